//! Inbound delivery webhook verification and payload extraction.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Verifies the `X-Signature` header on an inbound carrier webhook.
pub struct WebhookVerifier {
    signing_secret: String,
}

impl WebhookVerifier {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Verifies `signature` (optionally prefixed `sha256=`) against an HMAC-SHA256
    /// of `body` keyed by the signing secret.
    pub fn verify_signature(&self, body: &str, signature: &str) -> Result<(), WebhookVerificationError> {
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

        let expected_signature =
            hex::decode(signature).map_err(|_| WebhookVerificationError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|_| WebhookVerificationError::InvalidSecret)?;
        mac.update(body.as_bytes());

        mac.verify_slice(&expected_signature)
            .map_err(|_| WebhookVerificationError::SignatureMismatch)?;

        Ok(())
    }

    /// Verifies the signature, then parses the body as a [`DeliveryWebhookPayload`].
    /// The carrier posts `StatusCallback` bodies form-encoded, not as JSON.
    /// A missing signature is rejected, never treated as pre-verified.
    pub fn process_payload(
        &self,
        body: &str,
        signature: Option<&str>,
    ) -> Result<DeliveryWebhookPayload, WebhookProcessingError> {
        let signature = signature.ok_or(WebhookProcessingError::MissingSignature)?;
        self.verify_signature(body, signature)
            .map_err(WebhookProcessingError::Verification)?;

        serde_urlencoded::from_str(body).map_err(WebhookProcessingError::InvalidPayload)
    }
}

/// Carrier delivery-status callback payload, shaped like Twilio's
/// `StatusCallback` POST body. Some carriers (and Twilio's own legacy
/// fields) post `SmsSid`/`SmsStatus` instead of `MessageSid`/`MessageStatus`;
/// deserialization falls back to those when the primary key is absent.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryWebhookPayload {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "MessageStatus")]
    pub message_status: String,
    #[serde(rename = "ErrorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "ErrorMessage")]
    pub error_message: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
}

impl<'de> Deserialize<'de> for DeliveryWebhookPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields: HashMap<String, String> = HashMap::deserialize(deserializer)?;

        let message_sid = fields
            .remove("MessageSid")
            .or_else(|| fields.remove("SmsSid"))
            .ok_or_else(|| serde::de::Error::custom("missing MessageSid/SmsSid"))?;
        let message_status = fields
            .remove("MessageStatus")
            .or_else(|| fields.remove("SmsStatus"))
            .ok_or_else(|| serde::de::Error::custom("missing MessageStatus/SmsStatus"))?;

        Ok(DeliveryWebhookPayload {
            message_sid,
            message_status,
            error_code: fields.remove("ErrorCode"),
            error_message: fields.remove("ErrorMessage"),
            to: fields.remove("To"),
            from: fields.remove("From"),
            price: fields.remove("Price"),
        })
    }
}

#[derive(Debug, Error)]
pub enum WebhookVerificationError {
    #[error("invalid signature format")]
    InvalidSignature,
    #[error("invalid signing secret")]
    InvalidSecret,
    #[error("signature verification failed")]
    SignatureMismatch,
}

#[derive(Debug, Error)]
pub enum WebhookProcessingError {
    #[error("webhook verification failed: {0}")]
    Verification(WebhookVerificationError),
    #[error("invalid form-encoded payload: {0}")]
    InvalidPayload(serde_urlencoded::de::Error),
    #[error("missing X-Signature header")]
    MissingSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature_with_and_without_prefix() {
        let verifier = WebhookVerifier::new("topsecret");
        let body = "MessageSid=SM1&MessageStatus=delivered";
        let sig = sign("topsecret", body);

        assert!(verifier.verify_signature(body, &sig).is_ok());
        assert!(verifier
            .verify_signature(body, &format!("sha256={sig}"))
            .is_ok());
    }

    #[test]
    fn rejects_signature_for_tampered_body() {
        let verifier = WebhookVerifier::new("topsecret");
        let sig = sign("topsecret", "MessageStatus=delivered");

        let result = verifier.verify_signature("MessageStatus=failed", &sig);
        assert!(matches!(
            result,
            Err(WebhookVerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let verifier = WebhookVerifier::new("topsecret");
        let result = verifier.verify_signature("MessageStatus=delivered", "not-hex!!");
        assert!(matches!(
            result,
            Err(WebhookVerificationError::InvalidSignature)
        ));
    }

    #[test]
    fn process_payload_parses_delivery_fields() {
        let verifier = WebhookVerifier::new("topsecret");
        let body = "MessageSid=SM1&MessageStatus=delivered";
        let sig = sign("topsecret", body);

        let payload = verifier.process_payload(body, Some(&sig)).unwrap();
        assert_eq!(payload.message_sid, "SM1");
        assert_eq!(payload.message_status, "delivered");
    }

    #[test]
    fn process_payload_rejects_missing_signature() {
        let verifier = WebhookVerifier::new("topsecret");
        let body = "MessageSid=SM1&MessageStatus=delivered";

        let result = verifier.process_payload(body, None);
        assert!(matches!(result, Err(WebhookProcessingError::MissingSignature)));
    }

    #[test]
    fn process_payload_accepts_sms_sid_and_status_aliases() {
        let verifier = WebhookVerifier::new("topsecret");
        let body = "SmsSid=SM1&SmsStatus=delivered";
        let sig = sign("topsecret", body);

        let payload = verifier.process_payload(body, Some(&sig)).unwrap();
        assert_eq!(payload.message_sid, "SM1");
        assert_eq!(payload.message_status, "delivered");
    }
}
