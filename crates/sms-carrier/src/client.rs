//! Reference HTTP carrier adapter, shaped like the Twilio Messages REST API
//! (the provider the original service targeted).

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use sms_core::carrier::{CarrierError, CarrierResult, SendResult, SmsCarrier, StatusResult};

#[derive(Debug, Clone)]
pub struct HttpSmsCarrierConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl HttpSmsCarrierConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }
}

pub struct HttpSmsCarrier {
    config: HttpSmsCarrierConfig,
    http: reqwest::Client,
}

impl HttpSmsCarrier {
    pub fn new(config: HttpSmsCarrierConfig) -> Result<Self, CarrierError> {
        let http = reqwest::Client::builder()
            .user_agent("sms-dispatch-core/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| internal_error(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        )
    }

    fn message_url(&self, external_id: &str) -> String {
        format!(
            "{}/Accounts/{}/Messages/{}.json",
            self.config.base_url, self.config.account_sid, external_id
        )
    }

    async fn handle_response(&self, response: reqwest::Response) -> CarrierResult<MessageResourceResponse> {
        if response.status().is_success() {
            response
                .json::<MessageResourceResponse>()
                .await
                .map_err(|e| internal_error(format!("could not parse carrier response: {e}")))
        } else {
            let status = response.status();
            let body: Result<ApiErrorResponse, _> = response.json().await;
            match body {
                Ok(err) => Err(CarrierError {
                    code: err.code.to_string(),
                    message: err.message,
                    details: err.more_info.map(|u| serde_json::json!({ "more_info": u })),
                }),
                Err(_) => Err(CarrierError {
                    code: status.as_u16().to_string(),
                    message: format!("carrier returned HTTP {status}"),
                    details: None,
                }),
            }
        }
    }
}

#[async_trait]
impl SmsCarrier for HttpSmsCarrier {
    async fn send_sms(
        &self,
        to: &str,
        body: &str,
        status_callback_url: &str,
    ) -> CarrierResult<SendResult> {
        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
            ("StatusCallback", status_callback_url),
        ];

        tracing::debug!(to, "sending SMS via carrier");
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| internal_error(e.to_string()))?;

        let parsed = self.handle_response(response).await?;
        Ok(SendResult {
            external_id: parsed.sid,
            provider_status: parsed.status,
            cost: parsed.price.and_then(|p| Decimal::from_str(&p).ok().map(|d| -d)),
        })
    }

    async fn fetch_status(&self, external_id: &str) -> CarrierResult<StatusResult> {
        let response = self
            .http
            .get(self.message_url(external_id))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .map_err(|e| internal_error(e.to_string()))?;

        let parsed = self.handle_response(response).await?;
        Ok(StatusResult {
            provider_status: parsed.status,
            cost: parsed.price.and_then(|p| Decimal::from_str(&p).ok().map(|d| -d)),
        })
    }
}

fn internal_error(message: String) -> CarrierError {
    CarrierError {
        code: "carrier_unreachable".to_string(),
        message,
        details: None,
    }
}

#[derive(Debug, Deserialize)]
struct MessageResourceResponse {
    sid: String,
    status: String,
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: u32,
    message: String,
    more_info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_twilio_base_url() {
        let config = HttpSmsCarrierConfig::new("AC123", "token", "+15550000000");
        assert_eq!(config.base_url, "https://api.twilio.com/2010-04-01");
    }

    #[test]
    fn messages_url_embeds_account_sid() {
        let carrier = HttpSmsCarrier::new(HttpSmsCarrierConfig::new("AC123", "token", "+1")).unwrap();
        assert!(carrier.messages_url().ends_with("/Accounts/AC123/Messages.json"));
    }
}
