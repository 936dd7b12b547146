//! Carrier delivery-receipt ingestion (component H, §4.6).

use actix_web::{web, HttpRequest, HttpResponse};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

use sms_carrier::webhook::{DeliveryWebhookPayload, WebhookProcessingError, WebhookVerifier};
use sms_core::carrier::map_provider_status;
use sms_core::logging::LogEventRequest;

use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

/// `POST /webhooks/sms/delivery` — carrier-signed receipt, form-encoded.
/// Always returns 200 when the payload is well-formed and verified, even if
/// the referenced message is unknown, to avoid carrier retry storms.
pub async fn delivery_webhook(data: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let body = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return HttpResponse::BadRequest().body("invalid body encoding"),
    };

    let signature = req
        .headers()
        .get("X-Signature")
        .and_then(|v| v.to_str().ok());

    let verifier = WebhookVerifier::new(data.config.carrier.webhook_signing_secret.clone());
    let payload = match verifier.process_payload(body, signature) {
        Ok(payload) => payload,
        Err(WebhookProcessingError::Verification(e)) => {
            warn!(error = %e, "delivery webhook signature rejected");
            return HttpResponse::BadRequest().body("signature verification failed");
        }
        Err(WebhookProcessingError::MissingSignature) => {
            warn!("delivery webhook missing X-Signature header");
            return HttpResponse::BadRequest().body("missing signature");
        }
        Err(WebhookProcessingError::InvalidPayload(e)) => {
            warn!(error = %e, "delivery webhook payload malformed");
            return HttpResponse::BadRequest().body("malformed payload");
        }
    };

    let provider_status = map_provider_status(&payload.message_status);
    let provider_response = match serde_json::to_value(&payload) {
        Ok(v) => v,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };

    match data
        .logging_service
        .update_delivery_status(&payload.message_sid, &provider_status, provider_response)
        .await
    {
        Ok(found) => {
            if !found {
                warn!(external_id = %payload.message_sid, "delivery webhook for unknown message");
            }
            HttpResponse::Ok().body("OK")
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to apply delivery webhook");
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

/// `POST /webhooks/sms/status/{message_id}` — internal unsigned receipt,
/// addressed by the internal message id the dispatcher embeds in the
/// carrier's status callback URL. Bypasses signature verification.
pub async fn internal_status_webhook(
    data: web::Data<AppState>,
    message_id: web::Path<i64>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let body = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return Ok(HttpResponse::BadRequest().body("invalid body encoding")),
    };

    let payload: DeliveryWebhookPayload = match serde_urlencoded::from_str(body) {
        Ok(payload) => payload,
        Err(_) => return Ok(HttpResponse::BadRequest().body("malformed payload")),
    };

    let provider_status = map_provider_status(&payload.message_status);
    let cost = payload.price.as_deref().and_then(|p| Decimal::from_str(p).ok());

    let mut event = LogEventRequest::new(provider_status, "delivery_update");
    event.provider_status = Some(payload.message_status.clone());
    event.provider_response = Some(serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null));
    event.error_code = payload.error_code.clone();
    event.error_message = payload.error_message.clone();
    event.external_message_id = Some(payload.message_sid.clone());
    event.cost = cost;

    data.logging_service.log_event(message_id.into_inner(), event).await?;
    Ok(HttpResponse::Ok().body("OK"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_provider_status_passes_through_delivered() {
        assert_eq!(map_provider_status("delivered"), "delivered");
    }
}
