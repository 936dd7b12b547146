//! # sms-carrier
//!
//! Concrete SMS carrier adapter (component B's implementation) and inbound
//! webhook signature verification. The carrier port itself (`SmsCarrier`,
//! `CarrierError`) lives in `sms-core`; this crate only supplies one concrete
//! adapter plus the default permanent-failure classifier.

pub mod classify;
pub mod client;
pub mod webhook;

pub use classify::default_is_permanent;
pub use client::{HttpSmsCarrier, HttpSmsCarrierConfig};
pub use webhook::{DeliveryWebhookPayload, WebhookVerificationError, WebhookVerifier};
