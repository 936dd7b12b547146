//! Default permanent-failure classifier for the reference carrier.
//!
//! Generalizes the original service's Twilio-shaped error codes onto the
//! abstract taxonomy named in the carrier port: invalid/unreachable
//! recipient, send-disabled, unsubscribed recipient, content-filtered,
//! non-deliverable. Every other carrier-origin code is treated as transient.

/// Invalid 'To' phone number.
pub const INVALID_RECIPIENT: &str = "21211";
/// 'To' phone number cannot be reached.
pub const UNREACHABLE_RECIPIENT: &str = "21214";
/// Permission to send an SMS has not been enabled for this number pair.
pub const SEND_DISABLED: &str = "21408";
/// Message cannot be sent to an unsubscribed recipient.
pub const UNSUBSCRIBED_RECIPIENT: &str = "21610";
/// Message filtered by the carrier.
pub const CONTENT_FILTERED: &str = "30007";
/// Message not delivered, recipient unreachable on the carrier network.
pub const NON_DELIVERABLE: &str = "30008";

const PERMANENT_CODES: [&str; 6] = [
    INVALID_RECIPIENT,
    UNREACHABLE_RECIPIENT,
    SEND_DISABLED,
    UNSUBSCRIBED_RECIPIENT,
    CONTENT_FILTERED,
    NON_DELIVERABLE,
];

/// The default `IsPermanent` classifier for [`crate::client::HttpSmsCarrier`].
pub fn default_is_permanent(code: &str) -> bool {
    PERMANENT_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_permanent_codes_are_permanent() {
        for code in PERMANENT_CODES {
            assert!(default_is_permanent(code));
        }
    }

    #[test]
    fn unknown_code_is_transient() {
        assert!(!default_is_permanent("20429")); // rate limit, retryable
        assert!(!default_is_permanent("unknown"));
    }
}
