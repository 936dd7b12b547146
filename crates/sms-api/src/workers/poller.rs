//! Status poller (component I, §4.7): re-checks carrier status for
//! messages that were sent but never heard back from a webhook.

use std::sync::Arc;
use tracing::{error, info, warn};

use sms_core::carrier::{map_provider_status, SmsCarrier};
use sms_core::logging::{LogEventRequest, LoggingService};

pub struct StatusPoller {
    logging: Arc<dyn LoggingService>,
    carrier: Arc<dyn SmsCarrier>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PollTally {
    pub checked: u64,
    pub updated: u64,
}

impl StatusPoller {
    pub fn new(logging: Arc<dyn LoggingService>, carrier: Arc<dyn SmsCarrier>) -> Self {
        Self { logging, carrier }
    }

    /// One polling pass over every `sent` message from the last 24h.
    pub async fn run_once(&self) -> PollTally {
        let since = chrono::Utc::now() - chrono::Duration::hours(24);
        let messages = match self.logging.awaiting_status(since).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, "status poller: failed to list messages awaiting status");
                return PollTally::default();
            }
        };
        if messages.is_empty() {
            return PollTally::default();
        }

        info!(count = messages.len(), "status poller: checking messages");
        let mut tally = PollTally::default();

        for message in messages {
            tally.checked += 1;
            let Some(external_id) = message.external_message_id.as_deref() else {
                continue;
            };

            let status = match self.carrier.fetch_status(external_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(message_id = message.id, error = %e, "status poller: fetch_status failed");
                    continue;
                }
            };

            let internal_status = map_provider_status(&status.provider_status);
            if internal_status == message.statut_livraison {
                continue;
            }

            let mut event = LogEventRequest::new(internal_status, "status_poll");
            event.provider_status = Some(status.provider_status.clone());
            event.cost = status.cost;
            if let Err(e) = self.logging.log_event(message.id, event).await {
                error!(message_id = message.id, error = %e, "status poller: failed to log status change");
                continue;
            }
            tally.updated += 1;
        }

        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::carrier::{CarrierResult, SendResult, StatusResult};
    use sms_core::queue::{QueueStatus, SubmitRequest};
    use sms_core::testing::{InMemoryLoggingService, InMemoryQueueService};

    struct AlwaysDelivered;

    #[async_trait::async_trait]
    impl SmsCarrier for AlwaysDelivered {
        async fn send_sms(&self, _to: &str, _body: &str, _callback: &str) -> CarrierResult<SendResult> {
            unreachable!()
        }
        async fn fetch_status(&self, _external_id: &str) -> CarrierResult<StatusResult> {
            Ok(StatusResult { provider_status: "delivered".into(), cost: None })
        }
    }

    #[tokio::test]
    async fn advances_sent_message_to_delivered() {
        let queue = InMemoryQueueService::new();
        let item = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        let leased = queue.lease_pending(1).await.unwrap();
        assert_eq!(leased[0].id, item.id);

        let logging = InMemoryLoggingService::new();
        let message = logging.create_message(&leased[0], "sent", Some("SM1")).await.unwrap();
        assert_eq!(message.statut_livraison, "sent");

        let logging: Arc<dyn LoggingService> = Arc::new(logging);
        let carrier: Arc<dyn SmsCarrier> = Arc::new(AlwaysDelivered);
        let poller = StatusPoller::new(logging.clone(), carrier);

        let tally = poller.run_once().await;
        assert_eq!(tally.checked, 1);
        assert_eq!(tally.updated, 1);

        let timeline = logging.timeline(message.id).await.unwrap();
        assert!(timeline.iter().any(|l| l.status == "delivered"));
    }

    #[tokio::test]
    async fn skips_messages_with_no_external_id() {
        let queue = InMemoryQueueService::new();
        let item = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        let leased = queue.lease_pending(1).await.unwrap();
        assert_eq!(leased[0].status, QueueStatus::Processing);

        let logging = InMemoryLoggingService::new();
        logging.create_message(&leased[0], "sent", None).await.unwrap();
        let _ = item;

        let logging: Arc<dyn LoggingService> = Arc::new(logging);
        let carrier: Arc<dyn SmsCarrier> = Arc::new(AlwaysDelivered);
        let poller = StatusPoller::new(logging, carrier);

        let tally = poller.run_once().await;
        assert_eq!(tally.checked, 0);
    }
}
