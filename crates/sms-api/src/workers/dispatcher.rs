//! Batch dispatcher (component G): lease -> send -> log -> complete/retry.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use sms_carrier::default_is_permanent;
use sms_core::carrier::{map_provider_status, SmsCarrier};
use sms_core::directory::ContactDirectory;
use sms_core::errors::{CoreError, CoreResult};
use sms_core::logging::{LogEventRequest, LoggingService, Message};
use sms_core::phone;
use sms_core::queue::{QueueItem, QueueService};

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchTally {
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
}

pub struct Dispatcher {
    queue: Arc<dyn QueueService>,
    logging: Arc<dyn LoggingService>,
    carrier: Arc<dyn SmsCarrier>,
    contacts: Arc<dyn ContactDirectory>,
    base_url: String,
    default_region: String,
    rate_limit: i64,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn QueueService>,
        logging: Arc<dyn LoggingService>,
        carrier: Arc<dyn SmsCarrier>,
        contacts: Arc<dyn ContactDirectory>,
        base_url: String,
        default_region: String,
        rate_limit: i64,
        concurrency: usize,
    ) -> Self {
        Self { queue, logging, carrier, contacts, base_url, default_region, rate_limit, concurrency }
    }

    /// One dispatcher pass: lease up to `batchSize` eligible items and
    /// drive each through the carrier, bounded by a semaphore-backed pool.
    pub async fn run_once(&self) -> DispatchTally {
        let batch_size = self.rate_limit.clamp(1, i64::MAX) as u64;

        let items = match self.queue.lease_pending(batch_size).await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "dispatcher: failed to lease pending items");
                return DispatchTally::default();
            }
        };
        if items.is_empty() {
            return DispatchTally::default();
        }

        info!(count = items.len(), "dispatcher: leased batch");

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let queue = self.queue.clone();
            let logging = self.logging.clone();
            let carrier = self.carrier.clone();
            let contacts = self.contacts.clone();
            let base_url = self.base_url.clone();
            let default_region = self.default_region.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                dispatch_one(queue, logging, carrier, contacts, &base_url, &default_region, item).await
            }));
        }

        let mut tally = DispatchTally::default();
        for handle in handles {
            match handle.await {
                Ok(true) => {
                    tally.processed += 1;
                    tally.sent += 1;
                }
                Ok(false) => {
                    tally.processed += 1;
                    tally.failed += 1;
                }
                Err(e) => error!(error = %e, "dispatcher: worker task panicked"),
            }
        }
        tally
    }
}

/// Drives one queue item through send -> log -> complete/retry. Returns
/// `true` on a successful send, `false` on any failure (transient or not).
///
/// `message` starts `None` and is only set once the Message row has
/// actually been created; every later branch checks the handle explicitly
/// rather than relying on whether a local variable happens to be bound.
async fn dispatch_one(
    queue: Arc<dyn QueueService>,
    logging: Arc<dyn LoggingService>,
    carrier: Arc<dyn SmsCarrier>,
    contacts: Arc<dyn ContactDirectory>,
    base_url: &str,
    default_region: &str,
    item: QueueItem,
) -> bool {
    let t0 = chrono::Utc::now();
    let mut message: Option<Message> = None;

    let outcome: CoreResult<bool> = async {
        let created = logging.create_message(&item, "processing", None).await?;
        message = Some(created);
        let msg_id = message.as_ref().unwrap().id;

        let callback_url = format!("{base_url}/api/v1/webhooks/sms/status/{msg_id}");

        let raw_phone = contacts
            .phone_number(item.contact_id)
            .await?
            .ok_or_else(|| CoreError::internal(format!("contact {} has no phone on file", item.contact_id)))?;
        let to = phone::normalize(&raw_phone, default_region)?;

        match carrier.send_sms(&to, &item.message_content, &callback_url).await {
            Ok(result) => {
                let internal_status = map_provider_status(&result.provider_status);
                let duration_ms = (chrono::Utc::now() - t0).num_milliseconds();

                let mut event = LogEventRequest::new(internal_status, "sent");
                event.provider_status = Some(result.provider_status.clone());
                event.external_message_id = Some(result.external_id.clone());
                event.cost = result.cost;
                event.duration_ms = Some(duration_ms);
                logging.log_event(msg_id, event).await?;

                queue
                    .complete_sent(
                        item.id,
                        &result.external_id,
                        serde_json::json!({ "provider_status": result.provider_status }),
                    )
                    .await?;
                Ok(true)
            }
            Err(carrier_err) => {
                let permanent = default_is_permanent(&carrier_err.code);
                let status = if permanent { "failed" } else { "retry_pending" };

                let mut event = LogEventRequest::new(status, "send_failed");
                event.error_code = Some(carrier_err.code.clone());
                event.error_message = Some(carrier_err.message.clone());
                event.provider_response = carrier_err.details.clone();
                logging.log_event(msg_id, event).await?;

                queue.fail_attempt(item.id, &carrier_err.message, permanent).await?;
                Ok(false)
            }
        }
    }
    .await;

    match outcome {
        Ok(sent) => sent,
        Err(e) => {
            error!(item_id = item.id, error = %e, "dispatcher: unexpected failure");
            if let Some(msg) = &message {
                let mut event = LogEventRequest::new("failed", "send_failed");
                event.error_code = Some("INTERNAL_ERROR".to_string());
                event.error_message = Some(e.to_string());
                let _ = logging.log_event(msg.id, event).await;
            }
            let _ = queue.fail_attempt(item.id, &e.to_string(), true).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::testing::{InMemoryLoggingService, InMemoryQueueService, StaticDirectory};
    use sms_core::carrier::{CarrierError, CarrierResult, SendResult, StatusResult};
    use sms_core::queue::SubmitRequest;

    struct AlwaysSucceeds;

    #[async_trait::async_trait]
    impl SmsCarrier for AlwaysSucceeds {
        async fn send_sms(&self, _to: &str, _body: &str, _callback: &str) -> CarrierResult<SendResult> {
            Ok(SendResult { external_id: "SM1".into(), provider_status: "queued".into(), cost: None })
        }
        async fn fetch_status(&self, _external_id: &str) -> CarrierResult<StatusResult> {
            Ok(StatusResult { provider_status: "delivered".into(), cost: None })
        }
    }

    struct AlwaysFailsPermanently;

    #[async_trait::async_trait]
    impl SmsCarrier for AlwaysFailsPermanently {
        async fn send_sms(&self, _to: &str, _body: &str, _callback: &str) -> CarrierResult<SendResult> {
            Err(CarrierError { code: "21211".into(), message: "invalid recipient".into(), details: None })
        }
        async fn fetch_status(&self, _external_id: &str) -> CarrierResult<StatusResult> {
            unreachable!()
        }
    }

    fn directory_with_one_contact() -> StaticDirectory {
        let mut dir = StaticDirectory::default();
        dir.phones.insert(1, "+14155552671".to_string());
        dir
    }

    #[tokio::test]
    async fn happy_path_marks_item_sent() {
        let queue: Arc<dyn QueueService> = Arc::new(InMemoryQueueService::new());
        let logging: Arc<dyn LoggingService> = Arc::new(InMemoryLoggingService::new());
        let carrier: Arc<dyn SmsCarrier> = Arc::new(AlwaysSucceeds);
        let contacts: Arc<dyn ContactDirectory> = Arc::new(directory_with_one_contact());

        queue.submit(SubmitRequest::new(1, 1, "hello")).await.unwrap();

        let dispatcher = Dispatcher::new(
            queue.clone(),
            logging,
            carrier,
            contacts,
            "http://localhost:8080".to_string(),
            "FR".to_string(),
            10,
            4,
        );
        let tally = dispatcher.run_once().await;
        assert_eq!(tally.processed, 1);
        assert_eq!(tally.sent, 1);

        let items = queue.list(Default::default(), 10, 0).await.unwrap();
        assert_eq!(items[0].status, sms_core::queue::QueueStatus::Sent);
    }

    #[tokio::test]
    async fn permanent_carrier_failure_marks_item_failed_in_one_attempt() {
        let queue: Arc<dyn QueueService> = Arc::new(InMemoryQueueService::new());
        let logging: Arc<dyn LoggingService> = Arc::new(InMemoryLoggingService::new());
        let carrier: Arc<dyn SmsCarrier> = Arc::new(AlwaysFailsPermanently);
        let contacts: Arc<dyn ContactDirectory> = Arc::new(directory_with_one_contact());

        queue.submit(SubmitRequest::new(1, 1, "hello")).await.unwrap();

        let dispatcher = Dispatcher::new(
            queue.clone(),
            logging,
            carrier,
            contacts,
            "http://localhost:8080".to_string(),
            "FR".to_string(),
            10,
            4,
        );
        let tally = dispatcher.run_once().await;
        assert_eq!(tally.failed, 1);

        let items = queue.list(Default::default(), 10, 0).await.unwrap();
        assert_eq!(items[0].status, sms_core::queue::QueueStatus::Failed);
        assert_eq!(items[0].attempts, 1);
    }

    #[tokio::test]
    async fn missing_contact_fails_the_item_without_calling_the_carrier() {
        let queue: Arc<dyn QueueService> = Arc::new(InMemoryQueueService::new());
        let logging: Arc<dyn LoggingService> = Arc::new(InMemoryLoggingService::new());
        let carrier: Arc<dyn SmsCarrier> = Arc::new(AlwaysSucceeds);
        let contacts: Arc<dyn ContactDirectory> = Arc::new(StaticDirectory::default());

        queue.submit(SubmitRequest::new(1, 42, "hello")).await.unwrap();

        let dispatcher = Dispatcher::new(
            queue.clone(),
            logging,
            carrier,
            contacts,
            "http://localhost:8080".to_string(),
            "FR".to_string(),
            10,
            4,
        );
        let tally = dispatcher.run_once().await;
        assert_eq!(tally.failed, 1);
    }
}
