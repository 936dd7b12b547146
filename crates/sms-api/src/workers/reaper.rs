//! Stuck-lease reaper (§5): returns queue items abandoned mid-processing
//! (worker crash, deploy, panic) back to `pending`, counting the attempt.

use std::sync::Arc;
use tracing::{error, info, warn};

use sms_core::queue::QueueService;

pub struct StuckLeaseReaper {
    queue: Arc<dyn QueueService>,
    lease_timeout: chrono::Duration,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReapTally {
    pub reclaimed: u64,
}

impl StuckLeaseReaper {
    pub fn new(queue: Arc<dyn QueueService>, lease_timeout: chrono::Duration) -> Self {
        Self { queue, lease_timeout }
    }

    pub async fn run_once(&self) -> ReapTally {
        let stuck = match self.queue.find_stuck_leases(self.lease_timeout).await {
            Ok(stuck) => stuck,
            Err(e) => {
                error!(error = %e, "reaper: failed to list stuck leases");
                return ReapTally::default();
            }
        };
        if stuck.is_empty() {
            return ReapTally::default();
        }

        warn!(count = stuck.len(), "reaper: reclaiming stuck leases");
        let mut tally = ReapTally::default();
        for item in stuck {
            match self.queue.reclaim_stuck_lease(item.id).await {
                Ok(_) => tally.reclaimed += 1,
                Err(e) => error!(item_id = item.id, error = %e, "reaper: failed to reclaim lease"),
            }
        }
        info!(reclaimed = tally.reclaimed, "reaper: pass complete");
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::queue::{QueueStatus, SubmitRequest};
    use sms_core::testing::InMemoryQueueService;

    #[tokio::test]
    async fn reclaims_leases_older_than_timeout() {
        let queue: Arc<dyn QueueService> = Arc::new(InMemoryQueueService::new());
        queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        let leased = queue.lease_pending(1).await.unwrap();
        assert_eq!(leased[0].status, QueueStatus::Processing);

        let reaper = StuckLeaseReaper::new(queue.clone(), chrono::Duration::seconds(-1));
        let tally = reaper.run_once().await;
        assert_eq!(tally.reclaimed, 1);

        let items = queue.list(Default::default(), 10, 0).await.unwrap();
        assert_eq!(items[0].status, QueueStatus::Pending);
    }

    #[tokio::test]
    async fn leaves_fresh_leases_alone() {
        let queue: Arc<dyn QueueService> = Arc::new(InMemoryQueueService::new());
        queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        queue.lease_pending(1).await.unwrap();

        let reaper = StuckLeaseReaper::new(queue.clone(), chrono::Duration::minutes(5));
        let tally = reaper.run_once().await;
        assert_eq!(tally.reclaimed, 0);
    }
}
