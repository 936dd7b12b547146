//! Narrow ports onto the upstream collaborators this core depends on but
//! does not own: contact lookup and campaign status. Campaign composition,
//! personalization, and contact-list management live elsewhere (§1); all
//! the queue service needs from them is existence and status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Scheduled,
    Draft,
    Completed,
    Paused,
}

impl CampaignStatus {
    /// Campaign statuses a queue submission is allowed against, per §4.3.
    pub fn accepts_submissions(&self) -> bool {
        matches!(self, CampaignStatus::Active | CampaignStatus::Scheduled)
    }
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Returns the contact's raw phone number, or `None` if the contact
    /// does not exist.
    async fn phone_number(&self, contact_id: i64) -> CoreResult<Option<String>>;
}

#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    /// Returns the campaign's status, or `None` if it does not exist.
    async fn status(&self, campaign_id: i64) -> CoreResult<Option<CampaignStatus>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_scheduled_accept_submissions() {
        assert!(CampaignStatus::Active.accepts_submissions());
        assert!(CampaignStatus::Scheduled.accepts_submissions());
        assert!(!CampaignStatus::Draft.accepts_submissions());
        assert!(!CampaignStatus::Completed.accepts_submissions());
        assert!(!CampaignStatus::Paused.accepts_submissions());
    }
}
