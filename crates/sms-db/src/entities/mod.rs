//! SeaORM entity models for the SMS dispatch core.

pub mod message;
pub mod message_log;
pub mod queue_item;

pub use message::Entity as MessageEntity;
pub use message_log::Entity as MessageLogEntity;
pub use queue_item::Entity as QueueItemEntity;

pub use sea_orm::entity::prelude::*;
pub use sea_orm::{NotSet, Set, Unchanged};
pub use serde::{Deserialize, Serialize};
