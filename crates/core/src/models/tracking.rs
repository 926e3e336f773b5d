//! Persisted tracking state owned by the store

use super::RewardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user subscribed to reward notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_chat_id: i64,
    pub language: String,
}

/// One user's subscription to one reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedReward {
    pub id: i64,
    pub user_id: i64,
    pub reward_id: RewardId,
    /// Set once the user has been told the reward is missing
    pub is_missing: bool,
    /// Start of the current availability window
    pub available_since: Option<DateTime<Utc>>,
    /// Last time an "available" notification was actually delivered
    pub last_notified: Option<DateTime<Utc>>,
}

impl TrackedReward {
    pub fn new(id: i64, user_id: i64, reward_id: RewardId) -> Self {
        Self {
            id,
            user_id,
            reward_id,
            is_missing: false,
            available_since: None,
            last_notified: None,
        }
    }
}

/// A sweep's new state for one record, plus the `last_notified` it was
/// derived from. The store only writes `last_notified` if the stored value
/// still matches, so a reset that lands mid-sweep is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedRewardUpdate {
    pub record: TrackedReward,
    pub read_last_notified: Option<DateTime<Utc>>,
}

impl TrackedRewardUpdate {
    /// Update that leaves `last_notified` as it was read
    pub fn unchanged_notification(record: TrackedReward) -> Self {
        let read_last_notified = record.last_notified;
        Self {
            record,
            read_last_notified,
        }
    }

    /// `last_notified` to store given what is currently stored
    pub fn resolve_last_notified(
        &self,
        stored: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        if stored == self.read_last_notified {
            self.record.last_notified
        } else {
            stored
        }
    }
}
