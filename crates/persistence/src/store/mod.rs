//! Storage abstraction consumed by the update job and the tracking service

mod inmemory;
mod database;

pub use inmemory::InMemoryStore;

use slotwatch_core::{Result, RewardId, TrackedReward, TrackedRewardUpdate, User};

/// Outcome of registering a chat
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    /// False when the chat was already registered
    pub created: bool,
}

/// Users and their tracked rewards
#[async_trait::async_trait]
pub trait RewardStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn find_user_by_chat(&self, telegram_chat_id: i64) -> Result<Option<User>>;

    /// Idempotent on the chat id
    async fn register_user(&self, telegram_chat_id: i64) -> Result<Registration>;

    async fn tracked_rewards(&self, user_id: i64) -> Result<Vec<TrackedReward>>;

    /// Returns the ids that were not tracked before
    async fn add_tracked_rewards(&self, user_id: i64, reward_ids: &[RewardId])
        -> Result<Vec<RewardId>>;

    /// Returns the ids that were actually removed
    async fn remove_tracked_rewards(
        &self,
        user_id: i64,
        reward_ids: &[RewardId],
    ) -> Result<Vec<RewardId>>;

    /// Persist all updates in one transaction; on error nothing is written.
    /// `last_notified` is only overwritten when the stored value still equals
    /// the one the update was derived from.
    async fn save_tracked_rewards(&self, user_id: i64, updates: &[TrackedRewardUpdate])
        -> Result<()>;

    /// Bulk-clear `last_notified` for every reward of the user
    async fn reset_notifications(&self, user_id: i64) -> Result<u64>;
}
