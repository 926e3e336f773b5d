use super::{Registration, RewardStore};
use crate::sqlite::{self as queries, Database};
use slotwatch_core::{Result, RewardId, TrackedReward, TrackedRewardUpdate, User};

#[async_trait::async_trait]
impl RewardStore for Database {
    async fn list_users(&self) -> Result<Vec<User>> {
        queries::list_users(self.pool()).await
    }

    async fn find_user_by_chat(&self, telegram_chat_id: i64) -> Result<Option<User>> {
        queries::find_user_by_chat(self.pool(), telegram_chat_id).await
    }

    async fn register_user(&self, telegram_chat_id: i64) -> Result<Registration> {
        let (user, created) = queries::register_user(self.pool(), telegram_chat_id, None).await?;
        Ok(Registration { user, created })
    }

    async fn tracked_rewards(&self, user_id: i64) -> Result<Vec<TrackedReward>> {
        queries::list_tracked_rewards(self.pool(), user_id).await
    }

    async fn add_tracked_rewards(
        &self,
        user_id: i64,
        reward_ids: &[RewardId],
    ) -> Result<Vec<RewardId>> {
        queries::add_tracked_rewards(self.pool(), user_id, reward_ids).await
    }

    async fn remove_tracked_rewards(
        &self,
        user_id: i64,
        reward_ids: &[RewardId],
    ) -> Result<Vec<RewardId>> {
        queries::remove_tracked_rewards(self.pool(), user_id, reward_ids).await
    }

    async fn save_tracked_rewards(
        &self,
        user_id: i64,
        updates: &[TrackedRewardUpdate],
    ) -> Result<()> {
        queries::save_tracked_rewards(self.pool(), user_id, updates).await
    }

    async fn reset_notifications(&self, user_id: i64) -> Result<u64> {
        queries::reset_notifications(self.pool(), user_id).await
    }
}
