use super::{Registration, RewardStore};
use slotwatch_core::{Error, Result, RewardId, TrackedReward, TrackedRewardUpdate, User};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store backed by plain vectors. Used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<User>>,
    rewards: Mutex<Vec<TrackedReward>>,
    failing_saves: Mutex<HashSet<i64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `save_tracked_rewards` call for this user fail
    pub fn fail_saves_for(&self, user_id: i64) {
        lock(&self.failing_saves).insert(user_id);
    }

    /// Snapshot of one tracked reward
    pub fn tracked(&self, user_id: i64, reward_id: RewardId) -> Option<TrackedReward> {
        lock(&self.rewards)
            .iter()
            .find(|r| r.user_id == user_id && r.reward_id == reward_id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl RewardStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(lock(&self.users).clone())
    }

    async fn find_user_by_chat(&self, telegram_chat_id: i64) -> Result<Option<User>> {
        let users = lock(&self.users);
        Ok(users
            .iter()
            .find(|u| u.telegram_chat_id == telegram_chat_id)
            .cloned())
    }

    async fn register_user(&self, telegram_chat_id: i64) -> Result<Registration> {
        let mut users = lock(&self.users);
        if let Some(user) = users.iter().find(|u| u.telegram_chat_id == telegram_chat_id) {
            return Ok(Registration {
                user: user.clone(),
                created: false,
            });
        }

        let user = User {
            id: users.len() as i64 + 1,
            telegram_chat_id,
            language: "EN".to_string(),
        };
        users.push(user.clone());
        Ok(Registration {
            user,
            created: true,
        })
    }

    async fn tracked_rewards(&self, user_id: i64) -> Result<Vec<TrackedReward>> {
        let mut tracked: Vec<TrackedReward> = lock(&self.rewards)
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        tracked.sort_by_key(|r| r.reward_id);
        Ok(tracked)
    }

    async fn add_tracked_rewards(
        &self,
        user_id: i64,
        reward_ids: &[RewardId],
    ) -> Result<Vec<RewardId>> {
        let mut rewards = lock(&self.rewards);
        let mut inserted = Vec::new();
        for reward_id in reward_ids {
            if rewards
                .iter()
                .any(|r| r.user_id == user_id && r.reward_id == *reward_id)
            {
                continue;
            }
            let id = rewards.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            rewards.push(TrackedReward::new(id, user_id, *reward_id));
            inserted.push(*reward_id);
        }
        Ok(inserted)
    }

    async fn remove_tracked_rewards(
        &self,
        user_id: i64,
        reward_ids: &[RewardId],
    ) -> Result<Vec<RewardId>> {
        let mut rewards = lock(&self.rewards);
        let mut removed = Vec::new();
        for reward_id in reward_ids {
            let before = rewards.len();
            rewards.retain(|r| !(r.user_id == user_id && r.reward_id == *reward_id));
            if rewards.len() < before {
                removed.push(*reward_id);
            }
        }
        Ok(removed)
    }

    async fn save_tracked_rewards(
        &self,
        user_id: i64,
        updates: &[TrackedRewardUpdate],
    ) -> Result<()> {
        if lock(&self.failing_saves).contains(&user_id) {
            return Err(Error::DatabaseError(format!(
                "simulated failure saving rewards of user {}",
                user_id
            )));
        }

        let mut rewards = lock(&self.rewards);
        for update in updates {
            let record = &update.record;
            if let Some(existing) = rewards
                .iter_mut()
                .find(|r| r.id == record.id && r.user_id == user_id)
            {
                let last_notified = update.resolve_last_notified(existing.last_notified);
                *existing = TrackedReward {
                    last_notified,
                    ..record.clone()
                };
            }
        }
        Ok(())
    }

    async fn reset_notifications(&self, user_id: i64) -> Result<u64> {
        let mut rewards = lock(&self.rewards);
        let mut count = 0;
        for reward in rewards.iter_mut().filter(|r| r.user_id == user_id) {
            reward.last_notified = None;
            count += 1;
        }
        Ok(count)
    }
}
