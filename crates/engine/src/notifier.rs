//! Outbound notification seam

use slotwatch_core::{Campaign, Result, RewardResult, User};
use tracing::info;

/// Delivers messages to a user. Implementations own formatting.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// A tracked reward has open slots
    async fn notify_available(
        &self,
        user: &User,
        result: &RewardResult,
        campaign: &Campaign,
    ) -> Result<()>;

    /// Rewards that just went missing. Never called with an empty list.
    async fn notify_missing(&self, user: &User, missing: &[RewardResult]) -> Result<()>;
}

/// Writes notifications to the log instead of a chat
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify_available(
        &self,
        user: &User,
        result: &RewardResult,
        campaign: &Campaign,
    ) -> Result<()> {
        let title = result.reward.as_ref().map(|r| r.title()).unwrap_or_default();
        info!(
            "Reward {} ({}) of {} is available for chat {}",
            result.id,
            title,
            campaign.name(),
            user.telegram_chat_id
        );
        Ok(())
    }

    async fn notify_missing(&self, user: &User, missing: &[RewardResult]) -> Result<()> {
        let ids: Vec<String> = missing
            .iter()
            .map(|r| format!("{} ({})", r.id, r.status.reason()))
            .collect();
        info!(
            "Rewards missing for chat {}: [{}]",
            user.telegram_chat_id,
            ids.join(", ")
        );
        Ok(())
    }
}
