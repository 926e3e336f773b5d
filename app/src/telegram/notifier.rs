use super::{format, TelegramApi};
use slotwatch_core::{Campaign, Result, RewardResult, User};
use slotwatch_engine::Notifier;

/// Delivers sweep notifications as chat messages
#[derive(Clone)]
pub struct TelegramNotifier {
    api: TelegramApi,
    /// Base for checkout links
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(api: TelegramApi, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_available(
        &self,
        user: &User,
        result: &RewardResult,
        campaign: &Campaign,
    ) -> Result<()> {
        let text = format::reward_available(result, campaign, &self.base_url);
        self.api
            .send_message(user.telegram_chat_id, &text, None)
            .await
    }

    async fn notify_missing(&self, user: &User, missing: &[RewardResult]) -> Result<()> {
        if missing.is_empty() {
            return Ok(());
        }
        let text = format::rewards_missing(missing);
        self.api
            .send_message(user.telegram_chat_id, &text, None)
            .await
    }
}
