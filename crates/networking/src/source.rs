//! Remote lookup seam used by the dispatcher

use crate::PatreonClient;
use slotwatch_core::{Campaign, CampaignId, Result, Reward, RewardId};

/// Anything that can resolve reward and campaign ids.
///
/// Errors carrying an HTTP status (`Error::status_code`) are classified by the
/// dispatcher; any other error counts as an infrastructure failure.
#[async_trait::async_trait]
pub trait RewardSource: Send + Sync {
    async fn fetch_reward(&self, id: RewardId) -> Result<Reward>;

    async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign>;
}

#[async_trait::async_trait]
impl RewardSource for PatreonClient {
    async fn fetch_reward(&self, id: RewardId) -> Result<Reward> {
        PatreonClient::fetch_reward(self, id).await
    }

    async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign> {
        PatreonClient::fetch_campaign(self, id).await
    }
}
