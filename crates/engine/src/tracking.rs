//! User-facing tracking operations behind the chat commands

use slotwatch_core::{Campaign, CampaignId, Result, Reward, RewardId, RewardResult, User};
use slotwatch_networking::FetchDispatcher;
use slotwatch_persistence::{Registration, RewardStore};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Rewards of one campaign, for listings
#[derive(Debug, Clone)]
pub struct CampaignListing {
    pub campaign: Arc<Campaign>,
    pub rewards: Vec<Arc<Reward>>,
}

/// Everything a user tracks, as of now
#[derive(Debug, Clone, Default)]
pub struct RewardListing {
    /// Sorted by campaign name
    pub campaigns: Vec<CampaignListing>,
    /// Lookups that failed or have no usable campaign
    pub missing: Vec<RewardResult>,
}

pub struct TrackingService {
    store: Arc<dyn RewardStore>,
    dispatcher: FetchDispatcher,
}

impl TrackingService {
    pub fn new(store: Arc<dyn RewardStore>, dispatcher: FetchDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub async fn register(&self, telegram_chat_id: i64) -> Result<Registration> {
        let registration = self.store.register_user(telegram_chat_id).await?;
        if registration.created {
            info!(
                "Registered user {} (Chat ID: {})",
                registration.user.id, telegram_chat_id
            );
        }
        Ok(registration)
    }

    pub async fn find_user(&self, telegram_chat_id: i64) -> Result<Option<User>> {
        self.store.find_user_by_chat(telegram_chat_id).await
    }

    /// Track the given rewards. Ids already tracked are ignored and only ids
    /// upstream confirms exist are saved. Returns the saved ids.
    pub async fn add_rewards(&self, user: &User, ids: &[RewardId]) -> Result<Vec<RewardId>> {
        let existing: HashSet<RewardId> = self
            .store
            .tracked_rewards(user.id)
            .await?
            .into_iter()
            .map(|r| r.reward_id)
            .collect();

        let mut seen = HashSet::new();
        let new_ids: Vec<RewardId> = ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(id) && seen.insert(*id))
            .collect();
        if new_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: Vec<RewardId> = self
            .dispatcher
            .fetch_all(new_ids, false, CancellationToken::new())
            .await
            .into_iter()
            .filter(|r| r.is_present())
            .map(|r| r.id)
            .collect();
        found.sort();

        let saved = self.store.add_tracked_rewards(user.id, &found).await?;
        info!(
            "Added rewards [{}] for user {} (Chat ID: {})",
            join_ids(&saved),
            user.id,
            user.telegram_chat_id
        );
        Ok(saved)
    }

    pub async fn remove_rewards(&self, user: &User, ids: &[RewardId]) -> Result<Vec<RewardId>> {
        let removed = self.store.remove_tracked_rewards(user.id, ids).await?;
        info!(
            "Removed rewards [{}] for user {} (Chat ID: {})",
            join_ids(&removed),
            user.id,
            user.telegram_chat_id
        );
        Ok(removed)
    }

    /// Current state of every tracked reward, grouped by campaign.
    /// Each campaign is looked up at most once.
    pub async fn list_rewards(&self, user: &User) -> Result<RewardListing> {
        let ids: Vec<RewardId> = self
            .store
            .tracked_rewards(user.id)
            .await?
            .into_iter()
            .map(|r| r.reward_id)
            .collect();

        let results = self
            .dispatcher
            .fetch_all(ids, false, CancellationToken::new())
            .await;

        let mut listing = RewardListing::default();
        let mut by_campaign: BTreeMap<CampaignId, Vec<RewardResult>> = BTreeMap::new();

        for mut result in results {
            if !result.status.is_found() {
                listing.missing.push(result);
                continue;
            }
            match result.reward.as_ref().and_then(|r| r.campaign_id()) {
                Some(id) => by_campaign.entry(id).or_default().push(result),
                None => {
                    result.reclassify_no_campaign();
                    listing.missing.push(result);
                }
            }
        }

        for (campaign_id, results) in by_campaign {
            match self.dispatcher.campaign(campaign_id).await {
                Ok(campaign) => {
                    let mut rewards: Vec<Arc<Reward>> =
                        results.into_iter().filter_map(|r| r.reward).collect();
                    rewards.sort_by_key(|r| (r.attributes.amount_cents, r.id));
                    listing.campaigns.push(CampaignListing { campaign, rewards });
                }
                Err(e) => {
                    warn!("Could not fetch campaign {}: {}", campaign_id, e);
                    for mut result in results {
                        result.reclassify_no_campaign();
                        listing.missing.push(result);
                    }
                }
            }
        }

        listing
            .campaigns
            .sort_by(|a, b| a.campaign.name().cmp(b.campaign.name()));
        listing.missing.sort_by_key(|r| r.id);
        Ok(listing)
    }

    /// Forget past notifications so still-open rewards are announced again
    pub async fn reset_notifications(&self, user: &User) -> Result<u64> {
        let count = self.store.reset_notifications(user.id).await?;
        info!(
            "Notifications reset for user {} (Chat ID: {})",
            user.id, user.telegram_chat_id
        );
        Ok(count)
    }
}

fn join_ids(ids: &[RewardId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
