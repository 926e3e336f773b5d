//! The two upstream caches, constructed once at startup and passed around by reference

use super::TtlCache;
use slotwatch_core::{Campaign, CampaignId, Reward, RewardId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// TTL and sweep interval shared by both caches
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // sweep at 1.5x the TTL
        Self {
            ttl: Duration::from_secs(10 * 60),
            cleanup_interval: Duration::from_secs(15 * 60),
        }
    }
}

/// Reward and campaign caches. Each has its own lock; they never share one.
#[derive(Clone)]
pub struct ApiCaches {
    pub rewards: Arc<TtlCache<RewardId, Arc<Reward>>>,
    pub campaigns: Arc<TtlCache<CampaignId, Arc<Campaign>>>,
    cleanup_interval: Duration,
}

impl ApiCaches {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            rewards: Arc::new(TtlCache::new("RewardsCache", config.ttl)),
            campaigns: Arc::new(TtlCache::new("CampaignsCache", config.ttl)),
            cleanup_interval: config.cleanup_interval,
        }
    }

    /// Start one sweeper per cache; both stop when `cancel` fires
    pub fn spawn_sweepers(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.rewards
                .spawn_sweeper(self.cleanup_interval, cancel.child_token()),
            self.campaigns
                .spawn_sweeper(self.cleanup_interval, cancel.child_token()),
        ]
    }
}

impl Default for ApiCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
