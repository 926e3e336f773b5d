//! Bounded-parallelism batch lookups
//!
//! `FetchDispatcher::fetch_many` turns a sequence of reward ids into a stream
//! of classified results. Ids are consumed lazily: one semaphore permit is
//! taken per id before its lookup is spawned, so at most `max_parallelism`
//! lookups are in flight no matter how long the input is. Cancellation stops
//! new lookups from starting; the ones already running finish and report.
//! The stream closes only after every spawned lookup has reported back.
//!
//! Results arrive in completion order, not request order.

use crate::RewardSource;
use slotwatch_core::{Campaign, CampaignId, Result, RewardId, RewardResult, RewardStatus};
use slotwatch_persistence::ApiCaches;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const DEFAULT_MAX_PARALLELISM: usize = 4;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on concurrent remote lookups per batch
    pub max_parallelism: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_parallelism: DEFAULT_MAX_PARALLELISM,
        }
    }
}

/// Read-through lookup front for rewards and campaigns
#[derive(Clone)]
pub struct FetchDispatcher {
    source: Arc<dyn RewardSource>,
    caches: ApiCaches,
    max_parallelism: usize,
}

impl FetchDispatcher {
    pub fn new(source: Arc<dyn RewardSource>, caches: ApiCaches, config: &DispatcherConfig) -> Self {
        Self {
            source,
            caches,
            max_parallelism: config.max_parallelism.max(1),
        }
    }

    pub fn caches(&self) -> &ApiCaches {
        &self.caches
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Look up every id and stream the results.
    ///
    /// Unless `force_refresh` is set, cached rewards are served without a
    /// network call. Ids that fail with an infrastructure error (connection,
    /// decoding) are logged and left out of the stream.
    pub fn fetch_many<I>(
        &self,
        ids: I,
        force_refresh: bool,
        cancel: CancellationToken,
    ) -> ReceiverStream<RewardResult>
    where
        I: IntoIterator<Item = RewardId>,
        I::IntoIter: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.max_parallelism);
        let ids = ids.into_iter();
        let this = self.clone();

        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(this.max_parallelism));
            let mut lookups = JoinSet::new();
            let mut launched = 0usize;

            for id in ids {
                if cancel.is_cancelled() {
                    break;
                }

                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let tx = tx.clone();
                let source = Arc::clone(&this.source);
                let caches = this.caches.clone();
                lookups.spawn(async move {
                    let result = lookup(source.as_ref(), &caches, id, force_refresh).await;
                    // permit is held until the result is handed over
                    if let Some(result) = result {
                        let _ = tx.send(result).await;
                    }
                    drop(permit);
                });
                launched += 1;

                // reap finished lookups so the set stays bounded too
                while let Some(joined) = lookups.try_join_next() {
                    log_join_error(joined);
                }
            }

            if cancel.is_cancelled() {
                debug!("Batch cancelled after launching {} lookups", launched);
            }

            while let Some(joined) = lookups.join_next().await {
                log_join_error(joined);
            }
            // last sender goes away here, which closes the stream
        });

        ReceiverStream::new(rx)
    }

    /// Like `fetch_many`, but only yields failures and rewards with open slots
    pub fn check_availability<I>(
        &self,
        ids: I,
        force_refresh: bool,
        cancel: CancellationToken,
    ) -> impl Stream<Item = RewardResult> + Send + Unpin
    where
        I: IntoIterator<Item = RewardId>,
        I::IntoIter: Send + 'static,
    {
        self.fetch_many(ids, force_refresh, cancel)
            .filter(|result| !result.status.is_found() || result.is_available())
    }

    /// Collect `fetch_many` eagerly
    pub async fn fetch_all<I>(
        &self,
        ids: I,
        force_refresh: bool,
        cancel: CancellationToken,
    ) -> Vec<RewardResult>
    where
        I: IntoIterator<Item = RewardId>,
        I::IntoIter: Send + 'static,
    {
        self.fetch_many(ids, force_refresh, cancel).collect().await
    }

    /// Campaign lookup through the campaign cache
    pub async fn campaign(&self, id: CampaignId) -> Result<Arc<Campaign>> {
        if let Some(cached) = self.caches.campaigns.get(&id) {
            debug!("Cache hit for campaign {}", id);
            return Ok(cached);
        }

        let campaign = Arc::new(self.source.fetch_campaign(id).await?);
        if !campaign.id.is_zero() {
            self.caches.campaigns.set(id, Arc::clone(&campaign));
        }
        Ok(campaign)
    }
}

/// Resolve one id. `None` means an infrastructure failure that was logged.
async fn lookup(
    source: &dyn RewardSource,
    caches: &ApiCaches,
    id: RewardId,
    force_refresh: bool,
) -> Option<RewardResult> {
    if !force_refresh {
        if let Some(cached) = caches.rewards.get(&id) {
            debug!("Cache hit for reward {}", id);
            return Some(RewardResult::found(id, cached));
        }
    }

    debug!("Fetching reward {}", id);
    match source.fetch_reward(id).await {
        Ok(reward) => {
            let reward = Arc::new(reward);
            // a zero id means upstream did not confirm the reward exists
            if !reward.id.is_zero() {
                caches.rewards.set(id, Arc::clone(&reward));
            }
            Some(RewardResult::found(id, reward))
        }
        Err(err) => match err.status_code() {
            Some(code) => {
                let status = RewardStatus::from_http_status(code);
                debug!("Reward {} classified as {:?} (HTTP {})", id, status, code);
                Some(RewardResult::failed(id, status))
            }
            None => {
                error!("Error fetching reward {}: {}", id, err);
                None
            }
        },
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!("Reward lookup task failed: {}", e);
    }
}
