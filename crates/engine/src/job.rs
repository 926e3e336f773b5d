//! Periodic sweep over every user's tracked rewards

use crate::state_machine::{campaign_to_resolve, transition, RewardState};
use crate::{Clock, Notifier};
use slotwatch_core::{
    Campaign, RewardId, RewardResult, Result, TrackedReward, TrackedRewardUpdate, User,
};
use slotwatch_networking::FetchDispatcher;
use slotwatch_persistence::RewardStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Bypass the reward cache on every sweep
    pub force_refresh: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

/// Totals for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub users: usize,
    pub failed_users: usize,
    pub checked: usize,
    pub notified: usize,
    pub missing: usize,
    pub skipped: usize,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.checked += other.checked;
        self.notified += other.notified;
        self.missing += other.missing;
        self.skipped += other.skipped;
    }
}

/// One full pass of availability checks
#[derive(Clone)]
pub struct UpdateJob {
    store: Arc<dyn RewardStore>,
    dispatcher: FetchDispatcher,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: UpdateConfig,
}

impl UpdateJob {
    pub fn new(
        store: Arc<dyn RewardStore>,
        dispatcher: FetchDispatcher,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: UpdateConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            notifier,
            clock,
            config,
        }
    }

    /// Sweep all users concurrently. A failing user does not affect the others.
    pub async fn run_sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        let users = self.store.list_users().await?;
        info!("Checking {} users for available rewards", users.len());

        let mut report = SweepReport {
            users: users.len(),
            ..Default::default()
        };

        let mut sweeps = JoinSet::new();
        for user in users {
            let job = self.clone();
            let cancel = cancel.child_token();
            sweeps.spawn(async move {
                let user_id = user.id;
                (user_id, job.sweep_user(&user, cancel).await)
            });
        }

        while let Some(joined) = sweeps.join_next().await {
            match joined {
                Ok((_, Ok(user_report))) => report.merge(user_report),
                Ok((user_id, Err(e))) => {
                    error!("Update for user {} failed: {}", user_id, e);
                    report.failed_users += 1;
                }
                Err(e) => {
                    error!("User sweep task failed: {}", e);
                    report.failed_users += 1;
                }
            }
        }

        info!(
            "Sweep finished: {} rewards checked, {} notified, {} newly missing, {} skipped, {} users failed",
            report.checked, report.notified, report.missing, report.skipped, report.failed_users
        );
        Ok(report)
    }

    /// Check one user's rewards and commit the new tracking state in one transaction.
    ///
    /// "Available" messages go out as results arrive; the "missing" batch is
    /// only sent once the transaction has committed. A failed delivery of
    /// either kind is undone so the next sweep sends it again.
    pub async fn sweep_user(&self, user: &User, cancel: CancellationToken) -> Result<SweepReport> {
        let tracked = self.store.tracked_rewards(user.id).await?;
        if tracked.is_empty() {
            return Ok(SweepReport::default());
        }

        let mut records: HashMap<RewardId, TrackedReward> =
            tracked.into_iter().map(|r| (r.reward_id, r)).collect();
        let ids: Vec<RewardId> = records.keys().copied().collect();

        let mut report = SweepReport::default();
        let mut updated = Vec::with_capacity(ids.len());
        let mut missing: Vec<RewardResult> = Vec::new();
        let mut missing_records: Vec<TrackedReward> = Vec::new();

        let mut results = self
            .dispatcher
            .fetch_many(ids, self.config.force_refresh, cancel);

        while let Some(result) = results.next().await {
            let Some(record) = records.remove(&result.id) else {
                warn!(
                    "Could not find tracked reward {} for user {}",
                    result.id, user.id
                );
                continue;
            };
            report.checked += 1;

            let campaign = self.resolve_campaign(&result).await;
            let mut outcome = transition(&record, result, campaign, self.clock.now());

            match outcome.state {
                RewardState::Skipped => {
                    debug!("Rate limited on reward {}, keeping previous state", record.reward_id);
                    report.skipped += 1;
                    continue;
                }
                RewardState::Missing => {
                    debug!("Reward not found: {} ({})", outcome.result.id, outcome.result.status);
                }
                _ => {}
            }

            if let Some(campaign) = outcome.notify.clone() {
                info!("Notifying user {} about available reward {}", user.id, outcome.result.id);
                match self
                    .notifier
                    .notify_available(user, &outcome.result, &campaign)
                    .await
                {
                    Ok(()) => report.notified += 1,
                    Err(e) => {
                        warn!("Failed to notify user {} about reward {}: {}", user.id, outcome.result.id, e);
                        outcome.revert_notification();
                    }
                }
            }

            if outcome.newly_missing {
                missing.push(outcome.result.clone());
                missing_records.push(outcome.record.clone());
            }
            updated.push(outcome.update());
        }

        self.store.save_tracked_rewards(user.id, &updated).await?;

        report.missing = missing.len();
        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(|r| r.id.to_string()).collect();
            info!("Notifying user {} about missing rewards: [{}]", user.id, ids.join(", "));
            if let Err(e) = self.notifier.notify_missing(user, &missing).await {
                warn!("Failed to send missing rewards to user {}: {}", user.id, e);
                self.unmark_missing(user, missing_records).await;
            }
        }

        Ok(report)
    }

    /// Clear the missing flag again so the batch is re-reported next sweep
    async fn unmark_missing(&self, user: &User, records: Vec<TrackedReward>) {
        let updates: Vec<TrackedRewardUpdate> = records
            .into_iter()
            .map(|mut record| {
                record.is_missing = false;
                TrackedRewardUpdate::unchanged_notification(record)
            })
            .collect();
        if let Err(e) = self.store.save_tracked_rewards(user.id, &updates).await {
            error!("Could not clear missing flags of user {}: {}", user.id, e);
        }
    }

    async fn resolve_campaign(&self, result: &RewardResult) -> Option<Arc<Campaign>> {
        let campaign_id = campaign_to_resolve(result)?;
        match self.dispatcher.campaign(campaign_id).await {
            Ok(campaign) => Some(campaign),
            Err(e) => {
                warn!("Could not fetch campaign {} for reward {}: {}", campaign_id, result.id, e);
                None
            }
        }
    }
}

/// Run a sweep now and then once per `interval` until `cancel` fires
pub fn spawn_update_loop(
    job: UpdateJob,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Background updates started (every {:?})", interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stopping background updates");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = job.run_sweep(&cancel).await {
                        error!("Update sweep failed: {}", e);
                    }
                }
            }
        }
    })
}
