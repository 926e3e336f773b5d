use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use slotwatch_core::{
    Campaign, CampaignAttributes, CampaignId, CampaignReference, CampaignRelationship, Error,
    Result, Reward, RewardAttributes, RewardId, RewardRelationships, RewardResult, RewardStatus,
    User,
};
use slotwatch_engine::{spawn_update_loop, ManualClock, Notifier, UpdateConfig, UpdateJob};
use slotwatch_networking::{DispatcherConfig, FetchDispatcher, RewardSource};
use slotwatch_persistence::{ApiCaches, InMemoryStore, RewardStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const CAMPAIGN: u64 = 500;

#[derive(Clone, Copy)]
enum Upstream {
    Remaining(i64),
    Status(u16),
}

/// Holds reward lookups until released
#[derive(Clone, Default)]
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
struct ScriptedSource {
    rewards: Mutex<HashMap<u64, Upstream>>,
    reward_calls: AtomicUsize,
    campaign_calls: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

impl ScriptedSource {
    fn set(&self, id: u64, state: Upstream) {
        self.rewards.lock().unwrap().insert(id, state);
    }

    fn close_gate(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait::async_trait]
impl RewardSource for ScriptedSource {
    async fn fetch_reward(&self, id: RewardId) -> Result<Reward> {
        self.reward_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let state = self.rewards.lock().unwrap().get(&id.as_u64()).copied();
        match state {
            Some(Upstream::Remaining(remaining)) => Ok(Reward {
                id,
                attributes: RewardAttributes {
                    remaining,
                    title: format!("Tier {}", id),
                    ..Default::default()
                },
                relationships: RewardRelationships {
                    campaign: Some(CampaignRelationship {
                        data: Some(CampaignReference {
                            id: CampaignId(CAMPAIGN),
                            kind: "campaign".to_string(),
                        }),
                    }),
                },
            }),
            Some(Upstream::Status(code)) => Err(Error::Status {
                code,
                url: id.api_path(),
            }),
            None => Err(Error::Status {
                code: 404,
                url: id.api_path(),
            }),
        }
    }

    async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign> {
        self.campaign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Campaign {
            id,
            kind: "campaign".to_string(),
            attributes: CampaignAttributes {
                name: "Some Creator".to_string(),
                ..Default::default()
            },
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    available: Mutex<Vec<(i64, RewardId, String)>>,
    missing: Mutex<Vec<(i64, Vec<(RewardId, RewardStatus)>)>>,
    fail_available: AtomicBool,
    fail_missing: AtomicBool,
    missing_attempts: AtomicUsize,
}

impl RecordingNotifier {
    fn available_count(&self) -> usize {
        self.available.lock().unwrap().len()
    }

    fn missing_batches(&self) -> Vec<(i64, Vec<(RewardId, RewardStatus)>)> {
        self.missing.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_available(
        &self,
        user: &User,
        result: &RewardResult,
        campaign: &Campaign,
    ) -> Result<()> {
        if self.fail_available.load(Ordering::SeqCst) {
            return Err(Error::NotificationError("chat unreachable".to_string()));
        }
        self.available
            .lock()
            .unwrap()
            .push((user.id, result.id, campaign.name().to_string()));
        Ok(())
    }

    async fn notify_missing(&self, user: &User, missing: &[RewardResult]) -> Result<()> {
        self.missing_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_missing.load(Ordering::SeqCst) {
            return Err(Error::NotificationError("chat unreachable".to_string()));
        }
        let mut batch: Vec<(RewardId, RewardStatus)> =
            missing.iter().map(|r| (r.id, r.status)).collect();
        batch.sort_by_key(|(id, _)| *id);
        self.missing.lock().unwrap().push((user.id, batch));
        Ok(())
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    source: Arc<ScriptedSource>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    job: UpdateJob,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let source = Arc::new(ScriptedSource::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let dispatcher = FetchDispatcher::new(
            source.clone(),
            ApiCaches::default(),
            &DispatcherConfig { max_parallelism: 2 },
        );
        let job = UpdateJob::new(
            store.clone(),
            dispatcher,
            notifier.clone(),
            clock.clone(),
            UpdateConfig::default(),
        );
        Self {
            store,
            source,
            notifier,
            clock,
            job,
        }
    }

    async fn user_tracking(&self, chat_id: i64, rewards: &[u64]) -> User {
        let user = self.store.register_user(chat_id).await.unwrap().user;
        let ids: Vec<RewardId> = rewards.iter().copied().map(RewardId).collect();
        self.store.add_tracked_rewards(user.id, &ids).await.unwrap();
        user
    }

    async fn sweep(&self) -> slotwatch_engine::SweepReport {
        let report = self.job.run_sweep(&CancellationToken::new()).await.unwrap();
        self.clock.advance(ChronoDuration::minutes(2));
        report
    }
}

#[tokio::test]
async fn test_one_notification_per_availability_window() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10]).await;

    for remaining in [0, 5, 5, 0, 5] {
        h.source.set(10, Upstream::Remaining(remaining));
        h.sweep().await;
    }

    let sent = h.notifier.available.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![
            (user.id, RewardId(10), "Some Creator".to_string()),
            (user.id, RewardId(10), "Some Creator".to_string()),
        ]
    );
    // every sweep bypasses the reward cache, the campaign comes from cache
    assert_eq!(h.source.reward_calls.load(Ordering::SeqCst), 5);
    assert_eq!(h.source.campaign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_rewards_are_batched_once() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10, 11, 12]).await;
    h.source.set(10, Upstream::Status(403));
    h.source.set(12, Upstream::Remaining(0));

    let report = h.sweep().await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.missing, 2);

    let report = h.sweep().await;
    assert_eq!(report.missing, 0);

    assert_eq!(
        h.notifier.missing_batches(),
        vec![(
            user.id,
            vec![
                (RewardId(10), RewardStatus::Forbidden),
                (RewardId(11), RewardStatus::NotFound),
            ]
        )]
    );
    assert!(h.store.tracked(user.id, RewardId(10)).unwrap().is_missing);
    assert!(!h.store.tracked(user.id, RewardId(12)).unwrap().is_missing);

    // recovery clears the flag, a later loss is reported again
    h.source.set(10, Upstream::Remaining(0));
    h.sweep().await;
    assert!(!h.store.tracked(user.id, RewardId(10)).unwrap().is_missing);

    h.source.set(10, Upstream::Status(404));
    h.sweep().await;
    assert_eq!(h.notifier.missing_batches().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_keeps_previous_state() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10]).await;

    h.source.set(10, Upstream::Remaining(3));
    h.sweep().await;
    let before = h.store.tracked(user.id, RewardId(10)).unwrap();
    assert!(before.available_since.is_some());

    h.source.set(10, Upstream::Status(429));
    let report = h.sweep().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(h.store.tracked(user.id, RewardId(10)).unwrap(), before);
    assert!(h.notifier.missing_batches().is_empty());
}

#[tokio::test]
async fn test_failed_delivery_is_retried_next_sweep() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10]).await;
    h.source.set(10, Upstream::Remaining(1));

    h.notifier.fail_available.store(true, Ordering::SeqCst);
    let report = h.sweep().await;
    assert_eq!(report.notified, 0);

    let record = h.store.tracked(user.id, RewardId(10)).unwrap();
    assert!(record.available_since.is_some());
    assert!(record.last_notified.is_none());

    h.notifier.fail_available.store(false, Ordering::SeqCst);
    let report = h.sweep().await;
    assert_eq!(report.notified, 1);
    assert_eq!(h.notifier.available_count(), 1);
}

#[tokio::test]
async fn test_reset_during_sweep_is_kept() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10]).await;
    h.source.set(10, Upstream::Remaining(2));
    h.sweep().await;
    assert_eq!(h.notifier.available_count(), 1);

    let gate = h.source.close_gate();
    let job = h.job.clone();
    let sweep = tokio::spawn(async move { job.run_sweep(&CancellationToken::new()).await });

    gate.entered.notified().await;
    h.store.reset_notifications(user.id).await.unwrap();
    gate.release.notify_one();
    sweep.await.unwrap().unwrap();
    h.clock.advance(ChronoDuration::minutes(2));

    assert_eq!(h.store.tracked(user.id, RewardId(10)).unwrap().last_notified, None);

    // the still-open window is announced again
    let report = h.sweep().await;
    assert_eq!(report.notified, 1);
    assert_eq!(h.notifier.available_count(), 2);
}

#[tokio::test]
async fn test_failed_missing_notice_is_retried_next_sweep() {
    let h = Harness::new();
    let user = h.user_tracking(1, &[10]).await;
    h.source.set(10, Upstream::Status(404));

    h.notifier.fail_missing.store(true, Ordering::SeqCst);
    h.sweep().await;
    assert!(!h.store.tracked(user.id, RewardId(10)).unwrap().is_missing);
    assert!(h.notifier.missing_batches().is_empty());

    h.notifier.fail_missing.store(false, Ordering::SeqCst);
    h.sweep().await;
    h.sweep().await;

    assert_eq!(h.notifier.missing_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.notifier.missing_batches(),
        vec![(user.id, vec![(RewardId(10), RewardStatus::NotFound)])]
    );
    assert!(h.store.tracked(user.id, RewardId(10)).unwrap().is_missing);
}

#[tokio::test]
async fn test_failed_commit_only_affects_that_user() {
    let h = Harness::new();
    let broken = h.user_tracking(1, &[10]).await;
    let healthy = h.user_tracking(2, &[11]).await;
    h.store.fail_saves_for(broken.id);

    let report = h.sweep().await;

    assert_eq!(report.users, 2);
    assert_eq!(report.failed_users, 1);
    // missing batch only goes out after a successful commit
    assert_eq!(
        h.notifier.missing_batches(),
        vec![(healthy.id, vec![(RewardId(11), RewardStatus::NotFound)])]
    );
    assert!(!h.store.tracked(broken.id, RewardId(10)).unwrap().is_missing);
    assert!(h.store.tracked(healthy.id, RewardId(11)).unwrap().is_missing);
}

#[tokio::test]
async fn test_users_without_rewards_are_skipped() {
    let h = Harness::new();
    h.user_tracking(1, &[]).await;

    let report = h.sweep().await;

    assert_eq!(report.users, 1);
    assert_eq!(report.checked, 0);
    assert_eq!(h.source.reward_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_loop_runs_immediately_and_on_interval() {
    let h = Harness::new();
    h.user_tracking(1, &[10]).await;
    h.source.set(10, Upstream::Remaining(0));

    let cancel = CancellationToken::new();
    let handle = spawn_update_loop(h.job.clone(), Duration::from_secs(120), cancel.clone());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.source.reward_calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.source.reward_calls.load(Ordering::SeqCst), 2);

    cancel.cancel();
    handle.await.unwrap();
}
