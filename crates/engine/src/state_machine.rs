//! Per (user, reward) notification decisions
//!
//! The only state is what the store keeps on a `TrackedReward`: the missing
//! flag and the two timestamps. Every sweep re-derives the state from that
//! record and the latest lookup, so `transition` is a pure function of
//! `(record, result, campaign, now)`.

use chrono::{DateTime, Utc};
use slotwatch_core::{
    Campaign, CampaignId, RewardResult, RewardStatus, TrackedReward, TrackedRewardUpdate,
};
use std::sync::Arc;

/// State derived for one tracked reward in one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardState {
    /// Lookup failed, or the reward has no usable campaign
    Missing,
    PresentUnavailable,
    PresentAvailable,
    /// Rate limited; nothing learned, record left alone
    Skipped,
}

/// Outcome of applying one lookup to one record
#[derive(Debug, Clone)]
pub struct Transition {
    /// Record to persist
    pub record: TrackedReward,
    /// Lookup with its final classification, including `NoCampaign`
    pub result: RewardResult,
    pub state: RewardState,
    /// Set when an "available" message must go out for this campaign
    pub notify: Option<Arc<Campaign>>,
    /// Set the first time the reward is seen missing
    pub newly_missing: bool,
    previous_last_notified: Option<DateTime<Utc>>,
}

impl Transition {
    /// Undo the notification bookkeeping after a failed delivery
    pub fn revert_notification(&mut self) {
        self.record.last_notified = self.previous_last_notified;
        self.notify = None;
    }

    /// Store update for the new record, tied to the record it was derived from
    pub fn update(&self) -> TrackedRewardUpdate {
        TrackedRewardUpdate {
            record: self.record.clone(),
            read_last_notified: self.previous_last_notified,
        }
    }
}

/// Campaign that must be resolved before `transition` can decide.
/// Only available rewards need one.
pub fn campaign_to_resolve(result: &RewardResult) -> Option<CampaignId> {
    if !result.is_available() {
        return None;
    }
    result.reward.as_ref().and_then(|r| r.campaign_id())
}

/// Apply one classified lookup to a tracked reward.
///
/// `campaign` is the resolved campaign for available rewards, `None` when the
/// reward has no campaign reference or the campaign lookup failed.
pub fn transition(
    record: &TrackedReward,
    mut result: RewardResult,
    campaign: Option<Arc<Campaign>>,
    now: DateTime<Utc>,
) -> Transition {
    let mut next = record.clone();
    let previous_last_notified = record.last_notified;

    if result.status == RewardStatus::RateLimit {
        return Transition {
            record: next,
            result,
            state: RewardState::Skipped,
            notify: None,
            newly_missing: false,
            previous_last_notified,
        };
    }

    if result.status.is_found() {
        let has_campaign = result
            .reward
            .as_ref()
            .is_some_and(|r| r.campaign_id().is_some());
        if !has_campaign || (result.is_available() && campaign.is_none()) {
            result.reclassify_no_campaign();
        }
    }

    if !result.status.is_found() {
        let newly_missing = !next.is_missing;
        next.is_missing = true;
        return Transition {
            record: next,
            result,
            state: RewardState::Missing,
            notify: None,
            newly_missing,
            previous_last_notified,
        };
    }

    next.is_missing = false;

    if !result.is_available() {
        next.available_since = None;
        return Transition {
            record: next,
            result,
            state: RewardState::PresentUnavailable,
            notify: None,
            newly_missing: false,
            previous_last_notified,
        };
    }

    let opened = *next.available_since.get_or_insert(now);
    let notify = match next.last_notified {
        None => true,
        Some(last) => opened > last,
    };
    if notify {
        next.last_notified = Some(now);
    }

    Transition {
        record: next,
        result,
        state: RewardState::PresentAvailable,
        notify: if notify { campaign } else { None },
        newly_missing: false,
        previous_last_notified,
    }
}
