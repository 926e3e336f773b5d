//! Per-id result emitted by a batch lookup

use super::{Reward, RewardId, RewardStatus};
use std::sync::Arc;

/// One classified lookup. `reward` is set iff the lookup decoded successfully;
/// a later `NoCampaign` reclassification keeps it attached.
#[derive(Debug, Clone)]
pub struct RewardResult {
    pub id: RewardId,
    pub reward: Option<Arc<Reward>>,
    pub status: RewardStatus,
}

impl RewardResult {
    pub fn found(id: RewardId, reward: Arc<Reward>) -> Self {
        Self {
            id,
            reward: Some(reward),
            status: RewardStatus::Found,
        }
    }

    pub fn failed(id: RewardId, status: RewardStatus) -> Self {
        Self {
            id,
            reward: None,
            status,
        }
    }

    pub fn is_present(&self) -> bool {
        self.reward.is_some()
    }

    /// Found and has open slots
    pub fn is_available(&self) -> bool {
        self.status.is_found() && self.reward.as_ref().is_some_and(|r| r.is_available())
    }

    /// Mark a present reward as unusable because its campaign is missing
    pub fn reclassify_no_campaign(&mut self) {
        self.status = RewardStatus::NoCampaign;
    }
}
