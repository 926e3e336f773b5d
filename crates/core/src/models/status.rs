//! Classification of a reward lookup outcome

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of looking up one reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    /// Decoded successfully
    Found,
    /// Any non-2xx not covered below
    Unknown,
    Forbidden,
    NotFound,
    /// Reward exists but its campaign is absent or could not be fetched.
    /// Never produced by the transport classifier.
    NoCampaign,
    RateLimit,
    InternalServerError,
    /// 502 or 504
    GatewayError,
}

impl RewardStatus {
    /// Map a non-2xx HTTP status code to a reward status
    pub fn from_http_status(code: u16) -> Self {
        match code {
            403 => RewardStatus::Forbidden,
            404 => RewardStatus::NotFound,
            429 => RewardStatus::RateLimit,
            500 => RewardStatus::InternalServerError,
            502 | 504 => RewardStatus::GatewayError,
            _ => RewardStatus::Unknown,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RewardStatus::Found)
    }

    /// Human readable reason shown to users next to a missing reward
    pub fn reason(&self) -> &'static str {
        match self {
            RewardStatus::Found => "Found",
            RewardStatus::Unknown => "Unknown error",
            RewardStatus::Forbidden => "Access forbidden",
            RewardStatus::NotFound => "Reward not found",
            RewardStatus::NoCampaign => "No associated campaign",
            RewardStatus::RateLimit => "Rate limited by upstream",
            RewardStatus::InternalServerError => "Upstream server error",
            RewardStatus::GatewayError => "Upstream gateway error",
        }
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
