//! Campaign models for the `GET /api/campaigns/{id}` endpoint

use super::CampaignId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope returned by `GET /api/campaigns/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignResponse {
    pub data: Campaign,
}

/// The creator page a reward belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(default)]
    pub id: CampaignId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: CampaignAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub image_url: Option<String>,
    #[serde(rename = "is_nsfw", default)]
    pub nsfw: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn url(&self) -> &str {
        &self.attributes.url
    }
}
