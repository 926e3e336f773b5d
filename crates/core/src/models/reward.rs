//! Reward models for the `GET /api/rewards/{id}` endpoint

use super::{CampaignId, RewardId};
use crate::types::{Cents, Currency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream reports `remaining = 0` for this reward even though slots are open
pub const ALWAYS_AVAILABLE_REWARD: RewardId = RewardId(7790866);

/// Envelope returned by `GET /api/rewards/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardResponse {
    pub data: Reward,
}

/// A reward tier as returned by upstream. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Zero when upstream returned an empty document
    #[serde(default)]
    pub id: RewardId,
    #[serde(default)]
    pub attributes: RewardAttributes,
    #[serde(default)]
    pub relationships: RewardRelationships,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardAttributes {
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: String,
    /// Open slots; anything above zero means the tier can be joined
    #[serde(default)]
    pub remaining: i64,
    #[serde(default)]
    pub user_limit: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Relative checkout path, e.g. `/checkout/Name?rid=123`
    #[serde(default)]
    pub url: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardRelationships {
    #[serde(default)]
    pub campaign: Option<CampaignRelationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignRelationship {
    pub data: Option<CampaignReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignReference {
    pub id: CampaignId,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Reward {
    /// Whether slots are open right now
    pub fn is_available(&self) -> bool {
        self.id == ALWAYS_AVAILABLE_REWARD || self.attributes.remaining > 0
    }

    /// Campaign this reward belongs to. `None` when the reference is absent or zero.
    pub fn campaign_id(&self) -> Option<CampaignId> {
        self.relationships
            .campaign
            .as_ref()
            .and_then(|rel| rel.data.as_ref())
            .map(|reference| reference.id)
            .filter(|id| !id.is_zero())
    }

    pub fn title(&self) -> &str {
        &self.attributes.title
    }

    /// Absolute checkout link built from the relative `url` attribute
    pub fn checkout_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.attributes.url.trim_start_matches('/')
        )
    }

    /// Price formatted as `12.50 €`
    pub fn formatted_amount(&self) -> String {
        Cents::new(self.attributes.amount_cents).format(&Currency::new(&self.attributes.currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISCIPLE: &str = r#"{
        "data": {
            "id": "10206990",
            "type": "reward",
            "attributes": {
                "amount_cents": 6000,
                "currency": "EUR",
                "created_at": "2023-09-19T22:44:20.842+00:00",
                "remaining": 0,
                "user_limit": 5,
                "title": "Disciple",
                "url": "/checkout/NommzArts?rid=10206990",
                "published": true
            },
            "relationships": {
                "campaign": {
                    "data": { "id": "3876079", "type": "campaign" },
                    "links": { "related": "https://www.patreon.com/api/campaigns/3876079" }
                }
            }
        }
    }"#;

    #[test]
    fn test_decode_reward_envelope() {
        let response: RewardResponse = serde_json::from_str(DISCIPLE).unwrap();
        let reward = response.data;

        assert_eq!(reward.id, RewardId(10206990));
        assert_eq!(reward.campaign_id(), Some(CampaignId(3876079)));
        assert_eq!(reward.attributes.amount_cents, 6000);
        assert_eq!(reward.title(), "Disciple");
        assert!(!reward.is_available());
        assert_eq!(
            reward.attributes.created_at.unwrap().to_rfc3339(),
            "2023-09-19T22:44:20.842+00:00"
        );
        assert_eq!(reward.formatted_amount(), "60.00 €");
        assert_eq!(
            reward.checkout_url("https://www.patreon.com/"),
            "https://www.patreon.com/checkout/NommzArts?rid=10206990"
        );
    }

    #[test]
    fn test_override_reward_is_always_available() {
        let json = r#"{ "data": { "id": "7790866", "attributes": { "remaining": 0, "amount_cents": 2000 } } }"#;
        let reward = serde_json::from_str::<RewardResponse>(json).unwrap().data;

        assert!(reward.is_available());
        assert_eq!(reward.campaign_id(), None);
    }

    #[test]
    fn test_remaining_slots_make_reward_available() {
        let json = r#"{ "data": { "id": "55", "attributes": { "remaining": 3 } } }"#;
        let reward = serde_json::from_str::<RewardResponse>(json).unwrap().data;
        assert!(reward.is_available());
    }

    #[test]
    fn test_null_or_zero_campaign_reference() {
        let null_ref = r#"{ "data": { "id": "1", "relationships": { "campaign": { "data": null } } } }"#;
        let zero_ref = r#"{ "data": { "id": "1", "relationships": { "campaign": { "data": { "id": "0" } } } } }"#;

        for json in [null_ref, zero_ref] {
            let reward = serde_json::from_str::<RewardResponse>(json).unwrap().data;
            assert_eq!(reward.campaign_id(), None);
        }
    }

    #[test]
    fn test_empty_document_decodes_to_zero_id() {
        let reward = serde_json::from_str::<RewardResponse>(r#"{ "data": {} }"#).unwrap().data;
        assert!(reward.id.is_zero());
    }
}
