//! Tracked reward persistence operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwatch_core::{Error, Result, RewardId, TrackedReward, TrackedRewardUpdate};
use sqlx::SqlitePool;
use tracing::debug;

/// Tracked reward record stored in database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackedRewardRow {
    pub id: i64,
    pub user_id: i64,
    pub reward_id: i64,
    pub is_missing: bool,
    pub available_since: Option<DateTime<Utc>>,
    pub last_notified: Option<DateTime<Utc>>,
}

impl TryFrom<TrackedRewardRow> for TrackedReward {
    type Error = Error;

    fn try_from(row: TrackedRewardRow) -> Result<Self> {
        let reward_id = u64::try_from(row.reward_id).map_err(|_| {
            Error::InvalidData(format!("negative reward id {} in row {}", row.reward_id, row.id))
        })?;
        Ok(TrackedReward {
            id: row.id,
            user_id: row.user_id,
            reward_id: RewardId(reward_id),
            is_missing: row.is_missing,
            available_since: row.available_since,
            last_notified: row.last_notified,
        })
    }
}

/// Reward ids are stored in a signed column
fn column_id(reward_id: RewardId) -> Result<i64> {
    i64::try_from(reward_id.as_u64())
        .map_err(|_| Error::InvalidData(format!("reward id {} is too large", reward_id)))
}

/// Get all tracked rewards of a user
pub async fn list_tracked_rewards(pool: &SqlitePool, user_id: i64) -> Result<Vec<TrackedReward>> {
    let rows = sqlx::query_as::<_, TrackedRewardRow>(
        r#"
        SELECT id, user_id, reward_id, is_missing, available_since, last_notified
        FROM tracked_rewards
        WHERE user_id = ?
        ORDER BY reward_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(TrackedReward::try_from).collect()
}

/// Start tracking rewards. Ids already tracked are skipped; returns the ids inserted.
pub async fn add_tracked_rewards(
    pool: &SqlitePool,
    user_id: i64,
    reward_ids: &[RewardId],
) -> Result<Vec<RewardId>> {
    let columns = reward_ids
        .iter()
        .map(|id| column_id(*id))
        .collect::<Result<Vec<_>>>()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    let mut inserted = Vec::new();
    for (reward_id, column) in reward_ids.iter().zip(columns) {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO tracked_rewards (user_id, reward_id) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(column)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() > 0 {
            inserted.push(*reward_id);
        }
    }

    tx.commit()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(inserted)
}

/// Stop tracking rewards; returns the ids that were actually removed
pub async fn remove_tracked_rewards(
    pool: &SqlitePool,
    user_id: i64,
    reward_ids: &[RewardId],
) -> Result<Vec<RewardId>> {
    let columns = reward_ids
        .iter()
        .map(|id| column_id(*id))
        .collect::<Result<Vec<_>>>()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    let mut removed = Vec::new();
    for (reward_id, column) in reward_ids.iter().zip(columns) {
        let result = sqlx::query("DELETE FROM tracked_rewards WHERE user_id = ? AND reward_id = ?")
            .bind(user_id)
            .bind(column)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() > 0 {
            removed.push(*reward_id);
        }
    }

    tx.commit()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(removed)
}

/// Write the sweep outcome for one user in a single transaction.
/// Any failure rolls back every record of the batch.
///
/// `last_notified` is compared against the value the sweep started from; a
/// reset committed in the meantime wins.
pub async fn save_tracked_rewards(
    pool: &SqlitePool,
    user_id: i64,
    updates: &[TrackedRewardUpdate],
) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    for update in updates {
        let record = &update.record;
        let result = sqlx::query(
            r#"
            UPDATE tracked_rewards
            SET is_missing = ?,
                available_since = ?,
                last_notified = CASE WHEN last_notified IS ? THEN ? ELSE last_notified END
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(record.is_missing)
        .bind(record.available_since)
        .bind(update.read_last_notified)
        .bind(record.last_notified)
        .bind(record.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            // removed by the user while the sweep was running
            debug!(
                "Tracked reward {} of user {} vanished before save",
                record.reward_id, user_id
            );
        }
    }

    tx.commit()
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Clear `last_notified` on every tracked reward of a user so still-open
/// windows are announced again
pub async fn reset_notifications(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE tracked_rewards SET last_notified = NULL WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected())
}
