use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

use crate::{domain::NewSubscription, models::subscription::SubscriptionModel};

/// Result of an insert that is subject to the free-tier cap.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(SubscriptionModel),
    QuotaReached { limit: i64 },
}

#[derive(Clone, Debug)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a subscription for `owner`. When `free_tier_limit` is set and the
    /// owner is not premium, the count is checked by the insert statement
    /// itself, so concurrent inserts for one owner cannot overshoot the cap.
    #[instrument(name = "Saving new subscription to database", skip(self, new))]
    pub async fn insert(
        &self,
        owner: Uuid,
        new: &NewSubscription,
        free_tier_limit: Option<i64>,
    ) -> anyhow::Result<InsertOutcome> {
        // A single write statement takes the write lock up front and waits on
        // the busy timeout, where a read-then-write transaction fails fast.
        let inserted = sqlx::query_as::<_, SubscriptionModel>(
            r#"INSERT INTO subscriptions (name, price, renewal_date, user_id, created_at)
            SELECT ?, ?, ?, u.id, ?
            FROM users u
            WHERE u.id = ?
              AND (u.premium
                   OR ? IS NULL
                   OR (SELECT COUNT(*) FROM subscriptions s WHERE s.user_id = u.id) < ?)
            RETURNING id, name, price, renewal_date, user_id, created_at"#,
        )
        .bind(new.name.as_ref())
        .bind(new.price.to_string())
        .bind(new.renewal_date)
        .bind(Utc::now())
        .bind(owner)
        .bind(free_tier_limit)
        .bind(free_tier_limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })?;

        if let Some(subscription) = inserted {
            return Ok(InsertOutcome::Inserted(subscription));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        match (exists, free_tier_limit) {
            (true, Some(limit)) => Ok(InsertOutcome::QuotaReached { limit }),
            (true, None) => Err(anyhow::anyhow!("insert for {owner} matched no rows")),
            (false, _) => Err(anyhow::anyhow!("subscription owner {owner} does not exist")),
        }
    }

    /// Renewal date ascending with undated entries last, then name, then id.
    #[instrument(name = "Fetching subscriptions for owner", skip(self))]
    pub async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<SubscriptionModel>> {
        let rows = sqlx::query_as::<_, SubscriptionModel>(
            r#"SELECT id, name, price, renewal_date, user_id, created_at
            FROM subscriptions
            WHERE user_id = ?
            ORDER BY renewal_date IS NULL, renewal_date ASC, name COLLATE NOCASE ASC, id ASC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Deletes the row only if it belongs to `owner`. Returns whether a row
    /// was removed.
    #[instrument(name = "Deleting subscription", skip(self))]
    pub async fn delete_owned(&self, owner: Uuid, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
