use crate::{domain::UserEmail, models::user::UserModel};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(name = "Saving new user to database", skip(self, password_hash))]
    pub async fn create_user(
        &self,
        email: &UserEmail,
        password_hash: &str,
    ) -> anyhow::Result<UserModel> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"INSERT INTO users (id, email, password_hash, premium, created_at)
            VALUES (?, ?, ?, 0, ?)
            RETURNING id, email, password_hash, premium, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })?;
        Ok(user)
    }

    #[instrument(name = "Fetching user by email from database", skip(self))]
    pub async fn find_by_email(&self, email: &UserEmail) -> anyhow::Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"SELECT id, email, password_hash, premium, created_at FROM users WHERE email = ?"#,
        )
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user: {:?}", e);
            e
        })?;
        Ok(user)
    }

    #[instrument(name = "Fetching user by id from database", skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"SELECT id, email, password_hash, premium, created_at FROM users WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Returns `false` when no such user exists. Setting the flag on a user who
    /// already has it is not an error.
    #[instrument(name = "Flagging user as premium", skip(self))]
    pub async fn set_premium(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE users SET premium = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
