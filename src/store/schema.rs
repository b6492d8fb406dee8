use sqlx::SqlitePool;
use tracing::instrument;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BLOB PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    premium INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)"#;

const CREATE_SUBSCRIPTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price TEXT NOT NULL,
    renewal_date TEXT,
    user_id BLOB NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)"#;

const CREATE_SUBSCRIPTIONS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_subscriptions_user_id ON subscriptions (user_id)";

/// Creates the tables if they are missing, then applies the patches. Safe to
/// run on every boot.
#[instrument(name = "Running schema migrations", skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(CREATE_USERS).execute(&mut *tx).await?;
    sqlx::query(CREATE_SUBSCRIPTIONS).execute(&mut *tx).await?;
    sqlx::query(CREATE_SUBSCRIPTIONS_OWNER_INDEX)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    apply_patches(pool).await
}

/// Brings databases created by older builds up to date.
async fn apply_patches(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let has_created_at: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'created_at'",
    )
    .fetch_one(&mut *tx)
    .await?;
    if has_created_at == 0 {
        tracing::info!("Adding users.created_at");
        // ALTER TABLE only accepts constant defaults, so backfill afterwards.
        sqlx::query(
            "ALTER TABLE users ADD COLUMN created_at TEXT NOT NULL DEFAULT '1970-01-01 00:00:00'",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE users SET created_at = CURRENT_TIMESTAMP")
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS ix_users_email ON users (email)")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
