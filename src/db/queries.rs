use crate::db::models::*;
use crate::error::AppResult;
use sqlx::{Pool, Sqlite};
use tracing::info;

pub type DbPool = Pool<Sqlite>;

/// Database operations for the audit log
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append an audit row
    pub async fn insert(pool: &DbPool, entry: &NewAuditLog) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (secret_key, action, timestamp, ip_address, metadata)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.secret_key)
        .bind(&entry.action)
        .bind(entry.timestamp)
        .bind(&entry.ip_address)
        .bind(&entry.metadata)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All rows for one secret, oldest first
    pub async fn list_for_secret(pool: &DbPool, secret_key: &str) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_logs WHERE secret_key = ? ORDER BY id ASC",
        )
        .bind(secret_key)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Number of rows with the given action
    #[cfg(test)]
    pub async fn count_by_action(pool: &DbPool, action: &str) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE action = ?")
            .bind(action)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
pub async fn setup_test_db() -> DbPool {
    use sqlx::sqlite::SqlitePoolOptions;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_db(&pool).await.expect("Failed to init database");
    pool
}

/// Initialize database with migrations
pub async fn init_db(pool: &DbPool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            secret_key TEXT NOT NULL,
            action TEXT NOT NULL,
            timestamp DATETIME NOT NULL,
            ip_address TEXT,
            metadata TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_secret_key ON audit_logs(secret_key)")
        .execute(pool)
        .await?;

    info!("Database migrations complete");
    Ok(())
}
