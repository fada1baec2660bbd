//! SQLite-backed credential store.

mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use user::{LOOKUP_TIMEOUT, StoreError, UserStore};

/// Schema steps, applied in order. The index of a step plus one is the
/// `user_version` it leaves behind.
const MIGRATIONS: &[&[&str]] = &[&[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT UNIQUE NOT NULL COLLATE NOCASE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX idx_users_email ON users(email)",
]];

/// Connections kept in the pool.
const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = match path {
            ":memory:" => "sqlite::memory:".to_string(),
            _ => format!("sqlite:{}?mode=rwc", path),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn schema_version(&self) -> Result<i64, sqlx::Error> {
        let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Bring the schema up to date. Each step commits together with its version bump.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let current = self.schema_version().await?;

        for (step, queries) in MIGRATIONS.iter().enumerate() {
            let version = step as i64 + 1;
            if version <= current {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            for query in queries.iter() {
                sqlx::query(query).execute(&mut *tx).await?;
            }
            // PRAGMA does not accept bound parameters.
            sqlx::query(&format!("PRAGMA user_version = {}", version))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            info!(version, "Applied schema migration");
        }

        Ok(())
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
