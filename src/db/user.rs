use std::time::Duration;

use sqlx::sqlite::SqlitePool;

use crate::auth::Identity;

/// Upper bound on a single credential lookup.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors from the credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
    timeout: Duration,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            timeout: LOOKUP_TIMEOUT,
        }
    }

    /// Override the lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (email, first_name, last_name) VALUES (?, ?, ?)")
                .bind(email)
                .bind(first_name)
                .bind(last_name)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Look up a user by email (case-insensitive).
    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let query = sqlx::query_as::<_, UserRow>(
            "SELECT id, first_name, last_name FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        Ok(row.map(Identity::from))
    }

    /// Look up a user by ID.
    pub async fn lookup_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        let query =
            sqlx::query_as::<_, UserRow>("SELECT id, first_name, last_name FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        Ok(row.map(Identity::from))
    }
}
