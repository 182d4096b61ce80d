use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

use super::{ApiUser, DirectoryError, KeyDirectory};

/// API keys stored in the `users` table of a PostgreSQL database
pub struct PgKeyDirectory {
    pool: PgPool,
}

impl PgKeyDirectory {
    /// Connections open on first lookup, so a down database rejects requests instead of startup
    pub fn connect_lazy(uri: &str, max_connections: u32) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(uri)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyDirectory for PgKeyDirectory {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiUser>, DirectoryError> {
        let row = sqlx::query("SELECT id::text AS id FROM users WHERE api_key = $1 LIMIT 1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| ApiUser { id: row.get("id") }))
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed API key database pool");
    }
}
