//! Revoked token repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sis_core::error::{AppError, ErrorKind};
use sis_core::result::AppResult;
use sis_entity::revoked::{RevocationReason, RevokedToken};

use crate::store::RevocationStore;

/// Postgres-backed [`RevocationStore`].
#[derive(Debug, Clone)]
pub struct RevokedTokenRepository {
    pool: PgPool,
}

impl RevokedTokenRepository {
    /// Create a new revoked token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for RevokedTokenRepository {
    async fn find(&self, token: &str) -> AppResult<Option<RevokedToken>> {
        sqlx::query_as::<_, RevokedToken>("SELECT * FROM revoked_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to look up revoked token", e)
            })
    }

    async fn revoke(
        &self,
        token: &str,
        reason: &RevocationReason,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token, reason, revoked_until) VALUES ($1, $2, $3) \
             ON CONFLICT (token) DO NOTHING",
        )
        .bind(token)
        .bind(reason.code())
        .bind(valid_until)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke token", e))?;
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE revoked_until <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to sweep revoked tokens", e)
            })?;
        Ok(result.rows_affected())
    }
}
