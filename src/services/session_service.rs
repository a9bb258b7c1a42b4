//! Blocked-token records for signed-out sessions.
//!
//! Sign-out stores the token's `jti`; the authentication middleware consults
//! this table so a signed-out token is refused before its natural expiry.
//! Purging expired rows is left to external housekeeping.

use sqlx::PgPool;

use super::ServiceError;

pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn block(&self, jti: &str) -> Result<(), ServiceError> {
        sqlx::query("INSERT INTO blocked_tokens (jti) VALUES ($1)")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn is_blocked(&self, jti: &str) -> Result<bool, ServiceError> {
        let blocked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM blocked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(blocked)
    }
}
