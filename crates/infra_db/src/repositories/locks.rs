//! Table-backed subject locks
//!
//! A lock is a row in `subject_locks`. Acquisition inserts the row, or takes
//! over a row whose TTL has passed, in a single statement. Release deletes
//! the row only if it still carries the holder's token.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use core_kernel::{DomainPort, PortError};
use domain_payments::{LockRelease, SubjectLockGuard, SubjectLockProvider};

use crate::error::port_error;

#[derive(Debug, Clone)]
pub struct PgSubjectLockProvider {
    pool: PgPool,
}

impl PgSubjectLockProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgSubjectLockProvider {}

#[async_trait]
impl SubjectLockProvider for PgSubjectLockProvider {
    #[instrument(skip(self), fields(lock_key = key))]
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<SubjectLockGuard>, PortError> {
        let token = SubjectLockGuard::new_token();

        let acquired: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO subject_locks (lock_key, token, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (lock_key) DO UPDATE
                SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
                WHERE subject_locks.expires_at <= now()
            RETURNING token
            "#,
        )
        .bind(key)
        .bind(&token)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;

        match acquired {
            Some(_) => {
                debug!("Acquired subject lock");
                let releaser: Arc<dyn LockRelease> = Arc::new(self.clone());
                Ok(Some(SubjectLockGuard::new(key, token, releaser)))
            }
            None => Ok(None),
        }
    }
}

impl LockRelease for PgSubjectLockProvider {
    fn release(&self, key: &str, token: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(lock_key = key, "No runtime to release subject lock; it will expire");
            return;
        };
        let pool = self.pool.clone();
        let key = key.to_string();
        let token = token.to_string();
        runtime.spawn(async move {
            let result = sqlx::query("DELETE FROM subject_locks WHERE lock_key = $1 AND token = $2")
                .bind(&key)
                .bind(&token)
                .execute(&pool)
                .await;
            match result {
                Ok(done) if done.rows_affected() == 1 => debug!(lock_key = %key, "Released subject lock"),
                Ok(_) => warn!(lock_key = %key, "Subject lock expired before release"),
                Err(e) => warn!(lock_key = %key, error = %e, "Failed to release subject lock"),
            }
        });
    }
}
