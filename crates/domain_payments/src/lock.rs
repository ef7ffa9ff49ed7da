//! Per-subject exclusive locks
//!
//! Payment creation for an account runs under a short-lived lock keyed by
//! the account. Acquisition never waits: a held lock means another request
//! is already creating a payment for the same subject, and the caller gets
//! a retryable rejection. The guard releases on drop, so every exit path
//! (including an unwinding panic) gives the lock back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use core_kernel::{AccountId, DomainPort, PaymentId, PortError};

/// Lock key guarding payment creation for an account
pub fn create_payment_lock_key(account_id: AccountId) -> String {
    format!("create-payment:{}", account_id.as_uuid())
}

/// Lock key guarding refunds against one original payment
pub fn refund_lock_key(original_payment_id: PaymentId) -> String {
    format!("refund:{}", original_payment_id.as_uuid())
}

/// Gives a lock back to the provider that issued it
///
/// Called from `Drop`, so implementations must not block on I/O. Async
/// backends hand the release off to a spawned task.
pub trait LockRelease: Send + Sync {
    fn release(&self, key: &str, token: &str);
}

/// Proof of holding a subject lock
///
/// Only the holder's token can release the lock; a guard whose lock already
/// expired and was taken over by someone else releases nothing.
pub struct SubjectLockGuard {
    key: String,
    token: String,
    releaser: Arc<dyn LockRelease>,
}

impl SubjectLockGuard {
    pub fn new(key: impl Into<String>, token: impl Into<String>, releaser: Arc<dyn LockRelease>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            releaser,
        }
    }

    /// Generates a fresh holder token
    pub fn new_token() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for SubjectLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectLockGuard")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Drop for SubjectLockGuard {
    fn drop(&mut self) {
        self.releaser.release(&self.key, &self.token);
    }
}

/// Issues per-subject locks
#[async_trait]
pub trait SubjectLockProvider: DomainPort {
    /// Takes the lock for `key` if nobody holds it
    ///
    /// Returns `Ok(None)` when the lock is held by someone else.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<SubjectLockGuard>, PortError>;
}

struct Holder {
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
struct LockTable {
    holders: Mutex<HashMap<String, Holder>>,
}

impl LockTable {
    // A poisoned table only means a holder panicked mid-update; the map is still usable.
    fn holders(&self) -> MutexGuard<'_, HashMap<String, Holder>> {
        self.holders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LockRelease for LockTable {
    fn release(&self, key: &str, token: &str) {
        let mut holders = self.holders();
        match holders.get(key) {
            Some(holder) if holder.token == token => {
                holders.remove(key);
                debug!(lock_key = key, "Released subject lock");
            }
            _ => warn!(lock_key = key, "Subject lock expired before release"),
        }
    }
}

/// Process-local lock provider
///
/// Sufficient for a single process (the batch CLI, tests). Multi-instance
/// deployments use the table-backed provider in `infra_db`.
#[derive(Clone, Default)]
pub struct InMemorySubjectLockProvider {
    table: Arc<LockTable>,
}

impl InMemorySubjectLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held and unexpired
    pub fn is_held(&self, key: &str) -> bool {
        self.table
            .holders()
            .get(key)
            .is_some_and(|h| h.expires_at > Instant::now())
    }
}

impl DomainPort for InMemorySubjectLockProvider {}

#[async_trait]
impl SubjectLockProvider for InMemorySubjectLockProvider {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<SubjectLockGuard>, PortError> {
        let now = Instant::now();
        let mut holders = self.table.holders();

        if holders.get(key).is_some_and(|h| h.expires_at > now) {
            debug!(lock_key = key, "Subject lock already held");
            return Ok(None);
        }

        let token = SubjectLockGuard::new_token();
        holders.insert(
            key.to_string(),
            Holder {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        drop(holders);

        debug!(lock_key = key, ?ttl, "Acquired subject lock");
        let releaser: Arc<dyn LockRelease> = self.table.clone();
        Ok(Some(SubjectLockGuard::new(key, token, releaser)))
    }
}
