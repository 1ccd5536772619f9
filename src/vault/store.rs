use super::{SecretHandle, SecretRecord, SharedClock, SystemClock};
use crate::audit::{AuditAction, AuditEvent, SharedAuditSink};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shortest retention window a caller can get, in seconds.
pub const MIN_TTL_SECS: i64 = 300;

/// Vault errors.
///
/// `NotFound` deliberately covers unknown, expired, consumed and deleted
/// handles alike.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VaultError {
    #[error("Secret not found")]
    NotFound,

    #[error("Invalid TTL: {0} seconds")]
    InvalidTtl(i64),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Retention policy.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// TTL applied when the caller does not ask for one
    pub default_ttl_secs: i64,
    /// Requested TTLs below this are raised to it (never below [`MIN_TTL_SECS`])
    pub min_ttl_secs: i64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: MIN_TTL_SECS,
            min_ttl_secs: MIN_TTL_SECS,
        }
    }
}

impl VaultConfig {
    fn floor(&self) -> i64 {
        self.min_ttl_secs.max(MIN_TTL_SECS)
    }

    /// Resolve a requested TTL to the one actually applied.
    pub fn effective_ttl(&self, requested: Option<i64>) -> VaultResult<i64> {
        match requested {
            Some(ttl) if ttl < 0 => Err(VaultError::InvalidTtl(ttl)),
            Some(ttl) => Ok(ttl.max(self.floor())),
            None => Ok(self.default_ttl_secs.max(self.floor())),
        }
    }
}

/// `now + ttl_secs`, saturating at the latest representable instant.
fn deadline_after(now: DateTime<Utc>, ttl_secs: i64) -> DateTime<Utc> {
    Duration::try_seconds(ttl_secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

enum Retrieval {
    Missing,
    Expired(DateTime<Utc>),
    Consumed(Vec<u8>, DateTime<Utc>),
}

/// Concurrency-safe map from handle to encrypted secret.
///
/// A single lock covers each whole operation, so lookup, expiry check,
/// consumption and removal are one atomic step. Audit events are emitted
/// after the lock is released, and only by the operation that removed the
/// record.
pub struct SecretVault {
    records: Mutex<HashMap<SecretHandle, SecretRecord>>,
    config: VaultConfig,
    clock: SharedClock,
    audit: SharedAuditSink,
}

impl SecretVault {
    /// Create an empty vault on the wall clock.
    pub fn new(config: VaultConfig, audit: SharedAuditSink) -> Self {
        Self::with_clock(config, audit, Arc::new(SystemClock))
    }

    pub fn with_clock(config: VaultConfig, audit: SharedAuditSink, clock: SharedClock) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            config,
            clock,
            audit,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Store ciphertext under a fresh handle.
    ///
    /// The deadline is `now + ttl`, with `ttl` clamped up to the minimum and
    /// the sum saturating rather than overflowing.
    pub async fn create(
        &self,
        ciphertext: Vec<u8>,
        passphrase: Option<String>,
        ttl_secs: Option<i64>,
        origin: Option<IpAddr>,
    ) -> VaultResult<SecretHandle> {
        let ttl = self.config.effective_ttl(ttl_secs)?;

        let (handle, now) = {
            let mut records = self.records.lock().await;
            let handle = loop {
                let candidate = SecretHandle::generate();
                if !records.contains_key(&candidate) {
                    break candidate;
                }
            };
            let now = self.clock.now();
            let deadline = deadline_after(now, ttl);
            records.insert(
                handle,
                SecretRecord::new(handle, ciphertext, passphrase, now, deadline),
            );
            (handle, now)
        };

        debug!(secret_key = %handle, ttl_seconds = ttl, "Secret stored");
        self.audit.record(
            AuditEvent::new(handle, AuditAction::Create, now, origin)
                .with_metadata(serde_json::json!({ "ttl_seconds": ttl })),
        );
        Ok(handle)
    }

    /// Hand back the ciphertext exactly once.
    pub async fn retrieve(
        &self,
        handle: &SecretHandle,
        origin: Option<IpAddr>,
    ) -> VaultResult<Vec<u8>> {
        let outcome = {
            let mut records = self.records.lock().await;
            let now = self.clock.now();
            match records.remove(handle) {
                None => Retrieval::Missing,
                Some(record) if record.is_expired(now) => Retrieval::Expired(now),
                Some(record) if record.is_consumed() => Retrieval::Missing,
                Some(mut record) => Retrieval::Consumed(record.consume(), now),
            }
        };

        match outcome {
            Retrieval::Missing => Err(VaultError::NotFound),
            Retrieval::Expired(at) => {
                debug!(secret_key = %handle, "Secret expired before retrieval");
                self.audit
                    .record(AuditEvent::new(*handle, AuditAction::Expire, at, origin));
                Err(VaultError::NotFound)
            }
            Retrieval::Consumed(ciphertext, at) => {
                debug!(secret_key = %handle, "Secret retrieved");
                self.audit
                    .record(AuditEvent::new(*handle, AuditAction::Retrieve, at, origin));
                Ok(ciphertext)
            }
        }
    }

    /// Drop a live secret without reading it.
    pub async fn delete(&self, handle: &SecretHandle, origin: Option<IpAddr>) -> VaultResult<()> {
        let removed_at = {
            let mut records = self.records.lock().await;
            records.remove(handle).map(|_| self.clock.now())
        };

        let at = removed_at.ok_or(VaultError::NotFound)?;
        debug!(secret_key = %handle, "Secret deleted");
        self.audit
            .record(AuditEvent::new(*handle, AuditAction::Delete, at, origin));
        Ok(())
    }

    /// Remove every record past its deadline in one pass.
    ///
    /// Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let (expired, now) = {
            let mut records = self.records.lock().await;
            let now = self.clock.now();
            let mut expired = Vec::new();
            records.retain(|handle, record| {
                if record.is_expired(now) {
                    expired.push(*handle);
                    false
                } else {
                    true
                }
            });
            (expired, now)
        };

        for handle in &expired {
            self.audit
                .record(AuditEvent::new(*handle, AuditAction::Expire, now, None));
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "Swept expired secrets");
        }
        expired.len()
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Shared vault handle for use across the application.
pub type SharedVault = Arc<SecretVault>;
