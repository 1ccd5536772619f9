//! Audit trail for the secret lifecycle.
//!
//! The vault reports every terminal transition (and every creation) to an
//! [`AuditSink`]. Sinks are best effort: they never block the caller and
//! never fail a vault operation.

pub mod sqlite;

pub use sqlite::SqliteAuditSink;

use crate::vault::SecretHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Lifecycle action being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Retrieve,
    Delete,
    Expire,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Retrieve => "retrieve",
            Self::Delete => "delete",
            Self::Expire => "expire",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub handle: SecretHandle,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    /// Network address of the caller, when the action came from a request
    pub origin: Option<IpAddr>,
    /// Action-specific details, e.g. `{"ttl_seconds": 300}` on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        handle: SecretHandle,
        action: AuditAction,
        timestamp: DateTime<Utc>,
        origin: Option<IpAddr>,
    ) -> Self {
        Self {
            handle,
            action,
            timestamp,
            origin,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Receiver of audit events.
///
/// `record` is called outside the vault lock and must return promptly.
/// Implementations swallow their own failures.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Shared audit sink handle.
pub type SharedAuditSink = Arc<dyn AuditSink>;

/// Writes each event to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "burnbox::audit",
            secret_key = %event.handle,
            action = %event.action,
            ip_address = ?event.origin,
            metadata = ?event.metadata,
            "Secret lifecycle event"
        );
    }
}

/// Keeps events in memory, in the order they were recorded.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events recorded for one handle.
    pub fn events_for(&self, handle: &SecretHandle) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.handle == handle)
            .collect()
    }

    /// Number of events with the given action.
    pub fn count(&self, action: AuditAction) -> usize {
        self.events()
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Forwards each event to every inner sink.
#[derive(Default)]
pub struct FanoutAuditSink {
    sinks: Vec<SharedAuditSink>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<SharedAuditSink>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: SharedAuditSink) {
        self.sinks.push(sink);
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}

impl std::fmt::Debug for FanoutAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutAuditSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
