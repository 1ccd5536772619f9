//! Audit sink backed by the SQLite `audit_logs` table.
//!
//! Events are handed to a bounded channel and written by a background task,
//! so recording never waits on the database.

use super::{AuditEvent, AuditSink};
use crate::db::{AuditLogRepo, DbPool, NewAuditLog};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Sends audit events to a writer task that persists them.
#[derive(Debug, Clone)]
pub struct SqliteAuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl SqliteAuditSink {
    /// Start the writer task.
    ///
    /// The task exits once every clone of the returned sink is dropped and
    /// the queue has drained; await the handle to flush on shutdown.
    pub fn spawn(pool: DbPool, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(writer_loop(pool, rx));
        (Self { tx }, task)
    }
}

impl AuditSink for SqliteAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let (reason, event) = match e {
                mpsc::error::TrySendError::Full(event) => ("queue full", event),
                mpsc::error::TrySendError::Closed(event) => ("writer stopped", event),
            };
            warn!(
                secret_key = %event.handle,
                action = %event.action,
                reason,
                "Dropping audit event"
            );
        }
    }
}

async fn writer_loop(pool: DbPool, mut rx: mpsc::Receiver<AuditEvent>) {
    while let Some(event) = rx.recv().await {
        let entry = NewAuditLog::from(&event);
        match AuditLogRepo::insert(&pool, &entry).await {
            Ok(id) => debug!(id, action = %event.action, "Audit event persisted"),
            Err(e) => error!(
                error = %e,
                secret_key = %event.handle,
                action = %event.action,
                "Failed to persist audit event"
            ),
        }
    }
    debug!("Audit writer stopped");
}
