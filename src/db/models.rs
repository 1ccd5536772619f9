use crate::audit::AuditEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted audit log row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub secret_key: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub metadata: Option<String>, // JSON object
}

impl AuditLogEntry {
    /// Parsed metadata, if present and well-formed
    pub fn metadata_json(&self) -> Option<serde_json::Value> {
        self.metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// New audit log row
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub secret_key: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub metadata: Option<String>,
}

impl From<&AuditEvent> for NewAuditLog {
    fn from(event: &AuditEvent) -> Self {
        Self {
            secret_key: event.handle.to_string(),
            action: event.action.as_str().to_string(),
            timestamp: event.timestamp,
            ip_address: event.origin.map(|ip| ip.to_string()),
            metadata: event.metadata.as_ref().map(|m| m.to_string()),
        }
    }
}
