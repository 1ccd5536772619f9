pub mod models;
pub mod queries;

pub use models::{AuditLogEntry, NewAuditLog};
pub use queries::{init_db, AuditLogRepo, DbPool};

#[cfg(test)]
pub use queries::setup_test_db;
