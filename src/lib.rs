pub mod audit;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod service;
pub mod vault;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use service::SecretService;
pub use vault::{ExpirySweeper, SecretHandle, SecretVault};
