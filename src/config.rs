use crate::crypto::CipherBox;
use crate::error::{AppError, AppResult};
use crate::vault::{VaultConfig, MIN_TTL_SECS};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Retention settings
#[derive(Debug, Deserialize, Clone)]
pub struct VaultSettings {
    /// TTL used when a request does not specify one
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,
    /// Lower bound for requested TTLs (never below 300)
    #[serde(default = "default_ttl_secs")]
    pub min_ttl_secs: i64,
    /// Seconds between expiry sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> i64 {
    MIN_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            min_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl VaultSettings {
    pub fn vault_config(&self) -> VaultConfig {
        VaultConfig {
            default_ttl_secs: self.default_ttl_secs,
            min_ttl_secs: self.min_ttl_secs,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Encryption key configuration
#[derive(Deserialize, Clone, Default)]
pub struct CryptoConfig {
    /// Base64-encoded 32-byte key
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// Generate a throwaway key when none is configured.
    /// Only suitable for single-process, non-persistent deployments.
    #[serde(default)]
    pub allow_ephemeral_key: bool,
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .field("allow_ephemeral_key", &self.allow_ephemeral_key)
            .finish()
    }
}

impl CryptoConfig {
    /// Build the process-wide cipher from the configured key.
    ///
    /// Without a key this fails unless ephemeral keys are allowed.
    pub fn build_cipher(&self) -> AppResult<CipherBox> {
        match self.encryption_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(CipherBox::from_base64_key(key)?),
            _ if self.allow_ephemeral_key => {
                warn!("No encryption key configured; generated an EPHEMERAL key");
                warn!("Secrets will be unrecoverable after a restart. Do not use this in production.");
                Ok(CipherBox::ephemeral())
            }
            _ => Err(AppError::MissingKey),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    /// SQLite URL for persisted audit logs; tracing only when unset
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Events buffered for the database writer before new ones are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_connections() -> u32 {
    5
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vault: VaultSettings,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (prefix: BURNBOX_)
            // e.g., BURNBOX_CRYPTO__ENCRYPTION_KEY, BURNBOX_SERVER__PORT
            .add_source(
                Environment::with_prefix("BURNBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(raw: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_from_empty_source() {
        let config = from_toml("");
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.vault.default_ttl_secs, 300);
        assert_eq!(config.vault.sweep_interval(), Duration::from_secs(60));
        assert!(config.crypto.encryption_key.is_none());
        assert!(!config.crypto.allow_ephemeral_key);
        assert!(config.audit.database_url.is_none());
        assert_eq!(config.audit.channel_capacity, 1024);
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
            [server]
            port = 9000

            [vault]
            default_ttl_secs = 3600
            sweep_interval_secs = 0

            [crypto]
            encryption_key = "c2VjcmV0"
            allow_ephemeral_key = true

            [audit]
            database_url = "sqlite::memory:"
            "#,
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.vault.vault_config().default_ttl_secs, 3600);
        assert_eq!(config.vault.sweep_interval(), Duration::from_secs(1));
        assert!(config.crypto.allow_ephemeral_key);
        assert_eq!(config.audit.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_build_cipher_from_key() {
        let crypto = CryptoConfig {
            encryption_key: Some(CipherBox::generate_base64_key()),
            allow_ephemeral_key: false,
        };
        assert!(!crypto.build_cipher().unwrap().is_ephemeral());
    }

    #[test]
    fn test_missing_key_is_fatal_by_default() {
        let crypto = CryptoConfig::default();
        assert!(matches!(crypto.build_cipher(), Err(AppError::MissingKey)));

        let blank = CryptoConfig {
            encryption_key: Some("  ".to_string()),
            allow_ephemeral_key: false,
        };
        assert!(matches!(blank.build_cipher(), Err(AppError::MissingKey)));
    }

    #[test]
    fn test_ephemeral_key_when_allowed() {
        let crypto = CryptoConfig {
            encryption_key: None,
            allow_ephemeral_key: true,
        };
        assert!(crypto.build_cipher().unwrap().is_ephemeral());
    }

    #[test]
    fn test_malformed_key_is_rejected() {
        let crypto = CryptoConfig {
            encryption_key: Some("dG9vLXNob3J0".to_string()),
            allow_ephemeral_key: true,
        };
        assert!(matches!(crypto.build_cipher(), Err(AppError::Crypto(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let crypto = CryptoConfig {
            encryption_key: Some("super-secret".to_string()),
            allow_ephemeral_key: false,
        };
        let rendered = format!("{:?}", crypto);
        assert!(!rendered.contains("super-secret"));
    }
}
