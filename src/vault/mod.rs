//! Ephemeral, single-use secret storage.
//!
//! ## Lifecycle
//!
//! - `create` stores already-encrypted bytes under a fresh random handle
//! - `retrieve` hands the bytes back exactly once and forgets them
//! - `delete` forgets them without handing them back
//! - the [`ExpirySweeper`] forgets anything past its deadline
//!
//! Every failure a caller can observe collapses into [`VaultError::NotFound`],
//! so "never existed", "expired", "already read" and "deleted" look identical.
//!
//! ```ignore
//! let vault = Arc::new(SecretVault::new(VaultConfig::default(), audit));
//! let sweeper = ExpirySweeper::new(vault.clone(), Duration::from_secs(60)).spawn();
//!
//! let handle = vault.create(sealed, None, Some(600), None).await?;
//! let sealed = vault.retrieve(&handle, None).await?;
//!
//! sweeper.shutdown().await;
//! ```

pub mod clock;
pub mod handle;
pub mod record;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use handle::SecretHandle;
pub use record::SecretRecord;
pub use store::{SecretVault, SharedVault, VaultConfig, VaultError, VaultResult, MIN_TTL_SECS};
pub use sweeper::{ExpirySweeper, SweeperHandle};
