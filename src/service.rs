//! Create/retrieve/delete flow over the vault and the cipher.
//!
//! Encryption happens before the vault lock is taken and decryption after it
//! is released, so the critical section only ever moves ciphertext around.

use crate::crypto::CipherBox;
use crate::error::{AppError, AppResult};
use crate::vault::{SecretHandle, SharedVault, VaultError};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;
use zeroize::Zeroizing;

/// One-time secret operations exposed to the request layer.
#[derive(Debug, Clone)]
pub struct SecretService {
    vault: SharedVault,
    cipher: Arc<CipherBox>,
}

impl SecretService {
    pub fn new(vault: SharedVault, cipher: Arc<CipherBox>) -> Self {
        Self { vault, cipher }
    }

    pub fn vault(&self) -> &SharedVault {
        &self.vault
    }

    /// Encrypt and store a secret, returning its handle.
    pub async fn create(
        &self,
        secret: &str,
        passphrase: Option<String>,
        ttl_seconds: Option<i64>,
        origin: Option<IpAddr>,
    ) -> AppResult<SecretHandle> {
        let ciphertext = self.cipher.encrypt(secret.as_bytes())?;
        let handle = self
            .vault
            .create(ciphertext, passphrase, ttl_seconds, origin)
            .await?;
        Ok(handle)
    }

    /// Consume a secret and return its plaintext.
    ///
    /// Malformed handles are reported exactly like unknown ones.
    pub async fn retrieve(&self, raw_handle: &str, origin: Option<IpAddr>) -> AppResult<Zeroizing<String>> {
        let handle = SecretHandle::parse(raw_handle).ok_or(VaultError::NotFound)?;
        let ciphertext = Zeroizing::new(self.vault.retrieve(&handle, origin).await?);

        let plaintext = self.cipher.decrypt(&ciphertext).map_err(|e| {
            error!(secret_key = %handle, error = %e, "Stored secret failed integrity check");
            AppError::from(e)
        })?;

        match String::from_utf8(plaintext.to_vec()) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(e) => {
                error!(secret_key = %handle, "Stored secret is not valid UTF-8");
                let mut bytes = e.into_bytes();
                zeroize::Zeroize::zeroize(&mut bytes);
                Err(AppError::internal("stored secret is not valid UTF-8"))
            }
        }
    }

    /// Destroy a secret without reading it.
    pub async fn delete(&self, raw_handle: &str, origin: Option<IpAddr>) -> AppResult<()> {
        let handle = SecretHandle::parse(raw_handle).ok_or(VaultError::NotFound)?;
        self.vault.delete(&handle, origin).await?;
        Ok(())
    }
}
