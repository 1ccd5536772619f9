use super::SecretHandle;
use chrono::{DateTime, Utc};
use zeroize::ZeroizeOnDrop;

/// One live secret held by the vault.
///
/// Only ciphertext is ever stored here. The passphrase is carried as opaque
/// metadata and is not checked on retrieval.
#[derive(ZeroizeOnDrop)]
pub struct SecretRecord {
    #[zeroize(skip)]
    handle: SecretHandle,
    ciphertext: Vec<u8>,
    passphrase: Option<String>,
    #[zeroize(skip)]
    created_at: DateTime<Utc>,
    #[zeroize(skip)]
    deadline: DateTime<Utc>,
    #[zeroize(skip)]
    consumed: bool,
}

impl SecretRecord {
    pub fn new(
        handle: SecretHandle,
        ciphertext: Vec<u8>,
        passphrase: Option<String>,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            handle,
            ciphertext,
            passphrase,
            created_at,
            deadline,
            consumed: false,
        }
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// True once `now` is strictly past the deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Mark consumed and move the ciphertext out. The record keeps nothing.
    pub fn consume(&mut self) -> Vec<u8> {
        self.consumed = true;
        std::mem::take(&mut self.ciphertext)
    }
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("handle", &self.handle)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("has_passphrase", &self.passphrase.is_some())
            .field("created_at", &self.created_at)
            .field("deadline", &self.deadline)
            .field("consumed", &self.consumed)
            .finish()
    }
}
