//! Encryption of secret material while it sits in memory.

pub mod cipher;

pub use cipher::{CipherBox, CryptoError, CryptoResult};
