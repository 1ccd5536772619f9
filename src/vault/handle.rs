use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a stored secret.
///
/// Backed by a random v4 UUID drawn from the OS RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHandle(Uuid);

impl SecretHandle {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the textual form. Anything malformed yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse::<Self>().ok()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for SecretHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl std::fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = SecretHandle::generate();
        let b = SecretHandle::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_parse() {
        let handle = SecretHandle::generate();
        let text = handle.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(SecretHandle::parse(&text), Some(handle));
        assert_eq!(text.parse::<SecretHandle>().unwrap(), handle);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SecretHandle::parse("").is_none());
        assert!(SecretHandle::parse("not-a-handle").is_none());
        assert!(SecretHandle::parse("../../etc/passwd").is_none());
        assert!("not-a-handle".parse::<SecretHandle>().is_err());
    }

    #[test]
    fn test_parse_paths_agree_on_whitespace() {
        let handle = SecretHandle::generate();
        let padded = format!("  {handle}\n");
        assert_eq!(SecretHandle::parse(&padded), Some(handle));
        assert_eq!(padded.parse::<SecretHandle>().ok(), Some(handle));
    }
}
