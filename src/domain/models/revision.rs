//! Revision tokens for long-pollable resources.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

/// Opaque revision token identifying the state of a long-pollable resource.
///
/// The wire form is the decimal ASCII rendering of a u64. Tokens compare by
/// decoded value, never lexically; a token that fails to parse surfaces as
/// [`OrchestratorError::BadRevision`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rev(String);

impl Rev {
    /// Encode a revision number into its wire form.
    pub fn encode(value: u64) -> Self {
        Self(value.to_string())
    }

    /// Decode the wire form back into the revision number.
    pub fn decode(&self) -> OrchestratorResult<u64> {
        self.0
            .parse::<u64>()
            .map_err(|_| OrchestratorError::BadRevision(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Rev {
    fn default() -> Self {
        Self::encode(0)
    }
}

impl From<String> for Rev {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Rev {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for Rev {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decimal_ascii() {
        assert_eq!(Rev::encode(42).as_str(), "42");
        assert_eq!(Rev::encode(0).as_str(), "0");
        assert_eq!(Rev::encode(u64::MAX).as_str(), "18446744073709551615");
    }

    #[test]
    fn test_decode_round_trip() {
        for n in [0u64, 1, 42, 1_000_000, u64::MAX] {
            assert_eq!(Rev::encode(n).decode().unwrap(), n);
        }
    }

    #[test]
    fn test_decode_rejects_non_decimal() {
        for bad in ["0x2a", "", "forty-two", "-1", "4.2", " 42"] {
            let err = Rev::from(bad).decode().unwrap_err();
            assert!(matches!(err, OrchestratorError::BadRevision(_)), "{bad}: {err}");
        }
    }
}
