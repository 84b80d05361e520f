//! Opaque 32-byte identifiers.
//!
//! Both identifiers render as lowercase hex and serialize as hex strings so
//! that config files and event payloads stay human readable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error parsing a hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

fn decode_32(s: &str) -> Result<[u8; 32], ParseIdError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| ParseIdError::Hex(e.to_string()))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ParseIdError::Length(len))
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // First 8 hex chars are enough to tell accounts apart in logs.
                write!(f, "{}({}..)", stringify!($name), &hex::encode(self.0)[..8])
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_32(s).map(Self)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a caller or holder of currency and tokens.
    AccountId
);

opaque_id!(
    /// Reference to a token contract or a legacy rule store.
    ContractRef
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_hex_roundtrip() {
        let id = AccountId([0xAB; 32]);
        let parsed: AccountId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_account_id_accepts_0x_prefix() {
        let s = format!("0x{}", "01".repeat(32));
        let id: AccountId = s.parse().expect("parse");
        assert_eq!(id, AccountId([1u8; 32]));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = "abcd".parse::<ContractRef>().expect_err("too short");
        assert_eq!(err, ParseIdError::Length(2));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = ContractRef([0x10; 32]);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", "10".repeat(32)));
        let back: ContractRef = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_debug_is_truncated() {
        let id = AccountId([0xFF; 32]);
        assert_eq!(format!("{id:?}"), "AccountId(ffffffff..)");
    }
}
