use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 20-byte account / contract address.
///
/// Parsing is case-insensitive (checksummed and lowercase input compare
/// equal); display is lowercase `0x`-prefixed hex.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {value:?}: {reason}")]
pub struct AddressParseError {
    pub value: String,
    pub reason: &'static str,
}

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// First 20 bytes of a longer digest.
    pub fn from_digest(digest: &[u8]) -> Self {
        let mut out = [0u8; 20];
        let n = digest.len().min(20);
        out[..n].copy_from_slice(&digest[..n]);
        Address(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| AddressParseError {
            value: s.to_string(),
            reason,
        };
        let t = s.trim();
        let body = t
            .strip_prefix("0x")
            .or_else(|| t.strip_prefix("0X"))
            .ok_or_else(|| err("missing 0x prefix"))?;
        if body.len() != 40 {
            return Err(err("expected 40 hex digits"));
        }
        let raw = hex::decode(body).map_err(|_| err("non-hex digit"))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&raw);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
