//! ABI-shaped values passed to and returned from contract calls.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, LedgerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiValue {
    Address(Address),
    Uint(u128),
    Str(String),
    Bool(bool),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
    /// Return value of a call with no outputs.
    Unit,
}

impl AbiValue {
    fn kind(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Uint(_) => "uint",
            AbiValue::Str(_) => "string",
            AbiValue::Bool(_) => "bool",
            AbiValue::Array(_) => "array",
            AbiValue::Tuple(_) => "tuple",
            AbiValue::Unit => "unit",
        }
    }

    fn mismatch(&self, expected: &'static str) -> LedgerError {
        LedgerError::Decode {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_address(&self) -> Result<Address, LedgerError> {
        match self {
            AbiValue::Address(a) => Ok(*a),
            other => Err(other.mismatch("address")),
        }
    }

    pub fn as_uint(&self) -> Result<u128, LedgerError> {
        match self {
            AbiValue::Uint(v) => Ok(*v),
            other => Err(other.mismatch("uint")),
        }
    }

    /// A uint that must fit in `u8` (token and feed decimals).
    pub fn as_u8(&self) -> Result<u8, LedgerError> {
        let v = self.as_uint()?;
        u8::try_from(v).map_err(|_| LedgerError::Decode {
            expected: "uint8",
            actual: "uint",
        })
    }

    pub fn as_str(&self) -> Result<&str, LedgerError> {
        match self {
            AbiValue::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, LedgerError> {
        match self {
            AbiValue::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_array(&self) -> Result<&[AbiValue], LedgerError> {
        match self {
            AbiValue::Array(v) => Ok(v),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_tuple(&self) -> Result<&[AbiValue], LedgerError> {
        match self {
            AbiValue::Tuple(v) => Ok(v),
            other => Err(other.mismatch("tuple")),
        }
    }

    /// Canonical byte encoding used for content hashing. Stable across
    /// releases: changing it re-deploys every content-addressed contract.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            AbiValue::Address(a) => {
                out.push(0x01);
                out.extend_from_slice(a.as_bytes());
            }
            AbiValue::Uint(v) => {
                out.push(0x02);
                out.extend_from_slice(&v.to_be_bytes());
            }
            AbiValue::Str(s) => {
                out.push(0x03);
                out.extend_from_slice(&(s.len() as u64).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            AbiValue::Bool(b) => {
                out.push(0x04);
                out.push(u8::from(*b));
            }
            AbiValue::Array(items) | AbiValue::Tuple(items) => {
                out.push(if matches!(self, AbiValue::Array(_)) { 0x05 } else { 0x06 });
                out.extend_from_slice(&(items.len() as u64).to_be_bytes());
                for item in items {
                    item.encode_into(out);
                }
            }
            AbiValue::Unit => out.push(0x00),
        }
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

impl From<u128> for AbiValue {
    fn from(v: u128) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        AbiValue::Uint(u128::from(v))
    }
}

impl From<u8> for AbiValue {
    fn from(v: u8) -> Self {
        AbiValue::Uint(u128::from(v))
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::Str(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::Str(s)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

/// A method invocation: name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub method: String,
    pub args: Vec<AbiValue>,
}

impl Call {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, v: impl Into<AbiValue>) -> Self {
        self.args.push(v.into());
        self
    }

    pub fn args(mut self, vs: impl IntoIterator<Item = AbiValue>) -> Self {
        self.args.extend(vs);
        self
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} args)", self.method, self.args.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_distinguishes_array_from_tuple() {
        let mut a = Vec::new();
        AbiValue::Array(vec![AbiValue::Uint(1)]).encode_into(&mut a);
        let mut t = Vec::new();
        AbiValue::Tuple(vec![AbiValue::Uint(1)]).encode_into(&mut t);
        assert_ne!(a, t);
    }

    #[test]
    fn decode_mismatch_is_reported() {
        let err = AbiValue::Str("x".into()).as_uint().unwrap_err();
        assert_eq!(
            err,
            LedgerError::Decode {
                expected: "uint",
                actual: "string"
            }
        );
        assert!(AbiValue::Uint(300).as_u8().is_err());
    }
}
