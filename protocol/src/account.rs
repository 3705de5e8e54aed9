//! # Account Keys
//!
//! An account key is an opaque byte string used verbatim as a store key.
//! The ledger never looks inside it; the only rule is the length bound the
//! argument decoder enforces, 1 to [`MAX_ADDRESS_SIZE`] bytes.
//!
//! Keys print as lowercase hex and parse from hex, which is how the node's
//! HTTP API and CLI accept them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_ADDRESS_SIZE;

/// Errors from constructing an [`AccountKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountKeyError {
    #[error("account key must not be empty")]
    Empty,

    #[error("account key is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("account key is not valid hex: {0}")]
    InvalidHex(String),
}

/// A bounded, opaque account identifier.
///
/// Decoding (serde) goes through the same validation as [`AccountKey::new`],
/// so a key read off the wire can never exceed the bound.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct AccountKey(Vec<u8>);

impl AccountKey {
    /// Validate and wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, AccountKeyError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(AccountKeyError::Empty);
        }
        if bytes.len() > MAX_ADDRESS_SIZE {
            return Err(AccountKeyError::TooLong {
                len: bytes.len(),
                max: MAX_ADDRESS_SIZE,
            });
        }
        Ok(Self(bytes))
    }

    /// Parse a hex-encoded key (an optional `0x` prefix is accepted).
    pub fn from_hex(s: &str) -> Result<Self, AccountKeyError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(trimmed).map_err(|e| AccountKeyError::InvalidHex(e.to_string()))?;
        Self::new(bytes)
    }

    /// The raw key bytes, as used for storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering of the key.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl TryFrom<Vec<u8>> for AccountKey {
    type Error = AccountKeyError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<AccountKey> for Vec<u8> {
    fn from(key: AccountKey) -> Self {
        key.0
    }
}

impl FromStr for AccountKey {
    type Err = AccountKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({})", self.to_hex())
    }
}
