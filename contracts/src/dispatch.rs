//! # Entry-Point Dispatch
//!
//! Maps a 32-bit selector plus an encoded argument buffer onto one token
//! operation and encodes its result. The set of entry points is closed: a
//! selector is either one of the seven below or the call fails with
//! [`DispatchError::UnknownEntryPoint`].
//!
//! | Entry point    | Selector     | Arguments          | Result   |
//! |----------------|--------------|--------------------|----------|
//! | `name`         | `0x76ea4297` | —                  | `String` |
//! | `symbol`       | `0x7e794b24` | —                  | `String` |
//! | `decimals`     | `0x59dc15ce` | —                  | `u32`    |
//! | `total_supply` | `0xcf2e8212` | —                  | `u64`    |
//! | `balance_of`   | `0x15619248` | [`BalanceOfArgs`]  | `u64`    |
//! | `transfer`     | `0x62efa292` | [`TransferArgs`]   | `bool`   |
//! | `mint`         | `0xc2f82bdc` | [`MintArgs`]       | `bool`   |
//!
//! Arguments and results use bincode with fixed-width integers. Decoding is
//! bounded by [`MAX_BUFFER_SIZE`] and rejects trailing bytes; account keys
//! are length-checked as they are decoded.
//!
//! Rejected transfers and mints are not dispatch errors. They produce a
//! `false` result and a warning in the log, so the caller always gets a
//! well-formed response.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use koin_protocol::config::MAX_BUFFER_SIZE;
use koin_protocol::{AccountKey, Host, ObjectStore};

use crate::token::{Token, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown entry point 0x{0:08x}")]
    UnknownEntryPoint(u32),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("encoded result is {size} bytes, maximum is {max}")]
    ResultTooLarge { size: usize, max: usize },

    #[error("result encoding failed: {0}")]
    Encoding(String),

    /// A read-only entry point could not read ledger state.
    #[error("query failed: {0}")]
    Query(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Entry Points
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf,
    Transfer,
    Mint,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 7] = [
        EntryPoint::Name,
        EntryPoint::Symbol,
        EntryPoint::Decimals,
        EntryPoint::TotalSupply,
        EntryPoint::BalanceOf,
        EntryPoint::Transfer,
        EntryPoint::Mint,
    ];

    pub const fn selector(self) -> u32 {
        match self {
            EntryPoint::Name => 0x76ea4297,
            EntryPoint::Symbol => 0x7e794b24,
            EntryPoint::Decimals => 0x59dc15ce,
            EntryPoint::TotalSupply => 0xcf2e8212,
            EntryPoint::BalanceOf => 0x15619248,
            EntryPoint::Transfer => 0x62efa292,
            EntryPoint::Mint => 0xc2f82bdc,
        }
    }

    /// Stable label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Name => "name",
            EntryPoint::Symbol => "symbol",
            EntryPoint::Decimals => "decimals",
            EntryPoint::TotalSupply => "total_supply",
            EntryPoint::BalanceOf => "balance_of",
            EntryPoint::Transfer => "transfer",
            EntryPoint::Mint => "mint",
        }
    }

    pub fn is_mutating(self) -> bool {
        matches!(self, EntryPoint::Transfer | EntryPoint::Mint)
    }
}

impl TryFrom<u32> for EntryPoint {
    type Error = DispatchError;

    fn try_from(selector: u32) -> Result<Self, Self::Error> {
        EntryPoint::ALL
            .into_iter()
            .find(|e| e.selector() == selector)
            .ok_or(DispatchError::UnknownEntryPoint(selector))
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Arguments & Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOfArgs {
    pub owner: AccountKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    pub from: AccountKey,
    pub to: AccountKey,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintArgs {
    pub to: AccountKey,
    pub value: u64,
}

/// A decoded call: one variant per entry point, carrying its own arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf(BalanceOfArgs),
    Transfer(TransferArgs),
    Mint(MintArgs),
}

/// A typed result: one variant per entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Name(String),
    Symbol(String),
    Decimals(u32),
    TotalSupply(u64),
    BalanceOf(u64),
    Transfer(bool),
    Mint(bool),
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_BUFFER_SIZE as u64)
        .reject_trailing_bytes()
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DispatchError> {
    codec()
        .deserialize(bytes)
        .map_err(|e| DispatchError::InvalidArguments(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DispatchError> {
    let bytes = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .serialize(value)
        .map_err(|e| DispatchError::Encoding(e.to_string()))?;
    if bytes.len() > MAX_BUFFER_SIZE {
        return Err(DispatchError::ResultTooLarge {
            size: bytes.len(),
            max: MAX_BUFFER_SIZE,
        });
    }
    Ok(bytes)
}

impl Request {
    pub fn entry_point(&self) -> EntryPoint {
        match self {
            Request::Name => EntryPoint::Name,
            Request::Symbol => EntryPoint::Symbol,
            Request::Decimals => EntryPoint::Decimals,
            Request::TotalSupply => EntryPoint::TotalSupply,
            Request::BalanceOf(_) => EntryPoint::BalanceOf,
            Request::Transfer(_) => EntryPoint::Transfer,
            Request::Mint(_) => EntryPoint::Mint,
        }
    }

    /// Decode `args` for the entry point named by `selector`.
    ///
    /// Entry points without arguments ignore the buffer.
    pub fn decode(selector: u32, args: &[u8]) -> Result<Self, DispatchError> {
        Ok(match EntryPoint::try_from(selector)? {
            EntryPoint::Name => Request::Name,
            EntryPoint::Symbol => Request::Symbol,
            EntryPoint::Decimals => Request::Decimals,
            EntryPoint::TotalSupply => Request::TotalSupply,
            EntryPoint::BalanceOf => Request::BalanceOf(decode(args)?),
            EntryPoint::Transfer => Request::Transfer(decode(args)?),
            EntryPoint::Mint => Request::Mint(decode(args)?),
        })
    }

    /// Encode the argument buffer for this request.
    pub fn encode_args(&self) -> Result<Vec<u8>, DispatchError> {
        match self {
            Request::Name | Request::Symbol | Request::Decimals | Request::TotalSupply => {
                Ok(Vec::new())
            }
            Request::BalanceOf(args) => encode(args),
            Request::Transfer(args) => encode(args),
            Request::Mint(args) => encode(args),
        }
    }
}

impl Response {
    pub fn entry_point(&self) -> EntryPoint {
        match self {
            Response::Name(_) => EntryPoint::Name,
            Response::Symbol(_) => EntryPoint::Symbol,
            Response::Decimals(_) => EntryPoint::Decimals,
            Response::TotalSupply(_) => EntryPoint::TotalSupply,
            Response::BalanceOf(_) => EntryPoint::BalanceOf,
            Response::Transfer(_) => EntryPoint::Transfer,
            Response::Mint(_) => EntryPoint::Mint,
        }
    }

    /// Encode the bare result value (the variant is implied by the selector).
    pub fn encode(&self) -> Result<Vec<u8>, DispatchError> {
        match self {
            Response::Name(v) | Response::Symbol(v) => encode(v),
            Response::Decimals(v) => encode(v),
            Response::TotalSupply(v) | Response::BalanceOf(v) => encode(v),
            Response::Transfer(v) | Response::Mint(v) => encode(v),
        }
    }

    /// Decode a result buffer produced for `entry`.
    pub fn decode(entry: EntryPoint, bytes: &[u8]) -> Result<Self, DispatchError> {
        Ok(match entry {
            EntryPoint::Name => Response::Name(decode(bytes)?),
            EntryPoint::Symbol => Response::Symbol(decode(bytes)?),
            EntryPoint::Decimals => Response::Decimals(decode(bytes)?),
            EntryPoint::TotalSupply => Response::TotalSupply(decode(bytes)?),
            EntryPoint::BalanceOf => Response::BalanceOf(decode(bytes)?),
            EntryPoint::Transfer => Response::Transfer(decode(bytes)?),
            EntryPoint::Mint => Response::Mint(decode(bytes)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run a decoded request against `token`.
pub fn execute<S, H>(
    token: &Token<S>,
    host: &H,
    request: Request,
) -> Result<Response, DispatchError>
where
    S: ObjectStore,
    H: Host,
{
    let response = match request {
        Request::Name => Response::Name(token.name().to_string()),
        Request::Symbol => Response::Symbol(token.symbol().to_string()),
        Request::Decimals => Response::Decimals(token.decimals()),
        Request::TotalSupply => Response::TotalSupply(token.total_supply()?),
        Request::BalanceOf(args) => Response::BalanceOf(token.balance_of(&args.owner)?),
        Request::Transfer(args) => {
            let outcome = token.transfer(host, &args.from, &args.to, args.value);
            if let Err(ref e) = outcome {
                tracing::warn!(
                    from = %args.from,
                    to = %args.to,
                    value = args.value,
                    error = %e,
                    "transfer rejected"
                );
            }
            Response::Transfer(outcome.is_ok())
        }
        Request::Mint(args) => {
            let outcome = token.mint(host, &args.to, args.value);
            if let Err(ref e) = outcome {
                tracing::warn!(to = %args.to, value = args.value, error = %e, "mint rejected");
            }
            Response::Mint(outcome.is_ok())
        }
    };
    Ok(response)
}

/// Decode, execute and encode in one step: the raw contract entry.
pub fn call<S, H>(
    token: &Token<S>,
    host: &H,
    selector: u32,
    args: &[u8],
) -> Result<Vec<u8>, DispatchError>
where
    S: ObjectStore,
    H: Host,
{
    let request = Request::decode(selector, args)?;
    execute(token, host, request)?.encode()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
