//! # KOIN Contracts
//!
//! The KOIN token: a single fungible asset whose transfers are gated by a
//! regenerating spending allowance called mana.
//!
//! - **records** — Account and supply records, typed over an object store.
//! - **mana** — The regeneration function. Pure, no I/O.
//! - **token** — Queries, mana-gated `transfer`, kernel-only `mint`.
//! - **dispatch** — Selector-based entry points with a bincode codec.
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked. Subtractions happen only after
//!    an explicit sufficiency check; additions use `checked_add`.
//! 2. Every check precedes the first write. A rejected call never mutates.
//! 3. Time and identity come from the injected [`koin_protocol::Host`],
//!    storage from the injected [`koin_protocol::ObjectStore`].

pub mod dispatch;
pub mod mana;
pub mod records;
pub mod token;

pub use dispatch::{execute, DispatchError, EntryPoint, Request, Response};
pub use records::{AccountRecord, Records, SupplyRecord};
pub use token::{Token, TokenError, TokenResult};
