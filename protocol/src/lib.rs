// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # KOIN Protocol — Core Primitives
//!
//! The pieces every KOIN contract leans on but never owns: who is calling,
//! what time it is, and where the bytes live. The token ledger itself lives
//! in `koin-contracts`; this crate only defines the boundary it talks to.
//!
//! ## Architecture
//!
//! - **account** — Bounded, opaque account keys.
//! - **host** — Clock and identity oracle. Time and caller are injected,
//!   never read from globals.
//! - **storage** — Namespaced object store abstraction with an in-memory
//!   implementation and a sled-backed one.
//! - **config** — Protocol constants and the token configuration file.
//!
//! ## Design Philosophy
//!
//! 1. Contracts see traits, not engines. Swapping sled for anything else
//!    must not touch ledger code.
//! 2. Every fallible host call returns a typed error. Nothing panics on a
//!    bad store.
//! 3. No wall clock in library code. The node decides what "now" means.

pub mod account;
pub mod config;
pub mod host;
pub mod storage;

pub use account::{AccountKey, AccountKeyError};
pub use host::{Caller, Host, HostError, Privilege, StaticHost, Timestamp};
pub use storage::{MemoryStore, ObjectStore, Space, StoreError, StoreResult};
