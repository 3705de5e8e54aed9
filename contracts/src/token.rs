//! # KOIN Token Contract
//!
//! A single fungible token whose transfers are rate-limited by mana. Holding
//! tokens is not enough to move them: the sender also needs that much mana,
//! which regenerates over [`TokenConfig::regen_window_ms`] (see
//! [`crate::mana`]).
//!
//! ## Operations
//!
//! | Operation      | Mutates | Privilege                  |
//! |----------------|---------|----------------------------|
//! | `name`         | no      | none                       |
//! | `symbol`       | no      | none                       |
//! | `decimals`     | no      | none                       |
//! | `total_supply` | no      | none                       |
//! | `balance_of`   | no      | none                       |
//! | `transfer`     | yes     | authority over `from`      |
//! | `mint`         | yes     | kernel                     |
//!
//! ## Failure Semantics
//!
//! Every check runs before the first write, so a rejected operation leaves
//! the store untouched. The two writes of a transfer (or of a mint) are
//! independent puts, though: if the second one fails the first has already
//! landed and the operation reports [`TokenError::StoreWrite`]. The store
//! offers no multi-key commit, so callers must treat a write failure as
//! "state unknown" rather than "nothing happened".

use thiserror::Error;

use koin_protocol::config::TokenConfig;
use koin_protocol::{AccountKey, Host, ObjectStore, Privilege, Space, StoreError};

use crate::mana::regenerate;
use crate::records::{AccountRecord, Records, SupplyRecord};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a token operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The caller lacks the required identity or privilege.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The source account does not hold enough tokens.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    /// The source account holds the tokens but has not regenerated enough mana.
    #[error("insufficient mana: available {available}, requested {requested}")]
    InsufficientMana { available: u64, requested: u64 },

    /// The operation would wrap a u64 counter.
    #[error("overflow: {current} + {amount} exceeds u64::MAX")]
    Overflow { current: u64, amount: u64 },

    #[error("could not read ledger state: {0}")]
    StoreRead(#[source] StoreError),

    #[error("could not write ledger state: {0}")]
    StoreWrite(#[source] StoreError),
}

pub type TokenResult<T> = Result<T, TokenError>;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The token contract bound to a store.
///
/// Methods take `&self`; the store handles its own synchronization. Mutating
/// calls must still be serialized by the host, since a transfer is a
/// read-check-write sequence over two keys with no locking of its own.
#[derive(Debug, Clone)]
pub struct Token<S> {
    records: Records<S>,
    config: TokenConfig,
}

impl<S: ObjectStore> Token<S> {
    /// Bind a token to `store`, using `config.space` as its namespace.
    pub fn new(store: S, config: TokenConfig) -> Self {
        let space = Space::new(config.space.clone());
        Self {
            records: Records::new(store, space),
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn records(&self) -> &Records<S> {
        &self.records
    }

    // -- Queries --------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn decimals(&self) -> u32 {
        self.config.decimals
    }

    /// Total tokens ever minted. Zero before the first mint.
    pub fn total_supply(&self) -> TokenResult<u64> {
        let supply = self.records.supply().map_err(TokenError::StoreRead)?;
        Ok(supply.total_issued)
    }

    /// Raw balance of `owner`. Mana is not exposed.
    pub fn balance_of(&self, owner: &AccountKey) -> TokenResult<u64> {
        let record = self.records.account(owner).map_err(TokenError::StoreRead)?;
        Ok(record.balance)
    }

    // -- Mutations ------------------------------------------------------------

    /// Move `value` tokens, and the same amount of mana, from `from` to `to`.
    pub fn transfer<H: Host>(
        &self,
        host: &H,
        from: &AccountKey,
        to: &AccountKey,
        value: u64,
    ) -> TokenResult<()> {
        host.require_authority(from)
            .map_err(|e| TokenError::Unauthorized(e.to_string()))?;

        let from_record = self
            .records
            .existing_account(from)
            .map_err(TokenError::StoreRead)?
            .ok_or(TokenError::InsufficientBalance {
                available: 0,
                requested: value,
            })?;

        if from_record.balance < value {
            return Err(TokenError::InsufficientBalance {
                available: from_record.balance,
                requested: value,
            });
        }

        let now = host.now();
        let window = self.config.regen_window_ms;
        let mut from_record = regenerate(from_record, now, window);

        if from_record.mana < value {
            return Err(TokenError::InsufficientMana {
                available: from_record.mana,
                requested: value,
            });
        }

        if from == to {
            // Debit and credit cancel out; only the regeneration sticks.
            self.records
                .put_account(from, &from_record)
                .map_err(TokenError::StoreWrite)?;
            tracing::debug!(account = %from, value, "self-transfer");
            return Ok(());
        }

        let to_record = self.records.account(to).map_err(TokenError::StoreRead)?;
        let mut to_record = regenerate(to_record, now, window);

        from_record.balance -= value;
        from_record.mana -= value;
        to_record = credit(to_record, value)?;

        self.records
            .put_account(from, &from_record)
            .map_err(TokenError::StoreWrite)?;
        self.records
            .put_account(to, &to_record)
            .map_err(TokenError::StoreWrite)?;

        tracing::debug!(%from, %to, value, "transfer applied");
        Ok(())
    }

    /// Create `amount` new tokens in `to`. Kernel callers only.
    pub fn mint<H: Host>(&self, host: &H, to: &AccountKey, amount: u64) -> TokenResult<()> {
        if host.caller().privilege != Privilege::Kernel {
            return Err(TokenError::Unauthorized(
                "can only mint token from kernel context".to_string(),
            ));
        }

        let supply = self.records.supply().map_err(TokenError::StoreRead)?;
        let new_supply = supply
            .total_issued
            .checked_add(amount)
            .ok_or(TokenError::Overflow {
                current: supply.total_issued,
                amount,
            })?;

        let to_record = self.records.account(to).map_err(TokenError::StoreRead)?;
        let to_record = credit(
            regenerate(to_record, host.now(), self.config.regen_window_ms),
            amount,
        )?;

        self.records
            .put_supply(&SupplyRecord {
                total_issued: new_supply,
            })
            .map_err(TokenError::StoreWrite)?;
        self.records
            .put_account(to, &to_record)
            .map_err(TokenError::StoreWrite)?;

        tracing::debug!(%to, amount, total_supply = new_supply, "mint applied");
        Ok(())
    }
}

/// Add `value` to both balance and mana.
///
/// Cannot overflow while every balance is bounded by the total supply, but
/// the check stays so a corrupted record fails loudly instead of wrapping.
fn credit(record: AccountRecord, value: u64) -> TokenResult<AccountRecord> {
    let overflow = TokenError::Overflow {
        current: record.balance,
        amount: value,
    };
    Ok(AccountRecord {
        balance: record.balance.checked_add(value).ok_or(overflow.clone())?,
        mana: record.mana.checked_add(value).ok_or(overflow)?,
        last_update: record.last_update,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
