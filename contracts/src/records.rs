//! # Ledger Records
//!
//! Two record types live in the token's space:
//!
//! | Key            | Value                    |
//! |----------------|--------------------------|
//! | `""` (empty)   | `bincode(SupplyRecord)`  |
//! | account key    | `bincode(AccountRecord)` |
//!
//! [`Records`] is the typed layer over an [`ObjectStore`]. It is the only
//! place that knows a missing record means "all zeroes": callers that
//! tolerate absent accounts use [`Records::account`], callers that must
//! distinguish absence use [`Records::existing_account`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use koin_protocol::config::SUPPLY_KEY;
use koin_protocol::{AccountKey, ObjectStore, Space, StoreError, StoreResult, Timestamp};

/// Per-account balance and spending allowance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Total tokens owned.
    pub balance: u64,
    /// Tokens that may be moved right now. Never exceeds `balance` at rest.
    pub mana: u64,
    /// Time of the last mana regeneration applied to this record.
    pub last_update: Timestamp,
}

impl AccountRecord {
    /// A record whose whole balance is spendable as of `now`.
    pub fn funded(balance: u64, now: Timestamp) -> Self {
        Self {
            balance,
            mana: balance,
            last_update: now,
        }
    }
}

/// Singleton tracking every token ever minted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub total_issued: u64,
}

/// Typed access to the records of one token space.
#[derive(Debug, Clone)]
pub struct Records<S> {
    store: S,
    space: Space,
}

impl<S: ObjectStore> Records<S> {
    pub fn new(store: S, space: Space) -> Self {
        Self { store, space }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The account record, or a zero record if the account was never credited.
    pub fn account(&self, key: &AccountKey) -> StoreResult<AccountRecord> {
        Ok(self.existing_account(key)?.unwrap_or_default())
    }

    /// The account record, if one was ever written.
    pub fn existing_account(&self, key: &AccountKey) -> StoreResult<Option<AccountRecord>> {
        self.read(key.as_bytes())
    }

    pub fn put_account(&self, key: &AccountKey, record: &AccountRecord) -> StoreResult<()> {
        self.write(key.as_bytes(), record)
    }

    /// The supply record, or zero supply before the first mint.
    pub fn supply(&self) -> StoreResult<SupplyRecord> {
        Ok(self.read(SUPPLY_KEY)?.unwrap_or_default())
    }

    pub fn put_supply(&self, record: &SupplyRecord) -> StoreResult<()> {
        self.write(SUPPLY_KEY, record)
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>> {
        match self.store.get(&self.space, key)? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &[u8], value: &T) -> StoreResult<()> {
        let bytes =
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put(&self.space, key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koin_protocol::MemoryStore;

    fn records() -> Records<MemoryStore> {
        Records::new(MemoryStore::new(), Space::new("koin"))
    }

    fn alice() -> AccountKey {
        AccountKey::new(b"alice".to_vec()).unwrap()
    }

    #[test]
    fn absent_account_defaults_to_zero() {
        let records = records();
        assert_eq!(records.account(&alice()).unwrap(), AccountRecord::default());
        assert_eq!(records.existing_account(&alice()).unwrap(), None);
    }

    #[test]
    fn absent_supply_defaults_to_zero() {
        assert_eq!(records().supply().unwrap().total_issued, 0);
    }

    #[test]
    fn account_and_supply_do_not_collide() {
        let records = records();
        records
            .put_account(&alice(), &AccountRecord::funded(500, 7))
            .unwrap();
        records
            .put_supply(&SupplyRecord { total_issued: 500 })
            .unwrap();

        assert_eq!(
            records.existing_account(&alice()).unwrap(),
            Some(AccountRecord {
                balance: 500,
                mana: 500,
                last_update: 7
            })
        );
        assert_eq!(records.supply().unwrap().total_issued, 500);
        assert_eq!(records.store().count_in(records.space()), 2);
    }

    #[test]
    fn corrupt_bytes_surface_as_serialization_error() {
        let records = records();
        records
            .store()
            .put(records.space(), alice().as_bytes(), &[0xff])
            .unwrap();
        assert!(matches!(
            records.account(&alice()),
            Err(StoreError::Serialization(_))
        ));
    }
}
