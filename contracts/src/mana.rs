//! # Mana Regeneration
//!
//! Mana is the part of a balance that may move right now. Spending mana
//! uses it up; it comes back linearly over the regeneration window, at a
//! rate of `balance / window` per millisecond, and never beyond the balance
//! itself.
//!
//! ```text
//! elapsed = min(now - last_update, window)
//! gained  = floor(elapsed * balance / window)      (u128 intermediate)
//! mana    = min(mana + gained, balance)
//! ```
//!
//! Clamping `elapsed` to one window means a record idle for a year regains
//! exactly one full balance worth of mana, not 73.

use koin_protocol::Timestamp;

use crate::records::AccountRecord;

/// Apply regeneration to `record` as of `now`.
///
/// `last_update` advances to `now` whenever any time has elapsed. A clock
/// that moved backwards counts as no elapsed time. A zero window never
/// regenerates.
pub fn regenerate(record: AccountRecord, now: Timestamp, window: u64) -> AccountRecord {
    let elapsed = now.saturating_sub(record.last_update).min(window);
    if elapsed == 0 {
        return record;
    }

    let gained = (u128::from(elapsed) * u128::from(record.balance)) / u128::from(window);
    // gained <= balance because elapsed <= window.
    let gained = u64::try_from(gained).unwrap_or(u64::MAX);

    AccountRecord {
        mana: record.mana.saturating_add(gained).min(record.balance),
        last_update: now,
        ..record
    }
}
