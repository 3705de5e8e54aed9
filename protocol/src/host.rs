//! # Host Oracle
//!
//! Contracts never read the wall clock or guess who called them. The host
//! tells them, through the [`Host`] trait:
//!
//! - `now()` — the current time, in milliseconds since the Unix epoch.
//! - `caller()` — the authenticated caller and its privilege level.
//! - `require_authority()` — whether the caller may act for an account.
//!
//! How the caller was authenticated (signatures, sessions, a config file)
//! is the host's business. [`StaticHost`] is the simplest possible host: a
//! fixed time and a fixed caller. Tests use it directly and the node builds
//! one per request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountKey;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Privilege level the caller runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// Ordinary, user-initiated call.
    User,
    /// System context. Required for minting.
    Kernel,
}

/// The authenticated caller of a contract operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Account the caller speaks for, if any.
    pub identity: Option<AccountKey>,
    /// Privilege level of the call.
    pub privilege: Privilege,
}

/// Errors reported by the host oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("caller is not authorized to act as {account}")]
    Unauthorized { account: AccountKey },
}

/// Clock and identity oracle consumed by contracts.
pub trait Host {
    /// Current time.
    fn now(&self) -> Timestamp;

    /// The caller of the current operation.
    fn caller(&self) -> Caller;

    /// Fail unless the caller may act as `account`.
    ///
    /// The default rule is identity equality. Kernel privilege does not
    /// imply authority over user accounts.
    fn require_authority(&self, account: &AccountKey) -> Result<(), HostError> {
        match self.caller().identity {
            Some(ref id) if id == account => Ok(()),
            _ => Err(HostError::Unauthorized {
                account: account.clone(),
            }),
        }
    }
}

impl<H: Host + ?Sized> Host for &H {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn caller(&self) -> Caller {
        (**self).caller()
    }

    fn require_authority(&self, account: &AccountKey) -> Result<(), HostError> {
        (**self).require_authority(account)
    }
}

/// A host with a fixed time and a fixed caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost {
    now: Timestamp,
    caller: Caller,
}

impl StaticHost {
    /// A user-mode call on behalf of `account`.
    pub fn user(account: AccountKey, now: Timestamp) -> Self {
        Self {
            now,
            caller: Caller {
                identity: Some(account),
                privilege: Privilege::User,
            },
        }
    }

    /// A kernel-mode call with no account identity.
    pub fn kernel(now: Timestamp) -> Self {
        Self {
            now,
            caller: Caller {
                identity: None,
                privilege: Privilege::Kernel,
            },
        }
    }

    /// A user-mode call with no identity. Can only query.
    pub fn anonymous(now: Timestamp) -> Self {
        Self {
            now,
            caller: Caller {
                identity: None,
                privilege: Privilege::User,
            },
        }
    }

    /// A kernel-mode call made by `account`. Privileged, and still holds
    /// authority over its own account.
    pub fn kernel_as(account: AccountKey, now: Timestamp) -> Self {
        Self {
            now,
            caller: Caller {
                identity: Some(account),
                privilege: Privilege::Kernel,
            },
        }
    }
}

impl Host for StaticHost {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn caller(&self) -> Caller {
        self.caller.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> AccountKey {
        AccountKey::new(vec![b; 4]).unwrap()
    }

    #[test]
    fn user_is_authorized_only_for_itself() {
        let host = StaticHost::user(key(1), 10);
        assert!(host.require_authority(&key(1)).is_ok());
        assert_eq!(
            host.require_authority(&key(2)),
            Err(HostError::Unauthorized { account: key(2) })
        );
    }

    #[test]
    fn kernel_has_no_account_authority() {
        let host = StaticHost::kernel(10);
        assert_eq!(host.caller().privilege, Privilege::Kernel);
        assert!(host.require_authority(&key(1)).is_err());
    }

    #[test]
    fn identified_kernel_keeps_its_own_authority() {
        let host = StaticHost::kernel_as(key(3), 10);
        assert_eq!(host.caller().privilege, Privilege::Kernel);
        assert!(host.require_authority(&key(3)).is_ok());
        assert!(host.require_authority(&key(4)).is_err());
    }
}
