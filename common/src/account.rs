//! Scenario account identities.
//!
//! The harness drives a fixed cast of key-ring identities. They are modeled
//! as an enum rather than free-form alias strings so a typo in a step cannot
//! silently address the wrong key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by account state transitions
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccountError {
    /// The viewing key is set exactly once per account and is immutable after
    #[error("viewing key for account '{0}' has already been set")]
    ViewingKeyAlreadySet(AccountId),

    /// An authenticated query was attempted before the key was set
    #[error("account '{0}' has no viewing key yet")]
    ViewingKeyMissing(AccountId),
}

/// The fixed set of key-ring aliases the scenarios run with
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountId {
    A,
    B,
    C,
    D,
}

impl AccountId {
    /// All scenario accounts, in key-ring order
    pub const ALL: [AccountId; 4] = [AccountId::A, AccountId::B, AccountId::C, AccountId::D];

    /// The key-ring alias this identity maps to
    pub fn alias(self) -> &'static str {
        match self {
            AccountId::A => "a",
            AccountId::B => "b",
            AccountId::C => "c",
            AccountId::D => "d",
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A resolved scenario account: alias, chain address and (eventually) the
/// secret used for authenticated queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Key-ring identity
    pub id: AccountId,
    /// Chain-derived bech32 address
    pub address: String,
    viewing_key: Option<String>,
}

impl Account {
    /// Create an account from a resolved address, with no viewing key yet
    pub fn new(id: AccountId, address: String) -> Self {
        Self {
            id,
            address,
            viewing_key: None,
        }
    }

    /// Record the viewing key for this account.
    ///
    /// The key is set exactly once during a scenario and is immutable after;
    /// a second call is a harness bug and is rejected.
    pub fn set_viewing_key(&mut self, key: String) -> Result<(), AccountError> {
        if self.viewing_key.is_some() {
            return Err(AccountError::ViewingKeyAlreadySet(self.id));
        }
        self.viewing_key = Some(key);
        Ok(())
    }

    /// The viewing key, if one was set
    pub fn viewing_key(&self) -> Option<&str> {
        self.viewing_key.as_deref()
    }

    /// The viewing key, required for authenticated queries
    pub fn require_viewing_key(&self) -> Result<&str, AccountError> {
        self.viewing_key
            .as_deref()
            .ok_or(AccountError::ViewingKeyMissing(self.id))
    }
}

/// Typed mapping from account identity to resolved account state
#[derive(Clone, Debug, Default)]
pub struct Accounts(BTreeMap<AccountId, Account>);

impl Accounts {
    /// Empty account set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolved account
    pub fn insert(&mut self, account: Account) {
        self.0.insert(account.id, account);
    }

    /// Look up an account; scenario accounts are always resolved at startup,
    /// so a miss is a harness bug surfaced to the caller.
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.0.get(&id)
    }

    /// Mutable lookup, used only by the viewing-key step
    pub fn get_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.0.get_mut(&id)
    }

    /// Iterate accounts in key-ring order
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.0.values()
    }

    /// Number of resolved accounts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no account has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
