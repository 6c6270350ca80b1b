//! Shared wire types for the lockup integration harness.
//!
//! This crate holds everything that both the harness library and its tests
//! need to agree on with the contracts under test:
//!
//! - **Accounts**: the fixed set of scenario identities and their set-once
//!   viewing keys
//! - **Messages**: typed builders for every execute/query message the
//!   scenario sends, serialized at the adapter boundary
//! - **Padding**: the 256-byte space-padded response convention used by the
//!   contracts' compute outputs

pub mod account;
pub mod msg;
pub mod padding;

pub use account::{Account, AccountId, Accounts};
pub use padding::{pad_response, RESPONSE_BLOCK_SIZE};
