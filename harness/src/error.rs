//! Harness error taxonomy.
//!
//! Transient "not yet included" states never surface here: the poller
//! absorbs them. Everything below either aborts the running scenario
//! (business and protocol failures) or is produced while mapping adapter
//! errors into scenario context.

use std::time::Duration;

use thiserror::Error;

/// Scenario-aborting failures observed while orchestrating transactions
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The ledger never reported inclusion within the caller's deadline
    #[error("transaction {tx_hash} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },

    /// The transaction confirmed but exhausted its gas limit
    #[error("transaction {tx_hash} ran out of gas: {raw_log}")]
    OutOfGas { tx_hash: String, raw_log: String },

    /// The transaction confirmed but emitted no application logs
    #[error("transaction {tx_hash} confirmed with no logs")]
    EmptyLogs { tx_hash: String },

    /// The contract rejected the call with a generic error
    #[error("contract returned an error: {msg}")]
    ContractError { msg: String },

    /// The node could not decrypt the compute output for our identity
    #[error("failed to decrypt compute output of {tx_hash}: {reason}")]
    Decrypt { tx_hash: String, reason: String },

    /// A required attribute was missing from the confirmed transaction's events
    #[error("transaction {tx_hash} has no '{key}' attribute in any '{event_type}' event")]
    MissingAttribute {
        tx_hash: String,
        event_type: String,
        key: String,
    },

    /// A response did not parse as the expected answer shape
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// Account bookkeeping violation (viewing key set twice, key missing)
    #[error(transparent)]
    Account(#[from] lockup_common::account::AccountError),

    /// Adapter-level failure talking to the node
    #[error("ledger error: {0:#}")]
    Ledger(#[from] anyhow::Error),
}
