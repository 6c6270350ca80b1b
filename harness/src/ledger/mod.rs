//! Ledger client boundary.
//!
//! The chain is an external collaborator reached through the [`Ledger`]
//! trait. Two implementations ship with the harness: [`NodeCli`], a thin
//! wrapper over the node CLI binary, and [`MockLedger`], a deterministic
//! in-memory chain for integration tests.

mod cli;
mod mock;

use std::fmt;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lockup_common::AccountId;

pub use cli::NodeCli;
pub use mock::{FailureMode, MockLedger};

/// Raw-log substring emitted when contract execution exhausts its gas limit
pub const OUT_OF_GAS_EXECUTE: &str = "execute contract failed: Out of gas: ";
/// Raw-log substring emitted by the lower-level gas meter
pub const OUT_OF_GAS_METER: &str = "out of gas:";

/// Hash identifying a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value pair attached to an emitted event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// Typed event emitted by a confirmed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// First value of the attribute named `key`, if present
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// One log entry of a confirmed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    #[serde(default)]
    pub msg_index: u64,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A confirmed transaction as reported by `query_tx`.
///
/// `logs` is `None` when the node attached no application logs; the decoder
/// treats that as a failed execution regardless of `code`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTxResult {
    pub txhash: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
    pub logs: Option<Vec<TxLog>>,
}

impl RawTxResult {
    /// Whether the raw log reports gas exhaustion.
    ///
    /// Gas exhaustion is terminal for the transaction; the poller still
    /// returns the result so the caller can attach scenario context.
    pub fn is_out_of_gas(&self) -> bool {
        self.raw_log.contains(OUT_OF_GAS_EXECUTE) || self.raw_log.contains(OUT_OF_GAS_METER)
    }

    /// Whether any application logs were attached
    pub fn has_logs(&self) -> bool {
        self.logs.as_ref().is_some_and(|logs| !logs.is_empty())
    }

    /// Search all logged events of `kind` for an attribute named `key`
    pub fn event_attr(&self, kind: &str, key: &str) -> Option<&str> {
        self.logs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .flat_map(|log| log.events.iter())
            .filter(|event| event.kind == kind)
            .find_map(|event| event.attr(key))
    }

    /// All events of `kind` across every log entry
    pub fn events(&self, kind: &str) -> Vec<&Event> {
        self.logs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .flat_map(|log| log.events.iter())
            .filter(|event| event.kind == kind)
            .collect()
    }
}

/// The node's decrypted view of a compute transaction.
///
/// Decryption requires the querying identity to have signed the transaction;
/// the adapter surfaces an error otherwise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecodedTx {
    pub txhash: String,
    /// Decrypted, space-padded application output
    #[serde(default)]
    pub output_data: String,
    /// Decrypted plaintext logs; `None` mirrors `logs == null` on the raw view
    pub output_logs: Option<Vec<Event>>,
    /// Structured contract error, when the call failed inside the enclave
    #[serde(default)]
    pub output_error: Option<Value>,
}

impl DecodedTx {
    /// Whether the decrypted view carries any plaintext logs
    pub fn has_logs(&self) -> bool {
        self.output_logs.as_ref().is_some_and(|logs| !logs.is_empty())
    }
}

/// Async boundary to the chain.
///
/// Implementations report `Ok(None)` from [`Ledger::query_tx`] while a
/// transaction is not yet included; errors are reserved for protocol
/// failures (unreachable node, unparsable output).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Upload contract code, returning the store transaction's hash
    async fn store_code(&self, wasm_path: &Path, sender: AccountId) -> Result<TxHash>;

    /// Instantiate uploaded code under a unique label
    async fn instantiate(
        &self,
        code_id: u64,
        init_msg: &Value,
        label: &str,
        sender: AccountId,
    ) -> Result<TxHash>;

    /// Execute a contract message, optionally attaching native funds
    /// (e.g. `"500000000000uscrt"`)
    async fn execute(
        &self,
        contract: &str,
        msg: &Value,
        sender: AccountId,
        funds: Option<&str>,
    ) -> Result<TxHash>;

    /// Look up a transaction; `None` while not yet included
    async fn query_tx(&self, hash: &TxHash) -> Result<Option<RawTxResult>>;

    /// Decrypted view of a compute transaction signed by one of our keys
    async fn query_compute_tx(&self, hash: &TxHash) -> Result<DecodedTx>;

    /// Run a smart query against a contract
    async fn query(&self, contract: &str, msg: &Value) -> Result<Value>;

    /// Resolve a key-ring alias to its chain address
    async fn key_show(&self, id: AccountId) -> Result<String>;

    /// Code hash of a deployed contract
    async fn contract_hash(&self, addr: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_raw_log(raw_log: &str) -> RawTxResult {
        RawTxResult {
            txhash: "ABC123".to_string(),
            height: 10,
            code: 11,
            raw_log: raw_log.to_string(),
            logs: None,
        }
    }

    #[test]
    fn out_of_gas_detection_matches_both_spellings() {
        let executor = result_with_raw_log(
            "execute contract failed: Out of gas: gas meter exhausted at 120000",
        );
        assert!(executor.is_out_of_gas());

        let meter = result_with_raw_log("out of gas: locate: wasm contract");
        assert!(meter.is_out_of_gas());

        let ok = result_with_raw_log("[]");
        assert!(!ok.is_out_of_gas());
    }

    #[test]
    fn event_attr_scans_all_logs() {
        let result = RawTxResult {
            txhash: "DEF".to_string(),
            height: 4,
            code: 0,
            raw_log: String::new(),
            logs: Some(vec![
                TxLog {
                    msg_index: 0,
                    log: String::new(),
                    events: vec![Event {
                        kind: "message".to_string(),
                        attributes: vec![Attribute {
                            key: "action".to_string(),
                            value: "store-code".to_string(),
                        }],
                    }],
                },
                TxLog {
                    msg_index: 1,
                    log: String::new(),
                    events: vec![Event {
                        kind: "message".to_string(),
                        attributes: vec![Attribute {
                            key: "code_id".to_string(),
                            value: "42".to_string(),
                        }],
                    }],
                },
            ]),
        };

        assert_eq!(result.event_attr("message", "code_id"), Some("42"));
        assert_eq!(result.event_attr("transfer", "code_id"), None);
    }
}
