//! Deterministic instantiation labels.
//!
//! The chain rejects duplicate labels, so repeated harness runs must not
//! collide with earlier deployments of the same code. The label is a pure
//! function of the code id and the exact init message, so identical
//! deployments map to identical labels while any change to either input
//! produces a fresh one.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derive the instantiation label for `(code_id, init_msg)`
pub fn contract_label(code_id: u64, init_msg: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_id.to_be_bytes());
    hasher.update(init_msg.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("contract-{}", &hex::encode(digest)[..16])
}
