//! Result decoding.
//!
//! Interprets confirmed transactions: classifies business failures (gas
//! exhaustion, missing logs, contract errors), fetches the node's decrypted
//! view of compute outputs and exposes the success signal both decode
//! contracts share: `logs == null` means failure.

use log::debug;

use crate::error::HarnessError;
use crate::ledger::{DecodedTx, Ledger, RawTxResult, TxHash};

/// Cheap re-check over an already-fetched result.
///
/// Distinguishes "no application logs present" (failure) from presence of
/// logs (success) without another node round trip.
pub fn check_tx(result: &RawTxResult) -> bool {
    result.has_logs()
}

/// Fetch the decrypted view of `tx_hash` along with its success signal.
///
/// The querying identity must have signed the transaction; a node that
/// cannot decrypt surfaces as [`HarnessError::Decrypt`] (non-fatal to the
/// caller deciding what to do with it). Absent plaintext logs mean the
/// execution failed even when the node decrypts fine.
pub async fn decode_compute(
    ledger: &dyn Ledger,
    tx_hash: &TxHash,
) -> Result<(DecodedTx, bool), HarnessError> {
    let decoded = ledger
        .query_compute_tx(tx_hash)
        .await
        .map_err(|e| HarnessError::Decrypt {
            tx_hash: tx_hash.as_str().to_string(),
            reason: format!("{e:#}"),
        })?;

    let success = decoded.has_logs() && decoded.output_error.is_none();
    debug!(
        "decoded {tx_hash}: success={success}, output={:?}",
        decoded.output_data.trim_end()
    );
    Ok((decoded, success))
}

/// Classify a confirmed transaction plus its decoded view into the harness
/// error taxonomy. `Ok(())` means the execution can be asserted on.
pub fn classify(result: &RawTxResult, decoded: &DecodedTx) -> Result<(), HarnessError> {
    if result.is_out_of_gas() {
        return Err(HarnessError::OutOfGas {
            tx_hash: result.txhash.clone(),
            raw_log: result.raw_log.clone(),
        });
    }
    if let Some(error) = &decoded.output_error {
        let msg = error
            .pointer("/generic_err/msg")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unrecognized contract error")
            .to_string();
        return Err(HarnessError::ContractError { msg });
    }
    if !check_tx(result) {
        return Err(HarnessError::EmptyLogs {
            tx_hash: result.txhash.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Event, TxLog};
    use serde_json::json;

    fn raw(code: u32, raw_log: &str, logs: Option<Vec<TxLog>>) -> RawTxResult {
        RawTxResult {
            txhash: "AA11".to_string(),
            height: 7,
            code,
            raw_log: raw_log.to_string(),
            logs,
        }
    }

    fn decoded(output_logs: Option<Vec<Event>>, output_error: Option<serde_json::Value>) -> DecodedTx {
        DecodedTx {
            txhash: "AA11".to_string(),
            output_data: String::new(),
            output_logs,
            output_error,
        }
    }

    #[test]
    fn null_logs_are_never_a_success() {
        assert!(!check_tx(&raw(0, "[]", None)));
        assert!(!check_tx(&raw(0, "[]", Some(vec![]))));
        assert!(check_tx(&raw(
            0,
            "[]",
            Some(vec![TxLog {
                msg_index: 0,
                log: String::new(),
                events: vec![],
            }])
        )));
    }

    #[test]
    fn out_of_gas_wins_over_partial_logs() {
        let result = raw(
            11,
            "out of gas: locate: wasm contract",
            Some(vec![TxLog {
                msg_index: 0,
                log: String::new(),
                events: vec![],
            }]),
        );
        let err = classify(&result, &decoded(None, None)).unwrap_err();
        assert!(matches!(err, HarnessError::OutOfGas { .. }));
    }

    #[test]
    fn generic_err_is_a_contract_error() {
        let result = raw(3, "failed to execute message", None);
        let dec = decoded(None, Some(json!({"generic_err": {"msg": "insufficient funds"}})));
        let err = classify(&result, &dec).unwrap_err();
        match err {
            HarnessError::ContractError { msg } => assert_eq!(msg, "insufficient funds"),
            other => panic!("expected ContractError, got {other:?}"),
        }
    }

    #[test]
    fn confirmed_without_logs_is_empty_logs() {
        let result = raw(0, "[]", None);
        let err = classify(&result, &decoded(None, None)).unwrap_err();
        assert!(matches!(err, HarnessError::EmptyLogs { .. }));
    }
}
