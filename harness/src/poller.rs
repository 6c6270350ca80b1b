//! Confirmation polling.
//!
//! The ledger is eventually consistent: a freshly broadcast transaction is
//! absent from `query_tx` until it lands in a block. The poller retries at a
//! fixed interval under an explicit deadline and reports progress with the
//! caller's scenario context on every miss.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::error::HarnessError;
use crate::ledger::{Ledger, RawTxResult, TxHash};

/// Fixed delay between inclusion polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait until the ledger reports `tx_hash` as included.
///
/// `context` is the caller-supplied step description logged on every
/// unsuccessful attempt. Expiry of `deadline` maps to
/// [`HarnessError::ConfirmationTimeout`].
///
/// Gas exhaustion is terminal, not retryable: a confirmed result whose raw
/// log reports it is logged as a diagnostic and returned as-is for the
/// caller to classify.
pub async fn await_confirmation(
    ledger: &dyn Ledger,
    tx_hash: &TxHash,
    context: &str,
    deadline: Duration,
) -> Result<RawTxResult, HarnessError> {
    let started = Instant::now();
    loop {
        if let Some(result) = ledger.query_tx(tx_hash).await? {
            if result.is_out_of_gas() {
                warn!("{context}: transaction {tx_hash} exhausted its gas: {}", result.raw_log);
            }
            return Ok(result);
        }

        let waited = started.elapsed();
        if waited >= deadline {
            return Err(HarnessError::ConfirmationTimeout {
                tx_hash: tx_hash.as_str().to_string(),
                waited,
            });
        }

        debug!("{context}: transaction {tx_hash} not yet included, retrying");
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedger;
    use lockup_common::AccountId;
    use serde_json::json;
    use std::path::Path;

    #[tokio::test(start_paused = true)]
    async fn confirms_after_latency_polls() {
        let ledger = MockLedger::with_latency(3);
        let hash = ledger
            .store_code(Path::new("token.wasm"), AccountId::A)
            .await
            .unwrap();

        let result = await_confirmation(&ledger, &hash, "store token code", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(result.txhash, hash.as_str());
        assert!(result.has_logs());
    }

    #[tokio::test(start_paused = true)]
    async fn maps_deadline_expiry_to_timeout() {
        let ledger = MockLedger::new();
        // Never-submitted hash: the ledger reports it absent forever
        let hash = TxHash("F".repeat(64));

        let err = await_confirmation(&ledger, &hash, "orphan tx", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ConfirmationTimeout { ref tx_hash, .. } if tx_hash == hash.as_str()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_out_of_gas_results_instead_of_retrying() {
        let ledger = MockLedger::with_latency(1);
        let code_hash = ledger
            .store_code(Path::new("token.wasm"), AccountId::A)
            .await
            .unwrap();
        await_confirmation(&ledger, &code_hash, "store", Duration::from_secs(10))
            .await
            .unwrap();

        let label_msg = json!({
            "name": "secret token", "symbol": "STKN", "decimals": 6,
            "initial_balances": [], "prng_seed": "c2VlZA==",
            "config": {"public_total_supply": true, "enable_deposit": true, "enable_redeem": true}
        });
        let init_hash = ledger
            .instantiate(1, &label_msg, "gas-test", AccountId::A)
            .await
            .unwrap();
        await_confirmation(&ledger, &init_hash, "init", Duration::from_secs(10))
            .await
            .unwrap();
        let init = ledger.query_tx(&init_hash).await.unwrap().unwrap();
        let token = init.event_attr("message", "contract_address").unwrap().to_string();

        ledger.fail_next(crate::ledger::FailureMode::OutOfGas);
        let hash = ledger
            .execute(&token, &json!({"deposit": {}}), AccountId::A, Some("100uscrt"))
            .await
            .unwrap();

        let result = await_confirmation(&ledger, &hash, "deposit", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(result.is_out_of_gas());
        assert!(!result.has_logs());
    }
}
