//! Scenario orchestration.
//!
//! A [`ScenarioContext`] owns the step sequence state: resolved accounts,
//! deployed contract handles, the assertion collector and the execution log.
//! Every operation fully confirms and decodes its transaction before the
//! context advances, so step N+1 never observes pre-N state.

pub mod lockup;

use std::path::Path;
use std::time::Duration;

use log::info;
use serde_json::Value;

use lockup_common::{Account, AccountId, Accounts};

use crate::asserts::{AssertionRecord, Assertions};
use crate::decoder::{check_tx, classify, decode_compute};
use crate::error::HarnessError;
use crate::label::contract_label;
use crate::ledger::{DecodedTx, Ledger, RawTxResult};
use crate::poller::await_confirmation;

/// Address and code hash of a deployed contract instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractHandle {
    pub address: String,
    pub code_hash: String,
}

/// Running state of one scenario execution
pub struct ScenarioContext<'a> {
    ledger: &'a dyn Ledger,
    /// Scenario identities, resolved once at startup
    pub accounts: Accounts,
    /// Collect-all assertion ledger
    pub asserts: Assertions,
    confirm_deadline: Duration,
    steps_executed: usize,
    log: Vec<String>,
}

impl<'a> ScenarioContext<'a> {
    /// Resolve every scenario account against the key ring and start with an
    /// empty assertion ledger.
    pub async fn new(
        ledger: &'a dyn Ledger,
        confirm_deadline: Duration,
    ) -> Result<ScenarioContext<'a>, HarnessError> {
        let mut accounts = Accounts::new();
        for id in AccountId::ALL {
            let address = ledger.key_show(id).await?;
            accounts.insert(Account::new(id, address));
        }
        Ok(Self {
            ledger,
            accounts,
            asserts: Assertions::new(),
            confirm_deadline,
            steps_executed: 0,
            log: Vec::new(),
        })
    }

    /// Resolved address of a scenario account
    pub fn address(&self, id: AccountId) -> Result<&str, HarnessError> {
        self.accounts
            .get(id)
            .map(|a| a.address.as_str())
            .ok_or_else(|| {
                HarnessError::Ledger(anyhow::anyhow!("account '{id}' was never resolved"))
            })
    }

    fn step(&mut self, name: &str) {
        self.steps_executed += 1;
        let line = format!("--- Step {}: {name} ---", self.steps_executed);
        info!("{line}");
        self.log.push(line);
    }

    /// Append a free-form line to the execution log
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.log.push(message);
    }

    /// Upload contract code and extract the assigned code id from the
    /// confirmed store transaction's events.
    pub async fn upload_code(
        &mut self,
        wasm_path: &Path,
        sender: AccountId,
    ) -> Result<u64, HarnessError> {
        let name = format!("upload {}", wasm_path.display());
        self.step(&name);

        let hash = self.ledger.store_code(wasm_path, sender).await?;
        let result = await_confirmation(self.ledger, &hash, &name, self.confirm_deadline).await?;
        if result.is_out_of_gas() {
            return Err(HarnessError::OutOfGas {
                tx_hash: result.txhash,
                raw_log: result.raw_log,
            });
        }
        if !check_tx(&result) {
            return Err(HarnessError::EmptyLogs {
                tx_hash: result.txhash,
            });
        }

        let code_id = Self::required_attr(&result, "message", "code_id")?;
        let code_id: u64 = code_id.parse().map_err(|_| HarnessError::MissingAttribute {
            tx_hash: result.txhash.clone(),
            event_type: "message".to_string(),
            key: "code_id (non-numeric)".to_string(),
        })?;
        self.note(format!("  code id {code_id}"));
        Ok(code_id)
    }

    /// Instantiate uploaded code under its deterministic label and extract
    /// the new contract's address. A confirmed init with no logs aborts the
    /// scenario: nothing later can reference the contract.
    pub async fn init_contract(
        &mut self,
        code_id: u64,
        init_msg: &Value,
        sender: AccountId,
    ) -> Result<ContractHandle, HarnessError> {
        let label = contract_label(code_id, init_msg);
        let name = format!("instantiate code {code_id} as '{label}'");
        self.step(&name);

        let hash = self
            .ledger
            .instantiate(code_id, init_msg, &label, sender)
            .await?;
        let result = await_confirmation(self.ledger, &hash, &name, self.confirm_deadline).await?;
        if result.is_out_of_gas() {
            return Err(HarnessError::OutOfGas {
                tx_hash: result.txhash,
                raw_log: result.raw_log,
            });
        }
        if !check_tx(&result) {
            return Err(HarnessError::EmptyLogs {
                tx_hash: result.txhash,
            });
        }

        let address = Self::required_attr(&result, "message", "contract_address")?.to_string();
        let code_hash = self.ledger.contract_hash(&address).await?;
        self.note(format!("  deployed at {address}"));
        Ok(ContractHandle { address, code_hash })
    }

    /// Execute a contract message and fully verify the transaction:
    /// confirmation, decrypted decode and business-failure classification.
    /// Returns both views for event and output assertions.
    pub async fn execute_checked(
        &mut self,
        name: &str,
        contract: &str,
        msg: &Value,
        sender: AccountId,
        funds: Option<&str>,
    ) -> Result<(RawTxResult, DecodedTx), HarnessError> {
        self.step(name);

        let hash = self.ledger.execute(contract, msg, sender, funds).await?;
        let result = await_confirmation(self.ledger, &hash, name, self.confirm_deadline).await?;
        let (decoded, _success) = decode_compute(self.ledger, &hash).await?;
        classify(&result, &decoded)?;
        Ok((result, decoded))
    }

    /// Run a smart query as a scenario step
    pub async fn query_step(
        &mut self,
        name: &str,
        contract: &str,
        msg: &Value,
    ) -> Result<Value, HarnessError> {
        self.step(name);
        Ok(self.ledger.query(contract, msg).await?)
    }

    fn required_attr<'r>(
        result: &'r RawTxResult,
        event_type: &str,
        key: &str,
    ) -> Result<&'r str, HarnessError> {
        result
            .event_attr(event_type, key)
            .ok_or_else(|| HarnessError::MissingAttribute {
                tx_hash: result.txhash.clone(),
                event_type: event_type.to_string(),
                key: key.to_string(),
            })
    }

    /// Terminal state: fold the assertion ledger into the final report
    pub fn report(self, scenario_name: &str) -> ScenarioReport {
        let records = self.asserts.into_records();
        let success = records.iter().all(|r| r.passed);
        ScenarioReport {
            scenario_name: scenario_name.to_string(),
            steps_executed: self.steps_executed,
            records,
            success,
            log: self.log,
        }
    }
}

/// Final verdict of a scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub steps_executed: usize,
    pub records: Vec<AssertionRecord>,
    /// True only when every assertion record passed
    pub success: bool,
    pub log: Vec<String>,
}

impl ScenarioReport {
    /// Print the verdict, the per-record outcomes and the execution log
    pub fn print(&self) {
        println!("\n================================================================");
        println!("  Scenario: {}", self.scenario_name);
        println!("  Steps executed: {}", self.steps_executed);
        println!(
            "  Assertions: {} total, {} failed",
            self.records.len(),
            self.records.iter().filter(|r| !r.passed).count()
        );
        println!(
            "  Verdict: {}",
            if self.success { "SUCCESS" } else { "FAILED" }
        );
        println!("================================================================\n");

        for record in &self.records {
            if record.passed {
                println!("  [pass] {}", record.description);
            } else {
                println!(
                    "  [FAIL] {}: expected {:?}, got {:?}",
                    record.description, record.expected, record.actual
                );
            }
        }

        println!("\nExecution log:");
        for line in &self.log {
            println!("{line}");
        }
    }
}
