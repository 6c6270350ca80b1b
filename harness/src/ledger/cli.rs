//! Node CLI adapter.
//!
//! Wraps the external node CLI binary (`secretcli`-compatible surface) with
//! `tokio::process`. Every subcommand asks for JSON output and is parsed
//! into the boundary types of [`super`]. The CLI's wire protocol to the
//! chain is opaque to the harness.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::process::Command;

use lockup_common::AccountId;

use super::{DecodedTx, Event, Ledger, RawTxResult, TxHash};

/// Ledger adapter backed by the node CLI binary
pub struct NodeCli {
    binary: PathBuf,
    chain_id: String,
    node: String,
    keyring_backend: String,
    gas: u64,
}

impl NodeCli {
    /// Build an adapter for a CLI binary talking to `node` on `chain_id`
    pub fn new(
        binary: impl Into<PathBuf>,
        chain_id: impl Into<String>,
        node: impl Into<String>,
        keyring_backend: impl Into<String>,
        gas: u64,
    ) -> Self {
        Self {
            binary: binary.into(),
            chain_id: chain_id.into(),
            node: node.into(),
            keyring_backend: keyring_backend.into(),
            gas,
        }
    }

    /// Run the CLI and return stdout; non-zero exit becomes an error with
    /// the CLI's stderr attached.
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("running {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.binary.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} {} exited with {}: {}",
                self.binary.display(),
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }
        Ok(stdout)
    }

    /// Flags shared by every transaction subcommand
    fn tx_flags<'a>(&'a self, sender: AccountId, gas: &'a str) -> Vec<&'a str> {
        vec![
            "--from",
            sender.alias(),
            "--gas",
            gas,
            "--chain-id",
            self.chain_id.as_str(),
            "--node",
            self.node.as_str(),
            "--keyring-backend",
            self.keyring_backend.as_str(),
            "--output",
            "json",
            "-y",
        ]
    }

    /// Extract the tx hash from a broadcast response
    fn parse_txhash(broadcast: &str) -> Result<TxHash> {
        let value: Value =
            serde_json::from_str(broadcast).context("broadcast response is not JSON")?;
        let hash = value
            .get("txhash")
            .and_then(Value::as_str)
            .context("broadcast response has no txhash")?;
        Ok(TxHash(hash.to_string()))
    }
}

#[async_trait]
impl Ledger for NodeCli {
    async fn store_code(&self, wasm_path: &Path, sender: AccountId) -> Result<TxHash> {
        let path = wasm_path.to_string_lossy();
        let gas = self.gas.to_string();
        let mut args: Vec<&str> = vec!["tx", "compute", "store", &*path];
        args.extend(self.tx_flags(sender, &gas));
        let out = self.run(&args).await?;
        Self::parse_txhash(&out)
    }

    async fn instantiate(
        &self,
        code_id: u64,
        init_msg: &Value,
        label: &str,
        sender: AccountId,
    ) -> Result<TxHash> {
        let code_id = code_id.to_string();
        let init_json = init_msg.to_string();
        let gas = self.gas.to_string();
        let mut args: Vec<&str> = vec![
            "tx",
            "compute",
            "instantiate",
            code_id.as_str(),
            init_json.as_str(),
            "--label",
            label,
        ];
        args.extend(self.tx_flags(sender, &gas));
        let out = self.run(&args).await?;
        Self::parse_txhash(&out)
    }

    async fn execute(
        &self,
        contract: &str,
        msg: &Value,
        sender: AccountId,
        funds: Option<&str>,
    ) -> Result<TxHash> {
        let msg_json = msg.to_string();
        let gas = self.gas.to_string();
        let mut args: Vec<&str> = vec!["tx", "compute", "execute", contract, msg_json.as_str()];
        if let Some(amount) = funds {
            args.push("--amount");
            args.push(amount);
        }
        args.extend(self.tx_flags(sender, &gas));
        let out = self.run(&args).await?;
        Self::parse_txhash(&out)
    }

    async fn query_tx(&self, hash: &TxHash) -> Result<Option<RawTxResult>> {
        let result = self
            .run(&[
                "q",
                "tx",
                hash.as_str(),
                "--node",
                self.node.as_str(),
                "--output",
                "json",
            ])
            .await;

        match result {
            Ok(out) => {
                let raw: RawTxResult = serde_json::from_str(&out)
                    .with_context(|| format!("unparsable q tx output for {hash}"))?;
                Ok(Some(raw))
            }
            // The CLI exits non-zero with a "not found" diagnostic while the
            // transaction is still propagating; that is the transient state.
            Err(e) if format!("{e:#}").contains("not found") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_compute_tx(&self, hash: &TxHash) -> Result<DecodedTx> {
        let out = self
            .run(&["q", "compute", "tx", hash.as_str(), "--node", self.node.as_str()])
            .await?;
        let value: Value = serde_json::from_str(&out)
            .with_context(|| format!("unparsable q compute tx output for {hash}"))?;

        let output_data = value
            .get("output_data_as_string")
            .or_else(|| value.get("output_data"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let output_logs: Option<Vec<Event>> = match value.get("output_log") {
            None | Some(Value::Null) => None,
            Some(logs) => Some(
                serde_json::from_value(logs.clone())
                    .with_context(|| format!("unparsable output_log for {hash}"))?,
            ),
        };
        let output_error = match value.get("output_error") {
            None | Some(Value::Null) => None,
            // An empty object means "no error" on this surface
            Some(err) if err.as_object().is_some_and(|o| o.is_empty()) => None,
            Some(err) => Some(err.clone()),
        };

        Ok(DecodedTx {
            txhash: hash.as_str().to_string(),
            output_data,
            output_logs,
            output_error,
        })
    }

    async fn query(&self, contract: &str, msg: &Value) -> Result<Value> {
        let msg_json = msg.to_string();
        let out = self
            .run(&[
                "q",
                "compute",
                "query",
                contract,
                msg_json.as_str(),
                "--node",
                self.node.as_str(),
            ])
            .await?;
        serde_json::from_str(&out)
            .with_context(|| format!("unparsable query response from {contract}"))
    }

    async fn key_show(&self, id: AccountId) -> Result<String> {
        let out = self
            .run(&[
                "keys",
                "show",
                "-a",
                id.alias(),
                "--keyring-backend",
                self.keyring_backend.as_str(),
            ])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn contract_hash(&self, addr: &str) -> Result<String> {
        let out = self
            .run(&["q", "compute", "contract-hash", addr, "--node", self.node.as_str()])
            .await?;
        Ok(out.trim().trim_start_matches("0x").to_string())
    }
}
