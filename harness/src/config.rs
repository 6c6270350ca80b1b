//! Harness binary configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::scenario::lockup::LockupScenarioParams;

/// Run the lockup reward scenario against a live node
#[derive(Parser, Debug)]
#[command(name = "lockup-harness", version, about)]
pub struct Config {
    /// Path to the node CLI binary
    #[arg(long, default_value = "secretcli")]
    pub cli: PathBuf,

    /// Chain id the CLI signs for
    #[arg(long, default_value = "secretdev-1")]
    pub chain_id: String,

    /// Node RPC address
    #[arg(long, default_value = "tcp://localhost:26657")]
    pub node: String,

    /// Key-ring backend holding the scenario accounts
    #[arg(long, default_value = "test")]
    pub keyring_backend: String,

    /// Gas limit for every submitted transaction
    #[arg(long, default_value_t = 10_000_000)]
    pub gas: u64,

    /// Compiled token contract artifact
    #[arg(long, default_value = "build/token.wasm")]
    pub token_wasm: PathBuf,

    /// Compiled lockup contract artifact
    #[arg(long, default_value = "build/lockup.wasm")]
    pub lockup_wasm: PathBuf,

    /// Per-transaction confirmation deadline, in seconds
    #[arg(long, default_value_t = 60)]
    pub confirm_deadline_secs: u64,
}

impl Config {
    /// Scenario parameters derived from the command line
    pub fn scenario_params(&self) -> LockupScenarioParams {
        let mut params =
            LockupScenarioParams::new(self.token_wasm.clone(), self.lockup_wasm.clone());
        params.confirm_deadline = Duration::from_secs(self.confirm_deadline_secs);
        params
    }
}
