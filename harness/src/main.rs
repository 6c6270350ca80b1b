use std::process::ExitCode;

use clap::Parser;
use log::error;

use lockup_harness::config::Config;
use lockup_harness::ledger::NodeCli;
use lockup_harness::scenario::lockup;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let ledger = NodeCli::new(
        &config.cli,
        &config.chain_id,
        &config.node,
        &config.keyring_backend,
        config.gas,
    );

    match lockup::run(&ledger, &config.scenario_params()).await {
        Ok(report) => {
            report.print();
            if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("scenario aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
