//! Integration-test harness for the lockup reward protocol.
//!
//! Deploys the token and lockup contracts, drives the scripted
//! multi-contract scenario and verifies on-chain outcomes against an
//! eventually-consistent, encrypted-compute ledger.
//!
//! # Architecture
//!
//! - [`ledger`]: the collaborator boundary to the chain ([`ledger::NodeCli`]
//!   over the node CLI, [`ledger::MockLedger`] for tests)
//! - [`poller`]: confirmation polling with an explicit deadline
//! - [`decoder`]: decode/decrypt of compute results and business-failure
//!   classification
//! - [`asserts`]: collect-all assertion ledger
//! - [`scenario`]: the step orchestrator and the lockup pipeline
//!
//! # Quick start
//!
//! ```rust,ignore
//! use lockup_harness::ledger::MockLedger;
//! use lockup_harness::scenario::lockup::{self, LockupScenarioParams};
//!
//! #[tokio::test]
//! async fn lockup_pipeline() {
//!     let ledger = MockLedger::new();
//!     let params = LockupScenarioParams::new("token.wasm".into(), "lockup.wasm".into());
//!     let report = lockup::run(&ledger, &params).await.unwrap();
//!     assert!(report.success);
//! }
//! ```

#![warn(clippy::all)]

pub mod asserts;
pub mod config;
pub mod decoder;
pub mod error;
pub mod label;
pub mod ledger;
pub mod poller;
pub mod scenario;

pub use asserts::{AssertionRecord, Assertions};
pub use error::HarnessError;
pub use poller::await_confirmation;
pub use scenario::{ContractHandle, ScenarioContext, ScenarioReport};
