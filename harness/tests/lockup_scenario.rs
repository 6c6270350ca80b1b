//! End-to-end run of the lockup scenario against the mock ledger.

mod common;

use common::CONFIRM_DEADLINE;
use lockup_harness::ledger::MockLedger;
use lockup_harness::scenario::lockup::{self, LockupScenarioParams};
use lockup_harness::ScenarioContext;
use lockup_common::RESPONSE_BLOCK_SIZE;

#[tokio::test(start_paused = true)]
async fn full_pipeline_succeeds() {
    let ledger = MockLedger::with_latency(2);
    let params = LockupScenarioParams::new("token.wasm".into(), "lockup.wasm".into());

    let report = lockup::run(&ledger, &params).await.unwrap();

    assert!(report.success, "failed records: {:?}", report.records.iter().filter(|r| !r.passed).collect::<Vec<_>>());
    assert!(report.records.iter().all(|r| r.passed));
    // Upload, three inits, funding, queries, four locks, keys, allowances,
    // redeem: the fixed pipeline is a double-digit step sequence
    assert!(report.steps_executed >= 13, "only {} steps ran", report.steps_executed);

    let record = |description: &str| {
        report
            .records
            .iter()
            .find(|r| r.description == description)
            .unwrap_or_else(|| panic!("no record '{description}'"))
    };

    // Depositing 500000000000 and sending it with add_to_reward_pool must
    // land in the pool and vest entirely to the only locker
    assert_eq!(record("lockup reward balance").actual, "500000000000");
    assert_eq!(record("reward pool balance").actual, "500000000000");
    assert_eq!(record("vested rewards").actual, "500000000000");

    // Allowance arithmetic is asserted as exact strings
    assert_eq!(record("allowance after increase").actual, "50");
    assert_eq!(record("allowance after decrease").actual, "30");

    // The redeem is verified against the padded literal and the suffixed
    // transfer-event amount
    assert_eq!(record("redeem output").expected.len(), RESPONSE_BLOCK_SIZE);
    assert!(record("redeem output")
        .expected
        .starts_with(r#"{"redeem":{"status":"success"}}"#));
    assert_eq!(record("redeem transfer amount").actual, "100uscrt");
}

#[tokio::test]
async fn assertion_failures_collect_without_aborting() {
    let ledger = MockLedger::new();
    let mut ctx = ScenarioContext::new(&ledger, CONFIRM_DEADLINE).await.unwrap();

    ctx.asserts.check_eq("first", "1", "2");
    ctx.asserts.check_eq("second", "x", "x");
    ctx.asserts.check_ne("third", "y", "y");

    let report = ctx.report("collect-all");
    assert!(!report.success);
    assert_eq!(report.records.len(), 3);
    assert!(!report.records[0].passed);
    assert!(report.records[1].passed);
    assert!(!report.records[2].passed);
}
