//! Shared helpers for the harness integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use serde_json::{to_value, Value};

use lockup_common::msg::{InitialBalance, LockupInitMsg, Snip20Ref, TokenInitConfig, TokenInitMsg};
use lockup_common::AccountId;
use lockup_harness::{ContractHandle, HarnessError, ScenarioContext};

/// Generous confirmation deadline; mock latency is a handful of polls
pub const CONFIRM_DEADLINE: Duration = Duration::from_secs(30);

/// Vesting deadline height used by the test deployments
pub const TEST_DEADLINE: &str = "10000000";

/// Token init message with the given genesis balances
pub fn token_init(name: &str, balances: &[(&str, &str)]) -> Value {
    to_value(TokenInitMsg {
        name: name.to_string(),
        symbol: "TST".to_string(),
        decimals: 6,
        initial_balances: balances
            .iter()
            .map(|(address, amount)| InitialBalance {
                address: address.to_string(),
                amount: amount.to_string(),
            })
            .collect(),
        prng_seed: "dGVzdC1zZWVk".to_string(),
        config: TokenInitConfig {
            public_total_supply: true,
            enable_deposit: true,
            enable_redeem: true,
        },
    })
    .expect("token init serializes")
}

/// Upload the token code and instantiate it with the given balances
pub async fn deploy_token(
    ctx: &mut ScenarioContext<'_>,
    balances: &[(&str, &str)],
) -> Result<ContractHandle, HarnessError> {
    let code = ctx
        .upload_code(Path::new("token.wasm"), AccountId::A)
        .await?;
    let init = token_init("test token", balances);
    ctx.init_contract(code, &init, AccountId::A).await
}

/// Handles of a fully deployed token/lockup stack
pub struct LockupStack {
    pub reward_token: ContractHandle,
    pub inc_token: ContractHandle,
    pub lockup: ContractHandle,
}

/// Deploy both tokens and the lockup; `inc_balances` seeds the incentivized
/// token so accounts have something to lock.
pub async fn deploy_lockup_stack(
    ctx: &mut ScenarioContext<'_>,
    inc_balances: &[(&str, &str)],
) -> Result<LockupStack, HarnessError> {
    let token_code = ctx
        .upload_code(Path::new("token.wasm"), AccountId::A)
        .await?;
    let reward_token = ctx
        .init_contract(token_code, &token_init("reward token", &[]), AccountId::A)
        .await?;
    let inc_token = ctx
        .init_contract(
            token_code,
            &token_init("incentivized token", inc_balances),
            AccountId::A,
        )
        .await?;

    let lockup_code = ctx
        .upload_code(Path::new("lockup.wasm"), AccountId::A)
        .await?;
    let lockup_init = to_value(LockupInitMsg {
        reward_token: Snip20Ref {
            address: reward_token.address.clone(),
            contract_hash: reward_token.code_hash.clone(),
        },
        inc_token: Snip20Ref {
            address: inc_token.address.clone(),
            contract_hash: inc_token.code_hash.clone(),
        },
        deadline: TEST_DEADLINE.to_string(),
        pool_claim_block: TEST_DEADLINE.to_string(),
        viewing_key: "lockup-test-key".to_string(),
        prng_seed: "dGVzdC1zZWVk".to_string(),
    })?;
    let lockup = ctx
        .init_contract(lockup_code, &lockup_init, AccountId::A)
        .await?;

    Ok(LockupStack {
        reward_token,
        inc_token,
        lockup,
    })
}
