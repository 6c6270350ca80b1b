//! The lockup rewards end-to-end scenario.
//!
//! Fixed pipeline: upload the token code, instantiate the reward and
//! incentivized tokens and the lockup, fund the reward pool through the
//! send/receiver pattern, lock incentivized tokens, register viewing keys,
//! verify balances, allowances and vested rewards, and fold everything into
//! a final report. Each step confirms and passes classification before the
//! next one runs; assertion failures accumulate without stopping the
//! pipeline (collect-all).

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use serde_json::{to_value, Value};

use lockup_common::msg::{
    InitialBalance, LockupExecuteMsg, LockupInitMsg, LockupQueryAnswer, LockupQueryMsg,
    LockupReceiveMsg, Snip20Ref, TokenExecuteMsg, TokenInitConfig, TokenInitMsg, TokenQueryAnswer,
    TokenQueryMsg,
};
use lockup_common::{pad_response, AccountId};

use super::{ScenarioContext, ScenarioReport};
use crate::error::HarnessError;
use crate::ledger::Ledger;

/// Native denom suffix appended to transfer-event amounts
const NATIVE_SUFFIX: &str = "uscrt";
/// Amount account B redeems from the reward token at the end of the run
const REDEEM_AMOUNT: &str = "100";
/// Height by which the whole reward pool has vested
const VESTING_DEADLINE: &str = "10000000";

/// Tunables of the lockup scenario
#[derive(Clone, Debug)]
pub struct LockupScenarioParams {
    /// Compiled token contract artifact
    pub token_wasm: PathBuf,
    /// Compiled lockup contract artifact
    pub lockup_wasm: PathBuf,
    /// Native amount deposited and routed into the reward pool
    pub deposit_amount: String,
    /// Incentivized tokens locked per round
    pub lock_amount: String,
    /// Lock rounds executed before the viewing-key step
    pub lock_rounds: u32,
    /// Per-transaction confirmation deadline
    pub confirm_deadline: Duration,
}

impl LockupScenarioParams {
    /// Spec amounts: 500000000000 into the pool, three 100-token locks
    pub fn new(token_wasm: PathBuf, lockup_wasm: PathBuf) -> Self {
        Self {
            token_wasm,
            lockup_wasm,
            deposit_amount: "500000000000".to_string(),
            lock_amount: "100".to_string(),
            lock_rounds: 3,
            confirm_deadline: Duration::from_secs(60),
        }
    }
}

fn viewing_key() -> String {
    let entropy: [u8; 16] = rand::thread_rng().gen();
    format!("api_key_{}", hex::encode(entropy))
}

fn token_answer(response: Value) -> Result<TokenQueryAnswer, HarnessError> {
    let answer: TokenQueryAnswer = serde_json::from_value(response)?;
    if let TokenQueryAnswer::ViewingKeyError { msg } = answer {
        return Err(HarnessError::ContractError { msg });
    }
    Ok(answer)
}

fn lockup_answer(response: Value) -> Result<LockupQueryAnswer, HarnessError> {
    let answer: LockupQueryAnswer = serde_json::from_value(response)?;
    if let LockupQueryAnswer::QueryError { msg } = answer {
        return Err(HarnessError::ContractError { msg });
    }
    Ok(answer)
}

/// Run the full scenario against `ledger` and produce the final report.
///
/// Business and protocol failures abort with the originating transaction
/// hash in the error; assertion failures only degrade the verdict.
pub async fn run(
    ledger: &dyn Ledger,
    params: &LockupScenarioParams,
) -> Result<ScenarioReport, HarnessError> {
    let mut ctx = ScenarioContext::new(ledger, params.confirm_deadline).await?;
    let prng_seed = "aGFybmVzcy1wcm5nLXNlZWQ=".to_string();

    let a_addr = ctx.address(AccountId::A)?.to_string();
    let b_addr = ctx.address(AccountId::B)?.to_string();

    // UploadCode + InitContract(reward token): B gets a redeemable balance
    let token_code = ctx.upload_code(&params.token_wasm, AccountId::A).await?;
    let reward_init = to_value(TokenInitMsg {
        name: "secret scrt".to_string(),
        symbol: "SSCRT".to_string(),
        decimals: 6,
        initial_balances: vec![InitialBalance {
            address: b_addr.clone(),
            amount: "1000".to_string(),
        }],
        prng_seed: prng_seed.clone(),
        config: TokenInitConfig {
            public_total_supply: true,
            enable_deposit: true,
            enable_redeem: true,
        },
    })?;
    let reward_token = ctx
        .init_contract(token_code, &reward_init, AccountId::A)
        .await?;

    // InitContract(incentivized token): A holds the lockable supply
    let inc_init = to_value(TokenInitMsg {
        name: "secret eth".to_string(),
        symbol: "SETH".to_string(),
        decimals: 6,
        initial_balances: vec![InitialBalance {
            address: a_addr.clone(),
            amount: "1000000000".to_string(),
        }],
        prng_seed: prng_seed.clone(),
        config: TokenInitConfig {
            public_total_supply: true,
            enable_deposit: false,
            enable_redeem: false,
        },
    })?;
    let inc_token = ctx.init_contract(token_code, &inc_init, AccountId::A).await?;

    // InitContract(lockup): the lockup registers its own key with both tokens
    let lockup_code = ctx.upload_code(&params.lockup_wasm, AccountId::A).await?;
    let lockup_key = viewing_key();
    let lockup_init = to_value(LockupInitMsg {
        reward_token: Snip20Ref {
            address: reward_token.address.clone(),
            contract_hash: reward_token.code_hash.clone(),
        },
        inc_token: Snip20Ref {
            address: inc_token.address.clone(),
            contract_hash: inc_token.code_hash.clone(),
        },
        deadline: VESTING_DEADLINE.to_string(),
        pool_claim_block: VESTING_DEADLINE.to_string(),
        viewing_key: lockup_key.clone(),
        prng_seed,
    })?;
    let lockup = ctx.init_contract(lockup_code, &lockup_init, AccountId::A).await?;

    // Deposit: convert native funds into reward tokens for A
    let funds = format!("{}{NATIVE_SUFFIX}", params.deposit_amount);
    let (_, decoded) = ctx
        .execute_checked(
            "deposit reward funds",
            &reward_token.address,
            &to_value(TokenExecuteMsg::Deposit { padding: None })?,
            AccountId::A,
            Some(&funds),
        )
        .await?;
    ctx.asserts.check_eq(
        "deposit output",
        &decoded.output_data,
        pad_response(r#"{"deposit":{"status":"success"}}"#),
    );

    // Send(add_to_reward_pool): two-phase send against the *source* token
    let fund_pool = to_value(TokenExecuteMsg::send_to(
        &lockup.address,
        &params.deposit_amount,
        &LockupReceiveMsg::AddToRewardPool {},
    )?)?;
    let (_, decoded) = ctx
        .execute_checked(
            "route deposit into the reward pool",
            &reward_token.address,
            &fund_pool,
            AccountId::A,
            None,
        )
        .await?;
    ctx.asserts.check_eq(
        "reward pool send output",
        &decoded.output_data,
        pad_response(r#"{"send":{"status":"success"}}"#),
    );

    // QueryBalance: the lockup's reward-token balance, via its own key
    let response = ctx
        .query_step(
            "query lockup reward balance",
            &reward_token.address,
            &to_value(TokenQueryMsg::Balance {
                address: lockup.address.clone(),
                key: lockup_key.clone(),
            })?,
        )
        .await?;
    match token_answer(response)? {
        TokenQueryAnswer::Balance { amount } => {
            ctx.asserts
                .check_eq("lockup reward balance", amount, &params.deposit_amount);
        }
        other => {
            return Err(HarnessError::ContractError {
                msg: format!("balance query answered with {other:?}"),
            })
        }
    }

    // QueryRewardPool
    let response = ctx
        .query_step(
            "query reward pool balance",
            &lockup.address,
            &to_value(LockupQueryMsg::QueryRewardPoolBalance {})?,
        )
        .await?;
    match lockup_answer(response)? {
        LockupQueryAnswer::QueryRewardPoolBalance { balance } => {
            ctx.asserts
                .check_eq("reward pool balance", balance, &params.deposit_amount);
        }
        other => {
            return Err(HarnessError::ContractError {
                msg: format!("reward pool query answered with {other:?}"),
            })
        }
    }

    // Send(lock_tokens) x N
    for round in 1..=params.lock_rounds {
        let lock = to_value(TokenExecuteMsg::send_to(
            &lockup.address,
            &params.lock_amount,
            &LockupReceiveMsg::LockTokens {},
        )?)?;
        let (_, decoded) = ctx
            .execute_checked(
                &format!("lock tokens (round {round})"),
                &inc_token.address,
                &lock,
                AccountId::A,
                None,
            )
            .await?;
        ctx.asserts.check_eq(
            format!("lock round {round} output"),
            &decoded.output_data,
            pad_response(r#"{"send":{"status":"success"}}"#),
        );
    }

    // SetViewingKey: A's key, set exactly once on the account and registered
    // with the lockup and both tokens for the authenticated queries below
    let a_key = viewing_key();
    ctx.accounts
        .get_mut(AccountId::A)
        .ok_or_else(|| HarnessError::Ledger(anyhow::anyhow!("account 'a' was never resolved")))?
        .set_viewing_key(a_key.clone())?;
    let (_, decoded) = ctx
        .execute_checked(
            "set viewing key on lockup",
            &lockup.address,
            &to_value(LockupExecuteMsg::SetViewingKey {
                key: a_key.clone(),
                padding: None,
            })?,
            AccountId::A,
            None,
        )
        .await?;
    ctx.asserts.check_eq(
        "set viewing key output",
        &decoded.output_data,
        pad_response(r#"{"set_viewing_key":{"status":"success"}}"#),
    );
    ctx.execute_checked(
        "register viewing key with incentivized token",
        &inc_token.address,
        &to_value(TokenExecuteMsg::SetViewingKey {
            key: a_key.clone(),
            padding: None,
        })?,
        AccountId::A,
        None,
    )
    .await?;

    // One more lock after the viewing key exists
    let lock = to_value(TokenExecuteMsg::send_to(
        &lockup.address,
        &params.lock_amount,
        &LockupReceiveMsg::LockTokens {},
    )?)?;
    ctx.execute_checked(
        "lock tokens (final round)",
        &inc_token.address,
        &lock,
        AccountId::A,
        None,
    )
    .await?;

    // QueryRewards: by the vesting deadline the whole pool belongs to the
    // only locker
    let response = ctx
        .query_step(
            "query vested rewards",
            &lockup.address,
            &to_value(LockupQueryMsg::QueryRewards {
                address: a_addr.clone(),
                height: VESTING_DEADLINE.to_string(),
                key: a_key.clone(),
            })?,
        )
        .await?;
    match lockup_answer(response)? {
        LockupQueryAnswer::QueryRewards { rewards } => {
            ctx.asserts
                .check_eq("vested rewards", rewards, &params.deposit_amount);
        }
        other => {
            return Err(HarnessError::ContractError {
                msg: format!("rewards query answered with {other:?}"),
            })
        }
    }

    // Allowance round-trip on the incentivized token: 50 up, 20 down
    ctx.execute_checked(
        "increase allowance a -> b",
        &inc_token.address,
        &to_value(TokenExecuteMsg::IncreaseAllowance {
            spender: b_addr.clone(),
            amount: "50".to_string(),
        })?,
        AccountId::A,
        None,
    )
    .await?;
    let response = ctx
        .query_step(
            "query allowance after increase",
            &inc_token.address,
            &to_value(TokenQueryMsg::Allowance {
                owner: a_addr.clone(),
                spender: b_addr.clone(),
                key: a_key.clone(),
            })?,
        )
        .await?;
    match token_answer(response)? {
        TokenQueryAnswer::Allowance { allowance, .. } => {
            ctx.asserts.check_eq("allowance after increase", allowance, "50");
        }
        other => {
            return Err(HarnessError::ContractError {
                msg: format!("allowance query answered with {other:?}"),
            })
        }
    }
    ctx.execute_checked(
        "decrease allowance a -> b",
        &inc_token.address,
        &to_value(TokenExecuteMsg::DecreaseAllowance {
            spender: b_addr.clone(),
            amount: "20".to_string(),
        })?,
        AccountId::A,
        None,
    )
    .await?;
    let response = ctx
        .query_step(
            "query allowance after decrease",
            &inc_token.address,
            &to_value(TokenQueryMsg::Allowance {
                owner: a_addr.clone(),
                spender: b_addr.clone(),
                key: a_key,
            })?,
        )
        .await?;
    match token_answer(response)? {
        TokenQueryAnswer::Allowance { allowance, .. } => {
            ctx.asserts.check_eq("allowance after decrease", allowance, "30");
        }
        other => {
            return Err(HarnessError::ContractError {
                msg: format!("allowance query answered with {other:?}"),
            })
        }
    }

    // Redeem: B converts reward tokens back to native funds; the confirmed
    // transaction must carry the transfer event with the suffixed amount
    let (result, decoded) = ctx
        .execute_checked(
            "redeem native funds for b",
            &reward_token.address,
            &to_value(TokenExecuteMsg::Redeem {
                amount: REDEEM_AMOUNT.to_string(),
                padding: None,
            })?,
            AccountId::B,
            None,
        )
        .await?;
    ctx.asserts.check_eq(
        "redeem output",
        &decoded.output_data,
        pad_response(r#"{"redeem":{"status":"success"}}"#),
    );
    let transfers = result.events("transfer");
    match transfers.first() {
        Some(transfer) => {
            ctx.asserts.check_eq(
                "redeem transfer recipient",
                transfer.attr("recipient").unwrap_or_default(),
                &b_addr,
            );
            ctx.asserts.check_eq(
                "redeem transfer amount",
                transfer.attr("amount").unwrap_or_default(),
                format!("{REDEEM_AMOUNT}{NATIVE_SUFFIX}"),
            );
        }
        None => {
            return Err(HarnessError::MissingAttribute {
                tx_hash: result.txhash.clone(),
                event_type: "transfer".to_string(),
                key: "recipient".to_string(),
            })
        }
    }

    // Report
    Ok(ctx.report("lockup rewards end-to-end"))
}
