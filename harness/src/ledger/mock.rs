//! Deterministic in-memory ledger.
//!
//! Emulates just enough of the chain for the harness's integration tests:
//! two SNIP-20-like tokens, the lockup contract, eventually-consistent
//! transaction lookup (configurable poll latency) and failure injection for
//! gas exhaustion, missing logs and undecryptable outputs. No consensus, no
//! cryptography; balances and events are bookkeeping only.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use lockup_common::msg::{
    LockupExecuteMsg, LockupInitMsg, LockupQueryMsg, LockupReceiveMsg, TokenExecuteMsg,
    TokenInitMsg, TokenQueryMsg,
};
use lockup_common::{pad_response, AccountId};

use super::{Attribute, DecodedTx, Event, Ledger, RawTxResult, TxHash, TxLog};

const WRONG_VIEWING_KEY: &str = "Wrong viewing key for this address or viewing key not set";
const NATIVE_DENOM: &str = "uscrt";

/// Failure injected into the next submitted transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Confirm with a gas-exhaustion raw log and no logs
    OutOfGas,
    /// Confirm cleanly but attach no application logs
    NoLogs,
    /// Confirm normally, but refuse to decrypt the compute output
    Decrypt,
}

struct TokenState {
    name: String,
    symbol: String,
    decimals: u8,
    balances: HashMap<String, u128>,
    allowances: HashMap<String, HashMap<String, u128>>,
    viewing_keys: HashMap<String, String>,
}

impl TokenState {
    fn total_supply(&self) -> u128 {
        self.balances.values().sum()
    }

    fn key_matches(&self, address: &str, key: &str) -> bool {
        self.viewing_keys.get(address).is_some_and(|k| k == key)
    }
}

struct LockupState {
    reward_token: String,
    inc_token: String,
    deadline: u64,
    reward_pool: u128,
    locked: HashMap<String, u128>,
    viewing_keys: HashMap<String, String>,
}

impl LockupState {
    fn key_matches(&self, address: &str, key: &str) -> bool {
        self.viewing_keys.get(address).is_some_and(|k| k == key)
    }
}

enum ContractKind {
    Token(TokenState),
    Lockup(LockupState),
}

struct ContractEntry {
    code_hash: String,
    kind: ContractKind,
}

struct PendingTx {
    result: RawTxResult,
    decoded: DecodedTx,
    remaining_polls: u32,
    decrypt_fails: bool,
}

#[derive(Default)]
struct MockState {
    height: u64,
    next_code_id: u64,
    codes: HashMap<u64, String>,
    labels: HashSet<String>,
    contracts: HashMap<String, ContractEntry>,
    txs: HashMap<String, PendingTx>,
    tx_counter: u64,
    fail_next: Option<FailureMode>,
}

/// In-memory [`Ledger`] for integration tests
pub struct MockLedger {
    state: Mutex<MockState>,
    latency: u32,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Ledger whose transactions are queryable immediately after submission
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    /// Ledger that reports each transaction absent for `latency` polls
    /// before confirming it
    pub fn with_latency(latency: u32) -> Self {
        Self {
            state: Mutex::new(MockState {
                next_code_id: 1,
                ..MockState::default()
            }),
            latency,
        }
    }

    /// Inject a failure into the next submitted transaction
    pub fn fail_next(&self, mode: FailureMode) {
        self.state.lock().fail_next = Some(mode);
    }

    /// Deterministic chain address for a key-ring alias
    pub fn account_address(id: AccountId) -> String {
        format!("secret1{}", id.alias().repeat(38))
    }

    fn contract_address(label: &str) -> String {
        let digest = Sha256::digest(label.as_bytes());
        format!("secret1{}", &hex::encode(digest)[..38])
    }

    fn code_hash_for(source: &str) -> String {
        hex::encode(Sha256::digest(source.as_bytes())).to_uppercase()
    }

    /// Record a transaction outcome, applying any injected failure mode.
    ///
    /// `answer` is the plaintext compute output before padding; `events`
    /// are the application events of a successful execution.
    fn record_tx(
        state: &mut MockState,
        latency: u32,
        events: Vec<Event>,
        answer: Option<&str>,
        error: Option<Value>,
    ) -> TxHash {
        state.tx_counter += 1;
        state.height += 1;
        let hash = format!("{:064X}", state.tx_counter);

        let failure = state.fail_next.take();
        let (result, decoded, decrypt_fails) = match failure {
            Some(FailureMode::OutOfGas) => (
                RawTxResult {
                    txhash: hash.clone(),
                    height: state.height,
                    code: 11,
                    raw_log: "out of gas: locate: wasm contract section".to_string(),
                    logs: None,
                },
                DecodedTx {
                    txhash: hash.clone(),
                    output_data: String::new(),
                    output_logs: None,
                    output_error: None,
                },
                false,
            ),
            Some(FailureMode::NoLogs) => (
                RawTxResult {
                    txhash: hash.clone(),
                    height: state.height,
                    code: 0,
                    raw_log: "[]".to_string(),
                    logs: None,
                },
                DecodedTx {
                    txhash: hash.clone(),
                    output_data: String::new(),
                    output_logs: None,
                    output_error: None,
                },
                false,
            ),
            mode => {
                let (code, logs, output_logs) = if error.is_some() {
                    (3, None, None)
                } else {
                    (
                        0,
                        Some(vec![TxLog {
                            msg_index: 0,
                            log: String::new(),
                            events: events.clone(),
                        }]),
                        Some(events),
                    )
                };
                (
                    RawTxResult {
                        txhash: hash.clone(),
                        height: state.height,
                        code,
                        raw_log: if error.is_some() {
                            "failed to execute message".to_string()
                        } else {
                            "[]".to_string()
                        },
                        logs,
                    },
                    DecodedTx {
                        txhash: hash.clone(),
                        output_data: answer.map(pad_response).unwrap_or_default(),
                        output_logs,
                        output_error: error,
                    },
                    mode == Some(FailureMode::Decrypt),
                )
            }
        };

        state.txs.insert(
            hash.clone(),
            PendingTx {
                result,
                decoded,
                remaining_polls: latency,
                decrypt_fails,
            },
        );
        TxHash(hash)
    }

    fn message_event(contract: &str, action: &str) -> Event {
        Event {
            kind: "message".to_string(),
            attributes: vec![
                Attribute {
                    key: "action".to_string(),
                    value: action.to_string(),
                },
                Attribute {
                    key: "contract_address".to_string(),
                    value: contract.to_string(),
                },
            ],
        }
    }

    fn generic_err(msg: &str) -> Value {
        json!({ "generic_err": { "msg": msg } })
    }

    fn parse_funds(funds: Option<&str>) -> Result<u128> {
        let Some(funds) = funds else {
            bail!("deposit requires attached funds");
        };
        let amount = funds
            .strip_suffix(NATIVE_DENOM)
            .with_context(|| format!("funds '{funds}' missing the {NATIVE_DENOM} denom"))?;
        amount
            .parse()
            .with_context(|| format!("funds amount '{amount}' is not a decimal integer"))
    }

    fn parse_amount(amount: &str) -> Result<u128> {
        amount
            .parse()
            .with_context(|| format!("amount '{amount}' is not a decimal integer"))
    }

    fn execute_token(
        state: &mut MockState,
        latency: u32,
        contract: &str,
        msg: TokenExecuteMsg,
        sender: &str,
        funds: Option<&str>,
    ) -> Result<TxHash> {
        // Pre-read lockup routing info before taking a mutable token borrow
        let forward_target = if let TokenExecuteMsg::Send {
            recipient,
            msg: Some(_),
            ..
        } = &msg
        {
            match state.contracts.get(recipient).map(|c| &c.kind) {
                Some(ContractKind::Lockup(lockup)) => Some((
                    recipient.clone(),
                    lockup.reward_token.clone(),
                    lockup.inc_token.clone(),
                )),
                _ => {
                    let hash = Self::record_tx(
                        state,
                        latency,
                        vec![],
                        None,
                        Some(Self::generic_err("send recipient cannot receive messages")),
                    );
                    return Ok(hash);
                }
            }
        } else {
            None
        };

        let Some(ContractKind::Token(token)) =
            state.contracts.get_mut(contract).map(|c| &mut c.kind)
        else {
            bail!("{contract} is not a token contract");
        };

        let mut events = Vec::new();
        let mut error = None;
        let mut answer = String::new();
        let mut inner_effect: Option<(String, LockupReceiveMsg, u128)> = None;

        match msg {
            TokenExecuteMsg::Deposit { .. } => {
                let amount = Self::parse_funds(funds)?;
                *token.balances.entry(sender.to_string()).or_default() += amount;
                events.push(Self::message_event(contract, "deposit"));
                answer = r#"{"deposit":{"status":"success"}}"#.to_string();
            }
            TokenExecuteMsg::Redeem { amount, .. } => {
                let amount = Self::parse_amount(&amount)?;
                let balance = token.balances.entry(sender.to_string()).or_default();
                if *balance < amount {
                    error = Some(Self::generic_err("insufficient funds to redeem"));
                } else {
                    *balance -= amount;
                    events.push(Self::message_event(contract, "redeem"));
                    events.push(Event {
                        kind: "transfer".to_string(),
                        attributes: vec![
                            Attribute {
                                key: "recipient".to_string(),
                                value: sender.to_string(),
                            },
                            Attribute {
                                key: "amount".to_string(),
                                value: format!("{amount}{NATIVE_DENOM}"),
                            },
                        ],
                    });
                    answer = r#"{"redeem":{"status":"success"}}"#.to_string();
                }
            }
            TokenExecuteMsg::Send {
                recipient,
                amount,
                msg: inner,
            } => {
                let amount = Self::parse_amount(&amount)?;
                let balance = token.balances.entry(sender.to_string()).or_default();
                if *balance < amount {
                    error = Some(Self::generic_err("insufficient funds to send"));
                } else {
                    *balance -= amount;
                    *token.balances.entry(recipient.clone()).or_default() += amount;
                    events.push(Self::message_event(contract, "send"));
                    answer = r#"{"send":{"status":"success"}}"#.to_string();
                    if let Some(encoded) = inner {
                        match LockupReceiveMsg::from_base64(&encoded) {
                            Ok(receive) => {
                                inner_effect = Some((recipient, receive, amount));
                            }
                            Err(e) => {
                                error = Some(Self::generic_err(&e.to_string()));
                                answer.clear();
                            }
                        }
                    }
                }
            }
            TokenExecuteMsg::IncreaseAllowance { spender, amount } => {
                let amount = Self::parse_amount(&amount)?;
                let entry = token
                    .allowances
                    .entry(sender.to_string())
                    .or_default()
                    .entry(spender)
                    .or_default();
                *entry = entry.saturating_add(amount);
                events.push(Self::message_event(contract, "increase_allowance"));
                answer = r#"{"increase_allowance":{"status":"success"}}"#.to_string();
            }
            TokenExecuteMsg::DecreaseAllowance { spender, amount } => {
                let amount = Self::parse_amount(&amount)?;
                let entry = token
                    .allowances
                    .entry(sender.to_string())
                    .or_default()
                    .entry(spender)
                    .or_default();
                *entry = entry.saturating_sub(amount);
                events.push(Self::message_event(contract, "decrease_allowance"));
                answer = r#"{"decrease_allowance":{"status":"success"}}"#.to_string();
            }
            TokenExecuteMsg::SetViewingKey { key, .. } => {
                token.viewing_keys.insert(sender.to_string(), key);
                events.push(Self::message_event(contract, "set_viewing_key"));
                answer = r#"{"set_viewing_key":{"status":"success"}}"#.to_string();
            }
        }

        // Second phase of the send/receiver pattern: forward the inner
        // message to the recipient lockup.
        if error.is_none() {
            if let Some((lockup_addr, receive, amount)) = inner_effect {
                let Some((_, reward_token, inc_token)) = forward_target else {
                    bail!("{lockup_addr} routing info missing for inner send");
                };
                let Some(ContractKind::Lockup(lockup)) =
                    state.contracts.get_mut(&lockup_addr).map(|c| &mut c.kind)
                else {
                    bail!("{lockup_addr} vanished mid-execution");
                };
                match receive {
                    LockupReceiveMsg::AddToRewardPool {} => {
                        if contract == reward_token {
                            lockup.reward_pool += amount;
                        } else {
                            error = Some(Self::generic_err(
                                "reward deposits must come from the reward token",
                            ));
                        }
                    }
                    LockupReceiveMsg::LockTokens {} => {
                        if contract == inc_token {
                            *lockup.locked.entry(sender.to_string()).or_default() += amount;
                        } else {
                            error = Some(Self::generic_err(
                                "lockups must come from the incentivized token",
                            ));
                        }
                    }
                }
            }
        }

        if error.is_some() {
            Ok(Self::record_tx(state, latency, vec![], None, error))
        } else {
            Ok(Self::record_tx(state, latency, events, Some(&answer), None))
        }
    }

    fn execute_lockup(
        state: &mut MockState,
        latency: u32,
        contract: &str,
        msg: LockupExecuteMsg,
        sender: &str,
    ) -> Result<TxHash> {
        let Some(ContractKind::Lockup(lockup)) =
            state.contracts.get_mut(contract).map(|c| &mut c.kind)
        else {
            bail!("{contract} is not a lockup contract");
        };

        let (events, answer, error) = match msg {
            LockupExecuteMsg::SetViewingKey { key, .. } => {
                lockup.viewing_keys.insert(sender.to_string(), key);
                (
                    vec![Self::message_event(contract, "set_viewing_key")],
                    r#"{"set_viewing_key":{"status":"success"}}"#.to_string(),
                    None,
                )
            }
            LockupExecuteMsg::Redeem { amount } => {
                let locked = lockup.locked.entry(sender.to_string()).or_default();
                let amount = match amount {
                    Some(a) => Self::parse_amount(&a)?,
                    None => *locked,
                };
                if *locked < amount {
                    (
                        vec![],
                        String::new(),
                        Some(Self::generic_err("redeem exceeds locked amount")),
                    )
                } else {
                    *locked -= amount;
                    (
                        vec![Self::message_event(contract, "redeem")],
                        r#"{"redeem":{"status":"success"}}"#.to_string(),
                        None,
                    )
                }
            }
        };

        if error.is_some() {
            Ok(Self::record_tx(state, latency, vec![], None, error))
        } else {
            Ok(Self::record_tx(state, latency, events, Some(&answer), None))
        }
    }

    fn query_token(token: &TokenState, msg: TokenQueryMsg) -> Value {
        match msg {
            TokenQueryMsg::Balance { address, key } => {
                if token.key_matches(&address, &key) {
                    let amount = token.balances.get(&address).copied().unwrap_or_default();
                    json!({ "balance": { "amount": amount.to_string() } })
                } else {
                    json!({ "viewing_key_error": { "msg": WRONG_VIEWING_KEY } })
                }
            }
            TokenQueryMsg::Allowance {
                owner,
                spender,
                key,
            } => {
                if token.key_matches(&owner, &key) || token.key_matches(&spender, &key) {
                    let allowance = token
                        .allowances
                        .get(&owner)
                        .and_then(|per_spender| per_spender.get(&spender))
                        .copied()
                        .unwrap_or_default();
                    json!({
                        "allowance": {
                            "owner": owner,
                            "spender": spender,
                            "allowance": allowance.to_string(),
                        }
                    })
                } else {
                    json!({ "viewing_key_error": { "msg": WRONG_VIEWING_KEY } })
                }
            }
            TokenQueryMsg::TokenInfo {} => json!({
                "token_info": {
                    "name": token.name,
                    "symbol": token.symbol,
                    "decimals": token.decimals,
                    "total_supply": token.total_supply().to_string(),
                }
            }),
        }
    }

    fn query_lockup(lockup: &LockupState, msg: LockupQueryMsg) -> Value {
        match msg {
            LockupQueryMsg::QueryRewardPoolBalance {} => json!({
                "query_reward_pool_balance": { "balance": lockup.reward_pool.to_string() }
            }),
            LockupQueryMsg::QueryRewards {
                address,
                height,
                key,
            } => {
                if !lockup.key_matches(&address, &key) {
                    return json!({ "query_error": { "msg": WRONG_VIEWING_KEY } });
                }
                let height: u64 = height.parse().unwrap_or_default();
                let locked = lockup.locked.get(&address).copied().unwrap_or_default();
                // Single-locker vesting model: the whole pool has vested to
                // whoever holds a lock once the deadline height is reached.
                let rewards = if locked > 0 && height >= lockup.deadline {
                    lockup.reward_pool
                } else {
                    0
                };
                json!({ "query_rewards": { "rewards": rewards.to_string() } })
            }
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn store_code(&self, wasm_path: &Path, _sender: AccountId) -> Result<TxHash> {
        let mut state = self.state.lock();

        // An injected failure preempts the upload; no code id is consumed
        if state.fail_next.is_some() {
            return Ok(Self::record_tx(&mut state, self.latency, vec![], None, None));
        }

        let code_id = state.next_code_id;
        state.next_code_id += 1;
        state
            .codes
            .insert(code_id, wasm_path.to_string_lossy().into_owned());

        let events = vec![Event {
            kind: "message".to_string(),
            attributes: vec![
                Attribute {
                    key: "action".to_string(),
                    value: "store-code".to_string(),
                },
                Attribute {
                    key: "code_id".to_string(),
                    value: code_id.to_string(),
                },
            ],
        }];
        Ok(Self::record_tx(&mut state, self.latency, events, None, None))
    }

    async fn instantiate(
        &self,
        code_id: u64,
        init_msg: &Value,
        label: &str,
        sender: AccountId,
    ) -> Result<TxHash> {
        let mut state = self.state.lock();

        // An injected failure preempts instantiation: the label stays free
        // and no contract is registered
        if state.fail_next.is_some() {
            return Ok(Self::record_tx(&mut state, self.latency, vec![], None, None));
        }

        let source = state
            .codes
            .get(&code_id)
            .with_context(|| format!("code id {code_id} was never stored"))?
            .clone();
        if !state.labels.insert(label.to_string()) {
            bail!("label '{label}' is already in use");
        }

        let address = Self::contract_address(label);
        let code_hash = Self::code_hash_for(&source);

        let kind = if init_msg.get("reward_token").is_some() {
            let init: LockupInitMsg = serde_json::from_value(init_msg.clone())
                .context("init message does not parse as a lockup instantiation")?;
            // The lockup registers its configured key with both tokens so it
            // can run authenticated balance queries against them.
            for token_addr in [&init.reward_token.address, &init.inc_token.address] {
                if let Some(ContractKind::Token(token)) =
                    state.contracts.get_mut(token_addr).map(|c| &mut c.kind)
                {
                    token
                        .viewing_keys
                        .insert(address.clone(), init.viewing_key.clone());
                }
            }
            ContractKind::Lockup(LockupState {
                reward_token: init.reward_token.address,
                inc_token: init.inc_token.address,
                deadline: init.deadline.parse().unwrap_or(u64::MAX),
                reward_pool: 0,
                locked: HashMap::new(),
                viewing_keys: HashMap::new(),
            })
        } else {
            let init: TokenInitMsg = serde_json::from_value(init_msg.clone())
                .context("init message does not parse as a token instantiation")?;
            let mut balances = HashMap::new();
            for entry in &init.initial_balances {
                *balances.entry(entry.address.clone()).or_default() +=
                    Self::parse_amount(&entry.amount)?;
            }
            ContractKind::Token(TokenState {
                name: init.name,
                symbol: init.symbol,
                decimals: init.decimals,
                balances,
                allowances: HashMap::new(),
                viewing_keys: HashMap::new(),
            })
        };

        state.contracts.insert(
            address.clone(),
            ContractEntry {
                code_hash,
                kind,
            },
        );

        let events = vec![Event {
            kind: "message".to_string(),
            attributes: vec![
                Attribute {
                    key: "action".to_string(),
                    value: "instantiate".to_string(),
                },
                Attribute {
                    key: "signer".to_string(),
                    value: Self::account_address(sender),
                },
                Attribute {
                    key: "contract_address".to_string(),
                    value: address,
                },
            ],
        }];
        Ok(Self::record_tx(&mut state, self.latency, events, None, None))
    }

    async fn execute(
        &self,
        contract: &str,
        msg: &Value,
        sender: AccountId,
        funds: Option<&str>,
    ) -> Result<TxHash> {
        let mut state = self.state.lock();
        let sender_addr = Self::account_address(sender);

        // An injected failure preempts execution; no state transition happens
        if state.fail_next.is_some() {
            return Ok(Self::record_tx(&mut state, self.latency, vec![], None, None));
        }

        let kind_is_token = match state.contracts.get(contract).map(|c| &c.kind) {
            Some(ContractKind::Token(_)) => true,
            Some(ContractKind::Lockup(_)) => false,
            None => bail!("no contract deployed at {contract}"),
        };

        if kind_is_token {
            let msg: TokenExecuteMsg = serde_json::from_value(msg.clone())
                .context("message does not parse as a token execute")?;
            Self::execute_token(&mut state, self.latency, contract, msg, &sender_addr, funds)
        } else {
            let msg: LockupExecuteMsg = serde_json::from_value(msg.clone())
                .context("message does not parse as a lockup execute")?;
            Self::execute_lockup(&mut state, self.latency, contract, msg, &sender_addr)
        }
    }

    async fn query_tx(&self, hash: &TxHash) -> Result<Option<RawTxResult>> {
        let mut state = self.state.lock();
        let Some(pending) = state.txs.get_mut(&hash.0) else {
            return Ok(None);
        };
        if pending.remaining_polls > 0 {
            pending.remaining_polls -= 1;
            return Ok(None);
        }
        Ok(Some(pending.result.clone()))
    }

    async fn query_compute_tx(&self, hash: &TxHash) -> Result<DecodedTx> {
        let state = self.state.lock();
        let pending = state
            .txs
            .get(&hash.0)
            .with_context(|| format!("unknown transaction {hash}"))?;
        if pending.decrypt_fails {
            bail!("failed to decrypt transaction {hash}: no matching session key");
        }
        Ok(pending.decoded.clone())
    }

    async fn query(&self, contract: &str, msg: &Value) -> Result<Value> {
        let state = self.state.lock();
        let entry = state
            .contracts
            .get(contract)
            .with_context(|| format!("no contract deployed at {contract}"))?;

        match &entry.kind {
            ContractKind::Token(token) => {
                let msg: TokenQueryMsg = serde_json::from_value(msg.clone())
                    .context("message does not parse as a token query")?;
                Ok(Self::query_token(token, msg))
            }
            ContractKind::Lockup(lockup) => {
                let msg: LockupQueryMsg = serde_json::from_value(msg.clone())
                    .context("message does not parse as a lockup query")?;
                Ok(Self::query_lockup(lockup, msg))
            }
        }
    }

    async fn key_show(&self, id: AccountId) -> Result<String> {
        Ok(Self::account_address(id))
    }

    async fn contract_hash(&self, addr: &str) -> Result<String> {
        let state = self.state.lock();
        state
            .contracts
            .get(addr)
            .map(|c| c.code_hash.clone())
            .with_context(|| format!("no contract deployed at {addr}"))
    }
}
