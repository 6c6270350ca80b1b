//! Typed contract messages.
//!
//! Every message the harness exchanges with the token and lockup contracts
//! is built through these tagged unions and serialized once, at the ledger
//! adapter boundary. Amounts travel as decimal strings, matching the
//! contracts' `Uint128` JSON encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Reference to a deployed SNIP-20-like token: address plus code hash
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Snip20Ref {
    pub address: String,
    pub contract_hash: String,
}

/// Genesis balance entry for a token instantiation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitialBalance {
    pub address: String,
    pub amount: String,
}

/// Token instantiation message
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenInitMsg {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_balances: Vec<InitialBalance>,
    pub prng_seed: String,
    pub config: TokenInitConfig,
}

/// Token feature flags set at instantiation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenInitConfig {
    pub public_total_supply: bool,
    pub enable_deposit: bool,
    pub enable_redeem: bool,
}

/// Lockup instantiation message
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LockupInitMsg {
    pub reward_token: Snip20Ref,
    pub inc_token: Snip20Ref,
    /// Height after which the whole pool has vested, as a decimal string
    pub deadline: String,
    pub pool_claim_block: String,
    /// Key the lockup registers with both tokens for its own balance queries
    pub viewing_key: String,
    pub prng_seed: String,
}

/// Execute messages understood by the token contracts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenExecuteMsg {
    Deposit {
        #[serde(skip_serializing_if = "Option::is_none")]
        padding: Option<String>,
    },
    Redeem {
        amount: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        padding: Option<String>,
    },
    Send {
        recipient: String,
        amount: String,
        /// Base64 of the inner message forwarded to the recipient
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    IncreaseAllowance {
        spender: String,
        amount: String,
    },
    DecreaseAllowance {
        spender: String,
        amount: String,
    },
    SetViewingKey {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        padding: Option<String>,
    },
}

impl TokenExecuteMsg {
    /// Build the two-phase send: the inner message is base64-embedded in the
    /// outer `send` and forwarded by the token to `recipient` after the
    /// transfer.
    pub fn send_to(
        recipient: &str,
        amount: &str,
        inner: &LockupReceiveMsg,
    ) -> Result<Self, serde_json::Error> {
        let encoded = BASE64.encode(serde_json::to_vec(inner)?);
        Ok(TokenExecuteMsg::Send {
            recipient: recipient.to_string(),
            amount: amount.to_string(),
            msg: Some(encoded),
        })
    }
}

/// Inner messages the lockup accepts through the send/receiver pattern
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockupReceiveMsg {
    LockTokens {},
    AddToRewardPool {},
}

impl LockupReceiveMsg {
    /// Decode an inner message from the base64 `msg` field of a `send`
    pub fn from_base64(encoded: &str) -> Result<Self, InnerMsgError> {
        let bytes = BASE64.decode(encoded)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Failures decoding the embedded inner message of a `send`
#[derive(thiserror::Error, Debug)]
pub enum InnerMsgError {
    #[error("inner message is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("inner message is not a known receive message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Execute messages sent directly to the lockup contract
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockupExecuteMsg {
    Redeem {
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<String>,
    },
    SetViewingKey {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        padding: Option<String>,
    },
}

/// Token queries; `balance` and `allowance` are viewing-key authenticated
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenQueryMsg {
    Balance {
        address: String,
        key: String,
    },
    Allowance {
        owner: String,
        spender: String,
        key: String,
    },
    TokenInfo {},
}

/// Lockup queries; `query_rewards` is viewing-key authenticated
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockupQueryMsg {
    QueryRewards {
        address: String,
        height: String,
        key: String,
    },
    QueryRewardPoolBalance {},
}

/// Token query responses, echoing the request's top-level key
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenQueryAnswer {
    Balance {
        amount: String,
    },
    Allowance {
        owner: String,
        spender: String,
        allowance: String,
    },
    TokenInfo {
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: Option<String>,
    },
    ViewingKeyError {
        msg: String,
    },
}

/// Lockup query responses, echoing the request's top-level key
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockupQueryAnswer {
    QueryRewards { rewards: String },
    QueryRewardPoolBalance { balance: String },
    QueryError { msg: String },
}

/// The error object contracts return in place of an answer
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GenericErr {
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execute_msgs_serialize_snake_case_tagged() {
        let msg = TokenExecuteMsg::Deposit { padding: None };
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"deposit": {}}));

        let msg = TokenExecuteMsg::IncreaseAllowance {
            spender: "secret1bbb".to_string(),
            amount: "50".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"increase_allowance": {"spender": "secret1bbb", "amount": "50"}})
        );
    }

    #[test]
    fn send_embeds_base64_inner_msg() {
        let msg =
            TokenExecuteMsg::send_to("secret1lockup", "500000000000", &LockupReceiveMsg::AddToRewardPool {})
                .unwrap();

        let TokenExecuteMsg::Send {
            recipient,
            amount,
            msg: Some(encoded),
        } = &msg
        else {
            panic!("send_to must build a Send variant");
        };
        assert_eq!(recipient, "secret1lockup");
        assert_eq!(amount, "500000000000");

        // The inner payload round-trips through the receiver decode path
        let inner = LockupReceiveMsg::from_base64(encoded).unwrap();
        assert_eq!(inner, LockupReceiveMsg::AddToRewardPool {});
    }

    #[test]
    fn inner_msg_rejects_garbage() {
        assert!(matches!(
            LockupReceiveMsg::from_base64("not-base64!"),
            Err(InnerMsgError::Base64(_))
        ));
        let bogus = BASE64.encode(b"{\"unknown\":{}}");
        assert!(matches!(
            LockupReceiveMsg::from_base64(&bogus),
            Err(InnerMsgError::Json(_))
        ));
    }

    #[test]
    fn query_answers_parse_from_response_json() {
        let answer: TokenQueryAnswer =
            serde_json::from_value(json!({"balance": {"amount": "500000000000"}})).unwrap();
        assert_eq!(
            answer,
            TokenQueryAnswer::Balance {
                amount: "500000000000".to_string()
            }
        );

        let answer: LockupQueryAnswer =
            serde_json::from_value(json!({"query_reward_pool_balance": {"balance": "0"}})).unwrap();
        assert_eq!(
            answer,
            LockupQueryAnswer::QueryRewardPoolBalance {
                balance: "0".to_string()
            }
        );
    }
}
