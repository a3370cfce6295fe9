//! Pool and token state as read from the chain, and the payloads of the write
//! operations.

use {
    alloy::primitives::{Address, U256},
    ethrpc::Receipt,
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, serde_as},
    std::collections::BTreeMap,
};

/// Snapshot of the pool's global parameters.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub manager: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub fee: U256,
    #[serde_as(as = "DisplayFromStr")]
    pub num_tokens: U256,
    pub is_paused: bool,
}

#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub balance: U256,
    #[serde_as(as = "DisplayFromStr")]
    pub weight: U256,
}

pub type TokenRecords = BTreeMap<Address, TokenRecord>;

/// A `bind` or `setParams` call recovered from the pool's call log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoggedCall {
    pub block_number: u64,
    pub log_index: u64,
    pub token: Address,
    pub balance: U256,
    pub weight: U256,
}

impl LoggedCall {
    fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Replays logged calls in chain order. For every token the call with the
/// highest `(block number, log index)` determines its record.
pub fn fold(calls: impl IntoIterator<Item = LoggedCall>) -> TokenRecords {
    let mut calls = calls.into_iter().collect::<Vec<_>>();
    calls.sort_by_key(LoggedCall::position);
    calls
        .into_iter()
        .map(|call| {
            (
                call.token,
                TokenRecord {
                    balance: call.balance,
                    weight: call.weight,
                },
            )
        })
        .collect()
}

/// Arguments of `swap_ExactAmountIn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Swap {
    pub token_in: Address,
    pub amount_in: U256,
    pub token_out: Address,
    pub min_amount_out: U256,
    pub max_price: U256,
}

/// Receipts of a completed approve + pool call pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipts {
    pub contract_address: Address,
    pub approve_tx: Receipt,
    /// Receipt of the pool method call. Consumers read it under `bindTx` for
    /// every write operation.
    #[serde(rename = "bindTx")]
    pub action_tx: Receipt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub contract_address: Address,
    pub error: String,
    pub progress: Progress,
}

/// How far a write operation got before it failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum Progress {
    /// The approval did not succeed. It may still have been broadcast, e.g.
    /// when it was mined and reverted or timed out waiting for inclusion.
    NoStepCompleted,
    AfterSteps {
        completed: usize,
        total: usize,
        receipts: Vec<Receipt>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFailure {
    pub contract_address: Address,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::btreemap, serde_json::json};

    fn call(block_number: u64, log_index: u64, token: u8, balance: u64, weight: u64) -> LoggedCall {
        LoggedCall {
            block_number,
            log_index,
            token: Address::repeat_byte(token),
            balance: U256::from(balance),
            weight: U256::from(weight),
        }
    }

    fn record(balance: u64, weight: u64) -> TokenRecord {
        TokenRecord {
            balance: U256::from(balance),
            weight: U256::from(weight),
        }
    }

    #[test]
    fn latest_call_wins() {
        let records = fold([
            call(12, 0, 1, 300, 3),
            call(10, 4, 1, 100, 1),
            call(12, 1, 2, 50, 5),
            call(11, 0, 1, 200, 2),
        ]);
        assert_eq!(
            records,
            btreemap! {
                Address::repeat_byte(1) => record(300, 3),
                Address::repeat_byte(2) => record(50, 5),
            }
        );
    }

    #[test]
    fn log_index_breaks_ties_within_block() {
        let records = fold([call(7, 3, 1, 30, 3), call(7, 1, 1, 10, 1), call(7, 2, 1, 20, 2)]);
        assert_eq!(records[&Address::repeat_byte(1)], record(30, 3));
    }

    #[test]
    fn no_calls_no_tokens() {
        assert!(fold([]).is_empty());
    }

    #[test]
    fn params_serialize_as_decimal_strings() {
        let params = Params {
            manager: Address::repeat_byte(0xaa),
            fee: U256::from(10).pow(U256::from(15)),
            num_tokens: U256::from(3),
            is_paused: false,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["fee"], "1000000000000000");
        assert_eq!(json["numTokens"], "3");
        assert_eq!(json["isPaused"], false);
    }

    #[test]
    fn progress_is_tagged() {
        assert_eq!(
            serde_json::to_value(Progress::NoStepCompleted).unwrap(),
            json!({"stage": "noStepCompleted"}),
        );
        let after = serde_json::to_value(Progress::AfterSteps {
            completed: 1,
            total: 2,
            receipts: vec![Receipt::default()],
        })
        .unwrap();
        assert_eq!(after["stage"], "afterSteps");
        assert_eq!(after["completed"], 1);
        assert_eq!(after["total"], 2);
        assert_eq!(after["receipts"].as_array().unwrap().len(), 1);
    }
}
