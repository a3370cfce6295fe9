use {
    alloy::primitives::Address,
    ethrpc::Receipt,
    serde::{Deserialize, Serialize},
};

/// A write operation submitted on behalf of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub account: Address,
    pub summary: String,
    /// Receipts of the transactions that were included so far.
    pub receipts: Vec<Receipt>,
}

/// Tracks the transactions an account has in flight and those that already
/// went through.
#[cfg_attr(test, mockall::automock)]
pub trait TransactionStore: Send + Sync {
    fn pending_transactions(&self, account: Address) -> Vec<Transaction>;
    fn confirmed_transactions(&self, account: Address) -> Vec<Transaction>;
}
