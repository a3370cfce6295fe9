use {
    super::{locks::PairLocks, pool::Pool, store::InMemoryTransactionStore},
    crate::domain::{
        Envelope,
        pool::{Swap, WriteFailure, WriteReceipts},
    },
    alloy::primitives::{Address, U256},
    std::{future::Future, sync::Arc},
};

/// Submits pool writes on behalf of one account. Writes to the same
/// `(pool, token)` pair are serialized and every write is tracked in the
/// transaction store while in flight.
pub struct Operator {
    pool: Pool,
    store: Arc<InMemoryTransactionStore>,
    locks: PairLocks,
    account: Address,
}

impl Operator {
    pub fn new(
        pool: Pool,
        store: Arc<InMemoryTransactionStore>,
        locks: PairLocks,
        account: Address,
    ) -> Self {
        Self {
            pool,
            store,
            locks,
            account,
        }
    }

    pub async fn bind(
        &self,
        pool: Address,
        token: Address,
        balance: U256,
        weight: U256,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        self.tracked(
            pool,
            token,
            format!("bind {token} to {pool}"),
            self.pool.bind(pool, token, balance, weight),
        )
        .await
    }

    pub async fn set_params(
        &self,
        pool: Address,
        token: Address,
        balance: U256,
        weight: U256,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        self.tracked(
            pool,
            token,
            format!("set params of {token} in {pool}"),
            self.pool.set_params(pool, token, balance, weight),
        )
        .await
    }

    pub async fn swap_exact_amount_in(
        &self,
        pool: Address,
        swap: Swap,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        self.tracked(
            pool,
            swap.token_in,
            format!("swap {} for {} in {pool}", swap.token_in, swap.token_out),
            self.pool.swap_exact_amount_in(pool, swap),
        )
        .await
    }

    async fn tracked(
        &self,
        pool: Address,
        token: Address,
        summary: String,
        write: impl Future<Output = Envelope<WriteReceipts, WriteFailure>>,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        let _guard = self.locks.lock(pool, token).await;
        let id = self.store.begin(self.account, summary);
        let envelope = write.await;
        match &envelope {
            Envelope::Success { data } => self
                .store
                .confirm(id, vec![data.approve_tx.clone(), data.action_tx.clone()]),
            Envelope::Failure(_) => self.store.abandon(id),
        }
        envelope
    }
}
