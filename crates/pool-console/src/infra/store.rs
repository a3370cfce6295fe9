use {
    crate::domain::transaction::{Transaction, TransactionStore},
    alloy::primitives::Address,
    ethrpc::Receipt,
    std::sync::Mutex,
    tokio::sync::watch,
};

/// Process local [`TransactionStore`]. Every mutation bumps a revision that
/// subscribers can watch.
pub struct InMemoryTransactionStore {
    state: Mutex<State>,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    pending: Vec<Transaction>,
    confirmed: Vec<Transaction>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            state: Default::default(),
            revision: watch::Sender::new(0),
        }
    }

    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Records a transaction that is about to be submitted and returns its id.
    pub fn begin(&self, account: Address, summary: impl Into<String>) -> u64 {
        let id = self.with_state(|state| {
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push(Transaction {
                id,
                account,
                summary: summary.into(),
                receipts: Vec::new(),
            });
            id
        });
        tracing::trace!(id, ?account, "transaction pending");
        id
    }

    /// Moves a pending transaction to the confirmed list.
    pub fn confirm(&self, id: u64, receipts: Vec<Receipt>) {
        self.with_state(|state| {
            if let Some(mut transaction) = take(&mut state.pending, id) {
                transaction.receipts = receipts;
                state.confirmed.push(transaction);
            }
        });
    }

    /// Forgets a pending transaction that did not go through.
    pub fn abandon(&self, id: u64) {
        self.with_state(|state| {
            take(&mut state.pending, id);
        });
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let result = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut state)
        };
        self.revision.send_modify(|revision| *revision += 1);
        result
    }

    fn filtered(
        &self,
        account: Address,
        list: impl Fn(&State) -> &Vec<Transaction>,
    ) -> Vec<Transaction> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        list(&state)
            .iter()
            .filter(|transaction| transaction.account == account)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn pending_transactions(&self, account: Address) -> Vec<Transaction> {
        self.filtered(account, |state| &state.pending)
    }

    fn confirmed_transactions(&self, account: Address) -> Vec<Transaction> {
        self.filtered(account, |state| &state.confirmed)
    }
}

fn take(transactions: &mut Vec<Transaction>, id: u64) -> Option<Transaction> {
    let index = transactions.iter().position(|transaction| transaction.id == id)?;
    Some(transactions.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    #[test]
    fn tracks_pending_and_confirmed_per_account() {
        let store = InMemoryTransactionStore::new();
        let bind = store.begin(ALICE, "bind");
        let swap = store.begin(ALICE, "swap");
        store.begin(BOB, "bind");

        assert_eq!(store.pending_transactions(ALICE).len(), 2);
        assert_eq!(store.pending_transactions(BOB).len(), 1);

        store.confirm(bind, vec![Receipt::default(), Receipt::default()]);
        store.abandon(swap);

        assert!(store.pending_transactions(ALICE).is_empty());
        let confirmed = store.confirmed_transactions(ALICE);
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].summary, "bind");
        assert_eq!(confirmed[0].receipts.len(), 2);
        assert!(store.confirmed_transactions(BOB).is_empty());
    }

    #[test]
    fn mutations_bump_revision() {
        let store = InMemoryTransactionStore::new();
        let revisions = store.revisions();
        let id = store.begin(ALICE, "bind");
        store.confirm(id, vec![]);
        assert_eq!(*revisions.borrow(), 2);
    }
}
