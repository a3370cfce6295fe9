pub mod cli;
pub mod locks;
pub mod operator;
pub mod pool;
pub mod store;

pub use {locks::PairLocks, operator::Operator, pool::Pool, store::InMemoryTransactionStore};
