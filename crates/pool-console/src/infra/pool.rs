//! Reads and writes against a deployed Balancer pool.
//!
//! Every operation is an independent request through the [`Blockchain`]
//! handle the caller provides. Nothing is cached between calls and nothing is
//! retried.

use {
    crate::domain::{
        Envelope,
        pool::{
            self as records,
            LoggedCall,
            Params,
            Progress,
            ReadFailure,
            Swap,
            TokenRecords,
            WriteFailure,
            WriteReceipts,
        },
    },
    alloy::{
        eips::BlockNumberOrTag,
        primitives::{Address, Bytes, U256},
        rpc::types::{Filter, Log},
        sol_types::{SolCall, SolEvent},
    },
    contracts::{BPool, TestToken},
    ethrpc::Blockchain,
    std::sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] ethrpc::Error),
    #[error("failed to decode contract data: {0}")]
    Decode(#[from] alloy::sol_types::Error),
    #[error("log is missing its block number or log index")]
    MissingLogPosition,
}

/// Pool methods whose calls are replayed from the `LOG_CALL` stream.
#[derive(Clone, Copy, Debug)]
enum LoggedMethod {
    Bind,
    SetParams,
}

impl LoggedMethod {
    fn selector(self) -> [u8; 4] {
        match self {
            Self::Bind => BPool::bindCall::SELECTOR,
            Self::SetParams => BPool::setParamsCall::SELECTOR,
        }
    }

    fn decode(self, log: &Log) -> Result<LoggedCall, Error> {
        let (Some(block_number), Some(log_index)) = (log.block_number, log.log_index) else {
            return Err(Error::MissingLogPosition);
        };
        let event = BPool::LOG_CALL::decode_log_data(log.data())?;
        let (token, balance, weight) = match self {
            Self::Bind => {
                let call = BPool::bindCall::abi_decode(&event.data)?;
                (call.token, call.balance, call.weight)
            }
            Self::SetParams => {
                let call = BPool::setParamsCall::abi_decode(&event.data)?;
                (call.token, call.balance, call.weight)
            }
        };
        Ok(LoggedCall {
            block_number,
            log_index,
            token,
            balance,
            weight,
        })
    }
}

pub struct Pool {
    chain: Arc<dyn Blockchain>,
}

impl Pool {
    pub fn new(chain: Arc<dyn Blockchain>) -> Self {
        Self { chain }
    }

    /// Reads the pool's manager, fee, token count and pause flag. Errors are
    /// returned as is; there are no partial results.
    pub async fn params(&self, pool: Address) -> Result<Envelope<Params, ReadFailure>, Error> {
        tracing::debug!(?pool, "reading pool parameters");
        let (manager, fee, num_tokens, is_paused) = futures::try_join!(
            self.call(pool, BPool::getManagerCall {}),
            self.call(pool, BPool::getFeeCall {}),
            self.call(pool, BPool::getNumTokensCall {}),
            self.call(pool, BPool::isPausedCall {}),
        )?;
        Ok(Envelope::success(Params {
            manager,
            fee,
            num_tokens,
            is_paused,
        }))
    }

    /// Rebuilds the balance and weight of every token ever bound to the pool
    /// from its call log. Balances are then replaced by the tokens' live
    /// `balanceOf(pool)`, all of which have completed when this returns.
    pub async fn token_params(&self, pool: Address) -> Envelope<TokenRecords, ReadFailure> {
        match self.reconstruct(pool).await {
            Ok(records) => {
                tracing::debug!(?pool, tokens = records.len(), "reconstructed token parameters");
                Envelope::success(records)
            }
            Err(err) => {
                tracing::warn!(?pool, ?err, "failed to reconstruct token parameters");
                Envelope::failure(ReadFailure {
                    contract_address: pool,
                    error: err.to_string(),
                })
            }
        }
    }

    pub async fn bind(
        &self,
        pool: Address,
        token: Address,
        balance: U256,
        weight: U256,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        let call = BPool::bindCall {
            token,
            balance,
            weight,
        };
        self.approve_and_call(
            pool,
            token,
            balance,
            call.abi_encode(),
            "bind",
            Envelope::failure,
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
        let call = BPool::setParamsCall {
            token,
            balance,
            weight,
        };
        self.approve_and_call(
            pool,
            token,
            balance,
            call.abi_encode(),
            "setParams",
            Envelope::failure_in_data,
        )
        .await
    }

    pub async fn swap_exact_amount_in(
        &self,
        pool: Address,
        swap: Swap,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        let call = BPool::swap_ExactAmountInCall {
            tokenIn: swap.token_in,
            amountIn: swap.amount_in,
            tokenOut: swap.token_out,
            minAmountOut: swap.min_amount_out,
            maxPrice: swap.max_price,
        };
        self.approve_and_call(
            pool,
            swap.token_in,
            swap.amount_in,
            call.abi_encode(),
            "swap_ExactAmountIn",
            Envelope::failure_in_data,
        )
        .await
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, Error> {
        let output = self.chain.call(to, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&output)?)
    }

    async fn reconstruct(&self, pool: Address) -> Result<TokenRecords, Error> {
        let (binds, set_params) = futures::try_join!(
            self.logged_calls(pool, LoggedMethod::Bind),
            self.logged_calls(pool, LoggedMethod::SetParams),
        )?;
        let mut tokens = records::fold(binds.into_iter().chain(set_params));

        let balances = futures::future::try_join_all(
            tokens
                .keys()
                .map(|&token| self.call(token, TestToken::balanceOfCall { account: pool })),
        )
        .await?;
        for (record, balance) in tokens.values_mut().zip(balances) {
            record.balance = balance;
        }
        Ok(tokens)
    }

    async fn logged_calls(
        &self,
        pool: Address,
        method: LoggedMethod,
    ) -> Result<Vec<LoggedCall>, Error> {
        let filter = Filter::new()
            .address(pool)
            .event_signature(contracts::log_call_topic(method.selector()))
            .from_block(0u64)
            .to_block(BlockNumberOrTag::Latest);
        let logs = self.chain.logs(filter).await?;
        tracing::debug!(?pool, ?method, logs = logs.len(), "fetched call logs");
        logs.iter().map(|log| method.decode(log)).collect()
    }

    /// Approves the pool to move exactly `amount` of `token`, then submits the
    /// pool call. The pool call is only sent once the approval is included.
    /// `report` wraps the failure payload; `bind` reports it under `error`,
    /// the other writes under `data`.
    async fn approve_and_call(
        &self,
        pool: Address,
        token: Address,
        amount: U256,
        input: Vec<u8>,
        method: &'static str,
        report: fn(WriteFailure) -> Envelope<WriteReceipts, WriteFailure>,
    ) -> Envelope<WriteReceipts, WriteFailure> {
        let failure = |err: ethrpc::Error, progress: Progress| -> Envelope<WriteReceipts, WriteFailure> {
            tracing::warn!(?pool, ?token, method, ?err, ?progress, "write failed");
            report(WriteFailure {
                contract_address: pool,
                error: err.to_string(),
                progress,
            })
        };

        let approve = TestToken::approveCall {
            spender: pool,
            amount,
        };
        tracing::debug!(?pool, ?token, %amount, "approving pool");
        let approve_tx = match self.chain.send(token, approve.abi_encode().into()).await {
            Ok(receipt) => receipt,
            Err(err) => return failure(err, Progress::NoStepCompleted),
        };

        tracing::debug!(?pool, ?token, method, "calling pool");
        let action_tx = match self.chain.send(pool, Bytes::from(input)).await {
            Ok(receipt) => receipt,
            Err(err) => {
                return failure(
                    err,
                    Progress::AfterSteps {
                        completed: 1,
                        total: 2,
                        receipts: vec![approve_tx],
                    },
                );
            }
        };

        Envelope::success(WriteReceipts {
            contract_address: pool,
            approve_tx,
            action_tx,
        })
    }
}
