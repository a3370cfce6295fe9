//! Node access for the pool console.
//!
//! [`Web3`] is the provider handle: an HTTP JSON-RPC connection plus the
//! local account that signs every transaction. Consumers depend on the
//! [`Blockchain`] trait so that they can be exercised against a mock.

use {
    alloy::{
        network::{EthereumWallet, TransactionBuilder},
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder},
        rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest},
        signers::local::PrivateKeySigner,
        transports::TransportError,
    },
    serde::{Deserialize, Serialize},
    std::{future::Future, time::Duration},
    url::Url,
};

/// The subset of node functionality the console needs.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait Blockchain: Send + Sync {
    /// Default account that signs transactions submitted with [`Self::send`].
    fn account(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, Error>;

    /// Executes a read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, Error>;

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, Error>;

    /// Signs and submits a transaction from the default account and waits for
    /// its inclusion. A reverted transaction is an error.
    async fn send(&self, to: Address, input: Bytes) -> Result<Receipt, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("waiting for transaction failed: {0}")]
    PendingTransaction(#[from] PendingTransactionError),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("node did not respond within {0:?}")]
    Timeout(Duration),
}

/// Summary of an included, successful transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

impl TryFrom<TransactionReceipt> for Receipt {
    type Error = Error;

    fn try_from(receipt: TransactionReceipt) -> Result<Self, Self::Error> {
        if !receipt.status() {
            return Err(Error::Reverted(receipt.transaction_hash));
        }
        Ok(Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}

/// HTTP provider with a local signer. Every request is bounded by `timeout`.
#[derive(Clone)]
pub struct Web3 {
    provider: DynProvider,
    account: Address,
    timeout: Duration,
}

impl Web3 {
    pub fn new(url: Url, signer: PrivateKeySigner, timeout: Duration) -> Self {
        let account = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Self {
            provider,
            account,
            timeout,
        }
    }

    async fn timed<T, E>(&self, request: impl Future<Output = Result<T, E>>) -> Result<T, Error>
    where
        Error: From<E>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl Blockchain for Web3 {
    fn account(&self) -> Address {
        self.account
    }

    async fn chain_id(&self) -> Result<u64, Error> {
        self.timed(async { self.provider.get_chain_id().await })
            .await
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, Error> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input);
        self.timed(async { self.provider.call(tx).await }).await
    }

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, Error> {
        self.timed(async { self.provider.get_logs(&filter).await })
            .await
    }

    async fn send(&self, to: Address, input: Bytes) -> Result<Receipt, Error> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input);
        let receipt = self
            .timed(async {
                let pending = self.provider.send_transaction(tx).await?;
                tracing::debug!(tx = ?pending.tx_hash(), ?to, "submitted transaction");
                pending.get_receipt().await.map_err(Error::from)
            })
            .await?;
        tracing::debug!(
            tx = ?receipt.transaction_hash,
            block = ?receipt.block_number,
            status = receipt.status(),
            "transaction included"
        );
        receipt.try_into()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::B256};

    fn web3(timeout: Duration) -> Web3 {
        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(0x01)).unwrap();
        Web3::new("http://localhost:8545".parse().unwrap(), signer, timeout)
    }

    #[test]
    fn account_is_signer_address() {
        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(0x01)).unwrap();
        let expected = signer.address();
        assert_eq!(web3(Duration::from_secs(1)).account(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_time_out() {
        let web3 = web3(Duration::from_secs(5));
        let result = web3
            .timed(std::future::pending::<Result<(), Error>>())
            .await;
        assert!(matches!(result, Err(Error::Timeout(timeout)) if timeout == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_requests_pass_through() {
        let web3 = web3(Duration::from_secs(5));
        let result = web3.timed(async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn receipt_serializes_camel_case() {
        let receipt = Receipt {
            transaction_hash: TxHash::repeat_byte(0xab),
            block_number: Some(7),
            gas_used: 21_000,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["blockNumber"], 7);
        assert_eq!(json["gasUsed"], 21_000);
        assert_eq!(
            json["transactionHash"],
            format!("0x{}", "ab".repeat(32)),
        );
    }
}
