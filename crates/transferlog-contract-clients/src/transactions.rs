use crate::common::tx_submitter::{TransactionSubmitter, confirm};
use alloy::{
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{PendingTransactionBuilder, Provider},
    sol,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;
use transferlog_provider::{PendingConfirmation, RawTransfer, TransactionsContract};

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract Transactions {
        struct TransferStruct {
            address sender;
            address receiver;
            uint amount;
            string message;
            uint256 timestamp;
            string keyword;
        }

        event Transfer(address from, address receiver, uint amount, string message, uint256 timestamp, string keyword);

        function addToBlockChain(address payable receiver, uint amount, string memory message, string memory keyword) public;
        function getAllTransactions() public view returns (TransferStruct[] memory);
        function getTransactionCount() public view returns (uint256);
    }
}

pub use Transactions::TransferStruct;
use Transactions::TransactionsInstance;

/// Client for the `Transactions` log contract.
///
/// `addToBlockChain` goes through the sending provider, view calls through
/// the reader, which is the same provider unless [`Self::with_reader`] is used.
#[derive(Clone)]
pub struct TransactionsClient<P: Provider + Clone> {
    contract: TransactionsInstance<P>,
    reader: TransactionsInstance<P>,
    submitter: TransactionSubmitter,
}

impl<P: Provider + Clone> TransactionsClient<P> {
    pub fn new(provider: P, contract_address: Address, tx_lock: Arc<Mutex<()>>) -> Self {
        let reader = TransactionsInstance::new(contract_address, provider.clone());
        let contract = TransactionsInstance::new(contract_address, provider);
        let submitter = TransactionSubmitter::new(tx_lock);
        Self {
            contract,
            reader,
            submitter,
        }
    }

    /// Route view calls to `provider` instead of the sending provider.
    pub fn with_reader(mut self, provider: P) -> Self {
        self.reader = TransactionsInstance::new(self.address(), provider);
        self
    }

    /// Use a fixed gas limit for `addToBlockChain` instead of estimating it.
    pub fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.submitter = self.submitter.with_gas_limit(gas_limit);
        self
    }

    /// Get the contract address
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    // ------------------------------------------------------------------------
    // View Functions
    // ------------------------------------------------------------------------

    pub async fn get_transaction_count(&self) -> Result<U256> {
        Ok(self.reader.getTransactionCount().call().await?)
    }

    pub async fn get_all_transactions(&self) -> Result<Vec<TransferStruct>> {
        Ok(self.reader.getAllTransactions().call().await?)
    }

    // ------------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------------

    /// Send `addToBlockChain` from `from` without waiting for it to be mined.
    pub async fn add_to_blockchain(
        &self,
        from: Address,
        receiver: Address,
        amount: U256,
        message: String,
        keyword: String,
    ) -> Result<PendingLog> {
        let call = self
            .contract
            .addToBlockChain(receiver, amount, message, keyword)
            .from(from);
        let inner = self.submitter.submit("addToBlockChain", call).await?;
        Ok(PendingLog { inner })
    }
}

/// An `addToBlockChain` transaction that has been sent but not mined.
pub struct PendingLog {
    inner: PendingTransactionBuilder<Ethereum>,
}

impl PendingConfirmation for PendingLog {
    fn hash(&self) -> B256 {
        *self.inner.tx_hash()
    }

    fn wait(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            confirm("addToBlockChain", self.inner).await?;
            Ok(())
        })
    }
}

impl From<TransferStruct> for RawTransfer {
    fn from(row: TransferStruct) -> Self {
        RawTransfer {
            sender: row.sender,
            receiver: row.receiver,
            amount: row.amount,
            message: row.message,
            timestamp: row.timestamp,
            keyword: row.keyword,
        }
    }
}

#[async_trait]
impl<P> TransactionsContract for TransactionsClient<P>
where
    P: Provider + Clone + 'static,
{
    async fn add_to_blockchain(
        &self,
        from: Address,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<Box<dyn PendingConfirmation>> {
        let receiver: Address = receiver
            .parse()
            .with_context(|| format!("invalid recipient address {receiver:?}"))?;
        let pending = TransactionsClient::add_to_blockchain(
            self,
            from,
            receiver,
            amount,
            message.to_string(),
            keyword.to_string(),
        )
        .await?;
        Ok(Box::new(pending))
    }

    async fn transaction_count(&self) -> Result<U256> {
        self.get_transaction_count().await
    }

    async fn all_transactions(&self) -> Result<Vec<RawTransfer>> {
        let rows = self.get_all_transactions().await?;
        Ok(rows.into_iter().map(RawTransfer::from).collect())
    }
}
