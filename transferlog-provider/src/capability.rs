//! The external collaborators the provider talks to.
//!
//! Each one is injected as a trait object so the provider can run against a
//! JSON-RPC wallet, a local signer, or in-memory doubles in tests.

use crate::record::RawTransfer;
use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::warn;

/// A native value transfer handed to the wallet (`eth_sendTransaction`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTransfer {
    pub from: Address,
    /// Recipient exactly as entered; the wallet decides whether it is valid.
    pub to: String,
    pub gas: u64,
    /// Amount in wei.
    pub value: U256,
}

/// User-controlled wallet holding the keys.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Accounts already authorized for this session (`eth_accounts`).
    /// Never prompts the user.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    /// May suspend until the user answers.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Submit a native value transfer and return its hash once accepted.
    async fn send_transaction(&self, transfer: ValueTransfer) -> Result<B256>;
}

/// A submitted transaction that has not been confirmed yet.
pub trait PendingConfirmation: Send {
    fn hash(&self) -> B256;

    /// Resolve once the transaction is mined successfully.
    fn wait(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// The pre-deployed `Transactions` contract.
#[async_trait]
pub trait TransactionsContract: Send + Sync {
    /// Call `addToBlockChain(receiver, amount, message, keyword)` from `from`.
    async fn add_to_blockchain(
        &self,
        from: Address,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<Box<dyn PendingConfirmation>>;

    /// `getTransactionCount()`
    async fn transaction_count(&self) -> Result<U256>;

    /// `getAllTransactions()`
    async fn all_transactions(&self) -> Result<Vec<RawTransfer>>;
}

/// Blocking notice shown to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only writes the notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(notice = message, "User notice");
    }
}
