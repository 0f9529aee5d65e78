use crate::amount::parse_amount;
use crate::capability::{
    Notifier, PendingConfirmation, TransactionsContract, ValueTransfer, WalletExtension,
};
use crate::error::ProviderError;
use crate::form::{FormData, FormField};
use crate::record::TransactionRecord;
use crate::storage::{CountStore, TRANSACTION_COUNT_KEY};
use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Gas allowance for the native value transfer (`0x5208`).
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

pub const INSTALL_WALLET_NOTICE: &str = "Please install a wallet to continue";
pub const NO_ACCOUNTS_NOTICE: &str = "No wallet account was authorized";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub gas_limit: u64,
    /// Storage key for the persisted transaction count.
    pub count_key: String,
    /// Upper bound on the confirmation wait. `None` waits indefinitely.
    pub confirmation_timeout: Option<Duration>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            count_key: TRANSACTION_COUNT_KEY.to_string(),
            confirmation_timeout: None,
        }
    }
}

/// The collaborators a provider is built from.
pub struct Capabilities {
    /// `None` when no wallet is installed.
    pub wallet: Option<Arc<dyn WalletExtension>>,
    pub contract: Arc<dyn TransactionsContract>,
    pub store: Arc<dyn CountStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Everything a consumer may observe, published as one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionContext {
    pub current_account: Option<Address>,
    pub form_data: FormData,
    pub transactions: Vec<TransactionRecord>,
    pub is_loading: bool,
    pub transaction_count: Option<u64>,
}

/// Outcome of a confirmed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    pub transfer_hash: B256,
    pub log_hash: B256,
    pub transaction_count: u64,
}

/// Connects to a wallet, sends transfers with an on-chain log entry and
/// mirrors the results into an observable [`TransactionContext`].
pub struct WalletTransactionProvider {
    wallet: Option<Arc<dyn WalletExtension>>,
    contract: Arc<dyn TransactionsContract>,
    store: Arc<dyn CountStore>,
    notifier: Arc<dyn Notifier>,
    config: ProviderConfig,
    state: watch::Sender<TransactionContext>,
    send_in_flight: AtomicBool,
    bootstrapped: AtomicBool,
}

impl WalletTransactionProvider {
    /// Build a provider. The persisted transaction count is read here, once.
    pub fn new(capabilities: Capabilities, config: ProviderConfig) -> Self {
        let Capabilities {
            wallet,
            contract,
            store,
            notifier,
        } = capabilities;

        let transaction_count = store
            .get_item(&config.count_key)
            .and_then(|v| v.parse::<u64>().ok());
        let (state, _) = watch::channel(TransactionContext {
            transaction_count,
            ..Default::default()
        });

        Self {
            wallet,
            contract,
            store,
            notifier,
            config,
            state,
            send_in_flight: AtomicBool::new(false),
            bootstrapped: AtomicBool::new(false),
        }
    }

    // ------------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------------

    pub fn subscribe(&self) -> watch::Receiver<TransactionContext> {
        self.state.subscribe()
    }

    pub fn context(&self) -> TransactionContext {
        self.state.borrow().clone()
    }

    pub fn current_account(&self) -> Option<Address> {
        self.state.borrow().current_account
    }

    pub fn form_data(&self) -> FormData {
        self.state.borrow().form_data.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.borrow().transactions.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn transaction_count(&self) -> Option<u64> {
        self.state.borrow().transaction_count
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    // ------------------------------------------------------------------------
    // Form
    // ------------------------------------------------------------------------

    /// Update the field called `name`. Absent or unknown names are ignored.
    pub fn handle_change(&self, name: Option<&str>, value: impl Into<String>) {
        let Some(name) = name else {
            return;
        };
        match name.parse::<FormField>() {
            Ok(field) => self.set_field(field, value),
            Err(e) => debug!(error = %e, "Ignoring change"),
        }
    }

    pub fn set_field(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        self.state
            .send_modify(|state| state.form_data.set(field, value));
    }

    pub fn reset_form(&self) {
        self.state
            .send_modify(|state| state.form_data = FormData::default());
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    /// Run the startup checks. Only the first call does anything; failures
    /// are logged and never returned.
    pub async fn bootstrap(&self) {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("Session bootstrap already done");
            return;
        }

        let (connection, count) = tokio::join!(
            self.check_if_wallet_is_connected(),
            self.check_if_transactions_exist()
        );

        if let Err(e) = connection {
            error!(error = %e, "Existing connection check failed");
        }
        if let Err(e) = count {
            warn!(error = %e, "Transaction count probe failed");
        }
    }

    /// Adopt an already authorized account, if there is one, without
    /// prompting the user.
    pub async fn check_if_wallet_is_connected(&self) -> Result<Option<Address>, ProviderError> {
        let Some(wallet) = self.wallet_or_notify() else {
            return Ok(None);
        };

        let accounts = wallet.accounts().await.map_err(|e| {
            error!(error = %e, "Failed to list wallet accounts");
            ProviderError::WalletUnavailable(e)
        })?;
        debug!(accounts = ?accounts, "Authorized accounts");

        let Some(account) = accounts.first().copied() else {
            info!("No accounts found");
            return Ok(None);
        };

        self.state
            .send_modify(|state| state.current_account = Some(account));
        info!(account = %account, "Wallet already connected");

        if let Err(e) = self.get_all_transactions().await {
            warn!(error = %e, "Could not load transactions for connected account");
        }

        Ok(Some(account))
    }

    /// Read the contract's transaction count and persist it.
    pub async fn check_if_transactions_exist(&self) -> Result<u64, ProviderError> {
        let count = self
            .contract
            .transaction_count()
            .await
            .map_err(ProviderError::ReadFailure)?;
        let count = self.persist_count(count).map_err(ProviderError::ReadFailure)?;
        debug!(transaction_count = count, "Transaction count stored");
        Ok(count)
    }

    /// Ask the wallet to authorize an account and adopt the first one.
    pub async fn connect_wallet(&self) -> Result<Option<Address>, ProviderError> {
        let Some(wallet) = self.wallet_or_notify() else {
            return Ok(None);
        };

        info!("Requesting wallet authorization");
        let accounts = wallet.request_accounts().await.map_err(|e| {
            error!(error = %e, "Wallet authorization failed");
            ProviderError::WalletUnavailable(e)
        })?;

        let Some(account) = accounts.first().copied() else {
            warn!("Wallet authorized no accounts");
            self.notifier.notify(NO_ACCOUNTS_NOTICE);
            return Ok(None);
        };

        self.state
            .send_modify(|state| state.current_account = Some(account));
        info!(account = %account, "Wallet connected");
        Ok(Some(account))
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Send the form's amount to its recipient and log the transfer on the
    /// contract, then refresh the count and the transaction list.
    ///
    /// Only one send may run at a time; a concurrent call fails with
    /// [`ProviderError::SendInProgress`] without touching any state.
    pub async fn send_transaction(&self) -> Result<Option<SendReceipt>, ProviderError> {
        let Some(wallet) = self.wallet_or_notify() else {
            return Ok(None);
        };
        let Some(_in_flight) = InFlight::acquire(&self.send_in_flight) else {
            warn!("Send requested while another is in flight");
            return Err(ProviderError::SendInProgress);
        };

        match self.submit(wallet.as_ref()).await {
            Ok(receipt) => Ok(Some(receipt)),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Transaction failed");
                Err(ProviderError::WalletUnavailable(e))
            }
        }
    }

    async fn submit(&self, wallet: &dyn WalletExtension) -> anyhow::Result<SendReceipt> {
        let form = self.form_data();
        let from = self
            .current_account()
            .context("no wallet account is connected")?;
        let amount = parse_amount(&form.amount)?;

        let transfer_hash = wallet
            .send_transaction(ValueTransfer {
                from,
                to: form.address_to.clone(),
                gas: self.config.gas_limit,
                value: amount,
            })
            .await
            .context("value transfer was not accepted")?;
        info!(tx_hash = ?transfer_hash, to = %form.address_to, value = %amount, "Value transfer submitted");

        let pending = self
            .contract
            .add_to_blockchain(from, &form.address_to, amount, &form.message, &form.keyword)
            .await
            .context("addToBlockChain was not accepted")?;
        let log_hash = pending.hash();

        {
            let _loading = LoadingFlag::raise(&self.state);
            info!(tx_hash = ?log_hash, "Loading");
            self.await_confirmation(pending).await?;
        }
        info!(tx_hash = ?log_hash, "Success");

        let count = self
            .contract
            .transaction_count()
            .await
            .context("failed to read the transaction count")?;
        let transaction_count = self.persist_count(count)?;

        if let Err(e) = self.get_all_transactions().await {
            warn!(error = %e, "Transaction list refresh after send failed");
        }

        Ok(SendReceipt {
            transfer_hash,
            log_hash,
            transaction_count,
        })
    }

    async fn await_confirmation(&self, pending: Box<dyn PendingConfirmation>) -> anyhow::Result<()> {
        let wait = pending.wait();
        match self.config.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| anyhow!("transaction not confirmed within {limit:?}"))?,
            None => wait.await,
        }
    }

    /// Fetch every transfer logged on the contract and replace the cached
    /// list with it. On failure the previous list is kept.
    pub async fn get_all_transactions(&self) -> Result<Vec<TransactionRecord>, ProviderError> {
        let records = self.fetch_records().await.map_err(|e| {
            error!(error = %format!("{e:#}"), "Failed to fetch transactions");
            ProviderError::ReadFailure(e)
        })?;

        info!(count = records.len(), "Transactions loaded");
        self.state
            .send_modify(|state| state.transactions = records.clone());
        Ok(records)
    }

    async fn fetch_records(&self) -> anyhow::Result<Vec<TransactionRecord>> {
        let rows = self.contract.all_transactions().await?;
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| {
                TransactionRecord::try_from(row)
                    .with_context(|| format!("invalid transaction at index {index}"))
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn wallet_or_notify(&self) -> Option<&Arc<dyn WalletExtension>> {
        if self.wallet.is_none() {
            warn!("No wallet detected");
            self.notifier.notify(INSTALL_WALLET_NOTICE);
        }
        self.wallet.as_ref()
    }

    fn persist_count(&self, count: U256) -> anyhow::Result<u64> {
        let count = u64::try_from(count)
            .map_err(|_| anyhow!("transaction count {count} does not fit in 64 bits"))?;
        self.store
            .set_item(&self.config.count_key, &count.to_string())
            .context("failed to persist the transaction count")?;
        self.state
            .send_modify(|state| state.transaction_count = Some(count));
        Ok(count)
    }
}

/// Marks a send as running until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Holds `is_loading` up while a confirmation is awaited.
struct LoadingFlag<'a>(&'a watch::Sender<TransactionContext>);

impl<'a> LoadingFlag<'a> {
    fn raise(state: &'a watch::Sender<TransactionContext>) -> Self {
        state.send_modify(|s| s.is_loading = true);
        Self(state)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.is_loading = false);
    }
}
