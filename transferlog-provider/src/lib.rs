//! Wallet-backed transfer state.
//!
//! [`WalletTransactionProvider`] connects to a wallet, holds the transfer
//! form, sends a value transfer together with an `addToBlockChain` log entry
//! on the `Transactions` contract, and keeps the contract's transaction list
//! and count available as a [`TransactionContext`] snapshot.

pub mod amount;
pub mod capability;
pub mod error;
pub mod form;
pub mod provider;
pub mod record;
pub mod storage;

// ============================================================================
// Re-exports
// ============================================================================

pub use amount::{AmountError, parse_amount, wei_to_ether};
pub use capability::{
    LogNotifier, Notifier, PendingConfirmation, TransactionsContract, ValueTransfer,
    WalletExtension,
};
pub use error::{ErrorKind, ProviderError};
pub use form::{FormData, FormField, UnknownField};
pub use provider::{
    Capabilities, DEFAULT_GAS_LIMIT, INSTALL_WALLET_NOTICE, NO_ACCOUNTS_NOTICE, ProviderConfig,
    SendReceipt, TransactionContext, WalletTransactionProvider,
};
pub use record::{RawTransfer, RecordError, TransactionRecord, format_timestamp};
pub use storage::{CountStore, MemoryStore, TRANSACTION_COUNT_KEY};
