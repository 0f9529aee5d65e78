use alloy::primitives::{Address, B256, U256, address};
use anyhow::{Result, bail};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use transferlog_provider::{
    Capabilities, CountStore, ErrorKind, FormField, INSTALL_WALLET_NOTICE, MemoryStore,
    NO_ACCOUNTS_NOTICE, Notifier, PendingConfirmation, ProviderConfig, ProviderError, RawTransfer,
    TRANSACTION_COUNT_KEY, TransactionContext, TransactionsContract, ValueTransfer,
    WalletExtension, WalletTransactionProvider,
};

const ALICE: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
const BOB: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

// ============================================================================
// Doubles
// ============================================================================

#[derive(Default)]
struct MockWallet {
    authorized: Vec<Address>,
    granted: Vec<Address>,
    reject_request: bool,
    fail_accounts: bool,
    transfers: Mutex<Vec<ValueTransfer>>,
}

impl MockWallet {
    fn connected(account: Address) -> Self {
        Self {
            authorized: vec![account],
            granted: vec![account],
            ..Default::default()
        }
    }

    fn transfers(&self) -> Vec<ValueTransfer> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletExtension for MockWallet {
    async fn accounts(&self) -> Result<Vec<Address>> {
        if self.fail_accounts {
            bail!("wallet locked");
        }
        Ok(self.authorized.clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        if self.reject_request {
            bail!("User rejected the request.");
        }
        Ok(self.granted.clone())
    }

    async fn send_transaction(&self, transfer: ValueTransfer) -> Result<B256> {
        self.transfers.lock().unwrap().push(transfer);
        Ok(B256::repeat_byte(0x11))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LogCall {
    from: Address,
    receiver: String,
    amount: U256,
    message: String,
    keyword: String,
}

#[derive(Default)]
struct MockContract {
    count: Mutex<u64>,
    rows: Mutex<Vec<RawTransfer>>,
    fail_reads: AtomicBool,
    fail_confirmation: bool,
    log_calls: Mutex<Vec<LogCall>>,
    gate: Option<Arc<Notify>>,
    probe: OnceLock<watch::Receiver<TransactionContext>>,
    loading_seen: Arc<Mutex<Vec<bool>>>,
}

impl MockContract {
    fn with_rows(rows: Vec<RawTransfer>) -> Self {
        Self {
            count: Mutex::new(rows.len() as u64),
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn set_rows(&self, rows: Vec<RawTransfer>) {
        *self.count.lock().unwrap() = rows.len() as u64;
        *self.rows.lock().unwrap() = rows;
    }

    fn log_calls(&self) -> Vec<LogCall> {
        self.log_calls.lock().unwrap().clone()
    }
}

struct MockPending {
    hash: B256,
    fail: bool,
    gate: Option<Arc<Notify>>,
    probe: Option<watch::Receiver<TransactionContext>>,
    loading_seen: Arc<Mutex<Vec<bool>>>,
}

impl PendingConfirmation for MockPending {
    fn hash(&self) -> B256 {
        self.hash
    }

    fn wait(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            if let Some(probe) = &self.probe {
                let loading = probe.borrow().is_loading;
                self.loading_seen.lock().unwrap().push(loading);
            }
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                bail!("transaction reverted on-chain");
            }
            Ok(())
        })
    }
}

#[async_trait]
impl TransactionsContract for MockContract {
    async fn add_to_blockchain(
        &self,
        from: Address,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<Box<dyn PendingConfirmation>> {
        self.log_calls.lock().unwrap().push(LogCall {
            from,
            receiver: receiver.to_string(),
            amount,
            message: message.to_string(),
            keyword: keyword.to_string(),
        });

        if !self.fail_confirmation {
            self.rows.lock().unwrap().push(RawTransfer {
                sender: from,
                receiver: receiver.parse().unwrap_or(Address::ZERO),
                amount,
                message: message.to_string(),
                timestamp: U256::from(1_640_995_200u64),
                keyword: keyword.to_string(),
            });
            *self.count.lock().unwrap() += 1;
        }

        Ok(Box::new(MockPending {
            hash: B256::repeat_byte(0x22),
            fail: self.fail_confirmation,
            gate: self.gate.clone(),
            probe: self.probe.get().cloned(),
            loading_seen: self.loading_seen.clone(),
        }))
    }

    async fn transaction_count(&self) -> Result<U256> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("rpc unavailable");
        }
        Ok(U256::from(*self.count.lock().unwrap()))
    }

    async fn all_transactions(&self) -> Result<Vec<RawTransfer>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("rpc unavailable");
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

struct Harness {
    provider: WalletTransactionProvider,
    wallet: Option<Arc<MockWallet>>,
    contract: Arc<MockContract>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(wallet: Option<MockWallet>, contract: MockContract) -> Self {
        Self::with(wallet, contract, MemoryStore::new(), ProviderConfig::default())
    }

    fn with(
        wallet: Option<MockWallet>,
        contract: MockContract,
        store: MemoryStore,
        config: ProviderConfig,
    ) -> Self {
        let wallet = wallet.map(Arc::new);
        let contract = Arc::new(contract);
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::default());

        let provider = WalletTransactionProvider::new(
            Capabilities {
                wallet: wallet
                    .clone()
                    .map(|w| w as Arc<dyn WalletExtension>),
                contract: contract.clone(),
                store: store.clone(),
                notifier: notifier.clone(),
            },
            config,
        );
        let _ = contract.probe.set(provider.subscribe());

        Self {
            provider,
            wallet,
            contract,
            store,
            notifier,
        }
    }

    fn wallet(&self) -> &MockWallet {
        self.wallet.as_deref().unwrap()
    }

    fn fill_form(&self, address_to: &str, amount: &str, keyword: &str, message: &str) {
        self.provider.handle_change(Some("addressTo"), address_to);
        self.provider.handle_change(Some("amount"), amount);
        self.provider.handle_change(Some("keyword"), keyword);
        self.provider.handle_change(Some("message"), message);
    }
}

fn row(receiver: Address, wei: u128, message: &str) -> RawTransfer {
    RawTransfer {
        sender: ALICE,
        receiver,
        amount: U256::from(wei),
        message: message.to_string(),
        timestamp: U256::from(1_656_684_245u64),
        keyword: "kw".to_string(),
    }
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_connect_wallet_adopts_first_account() {
    let wallet = MockWallet {
        granted: vec![ALICE, BOB],
        ..Default::default()
    };
    let h = Harness::new(Some(wallet), MockContract::default());

    let account = h.provider.connect_wallet().await.unwrap();

    assert_eq!(account, Some(ALICE));
    assert_eq!(h.provider.current_account(), Some(ALICE));
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_connect_wallet_with_no_accounts_notifies() {
    let h = Harness::new(Some(MockWallet::default()), MockContract::default());

    let account = h.provider.connect_wallet().await.unwrap();

    assert_eq!(account, None);
    assert_eq!(h.provider.current_account(), None);
    assert_eq!(h.notifier.messages(), vec![NO_ACCOUNTS_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_connect_wallet_without_wallet_notifies() {
    let h = Harness::new(None, MockContract::default());
    let before = h.provider.context();

    let result = h.provider.connect_wallet().await;

    assert!(matches!(result, Ok(None)));
    assert_eq!(h.provider.context(), before);
    assert_eq!(h.notifier.messages(), vec![INSTALL_WALLET_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_connect_wallet_rejection_is_generic() {
    let wallet = MockWallet {
        reject_request: true,
        ..Default::default()
    };
    let h = Harness::new(Some(wallet), MockContract::default());

    let err = h.provider.connect_wallet().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserOrNetworkRejection);
    assert_eq!(err.to_string(), "wallet unavailable");
    assert!(err.source().unwrap().to_string().contains("rejected"));
    assert_eq!(h.provider.current_account(), None);
}

// ============================================================================
// Form
// ============================================================================

#[tokio::test]
async fn test_handle_change_updates_only_named_field() {
    let h = Harness::new(None, MockContract::default());
    h.fill_form("0xABC", "1.5", "k", "hi");
    let before = h.provider.form_data();

    h.provider.handle_change(Some("message"), "hello");

    let after = h.provider.form_data();
    assert_eq!(after.message, "hello");
    assert_eq!(after.address_to, before.address_to);
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.keyword, before.keyword);
}

#[tokio::test]
async fn test_handle_change_without_name_is_noop() {
    let h = Harness::new(None, MockContract::default());
    h.fill_form("0xABC", "1.5", "k", "hi");
    let before = h.provider.form_data();

    h.provider.handle_change(None, "ignored");
    h.provider.handle_change(Some("recipient"), "ignored");

    assert_eq!(h.provider.form_data(), before);
}

#[tokio::test]
async fn test_reset_form_clears_every_field() {
    let h = Harness::new(None, MockContract::default());
    h.fill_form("0xABC", "1.5", "k", "hi");

    h.provider.reset_form();

    for field in FormField::ALL {
        assert_eq!(h.provider.form_data().get(field), "");
    }
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_send_transaction_transfers_and_logs() {
    let h = Harness::new(Some(MockWallet::connected(ALICE)), MockContract::with_rows(vec![]));
    h.provider.connect_wallet().await.unwrap();
    h.fill_form("0xABC", "1.5", "k", "hi");

    let receipt = h.provider.send_transaction().await.unwrap().unwrap();

    let expected = U256::from(3 * WEI_PER_ETHER / 2);
    assert_eq!(
        h.wallet().transfers(),
        vec![ValueTransfer {
            from: ALICE,
            to: "0xABC".to_string(),
            gas: 0x5208,
            value: expected,
        }]
    );
    assert_eq!(
        h.contract.log_calls(),
        vec![LogCall {
            from: ALICE,
            receiver: "0xABC".to_string(),
            amount: expected,
            message: "hi".to_string(),
            keyword: "k".to_string(),
        }]
    );

    assert_eq!(receipt.transfer_hash, B256::repeat_byte(0x11));
    assert_eq!(receipt.log_hash, B256::repeat_byte(0x22));
    assert_eq!(receipt.transaction_count, 1);
    assert_eq!(h.store.get_item(TRANSACTION_COUNT_KEY), Some("1".to_string()));
    assert_eq!(h.provider.transaction_count(), Some(1));

    let transactions = h.provider.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, 1.5);
    assert!(!h.provider.is_loading());
}

#[tokio::test]
async fn test_loading_flag_raised_only_while_confirming() {
    let h = Harness::new(Some(MockWallet::connected(ALICE)), MockContract::default());
    h.provider.connect_wallet().await.unwrap();
    h.fill_form(&BOB.to_string(), "0.1", "", "");
    assert!(!h.provider.is_loading());

    h.provider.send_transaction().await.unwrap();

    assert_eq!(*h.contract.loading_seen.lock().unwrap(), vec![true]);
    assert!(!h.provider.is_loading());
}

#[tokio::test]
async fn test_failed_confirmation_clears_loading_flag() {
    let contract = MockContract {
        fail_confirmation: true,
        ..Default::default()
    };
    let h = Harness::new(Some(MockWallet::connected(ALICE)), contract);
    h.provider.connect_wallet().await.unwrap();
    h.fill_form(&BOB.to_string(), "2", "", "");

    let err = h.provider.send_transaction().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserOrNetworkRejection);
    assert!(!h.provider.is_loading());
    assert_eq!(h.store.get_item(TRANSACTION_COUNT_KEY), None);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout() {
    let contract = MockContract {
        gate: Some(Arc::new(Notify::new())),
        ..Default::default()
    };
    let config = ProviderConfig {
        confirmation_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let h = Harness::with(
        Some(MockWallet::connected(ALICE)),
        contract,
        MemoryStore::new(),
        config,
    );
    h.provider.connect_wallet().await.unwrap();
    h.fill_form(&BOB.to_string(), "1", "", "");

    let err = h.provider.send_transaction().await.unwrap_err();

    assert!(format!("{:#}", anyhow::Error::from(err)).contains("not confirmed"));
    assert!(!h.provider.is_loading());
}

#[tokio::test]
async fn test_concurrent_send_is_rejected() {
    let gate = Arc::new(Notify::new());
    let contract = MockContract {
        gate: Some(gate.clone()),
        ..Default::default()
    };
    let h = Harness::new(Some(MockWallet::connected(ALICE)), contract);
    h.provider.connect_wallet().await.unwrap();
    h.fill_form(&BOB.to_string(), "1", "", "");

    let (first, second) = tokio::join!(h.provider.send_transaction(), async {
        tokio::task::yield_now().await;
        let result = h.provider.send_transaction().await;
        gate.notify_one();
        result
    });

    assert!(first.unwrap().is_some());
    assert!(matches!(second, Err(ProviderError::SendInProgress)));
    assert_eq!(h.wallet().transfers().len(), 1);
    assert_eq!(h.contract.log_calls().len(), 1);
}

#[tokio::test]
async fn test_send_while_disconnected_fails_before_wallet() {
    let h = Harness::new(Some(MockWallet::connected(ALICE)), MockContract::default());
    h.fill_form(&BOB.to_string(), "1", "", "");

    let err = h.provider.send_transaction().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserOrNetworkRejection);
    assert!(h.wallet().transfers().is_empty());
}

#[tokio::test]
async fn test_malformed_amount_fails_before_wallet() {
    let h = Harness::new(Some(MockWallet::connected(ALICE)), MockContract::default());
    h.provider.connect_wallet().await.unwrap();
    h.fill_form(&BOB.to_string(), "one and a half", "", "");

    let err = h.provider.send_transaction().await.unwrap_err();

    assert_eq!(err.to_string(), "wallet unavailable");
    assert!(h.wallet().transfers().is_empty());
    assert!(h.contract.log_calls().is_empty());
}

#[tokio::test]
async fn test_send_without_wallet_notifies() {
    let h = Harness::new(None, MockContract::default());
    h.fill_form(&BOB.to_string(), "1", "", "");

    let result = h.provider.send_transaction().await;

    assert!(matches!(result, Ok(None)));
    assert_eq!(h.notifier.messages(), vec![INSTALL_WALLET_NOTICE.to_string()]);
    assert!(h.contract.log_calls().is_empty());
}

// ============================================================================
// Reading
// ============================================================================

#[tokio::test]
async fn test_get_all_transactions_replaces_list() {
    let contract = MockContract::with_rows(vec![
        row(BOB, WEI_PER_ETHER, "first"),
        row(BOB, 2 * WEI_PER_ETHER, "second"),
    ]);
    let h = Harness::new(None, contract);

    let first = h.provider.get_all_transactions().await.unwrap();
    assert_eq!(first.len(), 2);

    h.contract.set_rows(vec![row(ALICE, WEI_PER_ETHER / 2, "third")]);
    h.provider.get_all_transactions().await.unwrap();

    let cached = h.provider.transactions();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].message, "third");
    assert_eq!(cached[0].address_to, ALICE.to_string());
    assert_eq!(cached[0].amount, 0.5);
    assert_eq!(cached[0].timestamp, "7/1/2022, 2:04:05 PM");
}

#[tokio::test]
async fn test_read_failure_keeps_stale_list() {
    let h = Harness::new(None, MockContract::with_rows(vec![row(BOB, 1, "kept")]));
    h.provider.get_all_transactions().await.unwrap();

    h.contract.fail_reads.store(true, Ordering::SeqCst);
    let err = h.provider.get_all_transactions().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReadFailure);
    assert_eq!(h.provider.transactions().len(), 1);
    assert_eq!(h.provider.transactions()[0].message, "kept");
}

#[tokio::test]
async fn test_invalid_row_is_read_failure() {
    let mut bad = row(BOB, 1, "bad");
    bad.timestamp = U256::MAX;
    let h = Harness::new(None, MockContract::with_rows(vec![row(BOB, 1, "good"), bad]));

    let err = h.provider.get_all_transactions().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReadFailure);
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("index 1"));
    assert!(h.provider.transactions().is_empty());
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_persisted_count_is_read_at_construction() {
    let h = Harness::with(
        None,
        MockContract::default(),
        MemoryStore::with_item(TRANSACTION_COUNT_KEY, "3"),
        ProviderConfig::default(),
    );

    assert_eq!(h.provider.transaction_count(), Some(3));
}

#[tokio::test]
async fn test_bootstrap_adopts_existing_session() {
    let contract = MockContract::with_rows(vec![row(BOB, WEI_PER_ETHER, "a"), row(BOB, 1, "b")]);
    let h = Harness::new(Some(MockWallet::connected(BOB)), contract);

    h.provider.bootstrap().await;

    assert_eq!(h.provider.current_account(), Some(BOB));
    assert_eq!(h.provider.transactions().len(), 2);
    assert_eq!(h.provider.transaction_count(), Some(2));
    assert_eq!(h.store.get_item(TRANSACTION_COUNT_KEY), Some("2".to_string()));
}

#[tokio::test]
async fn test_bootstrap_without_authorized_account_stays_disconnected() {
    let wallet = MockWallet {
        granted: vec![ALICE],
        ..Default::default()
    };
    let h = Harness::new(Some(wallet), MockContract::with_rows(vec![row(BOB, 1, "a")]));

    h.provider.bootstrap().await;

    assert_eq!(h.provider.current_account(), None);
    assert!(h.provider.transactions().is_empty());
    assert_eq!(h.provider.transaction_count(), Some(1));
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_bootstrap_survives_account_listing_failure() {
    let wallet = MockWallet {
        authorized: vec![ALICE],
        fail_accounts: true,
        ..Default::default()
    };
    let h = Harness::new(Some(wallet), MockContract::with_rows(vec![row(BOB, 1, "a")]));

    h.provider.bootstrap().await;

    assert_eq!(h.provider.current_account(), None);
    assert!(h.provider.transactions().is_empty());
    assert_eq!(h.provider.transaction_count(), Some(1));
    assert_eq!(h.store.get_item(TRANSACTION_COUNT_KEY), Some("1".to_string()));
}

#[tokio::test]
async fn test_check_if_wallet_is_connected_reports_listing_failure() {
    let wallet = MockWallet {
        fail_accounts: true,
        ..Default::default()
    };
    let h = Harness::new(Some(wallet), MockContract::default());

    let err = h.provider.check_if_wallet_is_connected().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserOrNetworkRejection);
    assert!(err.source().unwrap().to_string().contains("locked"));
}

#[tokio::test]
async fn test_bootstrap_without_wallet_still_probes_count() {
    let h = Harness::new(None, MockContract::with_rows(vec![row(BOB, 1, "a")]));

    h.provider.bootstrap().await;

    assert_eq!(h.notifier.messages(), vec![INSTALL_WALLET_NOTICE.to_string()]);
    assert_eq!(h.store.get_item(TRANSACTION_COUNT_KEY), Some("1".to_string()));
}

#[tokio::test]
async fn test_bootstrap_runs_once() {
    let h = Harness::new(None, MockContract::default());

    h.provider.bootstrap().await;
    h.provider.bootstrap().await;

    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_count_probe_failure_is_not_fatal() {
    let h = Harness::with(
        Some(MockWallet::connected(ALICE)),
        MockContract::default(),
        MemoryStore::with_item(TRANSACTION_COUNT_KEY, "9"),
        ProviderConfig::default(),
    );
    h.contract.fail_reads.store(true, Ordering::SeqCst);

    h.provider.bootstrap().await;

    assert_eq!(h.provider.current_account(), Some(ALICE));
    assert_eq!(h.provider.transaction_count(), Some(9));
}

#[tokio::test]
async fn test_subscribers_see_changes() {
    let h = Harness::new(Some(MockWallet::connected(ALICE)), MockContract::default());
    let mut rx = h.provider.subscribe();

    h.provider.connect_wallet().await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().current_account, Some(ALICE));
}
