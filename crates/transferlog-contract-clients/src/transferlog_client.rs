use crate::{ContractConfig, LocalKeyWallet, RpcWallet, TransactionsClient};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use transferlog_provider::WalletExtension;

/// Where transaction signing happens.
#[derive(Clone, Debug, Default)]
pub enum WalletSource {
    /// A JSON-RPC wallet that holds its own keys.
    Rpc(String),
    /// A private key held in this process, used against the chain RPC.
    PrivateKey(String),
    /// Read-only: no wallet is installed.
    #[default]
    None,
}

/// Wallet plus `Transactions` contract client.
///
/// Contract reads always go to `rpc_url`. Sends go through the wallet's
/// provider when there is one.
#[derive(Clone)]
pub struct TransferLogClient {
    wallet: Option<Arc<dyn WalletExtension>>,
    pub transactions: TransactionsClient<DynProvider>,
}

impl TransferLogClient {
    pub async fn new(
        config: ContractConfig,
        source: WalletSource,
        gas_limit: Option<u64>,
    ) -> Result<Self> {
        let reader = connect_read_only(&config.rpc_url).await?;
        let (sender, wallet): (DynProvider, Option<Arc<dyn WalletExtension>>) = match source {
            WalletSource::Rpc(wallet_url) => {
                let wallet = RpcWallet::connect(&wallet_url).await?;
                info!(wallet_url = %wallet_url, "Using RPC wallet");
                (wallet.provider(), Some(Arc::new(wallet) as Arc<dyn WalletExtension>))
            }
            WalletSource::PrivateKey(private_key) => {
                let wallet = LocalKeyWallet::connect(&config.rpc_url, &private_key).await?;
                info!(address = %wallet.signer_address(), "Using local key wallet");
                (wallet.provider(), Some(Arc::new(wallet) as Arc<dyn WalletExtension>))
            }
            WalletSource::None => (reader.clone(), None),
        };

        let tx_lock = Arc::new(Mutex::new(()));
        let transactions =
            TransactionsClient::new(sender, config.transactions_contract_address, tx_lock)
                .with_reader(reader)
                .with_gas_limit(gas_limit);

        Ok(Self {
            wallet,
            transactions,
        })
    }

    /// The installed wallet, if any.
    pub fn wallet(&self) -> Option<Arc<dyn WalletExtension>> {
        self.wallet.clone()
    }
}

/// Connect a provider with no signer. `ws://` and `wss://` URLs use a
/// WebSocket, anything else is treated as HTTP.
pub async fn connect_read_only(rpc_url: &str) -> Result<DynProvider> {
    let provider = if rpc_url.starts_with("ws://") || rpc_url.starts_with("wss://") {
        ProviderBuilder::new()
            .connect_ws(WsConnect::new(rpc_url))
            .await
            .with_context(|| format!("Failed to connect to {rpc_url}"))?
            .erased()
    } else {
        ProviderBuilder::new()
            .connect(rpc_url)
            .await
            .with_context(|| format!("Failed to connect to {rpc_url}"))?
            .erased()
    };
    Ok(provider)
}
