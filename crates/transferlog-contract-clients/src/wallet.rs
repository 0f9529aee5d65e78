use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet},
    primitives::{Address, B256, TxKind},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use transferlog_provider::{ValueTransfer, WalletExtension};

fn transfer_request(transfer: &ValueTransfer) -> Result<TransactionRequest> {
    let to: Address = transfer
        .to
        .parse()
        .with_context(|| format!("invalid recipient address {:?}", transfer.to))?;

    Ok(TransactionRequest {
        from: Some(transfer.from),
        to: Some(TxKind::Call(to)),
        gas: Some(transfer.gas),
        value: Some(transfer.value),
        ..Default::default()
    })
}

/// Wallet reached over JSON-RPC that keeps its own keys and approves
/// requests itself (a browser-extension bridge, a desktop wallet, or a dev
/// node with unlocked accounts).
#[derive(Clone)]
pub struct RpcWallet {
    provider: DynProvider,
}

impl RpcWallet {
    /// Connect without fillers so requests reach the wallet unmodified.
    pub async fn connect(wallet_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect(wallet_url)
            .await
            .with_context(|| format!("Failed to connect to wallet at {wallet_url}"))?
            .erased();
        Ok(Self { provider })
    }

    pub fn provider(&self) -> DynProvider {
        self.provider.clone()
    }
}

#[async_trait]
impl WalletExtension for RpcWallet {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.provider.get_accounts().await?)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<Address> = self
            .provider
            .client()
            .request_noparams("eth_requestAccounts")
            .await?;
        Ok(accounts)
    }

    async fn send_transaction(&self, transfer: ValueTransfer) -> Result<B256> {
        let request = transfer_request(&transfer)?;
        debug!(from = %transfer.from, to = %transfer.to, value = %transfer.value, "eth_sendTransaction");
        let tx_hash: B256 = self
            .provider
            .client()
            .request("eth_sendTransaction", (request,))
            .await?;
        Ok(tx_hash)
    }
}

/// Wallet backed by a private key held in this process. Its signer address
/// is the only account and every request is approved.
#[derive(Clone)]
pub struct LocalKeyWallet {
    provider: DynProvider,
    wallet: EthereumWallet,
}

impl LocalKeyWallet {
    pub async fn connect(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse::<PrivateKeySigner>()
            .context("Failed to parse private key")?;
        let wallet = EthereumWallet::from(signer);

        // Build a provider that can sign transactions, then erase the concrete type
        let provider: DynProvider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .connect(rpc_url)
            .await
            .with_context(|| format!("Failed to connect to RPC endpoint {rpc_url}"))?
            .erased();

        Ok(Self { provider, wallet })
    }

    pub fn provider(&self) -> DynProvider {
        self.provider.clone()
    }

    pub fn signer_address(&self) -> Address {
        <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&self.wallet)
    }
}

#[async_trait]
impl WalletExtension for LocalKeyWallet {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.signer_address()])
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.signer_address()])
    }

    async fn send_transaction(&self, transfer: ValueTransfer) -> Result<B256> {
        let request = transfer_request(&transfer)?;
        let pending = self.provider.send_transaction(request).await?;
        Ok(*pending.tx_hash())
    }
}
