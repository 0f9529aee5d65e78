use alloy::{
    contract::{CallBuilder, CallDecoder},
    network::Ethereum,
    primitives::B256,
    providers::{PendingTransactionBuilder, Provider},
    sol_types::decode_revert_reason,
};
use anyhow::{Result, anyhow, bail};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Sends contract calls one at a time and hands back the pending transaction,
/// leaving the confirmation wait to the caller.
#[derive(Clone)]
pub(crate) struct TransactionSubmitter {
    tx_lock: Arc<Mutex<()>>,
    gas_limit: Option<u64>,
}

impl TransactionSubmitter {
    pub(crate) fn new(tx_lock: Arc<Mutex<()>>) -> Self {
        Self {
            tx_lock,
            gas_limit: None,
        }
    }

    pub(crate) fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub(crate) async fn submit<P, D>(
        &self,
        method: &'static str,
        call: CallBuilder<P, D>,
    ) -> Result<PendingTransactionBuilder<Ethereum>>
    where
        P: Provider + Clone,
        D: CallDecoder + Clone,
    {
        // Pre-simulate to surface reverts with their reason
        if let Err(e) = call.call().await {
            return Err(anyhow!("{method} reverted: {}", describe_error(&e)));
        }

        let call = match self.gas_limit {
            Some(gas) => call.gas(gas),
            None => call,
        };

        let _guard = self.tx_lock.lock().await;
        let pending = call
            .send()
            .await
            .map_err(|e| anyhow!("{method} failed to send: {}", describe_error(&e)))?;

        debug!(method, tx_hash = ?pending.tx_hash(), "Transaction sent");
        Ok(pending)
    }
}

/// Wait for a sent transaction to be mined and check that it succeeded.
pub(crate) async fn confirm(
    method: &str,
    pending: PendingTransactionBuilder<Ethereum>,
) -> Result<B256> {
    let receipt = pending.get_receipt().await?;
    let tx_hash = receipt.transaction_hash;

    if !receipt.status() {
        warn!(method, tx_hash = ?tx_hash, gas_used = receipt.gas_used, "Transaction reverted");
        bail!("{method} reverted on-chain. Tx hash: {tx_hash:?}");
    }

    info!(
        method,
        tx_hash = ?tx_hash,
        block_number = ?receipt.block_number,
        gas_used = receipt.gas_used,
        effective_gas_price = receipt.effective_gas_price,
        "Transaction mined"
    );
    Ok(tx_hash)
}

fn describe_error(error: &alloy::contract::Error) -> String {
    error
        .as_revert_data()
        .and_then(|data| revert_reason(&data))
        .unwrap_or_else(|| error.to_string())
}

/// Decode `Error(string)`, `Panic(uint256)` and similar revert payloads.
pub(crate) fn revert_reason(data: &[u8]) -> Option<String> {
    decode_revert_reason(data)
}
