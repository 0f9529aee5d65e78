use alloy::primitives::{Address, address};

pub mod common;
pub mod transactions;
pub mod transferlog_client;
pub mod wallet;

// ============================================================================
// Client Type Re-exports
// ============================================================================

pub use transactions::{PendingLog, TransactionsClient, TransferStruct};
pub use transferlog_client::{TransferLogClient, WalletSource};
pub use wallet::{LocalKeyWallet, RpcWallet};

/// Address the `Transactions` contract lands at when deployer account #0 deploys
/// it first on a fresh Anvil node.
pub const ANVIL_TRANSACTIONS_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Default local node endpoint.
pub const ANVIL_RPC_URL: &str = "http://127.0.0.1:8545";

// ============================================================================
// Contract Configuration
// ============================================================================

/// Where the chain and the `Transactions` contract live.
#[derive(Clone, Debug)]
pub struct ContractConfig {
    pub transactions_contract_address: Address,
    pub rpc_url: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            transactions_contract_address: Address::ZERO,
            rpc_url: String::new(),
        }
    }
}

impl ContractConfig {
    /// # Arguments
    /// * `rpc_url` - Ethereum RPC endpoint (HTTP or WebSocket)
    /// * `transactions_contract_address` - Address of the deployed Transactions contract
    pub fn new(rpc_url: String, transactions_contract_address: Address) -> Self {
        Self {
            transactions_contract_address,
            rpc_url,
        }
    }

    /// Anvil local testnet defaults.
    pub fn anvil_config() -> Self {
        Self {
            transactions_contract_address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            rpc_url: ANVIL_RPC_URL.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
