use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use state_file::StateFile;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};
use transferlog_contract_clients::{
    ANVIL_RPC_URL, ANVIL_TRANSACTIONS_ADDRESS, ContractConfig, WalletSource,
};
use transferlog_provider::{DEFAULT_GAS_LIMIT, ProviderConfig, TRANSACTION_COUNT_KEY};

const STATE_FILE_CLI: &str = "transferlog.env";

/// CLI arguments for the transfer log client
#[derive(Parser, Debug)]
#[command(name = "transferlog")]
#[command(about = "Send ETH through a wallet and log each transfer on the Transactions contract", long_about = None)]
pub struct CliArgs {
    /// Ethereum RPC endpoint used for contract reads
    #[arg(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// JSON-RPC endpoint of a wallet that signs on its own
    #[arg(long, env = "WALLET_URL", global = true)]
    pub wallet_url: Option<String>,

    /// Private key for a wallet held by this process
    #[arg(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Transactions contract address
    #[arg(long, env = "TRANSACTIONS_CONTRACT_ADDRESS", global = true)]
    pub contract_address: Option<String>,

    /// File holding persisted values such as the transaction count
    #[arg(long, env = "TRANSFERLOG_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long, env = "TRANSFERLOG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Give up waiting for the log transaction after this many seconds
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", global = true)]
    pub confirmation_timeout_secs: Option<u64>,

    /// Gas limit for the value transfer
    #[arg(long, env = "GAS_LIMIT", global = true)]
    pub gas_limit: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the connected account, the stored count and the loading state
    Status,
    /// Ask the wallet to authorize an account
    Connect,
    /// Transfer ETH and log it on the contract
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount in ETH, e.g. 0.01
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        keyword: String,
        #[arg(long, default_value = "")]
        message: String,
    },
    /// List every logged transfer
    Transactions {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Values accepted in the `--config` TOML file.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub wallet_url: Option<String>,
    pub private_key: Option<String>,
    pub contract_address: Option<String>,
    pub state_file: Option<PathBuf>,
    pub confirmation_timeout_secs: Option<u64>,
    pub gas_limit: Option<u64>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: FileConfig = toml::from_str(&s)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }
}

/// CLI configuration with all values resolved
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub rpc_url: String,
    pub wallet_url: Option<String>,
    pub private_key: Option<String>,
    pub contract_address: Address,
    pub state_file: PathBuf,
    pub confirmation_timeout: Option<Duration>,
    pub gas_limit: u64,
}

impl CliConfig {
    /// Load configuration with priority: CLI/env -> TOML file -> state file -> defaults
    pub fn load(cli_args: &CliArgs) -> Result<Self> {
        let file = match &cli_args.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };

        let state_path = cli_args
            .state_file
            .clone()
            .or_else(|| file.state_file.clone())
            .unwrap_or_else(|| PathBuf::from(STATE_FILE_CLI));
        let state_file = StateFile::new(&state_path);

        let config = Self::resolve(cli_args, file, &state_file)?;
        info!(
            rpc_url = %config.rpc_url,
            contract = %config.contract_address,
            state_file = %config.state_file.display(),
            "Loaded CliConfig"
        );
        Ok(config)
    }

    fn resolve(cli_args: &CliArgs, file: FileConfig, state_file: &StateFile) -> Result<Self> {
        let rpc_url = cli_args
            .rpc_url
            .clone()
            .or(file.rpc_url)
            .or_else(|| state_file.load_value("RPC_URL"))
            .unwrap_or_else(|| ANVIL_RPC_URL.to_string());

        let wallet_url = cli_args
            .wallet_url
            .clone()
            .or(file.wallet_url)
            .or_else(|| state_file.load_value("WALLET_URL"));

        let private_key = cli_args
            .private_key
            .clone()
            .or(file.private_key)
            .or_else(|| state_file.load_value("PRIVATE_KEY"));

        let contract_address = cli_args
            .contract_address
            .clone()
            .or(file.contract_address)
            .or_else(|| state_file.load_value("TRANSACTIONS_CONTRACT_ADDRESS"))
            .unwrap_or_else(|| ANVIL_TRANSACTIONS_ADDRESS.to_string());
        let contract_address = contract_address
            .parse::<Address>()
            .with_context(|| format!("Invalid contract address {contract_address}"))?;

        let confirmation_timeout = cli_args
            .confirmation_timeout_secs
            .or(file.confirmation_timeout_secs)
            .or_else(|| state_file.load_u64("CONFIRMATION_TIMEOUT_SECS"))
            .map(Duration::from_secs);

        let gas_limit = cli_args
            .gas_limit
            .or(file.gas_limit)
            .or_else(|| state_file.load_u64("GAS_LIMIT"))
            .unwrap_or(DEFAULT_GAS_LIMIT);

        Ok(CliConfig {
            rpc_url,
            wallet_url,
            private_key,
            contract_address,
            state_file: state_file.path().to_path_buf(),
            confirmation_timeout,
            gas_limit,
        })
    }

    /// A wallet URL wins over a private key; with neither there is no wallet.
    pub fn wallet_source(&self) -> WalletSource {
        match (&self.wallet_url, &self.private_key) {
            (Some(url), Some(_)) => {
                warn!("Both a wallet URL and a private key are set, using the wallet URL");
                WalletSource::Rpc(url.clone())
            }
            (Some(url), None) => WalletSource::Rpc(url.clone()),
            (None, Some(key)) => WalletSource::PrivateKey(key.clone()),
            (None, None) => WalletSource::None,
        }
    }

    pub fn contract_config(&self) -> ContractConfig {
        ContractConfig::new(self.rpc_url.clone(), self.contract_address)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            gas_limit: self.gas_limit,
            count_key: TRANSACTION_COUNT_KEY.to_string(),
            confirmation_timeout: self.confirmation_timeout,
        }
    }
}
