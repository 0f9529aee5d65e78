use anyhow::{Context, Result, bail};
use args::{CliArgs, CliConfig, Command};
use clap::Parser;
use state_file::StateFile;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use transferlog_contract_clients::TransferLogClient;
use transferlog_provider::{Capabilities, FormField, WalletTransactionProvider};

use crate::display::{TerminalNotice, render_receipt, render_status, render_transactions};

mod args;
mod display;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli_args = CliArgs::parse();
    let config = CliConfig::load(&cli_args)?;
    let provider = setup_provider(&config).await?;

    run(cli_args.command, &provider, &config).await
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy()
        .add_directive("alloy=warn".parse()?)
        .add_directive("alloy_pubsub=error".parse()?)
        .add_directive("alloy_transport_ws=off".parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

async fn setup_provider(config: &CliConfig) -> Result<WalletTransactionProvider> {
    let client = TransferLogClient::new(config.contract_config(), config.wallet_source(), None)
        .await
        .context("Failed to set up clients")?;

    info!(
        contract = %client.transactions.address(),
        wallet = client.wallet().is_some(),
        "Connected to contract"
    );

    let capabilities = Capabilities {
        wallet: client.wallet(),
        contract: Arc::new(client.transactions.clone()),
        store: Arc::new(StateFile::new(&config.state_file)),
        notifier: Arc::new(TerminalNotice),
    };

    Ok(WalletTransactionProvider::new(
        capabilities,
        config.provider_config(),
    ))
}

async fn run(
    command: Command,
    provider: &WalletTransactionProvider,
    config: &CliConfig,
) -> Result<()> {
    match command {
        Command::Status => {
            provider.bootstrap().await;
            println!(
                "{}",
                render_status(&provider.context(), &config.rpc_url, provider.has_wallet())
            );
        }
        Command::Connect => match provider.connect_wallet().await? {
            Some(account) => println!("Connected account: {account}"),
            None => bail!("No wallet account connected"),
        },
        Command::Send {
            to,
            amount,
            keyword,
            message,
        } => {
            provider.bootstrap().await;
            if provider.has_wallet() && provider.current_account().is_none() {
                provider.connect_wallet().await?;
            }
            let fields = [
                (FormField::AddressTo, to),
                (FormField::Amount, amount),
                (FormField::Keyword, keyword),
                (FormField::Message, message),
            ];
            for (field, value) in fields {
                provider.handle_change(Some(field.name()), value);
            }

            let Some(receipt) = provider.send_transaction().await? else {
                bail!("No wallet installed, nothing was sent");
            };
            info!(
                transfer_hash = %receipt.transfer_hash,
                log_hash = %receipt.log_hash,
                transaction_count = receipt.transaction_count,
                "Transfer logged"
            );
            println!("{}", render_receipt(&receipt));
        }
        Command::Transactions { json } => {
            let records = provider.get_all_transactions().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("{}", render_transactions(&records));
            }
        }
    }
    Ok(())
}
