//! Veil Wallet CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veil_wallet::commands::{self, CliContext};
use veil_wallet::config::{default_config_path, default_data_dir, WalletConfig};

#[derive(Parser)]
#[command(name = "veil-wallet")]
#[command(about = "Veil wallet - confidential payments from the command line")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Wallet identifier
    #[arg(short, long, global = true)]
    wallet: Option<String>,

    /// Custom config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet
    Create {
        /// Recover from existing mnemonic
        #[arg(long)]
        recover: bool,
    },

    /// List wallets
    List,

    /// Delete a wallet from this machine
    Remove {
        /// Wallet identifier
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show wallet receive addresses
    Address {
        /// Derive a new address
        #[arg(long)]
        new: bool,
    },

    /// Check wallet balance
    Balance,

    /// Receive a payment by its payment id
    Receive {
        /// Payment id given by the sender
        payment_id: String,
    },

    /// Re-import outputs by payment id after restoring a wallet
    Recover {
        /// Payment ids of the outputs to recover
        #[arg(required = true)]
        payment_ids: Vec<String>,

        /// Drop stored transactions first
        #[arg(long)]
        reset: bool,
    },

    /// Send VEIL to an address
    Send {
        /// Recipient address
        address: String,

        /// Amount to send
        amount: String,

        /// Fee; derived from the configured rate when omitted
        #[arg(long)]
        fee: Option<String>,

        /// Memo for the recipient
        #[arg(long, default_value = "")]
        memo: String,

        /// Send as a stake deposit
        #[arg(long)]
        stake: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show transaction history
    History {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let ctx = CliContext {
        config: WalletConfig::load_or_default(&config_path)?,
        data_dir: default_data_dir()?,
        wallet: cli.wallet,
    };

    match cli.command {
        Commands::Create { recover } => commands::create::run(&ctx, recover),
        Commands::List => {
            use veil_wallet::store::StoreProvider;
            for identifier in ctx.provider().list()? {
                println!("{identifier}");
            }
            Ok(())
        }
        Commands::Remove { identifier, yes } => commands::remove::run(&ctx, &identifier, yes),
        Commands::Address { new } => commands::address::run(&ctx, new),
        Commands::Balance => commands::balance::run(&ctx),
        Commands::Receive { payment_id } => commands::receive::run(&ctx, &payment_id).await,
        Commands::Recover { payment_ids, reset } => {
            commands::recover::run(&ctx, &payment_ids, reset).await
        }
        Commands::Send {
            address,
            amount,
            fee,
            memo,
            stake,
            yes,
        } => {
            commands::send::run(&ctx, &address, &amount, fee.as_deref(), &memo, stake, yes).await
        }
        Commands::History { limit } => commands::history::run(&ctx, limit),
    }
}
