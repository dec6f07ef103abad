//! Elixir trade composer CLI
//!
//! Thin command-line front end over the library:
//!
//! - `prices`: list pool prices from the pricing service
//! - `compose`: compose a trade from a JSON request file and print the
//!   base64 transactions with their step labels

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elixir_compose::chain::RpcChainClient;
use elixir_compose::config::ComposerConfig;
use elixir_compose::prices::PricesClient;
use elixir_compose::tx_builder::{Composer, PoolContext, TradeRequest};
use elixir_compose::types::NftMetadata;
use elixir_compose::wallet::{WalletManager, WalletSigner};
use elixir_compose::Pubkey;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List pool prices
    Prices {
        /// Only show these pool mints (repeatable)
        #[arg(long = "mint")]
        mints: Vec<String>,

        /// Depth of the price ladder per pool
        #[arg(long)]
        num_nfts: Option<u32>,
    },

    /// Compose a trade and print its transactions
    Compose {
        /// JSON file holding the request, pool and asset metadata
        #[arg(long)]
        request: String,
    },
}

/// Pool description as written in a request file
#[derive(Debug, Deserialize)]
struct PoolSpec {
    #[serde(default)]
    fraction_mint: Option<String>,
    asset_mint: String,
    pool_mint: String,
    lookup_table: String,
}

#[derive(Debug, Deserialize)]
struct RequestFile {
    request: TradeRequest,
    pool: PoolSpec,
    metadata: NftMetadata,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), config = %args.config, "starting");
    let config = ComposerConfig::from_file_with_env(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    match args.command {
        Command::Prices { mints, num_nfts } => run_prices(&config, mints, num_nfts).await,
        Command::Compose { request } => run_compose(&config, &request).await,
    }
}

async fn run_prices(config: &ComposerConfig, mints: Vec<String>, num_nfts: Option<u32>) -> Result<()> {
    let client = PricesClient::from_config(&config.service)?;
    let filter = (!mints.is_empty()).then_some(mints.as_slice());
    let prices = client
        .retrieve_prices(filter, num_nfts)
        .await
        .context("Failed to retrieve prices")?;

    info!(count = prices.len(), "prices retrieved");
    println!("{}", serde_json::to_string_pretty(&prices)?);
    Ok(())
}

async fn run_compose(config: &ComposerConfig, path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path))?;
    let file: RequestFile = serde_json::from_str(&content).context("Failed to parse request file")?;

    let chain = Arc::new(RpcChainClient::new(&config.rpc)?);
    let table_address = parse_pubkey("pool.lookup_table", &file.pool.lookup_table)?;
    let lookup_table = chain
        .fetch_pool_table(&table_address)
        .await
        .context("Failed to load pool lookup table")?;
    let ctx = PoolContext {
        fraction_mint: file
            .pool
            .fraction_mint
            .as_deref()
            .map(|s| parse_pubkey("pool.fraction_mint", s))
            .transpose()?,
        asset_mint: parse_pubkey("pool.asset_mint", &file.pool.asset_mint)?,
        pool_mint: parse_pubkey("pool.pool_mint", &file.pool.pool_mint)?,
        lookup_table,
    };

    let wallet = match &config.wallet.keypair_path {
        Some(path) => Some(WalletManager::from_file(path).context("Failed to load wallet")?),
        None => {
            warn!("no wallet.keypair_path configured");
            None
        }
    };

    let composer = Composer::from_config(config, chain)?;
    let result = composer
        .compose(
            wallet.as_ref().map(|w| w as &dyn WalletSigner),
            &file.request,
            &ctx,
            &file.metadata,
        )
        .await
        .context("Composition failed")?;

    let transactions = result
        .transactions
        .iter()
        .map(|tx| tx.to_base64())
        .collect::<Result<Vec<_>, _>>()?;
    let output = json!({
        "status": result.status,
        "failure": result.failure.as_ref().map(|f| f.to_string()),
        "steps": result.steps,
        "transactions": transactions,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("{} is not a valid pubkey: {}", field, value))
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "elixir_compose=debug,info"
    } else {
        "elixir_compose=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    // Logs go to stderr; stdout carries command output
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }
    Ok(())
}
