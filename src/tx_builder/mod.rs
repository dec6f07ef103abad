//! Trade transaction composer
//!
//! Turns a trade request against a fractionalised NFT pool into an ordered
//! bundle of unsigned Solana transactions.
//!
//! ## Architecture
//!
//! - **errors**: error taxonomy shared by every step
//! - **pda**: program-derived address derivations
//! - **lookup_table**: pool and programs address lookup tables
//! - **amounts**: SOL bound adjustment per venue and direction
//! - **venue**: direct pool, Orca whirlpool and Raydium strategies
//! - **context**: trade request, pool context and derived trade accounts
//! - **instructions**: named account layouts, instruction data, ordering checks
//! - **remaining**: remaining-accounts tail (venue accounts, pNFT extension)
//! - **appraisal**: appraisal prerequisite gate and service client
//! - **output**: composed transactions and the result returned to callers
//! - **builder**: the [`Composer`] that ties the steps together
//!
//! ## Ordering
//!
//! A bundle is at most two transactions: the appraisal transaction when one
//! is needed, then the v0 trade transaction. Inside the trade the order is
//! compute limit, compute price, optional `init_fee`, trade.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use elixir_compose::chain::RpcChainClient;
//! use elixir_compose::config::ComposerConfig;
//! use elixir_compose::tx_builder::{Composer, ComposeError};
//!
//! # async fn example() -> Result<(), ComposeError> {
//! let config = ComposerConfig::from_file("config.toml")?;
//! let chain = Arc::new(RpcChainClient::new(&config.rpc)?);
//! let composer = Composer::from_config(&config, chain)?;
//! // let result = composer.compose(Some(&wallet), &request, &ctx, &metadata).await?;
//! # Ok(())
//! # }
//! ```

pub mod amounts;
pub mod appraisal;
pub mod builder;
pub mod context;
pub mod errors;
pub mod instructions;
pub mod lookup_table;
pub mod output;
pub mod pda;
pub mod remaining;
pub mod venue;

pub use amounts::{sol_to_lamports, FeeSchedule, LAMPORTS_PER_SOL};
pub use appraisal::{ensure_appraisal, AppraisalClient, AppraisalOutcome, AppraisalTarget};
pub use builder::{package, Composer};
pub use context::{PoolContext, TradeAccounts, TradeAction, TradeRequest};
pub use errors::ComposeError;
pub use instructions::{plan_trade_instructions, sanity_check_ix_order, InstructionPlan};
pub use lookup_table::{programs_table, PoolLookupTable};
pub use output::{ComposeFailure, ComposedTransaction, TransactionResult};
pub use venue::{TradeSide, Venue, VenueKind, VenueStrategy, WhirlpoolAccounts};

pub type Result<T> = std::result::Result<T, ComposeError>;
