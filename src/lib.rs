//! Elixir trade composer
//!
//! Builds unsigned Solana transactions that buy or sell fractions of an NFT
//! pool, either directly against the pool or routed through an Orca whirlpool
//! or a Raydium AMM.

pub mod chain;
pub mod compat;
pub mod config;
pub mod observability;
pub mod prices;
pub mod tx_builder;
pub mod types;
pub mod wallet;

pub mod test_utils;

// Re-export commonly used types
pub use chain::{AccountLookup, ChainClient, RpcChainClient};
pub use config::{ComposerConfig, Deployment};
pub use tx_builder::{ComposeError, Composer, TradeRequest, TransactionResult};
pub use wallet::{WalletManager, WalletSigner};

pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};
