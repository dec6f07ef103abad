//! Configuration module for the trade composer
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides the immutable [`Deployment`]
//! description of every on-chain program and account the composer targets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey};

use crate::tx_builder::amounts::FeeSchedule;
use crate::types::PriorityFee;

/// Environment variable overriding `rpc.url`
pub const ENV_RPC_URL: &str = "ELIXIR_RPC_URL";
/// Environment variable overriding `service.api_url`
pub const ENV_API_URL: &str = "ELIXIR_API_URL";

/// Main composer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Program IDs and well-known accounts
    pub deployment: Deployment,

    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Appraisal and pricing HTTP services
    pub service: ServiceConfig,

    /// Compute budget per trade transaction
    #[serde(default)]
    pub compute: ComputeConfig,

    /// Venue fee constants
    #[serde(default)]
    pub fees: FeeSchedule,

    /// Appraisal gate behaviour
    #[serde(default)]
    pub appraisal: AppraisalConfig,

    /// Wallet used by the CLI
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Immutable description of the deployed programs
///
/// Passed into the composer once; nothing in the build path reads globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Owner of the pool, vault, appraisal and fraction-mint PDAs
    #[serde(with = "pubkey_string")]
    pub elixir_program: Pubkey,

    /// Vault program; owner of the external-account PDA
    #[serde(with = "pubkey_string")]
    pub vault_program: Pubkey,

    #[serde(with = "pubkey_string")]
    pub amm_program: Pubkey,

    #[serde(default = "default_compose_program", with = "pubkey_string")]
    pub compose_program: Pubkey,

    #[serde(default = "default_fee_program", with = "pubkey_string")]
    pub fee_program: Pubkey,

    #[serde(default = "default_treasury", with = "pubkey_string")]
    pub treasury: Pubkey,

    /// Address of the global programs lookup table
    #[serde(default = "default_programs_lookup_table", with = "pubkey_string")]
    pub programs_lookup_table: Pubkey,

    /// Appraiser authority sent to the appraisal service
    #[serde(default = "default_appraiser", with = "pubkey_string")]
    pub appraiser: Pubkey,

    #[serde(default = "default_whirlpool_program", with = "pubkey_string")]
    pub whirlpool_program: Pubkey,

    #[serde(default = "default_token_metadata_program", with = "pubkey_string")]
    pub token_metadata_program: Pubkey,

    #[serde(default = "default_token_auth_rules_program", with = "pubkey_string")]
    pub token_auth_rules_program: Pubkey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment used for account lookups and blockhash fetches
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the API hosting `appraiser/ix`
    pub api_url: String,

    /// Pool prices endpoint
    pub prices_url: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Compute unit limit for direct-pool trades
    #[serde(default = "default_direct_cu_limit")]
    pub direct_unit_limit: u32,

    /// Compute unit limit for external-venue trades
    #[serde(default = "default_venue_cu_limit")]
    pub venue_unit_limit: u32,

    /// Priority tier used when the request does not name one
    #[serde(default)]
    pub default_priority_fee: PriorityFee,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppraisalConfig {
    /// Turn a failed appraisal request into a failed composition
    #[serde(default)]
    pub block_on_failure: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default)]
    pub keypair_path: Option<String>,
}

// Default value functions
fn default_compose_program() -> Pubkey { pubkey!("E1XRkj9fPF2NQUdoq41AHPqwMDHykYfn5PzBXAyDs7Be") }
fn default_fee_program() -> Pubkey { pubkey!("fee6uQpfQYhfZUxiYLvpAjuCGNE7NTJrCoXV8tsqsn6") }
fn default_treasury() -> Pubkey { pubkey!("6kLLewcYCvUK6xLQE1ep36ReamuTLFuTWwhCnbMCb3pd") }
fn default_programs_lookup_table() -> Pubkey { pubkey!("4oA28x6ZA1sNPvXLWLG7aNcoPoNj4a6F3QYPyTS2HvYE") }
fn default_appraiser() -> Pubkey { pubkey!("3RDTwtVmMcH9zvzqj8mZi9GH8apqWpRZyXB9DWL7QqrP") }
fn default_whirlpool_program() -> Pubkey { pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc") }
fn default_token_metadata_program() -> Pubkey { pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s") }
fn default_token_auth_rules_program() -> Pubkey { pubkey!("auth9SigNpDKz4sJJ1DfCTuZrZNSAgh9sFD3rboVmgg") }
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_service_timeout() -> u64 { 15 }
fn default_direct_cu_limit() -> u32 { 800_000 }
fn default_venue_cu_limit() -> u32 { 1_400_000 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            direct_unit_limit: default_direct_cu_limit(),
            venue_unit_limit: default_venue_cu_limit(),
            default_priority_fee: PriorityFee::default(),
        }
    }
}

impl Deployment {
    /// Deployment with the published program IDs and the two
    /// deployment-specific programs supplied by the caller
    pub fn new(elixir_program: Pubkey, vault_program: Pubkey, amm_program: Pubkey) -> Self {
        Self {
            elixir_program,
            vault_program,
            amm_program,
            compose_program: default_compose_program(),
            fee_program: default_fee_program(),
            treasury: default_treasury(),
            programs_lookup_table: default_programs_lookup_table(),
            appraiser: default_appraiser(),
            whirlpool_program: default_whirlpool_program(),
            token_metadata_program: default_token_metadata_program(),
            token_auth_rules_program: default_token_auth_rules_program(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("elixir_program", self.elixir_program),
            ("vault_program", self.vault_program),
            ("amm_program", self.amm_program),
            ("compose_program", self.compose_program),
            ("fee_program", self.fee_program),
            ("treasury", self.treasury),
        ];
        for (name, key) in required {
            if key == Pubkey::default() {
                anyhow::bail!("deployment.{} must not be the default address", name);
            }
        }
        Ok(())
    }
}

impl ComposerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ComposerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable source (the process environment in
    /// production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|v| !v.is_empty()) {
            self.rpc.url = url;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.service.api_url = url;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.deployment.validate()?;
        self.fees.validate()?;
        if self.service.api_url.is_empty() {
            anyhow::bail!("service.api_url must be set");
        }
        if self.compute.direct_unit_limit == 0 || self.compute.venue_unit_limit == 0 {
            anyhow::bail!("compute unit limits must be positive");
        }
        Ok(())
    }
}

/// Serde adapter storing a `Pubkey` as its base58 string
pub mod pubkey_string {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.serialize_some(&key.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            let s: Option<String> = Option::deserialize(deserializer)?;
            s.map(|s| Pubkey::from_str(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
