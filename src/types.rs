//! Common types used throughout the composer

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::config::pubkey_string;

/// Token standard of the underlying asset, as reported by its metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStandard {
    NonFungible,
    FungibleAsset,
    Fungible,
    NonFungibleEdition,
    ProgrammableNonFungible,
}

impl TokenStandard {
    /// Programmable assets need token records, the rule set and creator
    /// payout accounts on every transfer.
    pub fn is_programmable(&self) -> bool {
        matches!(self, TokenStandard::ProgrammableNonFungible)
    }
}

/// Creator entry from the asset metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(default)]
    pub verified: bool,
    pub share: u8,
}

/// On-chain data section of the asset metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NftData {
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub seller_fee_basis_points: u16,
    #[serde(default)]
    pub creators: Option<Vec<Creator>>,
}

/// Off-chain JSON metadata (only the fields the composer reads)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtraMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Asset metadata supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    pub data: NftData,
    pub token_standard: TokenStandard,
    #[serde(default)]
    pub extra_metadata: ExtraMetadata,
    #[serde(default, with = "pubkey_string::option")]
    pub programmable_config: Option<Pubkey>,
}

impl NftMetadata {
    /// Creators that receive a payout, in metadata order
    pub fn paid_creators(&self) -> impl Iterator<Item = &Creator> {
        self.data
            .creators
            .iter()
            .flatten()
            .filter(|creator| creator.share != 0)
    }

    /// Display name used in progress labels
    ///
    /// On-chain names are NUL padded; the off-chain name is the fallback.
    pub fn asset_name(&self) -> String {
        let name = self.data.name.replace('\0', "");
        if !name.is_empty() {
            return name;
        }
        let name = self.extra_metadata.name.replace('\0', "");
        if !name.is_empty() {
            return name;
        }
        "Unknown Asset".to_string()
    }
}

/// Priority fee tiers, in micro-lamports per compute unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityFee {
    None,
    #[default]
    BaseLine,
    High,
}

impl PriorityFee {
    pub fn micro_lamports(&self) -> u64 {
        match self {
            PriorityFee::None => 0,
            PriorityFee::BaseLine => 500_000,
            PriorityFee::High => 1_000_000,
        }
    }
}

/// Price observation for one side of a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub price: Option<f64>,
    pub cumulative_price: Option<f64>,
    #[serde(default)]
    pub observation_id: Option<String>,
    #[serde(default)]
    pub ticks: Option<Vec<String>>,
}

/// Whirlpool venue quote for a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrcaPoolInfo {
    pub mint: String,
    pub collection_id: String,
    pub whirlpool: String,
    pub oracle: String,
    pub token_vault_a: String,
    pub token_vault_b: String,
    pub token_price: f64,
    #[serde(default)]
    pub buys: Vec<Price>,
    #[serde(default)]
    pub sells: Vec<Price>,
}

/// Raydium venue quote for a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaydiumPoolInfo {
    pub mint: String,
    pub collection_id: String,
    pub token_price: f64,
    #[serde(default)]
    pub buys: Vec<Price>,
    #[serde(default)]
    pub sells: Vec<Price>,
}

/// Pool price record returned by the pricing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfoV2 {
    pub mint: String,
    pub collection_id: String,
    pub fee: f64,
    pub royalty: f64,
    pub token_price: f64,
    pub raydium: Option<RaydiumPoolInfo>,
    pub orca: Option<OrcaPoolInfo>,
}
