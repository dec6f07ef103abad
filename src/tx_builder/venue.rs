//! Liquidity venues and their trade strategies
//!
//! A [`Venue`] names where a trade settles. Each venue resolves to a
//! [`VenueStrategy`] that knows the compose-program entry point, the named
//! account layout, the amount adjustment and the venue-specific head of the
//! remaining-accounts tail.

use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::AccountMeta, pubkey::Pubkey, system_program, sysvar};

use super::amounts::FeeSchedule;
use super::context::TradeAccounts;
use super::errors::ComposeError;
use super::instructions::{layout, Layout};
use super::lookup_table::PoolLookupTable;
use crate::config::{pubkey_string, Deployment};
use crate::types::NftMetadata;

/// Lowest sqrt price the whirlpool accepts; a buy may walk the price down to it
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;
/// Highest sqrt price the whirlpool accepts
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Venue without its payload, used for fee lookups and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueKind {
    Direct,
    Orca,
    Raydium,
}

impl std::fmt::Display for VenueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueKind::Direct => write!(f, "direct"),
            VenueKind::Orca => write!(f, "orca"),
            VenueKind::Raydium => write!(f, "raydium"),
        }
    }
}

/// Whirlpool liquidity accounts supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhirlpoolAccounts {
    #[serde(with = "pubkey_string")]
    pub whirlpool: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_vault_a: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_vault_b: Pubkey,
    #[serde(with = "pubkey_string")]
    pub tick_array_0: Pubkey,
    #[serde(with = "pubkey_string")]
    pub tick_array_1: Pubkey,
    #[serde(with = "pubkey_string")]
    pub tick_array_2: Pubkey,
    #[serde(with = "pubkey_string")]
    pub oracle: Pubkey,
}

impl WhirlpoolAccounts {
    /// The seven pool accounts in swap order, all writable
    pub fn metas(&self) -> [AccountMeta; 7] {
        [
            AccountMeta::new(self.whirlpool, false),
            AccountMeta::new(self.token_vault_a, false),
            AccountMeta::new(self.token_vault_b, false),
            AccountMeta::new(self.tick_array_0, false),
            AccountMeta::new(self.tick_array_1, false),
            AccountMeta::new(self.tick_array_2, false),
            AccountMeta::new(self.oracle, false),
        ]
    }
}

/// Where a trade settles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Venue {
    /// The pool's own reserves
    Direct,
    /// Concentrated-liquidity whirlpool
    Orca(WhirlpoolAccounts),
    /// Constant-product AMM
    Raydium,
}

impl Venue {
    pub fn kind(&self) -> VenueKind {
        match self {
            Venue::Direct => VenueKind::Direct,
            Venue::Orca(_) => VenueKind::Orca,
            Venue::Raydium => VenueKind::Raydium,
        }
    }

    pub fn strategy(&self) -> Box<dyn VenueStrategy + '_> {
        match self {
            Venue::Direct => Box::new(DirectVenue),
            Venue::Orca(pool) => Box::new(OrcaVenue { pool }),
            Venue::Raydium => Box::new(RaydiumVenue),
        }
    }
}

/// Per-venue trade construction
pub trait VenueStrategy {
    fn kind(&self) -> VenueKind;

    /// Compose-program instruction name
    fn entry_point(&self, side: TradeSide) -> &'static str;

    /// Named accounts of the entry point, in ABI order
    fn layout(&self, side: TradeSide) -> &'static Layout;

    /// Sqrt price bound passed to the swap, if the venue takes one
    fn sqrt_price_limit(&self, _side: TradeSide) -> Option<u128> {
        None
    }

    /// Whether a missing fee record must be initialised before the trade
    fn requires_fee_record(&self, _side: TradeSide) -> bool {
        false
    }

    /// User bound converted to the lamport amount the program expects
    fn adjust_amount(&self, fees: &FeeSchedule, side: TradeSide, user_bound: Option<f64>) -> u64 {
        fees.adjusted_bound(self.kind(), side, user_bound)
    }

    /// Derive every address the trade touches
    fn derive_accounts(
        &self,
        deployment: &Deployment,
        ctx: &super::context::PoolContext,
        metadata: &NftMetadata,
        wallet: &Pubkey,
        side: TradeSide,
        nonce: Option<[u8; 32]>,
    ) -> Result<TradeAccounts, ComposeError> {
        TradeAccounts::derive(deployment, ctx, metadata, wallet, side, nonce)
    }

    /// Venue-specific remaining accounts, before the programmable extension
    fn base_tail(
        &self,
        side: TradeSide,
        accounts: &TradeAccounts,
        table: &PoolLookupTable,
        deployment: &Deployment,
    ) -> Vec<AccountMeta>;
}

/// Trades against the pool's own reserves
pub struct DirectVenue;

impl VenueStrategy for DirectVenue {
    fn kind(&self) -> VenueKind {
        VenueKind::Direct
    }

    fn entry_point(&self, side: TradeSide) -> &'static str {
        match side {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    fn layout(&self, side: TradeSide) -> &'static Layout {
        match side {
            TradeSide::Buy => &layout::DIRECT_BUY,
            TradeSide::Sell => &layout::DIRECT_SELL,
        }
    }

    fn requires_fee_record(&self, side: TradeSide) -> bool {
        side == TradeSide::Buy
    }

    fn base_tail(
        &self,
        side: TradeSide,
        accounts: &TradeAccounts,
        table: &PoolLookupTable,
        _deployment: &Deployment,
    ) -> Vec<AccountMeta> {
        let mut tail = Vec::with_capacity(17);
        if side == TradeSide::Sell {
            tail.push(AccountMeta::new(accounts.fraction_metadata, false));
        }
        tail.push(AccountMeta::new(accounts.appraisal_account, false));
        tail.extend(table.route_metas());
        if side == TradeSide::Sell {
            tail.push(AccountMeta::new_readonly(accounts.asset_metadata, false));
        }
        tail
    }
}

/// Routes through a whirlpool
pub struct OrcaVenue<'a> {
    pub pool: &'a WhirlpoolAccounts,
}

impl VenueStrategy for OrcaVenue<'_> {
    fn kind(&self) -> VenueKind {
        VenueKind::Orca
    }

    fn entry_point(&self, side: TradeSide) -> &'static str {
        match side {
            TradeSide::Buy => "orca_buy",
            TradeSide::Sell => "orca_sell",
        }
    }

    fn layout(&self, _side: TradeSide) -> &'static Layout {
        &layout::ORCA
    }

    fn sqrt_price_limit(&self, side: TradeSide) -> Option<u128> {
        Some(match side {
            TradeSide::Buy => MIN_SQRT_PRICE,
            TradeSide::Sell => MAX_SQRT_PRICE,
        })
    }

    fn base_tail(
        &self,
        side: TradeSide,
        accounts: &TradeAccounts,
        _table: &PoolLookupTable,
        deployment: &Deployment,
    ) -> Vec<AccountMeta> {
        let mut tail = Vec::with_capacity(12);
        if side == TradeSide::Sell {
            tail.push(AccountMeta::new(accounts.asset_metadata, false));
        }
        tail.extend(self.pool.metas());
        tail.push(AccountMeta::new(accounts.appraisal_account, false));
        tail.push(AccountMeta::new_readonly(deployment.whirlpool_program, false));
        if side == TradeSide::Sell {
            tail.push(AccountMeta::new_readonly(sysvar::instructions::id(), false));
            tail.push(AccountMeta::new(accounts.asset_edition, false));
        }
        tail
    }
}

/// Routes through the constant-product AMM
pub struct RaydiumVenue;

impl VenueStrategy for RaydiumVenue {
    fn kind(&self) -> VenueKind {
        VenueKind::Raydium
    }

    fn entry_point(&self, side: TradeSide) -> &'static str {
        match side {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    fn layout(&self, side: TradeSide) -> &'static Layout {
        match side {
            TradeSide::Buy => &layout::RAYDIUM_BUY,
            TradeSide::Sell => &layout::RAYDIUM_SELL,
        }
    }

    fn base_tail(
        &self,
        side: TradeSide,
        accounts: &TradeAccounts,
        table: &PoolLookupTable,
        deployment: &Deployment,
    ) -> Vec<AccountMeta> {
        let mut tail = Vec::with_capacity(21);
        match side {
            TradeSide::Buy => {
                tail.push(AccountMeta::new(accounts.appraisal_account, false));
                tail.extend(table.route_metas());
                tail.push(AccountMeta::new_readonly(system_program::id(), false));
                tail.push(AccountMeta::new_readonly(sysvar::instructions::id(), false));
                tail.push(AccountMeta::new_readonly(deployment.token_metadata_program, false));
                tail.push(AccountMeta::new_readonly(spl_associated_token_account::id(), false));
                tail.push(AccountMeta::new(accounts.asset_edition, false));
            }
            TradeSide::Sell => {
                tail.push(AccountMeta::new(accounts.asset_metadata, false));
                tail.push(AccountMeta::new(accounts.appraisal_account, false));
                tail.extend(table.route_metas());
                tail.push(AccountMeta::new_readonly(sysvar::instructions::id(), false));
                tail.push(AccountMeta::new(accounts.asset_edition, false));
            }
        }
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whirlpool() -> WhirlpoolAccounts {
        WhirlpoolAccounts {
            whirlpool: Pubkey::new_unique(),
            token_vault_a: Pubkey::new_unique(),
            token_vault_b: Pubkey::new_unique(),
            tick_array_0: Pubkey::new_unique(),
            tick_array_1: Pubkey::new_unique(),
            tick_array_2: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_entry_points() {
        let pool = whirlpool();
        let orca = Venue::Orca(pool);
        assert_eq!(Venue::Direct.strategy().entry_point(TradeSide::Buy), "buy");
        assert_eq!(Venue::Raydium.strategy().entry_point(TradeSide::Sell), "sell");
        assert_eq!(orca.strategy().entry_point(TradeSide::Buy), "orca_buy");
        assert_eq!(orca.strategy().entry_point(TradeSide::Sell), "orca_sell");
    }

    #[test]
    fn test_only_orca_takes_price_limit() {
        let orca = Venue::Orca(whirlpool());
        assert_eq!(orca.strategy().sqrt_price_limit(TradeSide::Buy), Some(4295048016));
        assert_eq!(
            orca.strategy().sqrt_price_limit(TradeSide::Sell),
            Some(79226673515401279992447579055)
        );
        assert_eq!(Venue::Direct.strategy().sqrt_price_limit(TradeSide::Buy), None);
        assert_eq!(Venue::Raydium.strategy().sqrt_price_limit(TradeSide::Sell), None);
    }

    #[test]
    fn test_only_direct_initialises_fee_record() {
        assert!(Venue::Direct.strategy().requires_fee_record(TradeSide::Buy));
        assert!(!Venue::Direct.strategy().requires_fee_record(TradeSide::Sell));
        for side in [TradeSide::Buy, TradeSide::Sell] {
            assert!(!Venue::Raydium.strategy().requires_fee_record(side));
            assert!(!Venue::Orca(whirlpool()).strategy().requires_fee_record(side));
        }
    }

    #[test]
    fn test_whirlpool_metas_order() {
        let pool = whirlpool();
        let metas = pool.metas();
        assert_eq!(metas[0].pubkey, pool.whirlpool);
        assert_eq!(metas[6].pubkey, pool.oracle);
        assert!(metas.iter().all(|m| m.is_writable && !m.is_signer));
    }

    #[test]
    fn test_venue_serde_tagged() {
        let json = serde_json::to_string(&Venue::Raydium).unwrap();
        assert_eq!(json, r#"{"kind":"raydium"}"#);

        let pool = whirlpool();
        let json = serde_json::to_string(&Venue::Orca(pool.clone())).unwrap();
        let back: Venue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Venue::Orca(pool));
    }
}
