//! Conversion of user-facing SOL bounds into venue amounts
//!
//! Bounds arrive in SOL as `Option<f64>`; an absent bound means zero, which
//! the on-chain programs treat as "no protection". The `*_sol` functions are
//! the pure adjustments; [`FeeSchedule::adjusted_bound`] applies the right one
//! for a venue and direction and converts to lamports.

use serde::{Deserialize, Serialize};

use super::venue::{TradeSide, VenueKind};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Per-venue fee constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fixed fee (SOL) the compose program withholds on external buys
    #[serde(default = "default_txn_fee")]
    pub buy_txn_fee: f64,

    /// Fixed fee (SOL) the compose program withholds on external sells
    #[serde(default = "default_txn_fee")]
    pub sell_txn_fee: f64,

    /// Swap fee rate of the constant-product venue
    #[serde(default = "default_raydium_fee_rate")]
    pub raydium_fee_rate: f64,

    /// Headroom added to the direct-pool spend bound
    #[serde(default = "default_direct_buy_margin")]
    pub direct_buy_margin: f64,
}

fn default_txn_fee() -> f64 { 0.01 }
fn default_raydium_fee_rate() -> f64 { 0.0025 }
fn default_direct_buy_margin() -> f64 { 0.05 }

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            buy_txn_fee: default_txn_fee(),
            sell_txn_fee: default_txn_fee(),
            raydium_fee_rate: default_raydium_fee_rate(),
            direct_buy_margin: default_direct_buy_margin(),
        }
    }
}

impl FeeSchedule {
    pub fn validate(&self) -> anyhow::Result<()> {
        let all = [
            self.buy_txn_fee,
            self.sell_txn_fee,
            self.raydium_fee_rate,
            self.direct_buy_margin,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            anyhow::bail!("fee constants must be finite and non-negative");
        }
        if self.raydium_fee_rate >= 1.0 {
            anyhow::bail!("raydium_fee_rate must be below 1");
        }
        Ok(())
    }

    /// Bound in SOL for a venue and direction, before lamport conversion
    pub fn adjusted_bound_sol(&self, venue: VenueKind, side: TradeSide, user_bound: Option<f64>) -> f64 {
        let bound = user_bound.unwrap_or(0.0);
        match (venue, side) {
            (VenueKind::Direct, TradeSide::Buy) => direct_buy_sol(bound, self.direct_buy_margin),
            (VenueKind::Direct, TradeSide::Sell) => bound,
            (VenueKind::Orca, TradeSide::Buy) => orca_buy_sol(bound, self.buy_txn_fee),
            (VenueKind::Orca, TradeSide::Sell) => bound + self.sell_txn_fee,
            (VenueKind::Raydium, TradeSide::Buy) => {
                raydium_buy_sol(bound, self.buy_txn_fee, self.raydium_fee_rate)
            }
            (VenueKind::Raydium, TradeSide::Sell) => {
                raydium_sell_sol(bound, self.sell_txn_fee, self.raydium_fee_rate)
            }
        }
    }

    /// Bound in lamports for a venue and direction
    ///
    /// The whirlpool buy gets one extra lamport after conversion. A bound at
    /// or below the transaction fee stays 0, meaning no protection.
    pub fn adjusted_bound(&self, venue: VenueKind, side: TradeSide, user_bound: Option<f64>) -> u64 {
        let lamports = sol_to_lamports(self.adjusted_bound_sol(venue, side, user_bound));
        match (venue, side) {
            (VenueKind::Orca, TradeSide::Buy) if lamports > 0 => lamports.saturating_add(1),
            _ => lamports,
        }
    }
}

/// SOL to lamports, truncating and saturating at zero
pub fn sol_to_lamports(sol: f64) -> u64 {
    if !sol.is_finite() || sol <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX
    (sol * LAMPORTS_PER_SOL) as u64
}

pub fn direct_buy_sol(user_max: f64, margin: f64) -> f64 {
    user_max * (1.0 + margin)
}

/// Whirlpool buy spend without the trailing lamport
pub fn orca_buy_sol(user_max: f64, buy_txn_fee: f64) -> f64 {
    user_max - buy_txn_fee
}

pub fn raydium_buy_sol(user_max: f64, buy_txn_fee: f64, fee_rate: f64) -> f64 {
    (user_max - buy_txn_fee) * (1.0 + fee_rate)
}

pub fn raydium_sell_sol(user_min: f64, sell_txn_fee: f64, fee_rate: f64) -> f64 {
    (user_min + sell_txn_fee) / (1.0 - fee_rate)
}
