//! Trade request and pool context
//!
//! [`TradeAccounts`] holds every address a trade touches. It is derived once
//! per composition and then read by the named layouts and the
//! remaining-accounts tail, so each address is computed in exactly one place.

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, system_program, sysvar};

use super::errors::ComposeError;
use super::instructions::Slot;
use super::lookup_table::PoolLookupTable;
use super::pda;
use super::venue::{TradeSide, Venue};
use crate::config::Deployment;
use crate::types::{NftMetadata, PriorityFee};

/// Direction and bound of a trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum TradeAction {
    Buy {
        /// Whole fractions to buy; the program counts hundredths
        num_fractions: u64,
        /// Spend ceiling in SOL
        #[serde(default)]
        max_sol_to_spend: Option<f64>,
    },
    Sell {
        /// Proceeds floor in SOL
        #[serde(default)]
        min_sol_received: Option<f64>,
    },
}

impl TradeAction {
    pub fn side(&self) -> TradeSide {
        match self {
            TradeAction::Buy { .. } => TradeSide::Buy,
            TradeAction::Sell { .. } => TradeSide::Sell,
        }
    }

    pub fn user_bound(&self) -> Option<f64> {
        match self {
            TradeAction::Buy {
                max_sol_to_spend, ..
            } => *max_sol_to_spend,
            TradeAction::Sell { min_sol_received } => *min_sol_received,
        }
    }
}

/// What the caller wants to trade and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub venue: Venue,
    pub action: TradeAction,
    /// Swap the pool tokens into or out of fractions as part of the trade
    #[serde(default)]
    pub do_swap: bool,
    #[serde(default)]
    pub priority_fee: Option<PriorityFee>,
}

/// The pool an asset trades against
#[derive(Debug, Clone)]
pub struct PoolContext {
    /// Fraction mint of the asset; required to buy
    pub fraction_mint: Option<Pubkey>,
    pub asset_mint: Pubkey,
    pub pool_mint: Pubkey,
    pub lookup_table: PoolLookupTable,
}

/// Every address one trade touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeAccounts {
    pub initializer: Pubkey,
    pub asset_mint: Pubkey,
    pub fractions_mint: Pubkey,
    pub pool_mint: Pubkey,
    /// Random seed of the throwaway fraction mint (sells only)
    pub nonce: Option<[u8; 32]>,

    pub pool_account: Pubkey,
    pub vault_account: Pubkey,
    pub external_account: Pubkey,
    pub appraisal_account: Pubkey,
    pub fee_collector: Pubkey,
    pub fee_record: Pubkey,

    pub initializer_sol_ta: Pubkey,
    pub initializer_nft_ta: Pubkey,
    pub initializer_fractions_ta: Pubkey,
    pub initializer_pool_ta: Pubkey,
    pub vault_program_nft_ta: Pubkey,
    pub vault_program_fractions_ta: Pubkey,
    pub fee_record_sol_ta: Pubkey,
    pub treasury_sol_fee_ta: Pubkey,
    pub treasury_pool_fee_ta: Pubkey,

    pub asset_metadata: Pubkey,
    pub asset_edition: Pubkey,
    pub fraction_metadata: Pubkey,
    pub user_token_record: Pubkey,
    pub program_token_record: Pubkey,
}

impl TradeAccounts {
    /// Derive the accounts of a trade
    ///
    /// Buys trade the pool's existing fraction mint. Sells mint a throwaway
    /// fraction mint seeded by `nonce`, which must be supplied.
    pub fn derive(
        deployment: &Deployment,
        ctx: &PoolContext,
        metadata: &NftMetadata,
        wallet: &Pubkey,
        side: TradeSide,
        nonce: Option<[u8; 32]>,
    ) -> Result<Self, ComposeError> {
        let asset_mint = ctx.asset_mint;
        let pool_mint = ctx.pool_mint;

        let (fractions_mint, nonce) = match side {
            TradeSide::Buy => {
                let mint = ctx
                    .fraction_mint
                    .ok_or_else(|| ComposeError::MissingFractionMint(pool_mint.to_string()))?;
                (mint, None)
            }
            TradeSide::Sell => {
                let nonce = nonce.ok_or_else(|| {
                    ComposeError::instruction_failed(
                        deployment.compose_program.to_string(),
                        "sell requires a nonce",
                    )
                })?;
                (pda::throwaway_fraction_mint(deployment, &nonce)?, Some(nonce))
            }
        };

        if asset_mint != metadata.mint {
            tracing::debug!(
                asset_mint = %asset_mint,
                metadata_mint = %metadata.mint,
                "metadata mint differs from pool context asset mint"
            );
        }

        let pool_account = pda::pool_account(deployment, &pool_mint)?;
        let vault_account = pda::vault_account(deployment, &fractions_mint)?;
        let fee_collector = ctx.lookup_table.fee_collector();
        let fee_record = pda::fee_record(deployment, &pool_mint, &fee_collector)?;
        let wsol = spl_token::native_mint::id();

        let initializer_nft_ta = pda::ata(wallet, &asset_mint);
        let vault_program_nft_ta = pda::ata(&vault_account, &asset_mint);

        Ok(Self {
            initializer: *wallet,
            asset_mint,
            fractions_mint,
            pool_mint,
            nonce,
            pool_account,
            vault_account,
            external_account: pda::external_account(deployment, &pool_mint)?,
            appraisal_account: pda::appraisal_account(deployment, &pool_mint, &asset_mint)?,
            fee_collector,
            fee_record,
            initializer_sol_ta: pda::ata(wallet, &wsol),
            initializer_nft_ta,
            initializer_fractions_ta: pda::ata(wallet, &fractions_mint),
            initializer_pool_ta: pda::ata(wallet, &pool_mint),
            vault_program_nft_ta,
            vault_program_fractions_ta: pda::ata(&pool_account, &fractions_mint),
            fee_record_sol_ta: pda::ata(&fee_record, &wsol),
            treasury_sol_fee_ta: pda::ata(&deployment.treasury, &wsol),
            treasury_pool_fee_ta: pda::ata(&deployment.treasury, &pool_mint),
            asset_metadata: pda::metadata_account(deployment, &asset_mint)?,
            asset_edition: pda::edition_account(deployment, &asset_mint)?,
            fraction_metadata: pda::metadata_account(deployment, &fractions_mint)?,
            user_token_record: pda::token_record(deployment, &asset_mint, &initializer_nft_ta)?,
            program_token_record: pda::token_record(deployment, &asset_mint, &vault_program_nft_ta)?,
        })
    }

    /// Address bound to a named slot
    pub fn resolve(&self, slot: Slot, deployment: &Deployment) -> Pubkey {
        match slot {
            Slot::Initializer => self.initializer,
            Slot::NftMint => self.asset_mint,
            Slot::NftMetadata => self.asset_metadata,
            Slot::NftEdition => self.asset_edition,
            Slot::FractionsMint => self.fractions_mint,
            Slot::PoolMint => self.pool_mint,
            Slot::VaultAccount => self.vault_account,
            Slot::PoolAccount => self.pool_account,
            Slot::InitializerSolTa => self.initializer_sol_ta,
            Slot::InitializerNftTa => self.initializer_nft_ta,
            Slot::InitializerFractionsTa => self.initializer_fractions_ta,
            Slot::InitializerPoolTa => self.initializer_pool_ta,
            Slot::VaultProgramNftTa => self.vault_program_nft_ta,
            Slot::VaultProgramFractionsTa => self.vault_program_fractions_ta,
            Slot::Treasury => deployment.treasury,
            Slot::TreasuryPoolFeeTa => self.treasury_pool_fee_ta,
            Slot::TreasurySolFeeTa => self.treasury_sol_fee_ta,
            Slot::ComposeFeeMint => spl_token::native_mint::id(),
            Slot::ComposeFeeAccount => self.fee_record,
            Slot::ComposeFeeSolTa => self.fee_record_sol_ta,
            Slot::FeeProgram => deployment.fee_program,
            Slot::VaultProgram => deployment.vault_program,
            Slot::AmmProgram => deployment.amm_program,
            Slot::MplTokenMetadata => deployment.token_metadata_program,
            Slot::AssociatedTokenProgram => spl_associated_token_account::id(),
            Slot::TokenProgram => spl_token::id(),
            Slot::SystemProgram => system_program::id(),
            Slot::Rent => sysvar::rent::id(),
            Slot::Clock => sysvar::clock::id(),
            Slot::InstructionsSysvar => sysvar::instructions::id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NftData, TokenStandard};

    fn fixture() -> (Deployment, PoolContext, NftMetadata) {
        let deployment =
            Deployment::new(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let entries: Vec<Pubkey> = (0..16).map(|_| Pubkey::new_unique()).collect();
        let asset_mint = Pubkey::new_unique();
        let ctx = PoolContext {
            fraction_mint: Some(Pubkey::new_unique()),
            asset_mint,
            pool_mint: Pubkey::new_unique(),
            lookup_table: PoolLookupTable::new(Pubkey::new_unique(), entries).unwrap(),
        };
        let metadata = NftMetadata {
            mint: asset_mint,
            data: NftData {
                name: "Asset".to_string(),
                ..Default::default()
            },
            token_standard: TokenStandard::NonFungible,
            extra_metadata: Default::default(),
            programmable_config: None,
        };
        (deployment, ctx, metadata)
    }

    #[test]
    fn test_buy_uses_pool_fraction_mint() {
        let (deployment, ctx, metadata) = fixture();
        let wallet = Pubkey::new_unique();
        let accounts =
            TradeAccounts::derive(&deployment, &ctx, &metadata, &wallet, TradeSide::Buy, None).unwrap();

        assert_eq!(Some(accounts.fractions_mint), ctx.fraction_mint);
        assert_eq!(accounts.nonce, None);
        assert_eq!(
            accounts.vault_account,
            pda::vault_account(&deployment, &accounts.fractions_mint).unwrap()
        );
        assert_eq!(
            accounts.vault_program_fractions_ta,
            pda::ata(&accounts.pool_account, &accounts.fractions_mint)
        );
        assert_eq!(accounts.fee_collector, ctx.lookup_table.fee_collector());
    }

    #[test]
    fn test_buy_without_fraction_mint_fails() {
        let (deployment, mut ctx, metadata) = fixture();
        ctx.fraction_mint = None;
        let err = TradeAccounts::derive(
            &deployment,
            &ctx,
            &metadata,
            &Pubkey::new_unique(),
            TradeSide::Buy,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::MissingFractionMint(_)));
    }

    #[test]
    fn test_sell_derives_mint_from_nonce() {
        let (deployment, ctx, metadata) = fixture();
        let nonce = [4u8; 32];
        let accounts = TradeAccounts::derive(
            &deployment,
            &ctx,
            &metadata,
            &Pubkey::new_unique(),
            TradeSide::Sell,
            Some(nonce),
        )
        .unwrap();

        assert_eq!(
            accounts.fractions_mint,
            pda::throwaway_fraction_mint(&deployment, &nonce).unwrap()
        );
        assert_ne!(Some(accounts.fractions_mint), ctx.fraction_mint);
        assert_eq!(
            accounts.fraction_metadata,
            pda::metadata_account(&deployment, &accounts.fractions_mint).unwrap()
        );
    }

    #[test]
    fn test_token_records_follow_token_accounts() {
        let (deployment, ctx, metadata) = fixture();
        let wallet = Pubkey::new_unique();
        let accounts =
            TradeAccounts::derive(&deployment, &ctx, &metadata, &wallet, TradeSide::Buy, None).unwrap();

        assert_eq!(
            accounts.user_token_record,
            pda::token_record(&deployment, &ctx.asset_mint, &pda::ata(&wallet, &ctx.asset_mint))
                .unwrap()
        );
        assert_eq!(
            accounts.program_token_record,
            pda::token_record(&deployment, &ctx.asset_mint, &accounts.vault_program_nft_ta).unwrap()
        );
    }

    #[test]
    fn test_resolve_constants() {
        let (deployment, ctx, metadata) = fixture();
        let accounts = TradeAccounts::derive(
            &deployment,
            &ctx,
            &metadata,
            &Pubkey::new_unique(),
            TradeSide::Buy,
            None,
        )
        .unwrap();

        assert_eq!(accounts.resolve(Slot::ComposeFeeMint, &deployment), spl_token::native_mint::id());
        assert_eq!(accounts.resolve(Slot::Treasury, &deployment), deployment.treasury);
        assert_eq!(accounts.resolve(Slot::ComposeFeeAccount, &deployment), accounts.fee_record);
        assert_eq!(accounts.resolve(Slot::Clock, &deployment), sysvar::clock::id());
    }

    #[test]
    fn test_request_json_shape() {
        let json = r#"{
            "venue": {"kind": "direct"},
            "action": {"side": "buy", "num_fractions": 3, "max_sol_to_spend": 2.0}
        }"#;
        let request: TradeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.venue, Venue::Direct);
        assert_eq!(request.action.side(), TradeSide::Buy);
        assert_eq!(request.action.user_bound(), Some(2.0));
        assert!(!request.do_swap);
        assert_eq!(request.priority_fee, None);
    }
}
