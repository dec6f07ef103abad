//! Remaining-accounts tail of a trade instruction
//!
//! The tail is the venue's base accounts followed, for programmable assets
//! only, by the token-record block and one writable entry per paid creator.

use solana_sdk::instruction::AccountMeta;

use super::context::TradeAccounts;
use super::errors::ComposeError;
use super::lookup_table::PoolLookupTable;
use super::venue::{TradeSide, VenueStrategy};
use crate::config::Deployment;
use crate::types::NftMetadata;

/// Accounts appended for a programmable asset before the creators
pub const PROGRAMMABLE_ACCOUNTS: usize = 4;

/// Build the full remaining-accounts tail for a trade
pub fn assemble(
    strategy: &dyn VenueStrategy,
    side: TradeSide,
    accounts: &TradeAccounts,
    table: &PoolLookupTable,
    metadata: &NftMetadata,
    deployment: &Deployment,
) -> Result<Vec<AccountMeta>, ComposeError> {
    let mut tail = strategy.base_tail(side, accounts, table, deployment);
    if metadata.token_standard.is_programmable() {
        tail.extend(programmable_extension(side, accounts, metadata, deployment)?);
    }
    Ok(tail)
}

/// Token records, rule set, auth-rules program and paid creators
///
/// Buys list the program's token record first; sells list the user's.
pub fn programmable_extension(
    side: TradeSide,
    accounts: &TradeAccounts,
    metadata: &NftMetadata,
    deployment: &Deployment,
) -> Result<Vec<AccountMeta>, ComposeError> {
    let config = metadata
        .programmable_config
        .ok_or_else(|| ComposeError::MissingProgrammableConfig(metadata.mint.to_string()))?;

    let (first, second) = match side {
        TradeSide::Buy => (accounts.program_token_record, accounts.user_token_record),
        TradeSide::Sell => (accounts.user_token_record, accounts.program_token_record),
    };

    let mut extension = vec![
        AccountMeta::new(first, false),
        AccountMeta::new(second, false),
        AccountMeta::new(config, false),
        AccountMeta::new_readonly(deployment.token_auth_rules_program, false),
    ];
    extension.extend(
        metadata
            .paid_creators()
            .map(|creator| AccountMeta::new(creator.address, false)),
    );
    Ok(extension)
}
