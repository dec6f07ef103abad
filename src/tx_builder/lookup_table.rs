//! Address lookup tables used to compress trade transactions
//!
//! Two tables are attached to every trade: the global programs table, built
//! from the [`Deployment`], and the pool table supplied by the caller. The
//! pool table is a positional contract with the on-chain programs, so it is
//! validated once at construction and read through named accessors.

use solana_sdk::{
    address_lookup_table::{state::AddressLookupTable, AddressLookupTableAccount},
    instruction::AccountMeta,
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::errors::ComposeError;
use crate::config::Deployment;

/// Position of the fee collector in the pool table
pub const FEE_COLLECTOR_INDEX: usize = 2;
/// Last position read from the pool table
pub const LAST_ROUTE_INDEX: usize = 15;
/// The one readonly position in the route
pub const READONLY_ROUTE_INDEX: usize = 8;

const ROUTE_LEN: usize = LAST_ROUTE_INDEX - FEE_COLLECTOR_INDEX;

/// Pool-specific lookup table with its positional schema checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLookupTable {
    address: Pubkey,
    addresses: Vec<Pubkey>,
    fee_collector: Pubkey,
    route: [Pubkey; ROUTE_LEN],
}

impl PoolLookupTable {
    /// Validate a table's contents against the schema
    ///
    /// Needs at least 16 entries and a real address at every position from 2
    /// through 15.
    pub fn new(address: Pubkey, addresses: Vec<Pubkey>) -> Result<Self, ComposeError> {
        if addresses.len() <= LAST_ROUTE_INDEX {
            return Err(ComposeError::lookup_table(
                address,
                format!(
                    "{} entries, at least {} required",
                    addresses.len(),
                    LAST_ROUTE_INDEX + 1
                ),
            ));
        }
        if let Some(index) = (FEE_COLLECTOR_INDEX..=LAST_ROUTE_INDEX)
            .find(|i| addresses[*i] == Pubkey::default())
        {
            return Err(ComposeError::lookup_table(
                address,
                format!("entry {} is the default address", index),
            ));
        }

        let fee_collector = addresses[FEE_COLLECTOR_INDEX];
        let mut route = [Pubkey::default(); ROUTE_LEN];
        route.copy_from_slice(&addresses[FEE_COLLECTOR_INDEX + 1..=LAST_ROUTE_INDEX]);

        Ok(Self {
            address,
            addresses,
            fee_collector,
            route,
        })
    }

    /// Decode the raw account data of an on-chain lookup table
    pub fn from_account_data(address: Pubkey, data: &[u8]) -> Result<Self, ComposeError> {
        let table = AddressLookupTable::deserialize(data)
            .map_err(|e| ComposeError::lookup_table(address, e.to_string()))?;
        Self::new(address, table.addresses.to_vec())
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn fee_collector(&self) -> Pubkey {
        self.fee_collector
    }

    /// Route accounts at positions 3 through 15
    pub fn route(&self) -> &[Pubkey] {
        &self.route
    }

    /// Positions 2 through 15 as account metas, in table order
    pub fn route_metas(&self) -> Vec<AccountMeta> {
        std::iter::once(self.fee_collector)
            .chain(self.route.iter().copied())
            .enumerate()
            .map(|(offset, key)| {
                if offset + FEE_COLLECTOR_INDEX == READONLY_ROUTE_INDEX {
                    AccountMeta::new_readonly(key, false)
                } else {
                    AccountMeta::new(key, false)
                }
            })
            .collect()
    }

    /// Full table for message compilation
    pub fn to_account(&self) -> AddressLookupTableAccount {
        AddressLookupTableAccount {
            key: self.address,
            addresses: self.addresses.clone(),
        }
    }
}

/// Global programs table contents, in on-chain order
pub fn programs_table_addresses(deployment: &Deployment) -> Vec<Pubkey> {
    vec![
        spl_associated_token_account::id(),
        spl_token::id(),
        system_program::id(),
        deployment.token_metadata_program,
        sysvar::rent::id(),
        sysvar::clock::id(),
        deployment.amm_program,
        deployment.vault_program,
        deployment.compose_program,
        deployment.token_metadata_program,
        deployment.whirlpool_program,
        deployment.fee_program,
        spl_token::native_mint::id(),
        deployment.treasury,
    ]
}

pub fn programs_table(deployment: &Deployment) -> AddressLookupTableAccount {
    AddressLookupTableAccount {
        key: deployment.programs_lookup_table,
        addresses: programs_table_addresses(deployment),
    }
}
