//! Program-derived address helpers
//!
//! Every account the compose program checks is derived here from its fixed
//! seed literal. Derivation is pure: the same seeds and owner always give the
//! same address and bump.

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use super::errors::ComposeError;
use crate::config::Deployment;

/// Runtime limits on program address seeds
pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;

pub const POOL_SEED: &[u8] = b"fractions";
pub const VAULT_SEED: &[u8] = b"vault";
pub const EXTERNAL_SEED: &[u8] = b"fractions-seed";
pub const APPRAISAL_SEED: &[u8] = b"appraisal";
pub const FEE_SEED: &[u8] = b"fee";
pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";
pub const TOKEN_RECORD_SEED: &[u8] = b"token_record";

type Result<T> = std::result::Result<T, ComposeError>;

/// Derive a program address and its bump from raw seeds
pub fn derive(seeds: &[&[u8]], owner: &Pubkey) -> Result<(Pubkey, u8)> {
    if seeds.len() > MAX_SEEDS {
        return Err(ComposeError::invalid_seed(format!(
            "{} seeds supplied, at most {} allowed",
            seeds.len(),
            MAX_SEEDS
        )));
    }
    if let Some((i, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(ComposeError::invalid_seed(format!(
            "seed {} is {} bytes, at most {} allowed",
            i,
            seed.len(),
            MAX_SEED_LEN
        )));
    }
    Pubkey::try_find_program_address(seeds, owner).ok_or_else(|| {
        ComposeError::invalid_seed(format!("no viable bump for owner {}", owner))
    })
}

fn address(seeds: &[&[u8]], owner: &Pubkey) -> Result<Pubkey> {
    derive(seeds, owner).map(|(key, _)| key)
}

/// Pool state account of a fractionalised pool
pub fn pool_account(deployment: &Deployment, pool_mint: &Pubkey) -> Result<Pubkey> {
    address(&[POOL_SEED, pool_mint.as_ref()], &deployment.elixir_program)
}

pub fn vault_account(deployment: &Deployment, fraction_mint: &Pubkey) -> Result<Pubkey> {
    address(&[VAULT_SEED, fraction_mint.as_ref()], &deployment.elixir_program)
}

/// Pool record held by the vault program
pub fn external_account(deployment: &Deployment, pool_mint: &Pubkey) -> Result<Pubkey> {
    address(&[EXTERNAL_SEED, pool_mint.as_ref()], &deployment.vault_program)
}

pub fn appraisal_account(
    deployment: &Deployment,
    pool_mint: &Pubkey,
    asset_mint: &Pubkey,
) -> Result<Pubkey> {
    address(
        &[APPRAISAL_SEED, pool_mint.as_ref(), asset_mint.as_ref()],
        &deployment.elixir_program,
    )
}

/// Fee record for a pool and its fee collector
pub fn fee_record(deployment: &Deployment, pool_mint: &Pubkey, fee_collector: &Pubkey) -> Result<Pubkey> {
    address(
        &[FEE_SEED, pool_mint.as_ref(), fee_collector.as_ref()],
        &deployment.fee_program,
    )
}

/// Single-use fraction mint for a sell, seeded by a random nonce
pub fn throwaway_fraction_mint(deployment: &Deployment, nonce: &[u8; 32]) -> Result<Pubkey> {
    address(&[nonce.as_ref()], &deployment.elixir_program)
}

pub fn metadata_account(deployment: &Deployment, mint: &Pubkey) -> Result<Pubkey> {
    let program = deployment.token_metadata_program;
    address(&[METADATA_SEED, program.as_ref(), mint.as_ref()], &program)
}

pub fn edition_account(deployment: &Deployment, mint: &Pubkey) -> Result<Pubkey> {
    let program = deployment.token_metadata_program;
    address(
        &[METADATA_SEED, program.as_ref(), mint.as_ref(), EDITION_SEED],
        &program,
    )
}

pub fn token_record(deployment: &Deployment, mint: &Pubkey, token_account: &Pubkey) -> Result<Pubkey> {
    let program = deployment.token_metadata_program;
    address(
        &[
            METADATA_SEED,
            program.as_ref(),
            mint.as_ref(),
            TOKEN_RECORD_SEED,
            token_account.as_ref(),
        ],
        &program,
    )
}

/// Associated token account of `owner` for `mint`
pub fn ata(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
