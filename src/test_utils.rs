//! Test Utilities Module
//!
//! Mock chain client and fixtures for deterministic composer tests.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use tokio::sync::Mutex;

use crate::chain::{AccountLookup, ChainClient};
use crate::config::{AppraisalConfig, ComputeConfig, Deployment};
use crate::tx_builder::{
    pda, AppraisalClient, ComposeError, Composer, FeeSchedule, PoolContext, PoolLookupTable,
    WhirlpoolAccounts,
};
use crate::types::{Creator, ExtraMetadata, NftData, NftMetadata, TokenStandard};
use crate::wallet::WalletManager;

/// Mock ChainClient for testing
///
/// Accounts not registered with [`MockChainClient::add_account`] read as
/// missing. All operations are in-memory and deterministic.
pub struct MockChainClient {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    fail_lookups: AtomicBool,
    blockhash: Hash,
    lookups: Mutex<Vec<Pubkey>>,
    submitted: Mutex<Vec<Transaction>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            fail_lookups: AtomicBool::new(false),
            blockhash: Hash::new_from_array([7u8; 32]),
            lookups: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Register an existing account
    pub async fn add_account(&self, address: Pubkey) {
        self.accounts.lock().await.insert(address, Account::default());
    }

    /// Make every lookup fail with an RPC error
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    /// Addresses looked up so far, in call order
    pub async fn lookups(&self) -> Vec<Pubkey> {
        self.lookups.lock().await.clone()
    }

    pub async fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().await.clone()
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn lookup_account(&self, address: &Pubkey) -> Result<AccountLookup, ComposeError> {
        self.lookups.lock().await.push(*address);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ComposeError::Rpc("mock lookup failure".to_string()));
        }
        Ok(match self.accounts.lock().await.get(address) {
            Some(account) => AccountLookup::Found(account.clone()),
            None => AccountLookup::Missing,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash, ComposeError> {
        Ok(self.blockhash)
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<Signature, ComposeError> {
        self.submitted.lock().await.push(transaction.clone());
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }
}

/// Fixtures shared by unit and integration tests
pub mod fixtures {
    use super::*;

    /// Deployment with deterministic program ids
    pub fn deployment() -> Deployment {
        Deployment::new(
            Pubkey::new_from_array([11u8; 32]),
            Pubkey::new_from_array([12u8; 32]),
            Pubkey::new_from_array([13u8; 32]),
        )
    }

    /// Pool table with 16 distinct entries
    pub fn pool_table() -> PoolLookupTable {
        let addresses = (0..16u8).map(|i| Pubkey::new_from_array([100 + i; 32])).collect();
        // schema is satisfied by construction
        PoolLookupTable::new(Pubkey::new_from_array([99u8; 32]), addresses).unwrap()
    }

    pub fn pool_context() -> PoolContext {
        PoolContext {
            fraction_mint: Some(Pubkey::new_from_array([21u8; 32])),
            asset_mint: Pubkey::new_from_array([22u8; 32]),
            pool_mint: Pubkey::new_from_array([23u8; 32]),
            lookup_table: pool_table(),
        }
    }

    /// Metadata for the pool context's asset with one creator per share
    pub fn nft_metadata(standard: TokenStandard, shares: &[u8]) -> NftMetadata {
        let creators = shares
            .iter()
            .enumerate()
            .map(|(i, share)| Creator {
                address: Pubkey::new_from_array([40 + i as u8; 32]),
                verified: true,
                share: *share,
            })
            .collect();
        NftMetadata {
            mint: pool_context().asset_mint,
            data: NftData {
                name: "Degen Ape #42\0\0\0".to_string(),
                symbol: "DAPE".to_string(),
                creators: Some(creators),
                ..Default::default()
            },
            token_standard: standard,
            extra_metadata: ExtraMetadata::default(),
            programmable_config: standard
                .is_programmable()
                .then(|| Pubkey::new_from_array([30u8; 32])),
        }
    }

    pub fn whirlpool() -> WhirlpoolAccounts {
        WhirlpoolAccounts {
            whirlpool: Pubkey::new_from_array([50u8; 32]),
            token_vault_a: Pubkey::new_from_array([51u8; 32]),
            token_vault_b: Pubkey::new_from_array([52u8; 32]),
            tick_array_0: Pubkey::new_from_array([53u8; 32]),
            tick_array_1: Pubkey::new_from_array([54u8; 32]),
            tick_array_2: Pubkey::new_from_array([55u8; 32]),
            oracle: Pubkey::new_from_array([56u8; 32]),
        }
    }

    pub fn wallet() -> WalletManager {
        WalletManager::from_keypair(Keypair::new())
    }

    /// Appraisal record address of the fixture pool
    pub fn appraisal_address() -> Pubkey {
        let ctx = pool_context();
        pda::appraisal_account(&deployment(), &ctx.pool_mint, &ctx.asset_mint).unwrap()
    }

    /// Fee record address of the fixture pool
    pub fn fee_record_address() -> Pubkey {
        let ctx = pool_context();
        pda::fee_record(&deployment(), &ctx.pool_mint, &ctx.lookup_table.fee_collector()).unwrap()
    }

    /// Legacy appraisal transaction as the service would return it
    pub fn appraisal_transaction(payer: &Pubkey) -> Transaction {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_from_array([60u8; 32]),
            &[1, 2, 3],
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(appraisal_address(), false),
            ],
        );
        Transaction::new_unsigned(Message::new_with_blockhash(
            &[ix],
            Some(payer),
            &Hash::new_from_array([8u8; 32]),
        ))
    }

    /// Service response body for a transaction
    pub fn appraisal_body(tx: &Transaction) -> String {
        STANDARD.encode(bincode::serialize(tx).unwrap())
    }

    /// Composer over a mock chain and an appraisal service at `api_url`
    pub fn composer(chain: Arc<MockChainClient>, api_url: &str, block_on_failure: bool) -> Composer {
        Composer::new(
            deployment(),
            ComputeConfig::default(),
            FeeSchedule::default(),
            AppraisalConfig { block_on_failure },
            chain,
            AppraisalClient::new(api_url, Duration::from_secs(5)).unwrap(),
        )
    }
}
