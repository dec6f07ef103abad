//! Chain access used by the composer
//!
//! The composer reads two accounts (appraisal record, fee record), fetches a
//! recent blockhash and, on the appraisal send path, submits one transaction.
//! Everything else is pure.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};
use tracing::debug;

use crate::config::RpcConfig;
use crate::tx_builder::{ComposeError, PoolLookupTable};

/// Result of reading an account that may not exist yet
///
/// Transport failures are reported as `Err`, never as `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountLookup {
    Found(Account),
    Missing,
}

impl AccountLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, AccountLookup::Found(_))
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn lookup_account(&self, address: &Pubkey) -> Result<AccountLookup, ComposeError>;

    async fn latest_blockhash(&self) -> Result<Hash, ComposeError>;

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<Signature, ComposeError>;
}

/// JSON-RPC backed chain client
pub struct RpcChainClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcChainClient {
    pub fn new(config: &RpcConfig) -> Result<Self, ComposeError> {
        let commitment = CommitmentConfig::from_str(&config.commitment)
            .map_err(|e| ComposeError::Configuration(format!("rpc.commitment: {}", e)))?;
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            commitment,
        );
        Ok(Self {
            client: Arc::new(client),
            commitment,
        })
    }

    pub fn from_client(client: Arc<RpcClient>) -> Self {
        let commitment = client.commitment();
        Self { client, commitment }
    }

    /// Read and validate an on-chain pool lookup table
    pub async fn fetch_pool_table(&self, address: &Pubkey) -> Result<PoolLookupTable, ComposeError> {
        match self.lookup_account(address).await? {
            AccountLookup::Found(account) => PoolLookupTable::from_account_data(*address, &account.data),
            AccountLookup::Missing => Err(ComposeError::lookup_table(address, "account not found")),
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn lookup_account(&self, address: &Pubkey) -> Result<AccountLookup, ComposeError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| ComposeError::Rpc(format!("get_account {}: {}", address, e)))?;

        debug!(account = %address, found = response.value.is_some(), "account lookup");
        Ok(match response.value {
            Some(account) => AccountLookup::Found(account),
            None => AccountLookup::Missing,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash, ComposeError> {
        self.client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map(|(hash, _)| hash)
            .map_err(|e| ComposeError::blockhash_unavailable(e.to_string()))
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> Result<Signature, ComposeError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| ComposeError::Rpc(format!("send_transaction: {}", e)))
    }
}
