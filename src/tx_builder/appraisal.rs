//! Appraisal prerequisite gate
//!
//! A trade needs a fresh appraisal record for the asset. When the record is
//! missing, the appraisal service hands back a ready-made legacy transaction
//! that creates it; the composer either prepends that transaction to the
//! bundle or signs and submits it immediately.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature, system_program, sysvar, transaction::Transaction};
use tracing::{debug, info, warn};

use super::context::TradeAccounts;
use super::errors::ComposeError;
use crate::chain::{AccountLookup, ChainClient};
use crate::config::Deployment;
use crate::wallet::WalletSigner;

/// What the gate did about the appraisal record
#[derive(Debug, Clone, PartialEq)]
pub enum AppraisalOutcome {
    /// Record already exists
    AlreadyFresh,
    /// Service declined to appraise
    Skipped,
    /// Corrective transaction to run before the trade
    Prepended(Box<Transaction>),
    /// Corrective transaction was signed and sent
    Submitted(Signature),
    /// Service, decoding or submission failed
    Failed { reason: String },
}

impl AppraisalOutcome {
    /// Transaction to place ahead of the trade, if any
    pub fn prepended(&self) -> Option<&Transaction> {
        match self {
            AppraisalOutcome::Prepended(tx) => Some(tx.as_ref()),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AppraisalOutcome::Failed { .. })
    }
}

/// Accounts identifying the appraisal to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppraisalTarget {
    pub pool_mint: Pubkey,
    pub external_account: Pubkey,
    pub asset_mint: Pubkey,
    pub pool_account: Pubkey,
    pub appraisal_account: Pubkey,
}

impl From<&TradeAccounts> for AppraisalTarget {
    fn from(accounts: &TradeAccounts) -> Self {
        Self {
            pool_mint: accounts.pool_mint,
            external_account: accounts.external_account,
            asset_mint: accounts.asset_mint,
            pool_account: accounts.pool_account,
            appraisal_account: accounts.appraisal_account,
        }
    }
}

/// Body of `POST appraiser/ix`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppraisalIxRequest {
    pub appraiser: String,
    pub initializer: String,
    pub index_mint: String,
    pub index: String,
    pub external_account: String,
    pub asset_mint: String,
    pub appraisal: String,
    pub system: String,
    pub clock: String,
}

impl AppraisalIxRequest {
    pub fn new(deployment: &Deployment, initializer: &Pubkey, target: &AppraisalTarget) -> Self {
        Self {
            appraiser: deployment.appraiser.to_string(),
            initializer: initializer.to_string(),
            index_mint: target.pool_mint.to_string(),
            index: target.pool_account.to_string(),
            external_account: target.external_account.to_string(),
            asset_mint: target.asset_mint.to_string(),
            appraisal: target.appraisal_account.to_string(),
            system: system_program::id().to_string(),
            clock: sysvar::clock::id().to_string(),
        }
    }
}

/// HTTP client for the appraisal service
#[derive(Debug, Clone)]
pub struct AppraisalClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AppraisalClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ComposeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ComposeError::Configuration(format!("appraisal client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: format!("{}/appraiser/ix", api_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service for the transaction creating an appraisal
    ///
    /// `Ok(None)` means the service answered `false`.
    pub async fn request_transaction(
        &self,
        body: &AppraisalIxRequest,
    ) -> Result<Option<Transaction>, ComposeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| ComposeError::AppraisalService(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ComposeError::AppraisalService(e.to_string()))?;
        if !status.is_success() {
            return Err(ComposeError::AppraisalService(format!(
                "HTTP {}: {}",
                status,
                text.trim()
            )));
        }
        decode_response(&text)
    }
}

/// Decode the service's text body
pub fn decode_response(body: &str) -> Result<Option<Transaction>, ComposeError> {
    let body = body.trim().trim_matches('"');
    if body == "false" {
        return Ok(None);
    }
    let bytes = STANDARD
        .decode(body)
        .map_err(|e| ComposeError::AppraisalService(format!("invalid base64: {}", e)))?;
    let tx: Transaction = bincode::deserialize(&bytes)
        .map_err(|e| ComposeError::AppraisalService(format!("invalid transaction: {}", e)))?;
    Ok(Some(tx))
}

/// Make sure the appraisal record exists, or line up the transaction creating it
///
/// Only the record lookup can fail this call; everything after it is folded
/// into the outcome.
pub async fn ensure_appraisal(
    chain: &dyn ChainClient,
    service: &AppraisalClient,
    wallet: &dyn WalletSigner,
    deployment: &Deployment,
    target: &AppraisalTarget,
    send: bool,
) -> Result<AppraisalOutcome, ComposeError> {
    if let AccountLookup::Found(_) = chain.lookup_account(&target.appraisal_account).await? {
        debug!(appraisal = %target.appraisal_account, "appraisal record present");
        return Ok(AppraisalOutcome::AlreadyFresh);
    }

    let body = AppraisalIxRequest::new(deployment, &wallet.pubkey(), target);
    let tx = match service.request_transaction(&body).await {
        Ok(Some(tx)) => tx,
        Ok(None) => {
            info!(asset_mint = %target.asset_mint, "appraisal service declined");
            return Ok(AppraisalOutcome::Skipped);
        }
        Err(e) => {
            warn!(asset_mint = %target.asset_mint, error = %e, "appraisal request failed");
            return Ok(AppraisalOutcome::Failed {
                reason: e.to_string(),
            });
        }
    };

    if !send {
        return Ok(AppraisalOutcome::Prepended(Box::new(tx)));
    }
    Ok(submit(chain, wallet, tx).await)
}

async fn submit(chain: &dyn ChainClient, wallet: &dyn WalletSigner, mut tx: Transaction) -> AppraisalOutcome {
    if let Err(e) = wallet.partial_sign(&mut tx).await {
        warn!(error = %e, "appraisal signing failed");
        return AppraisalOutcome::Failed {
            reason: e.to_string(),
        };
    }
    match chain.submit_transaction(&tx).await {
        Ok(signature) => {
            info!(%signature, "appraisal submitted");
            AppraisalOutcome::Submitted(signature)
        }
        Err(e) => {
            warn!(error = %e, "appraisal submission failed");
            AppraisalOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, instruction::AccountMeta, instruction::Instruction, message::Message};

    fn sample_transaction(payer: &Pubkey) -> Transaction {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[7],
            vec![AccountMeta::new(*payer, true)],
        );
        Transaction::new_unsigned(Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_unique()))
    }

    #[test]
    fn test_decode_false_variants() {
        assert_eq!(decode_response("false").unwrap(), None);
        assert_eq!(decode_response("\"false\"\n").unwrap(), None);
    }

    #[test]
    fn test_decode_transaction() {
        let tx = sample_transaction(&Pubkey::new_unique());
        let body = STANDARD.encode(bincode::serialize(&tx).unwrap());
        assert_eq!(decode_response(&body).unwrap(), Some(tx.clone()));
        assert_eq!(decode_response(&format!("\"{}\"", body)).unwrap(), Some(tx));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_response("not base64!"),
            Err(ComposeError::AppraisalService(_))
        ));
        assert!(matches!(
            decode_response(&STANDARD.encode([1u8, 2, 3])),
            Err(ComposeError::AppraisalService(_))
        ));
    }

    #[test]
    fn test_request_body_fields() {
        let deployment =
            Deployment::new(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let target = AppraisalTarget {
            pool_mint: Pubkey::new_unique(),
            external_account: Pubkey::new_unique(),
            asset_mint: Pubkey::new_unique(),
            pool_account: Pubkey::new_unique(),
            appraisal_account: Pubkey::new_unique(),
        };
        let initializer = Pubkey::new_unique();
        let body = serde_json::to_value(AppraisalIxRequest::new(&deployment, &initializer, &target)).unwrap();

        assert_eq!(body["appraiser"], "3RDTwtVmMcH9zvzqj8mZi9GH8apqWpRZyXB9DWL7QqrP");
        assert_eq!(body["initializer"], initializer.to_string());
        assert_eq!(body["index_mint"], target.pool_mint.to_string());
        assert_eq!(body["index"], target.pool_account.to_string());
        assert_eq!(body["system"], "11111111111111111111111111111111");
        assert_eq!(body["clock"], "SysvarC1ock11111111111111111111111111111111");
    }

    #[test]
    fn test_endpoint_join() {
        let a = AppraisalClient::new("https://api.example.invalid/", Duration::from_secs(1)).unwrap();
        let b = AppraisalClient::new("https://api.example.invalid", Duration::from_secs(1)).unwrap();
        assert_eq!(a.endpoint(), "https://api.example.invalid/appraiser/ix");
        assert_eq!(a.endpoint(), b.endpoint());
    }

    #[test]
    fn test_outcome_helpers() {
        let tx = sample_transaction(&Pubkey::new_unique());
        assert!(AppraisalOutcome::Prepended(Box::new(tx)).prepended().is_some());
        assert!(AppraisalOutcome::AlreadyFresh.prepended().is_none());
        assert!(AppraisalOutcome::Failed { reason: "x".into() }.is_failed());
    }
}
