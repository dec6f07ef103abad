//! Appraisal gate behaviour inside a composition
//!
//! The appraisal service is a mockito server; the chain is in-memory.

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use solana_sdk::signature::Signer;

use crate::test_utils::fixtures::{self, appraisal_address, fee_record_address};
use crate::test_utils::MockChainClient;
use crate::tx_builder::{
    ensure_appraisal, AppraisalClient, AppraisalOutcome, AppraisalTarget, ComposeError,
    ComposeFailure, TradeAccounts, TradeSide, Venue,
};
use crate::types::TokenStandard;
use crate::wallet::{WalletManager, WalletSigner};

fn signer(wallet: &WalletManager) -> Option<&dyn WalletSigner> {
    Some(wallet)
}

async fn chain_without_appraisal() -> Arc<MockChainClient> {
    let chain = Arc::new(MockChainClient::new());
    chain.add_account(fee_record_address()).await;
    chain
}

#[tokio::test]
async fn test_service_declines() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/appraiser/ix")
        .with_status(200)
        .with_body("false")
        .create_async()
        .await;

    let chain = chain_without_appraisal().await;
    let composer = fixtures::composer(chain, &server.url(), false);
    let wallet = fixtures::wallet();
    let metadata = fixtures::nft_metadata(TokenStandard::NonFungible, &[]);

    let result = composer
        .sell(signer(&wallet), Venue::Direct, &fixtures::pool_context(), &metadata, None, false, None)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.appraisal, Some(AppraisalOutcome::Skipped));
    assert_eq!(result.transactions.len(), 1);
    assert!(result.transactions[0].is_trade());
}

#[tokio::test]
async fn test_service_failure_is_recovered() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/appraiser/ix")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let chain = chain_without_appraisal().await;
    let composer = fixtures::composer(chain, &server.url(), false);
    let wallet = fixtures::wallet();
    let metadata = fixtures::nft_metadata(TokenStandard::NonFungible, &[]);

    let result = composer
        .buy(signer(&wallet), Venue::Raydium, &fixtures::pool_context(), &metadata, 1, Some(1.0), false, None)
        .await
        .unwrap();

    assert!(result.status);
    assert!(result.appraisal.as_ref().unwrap().is_failed());
    assert_eq!(result.transactions.len(), 1);
}

#[tokio::test]
async fn test_service_failure_blocks_when_configured() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/appraiser/ix")
        .with_status(503)
        .create_async()
        .await;

    let chain = chain_without_appraisal().await;
    let composer = fixtures::composer(chain, &server.url(), true);
    let wallet = fixtures::wallet();
    let metadata = fixtures::nft_metadata(TokenStandard::NonFungible, &[]);

    let result = composer
        .buy(signer(&wallet), Venue::Direct, &fixtures::pool_context(), &metadata, 1, Some(1.0), false, None)
        .await
        .unwrap();

    assert!(!result.status);
    assert!(result.transactions.is_empty());
    assert!(matches!(result.failure, Some(ComposeFailure::AppraisalBlocked(_))));
}

#[tokio::test]
async fn test_lookup_failure_propagates() {
    let chain = Arc::new(MockChainClient::new());
    chain.set_fail_lookups(true);
    let composer = fixtures::composer(chain, "http://127.0.0.1:1", false);
    let wallet = fixtures::wallet();
    let metadata = fixtures::nft_metadata(TokenStandard::NonFungible, &[]);

    let err = composer
        .buy(signer(&wallet), Venue::Direct, &fixtures::pool_context(), &metadata, 1, None, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ComposeError::Rpc(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_no_wallet_touches_nothing() {
    let chain = Arc::new(MockChainClient::new());
    let composer = fixtures::composer(chain.clone(), "http://127.0.0.1:1", false);
    let metadata = fixtures::nft_metadata(TokenStandard::NonFungible, &[]);

    let result = composer
        .buy(None, Venue::Direct, &fixtures::pool_context(), &metadata, 1, None, false, None)
        .await
        .unwrap();

    assert!(!result.status);
    assert!(result.transactions.is_empty());
    assert_eq!(result.failure, Some(ComposeFailure::NoWallet));
    assert!(chain.lookups().await.is_empty());
}

#[tokio::test]
async fn test_send_path_signs_and_submits() {
    let wallet = fixtures::wallet();
    let appraisal_tx = fixtures::appraisal_transaction(&wallet.pubkey());

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/appraiser/ix")
        .match_body(Matcher::PartialJson(json!({
            "initializer": wallet.pubkey().to_string(),
            "appraisal": appraisal_address().to_string(),
        })))
        .with_status(200)
        .with_body(fixtures::appraisal_body(&appraisal_tx))
        .create_async()
        .await;

    let chain = MockChainClient::new();
    let service = AppraisalClient::new(&server.url(), Duration::from_secs(5)).unwrap();
    let deployment = fixtures::deployment();
    let accounts = TradeAccounts::derive(
        &deployment,
        &fixtures::pool_context(),
        &fixtures::nft_metadata(TokenStandard::NonFungible, &[]),
        &wallet.pubkey(),
        TradeSide::Buy,
        None,
    )
    .unwrap();

    let outcome = ensure_appraisal(
        &chain,
        &service,
        &wallet,
        &deployment,
        &AppraisalTarget::from(&accounts),
        true,
    )
    .await
    .unwrap();

    mock.assert_async().await;
    let submitted = chain.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert!(submitted[0].is_signed());
    assert_eq!(outcome, AppraisalOutcome::Submitted(submitted[0].signatures[0]));
    assert_eq!(submitted[0].signatures[0], wallet.keypair().sign_message(&submitted[0].message_data()));
}
