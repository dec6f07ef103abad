//! Span structure of a composition
//!
//! The appraisal and packaging steps open child spans of the compose span.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

use crate::test_utils::fixtures::{self, appraisal_address, fee_record_address};
use crate::test_utils::MockChainClient;
use crate::tx_builder::Venue;
use crate::types::TokenStandard;
use crate::wallet::WalletSigner;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_appraisal_and_package_run_in_child_spans() {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_span_events(FmtSpan::NEW)
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let chain = Arc::new(MockChainClient::new());
    chain.add_account(appraisal_address()).await;
    chain.add_account(fee_record_address()).await;
    let composer = fixtures::composer(chain, "http://127.0.0.1:1", false);
    let wallet = fixtures::wallet();

    let result = composer
        .buy(
            Some(&wallet as &dyn WalletSigner),
            Venue::Direct,
            &fixtures::pool_context(),
            &fixtures::nft_metadata(TokenStandard::NonFungible, &[100]),
            1,
            Some(1.0),
            false,
            None,
        )
        .await
        .unwrap();
    assert!(result.status);

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("operation=compose"), "{}", output);
    assert!(output.contains("operation=appraisal"), "{}", output);
    assert!(output.contains("operation=package"), "{}", output);
    assert!(output.contains("parent_span_id=Some("), "{}", output);
}
