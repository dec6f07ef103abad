//! Composition output
//!
//! A composition yields an ordered list of transactions (an optional legacy
//! appraisal transaction, then the v0 trade) with one progress label per
//! transaction. Outputs are built fresh on every call.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    message::VersionedMessage,
    pubkey::Pubkey,
    transaction::{Transaction, VersionedTransaction},
};

use super::appraisal::AppraisalOutcome;
use super::errors::ComposeError;

/// One transaction of a composed bundle
#[derive(Debug, Clone, PartialEq)]
pub enum ComposedTransaction {
    /// Legacy transaction from the appraisal service
    Appraisal(Transaction),
    /// Unsigned v0 trade transaction
    Trade(VersionedTransaction),
}

impl ComposedTransaction {
    pub fn is_trade(&self) -> bool {
        matches!(self, ComposedTransaction::Trade(_))
    }

    /// Signers the wallet (and any co-signers) must provide
    pub fn required_signers(&self) -> Vec<Pubkey> {
        match self {
            ComposedTransaction::Appraisal(tx) => {
                let count = tx.message.header.num_required_signatures as usize;
                tx.message.account_keys.iter().take(count).copied().collect()
            }
            ComposedTransaction::Trade(tx) => crate::compat::get_required_signers(&tx.message).to_vec(),
        }
    }

    /// Wire encoding, base64 wrapped
    pub fn to_base64(&self) -> Result<String, ComposeError> {
        let bytes = match self {
            ComposedTransaction::Appraisal(tx) => bincode::serialize(tx)?,
            ComposedTransaction::Trade(tx) => bincode::serialize(tx)?,
        };
        Ok(STANDARD.encode(bytes))
    }

    pub fn as_trade(&self) -> Option<&VersionedTransaction> {
        match self {
            ComposedTransaction::Trade(tx) => Some(tx),
            ComposedTransaction::Appraisal(_) => None,
        }
    }
}

/// Unsigned v0 transaction with placeholder signatures for every required signer
pub fn unsigned_versioned(message: VersionedMessage) -> VersionedTransaction {
    let count = crate::compat::get_message_header(&message).num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Default::default(); count],
        message,
    }
}

/// Reason a composition produced no transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeFailure {
    /// No wallet connected
    NoWallet,
    /// Appraisal failed and the configuration blocks trading without it
    AppraisalBlocked(String),
}

impl std::fmt::Display for ComposeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeFailure::NoWallet => write!(f, "No connected wallet"),
            ComposeFailure::AppraisalBlocked(reason) => write!(f, "Appraisal failed: {}", reason),
        }
    }
}

/// Everything a composition returns to the caller
#[derive(Debug, Clone)]
pub struct TransactionResult {
    /// Transactions in submission order; the trade is always last
    pub transactions: Vec<ComposedTransaction>,
    /// One progress label per transaction
    pub steps: Vec<String>,
    pub status: bool,
    pub failure: Option<ComposeFailure>,
    pub appraisal: Option<AppraisalOutcome>,
}

impl TransactionResult {
    pub fn failed(failure: ComposeFailure, appraisal: Option<AppraisalOutcome>) -> Self {
        Self {
            transactions: Vec::new(),
            steps: Vec::new(),
            status: false,
            failure: Some(failure),
            appraisal,
        }
    }

    pub fn trade(&self) -> Option<&VersionedTransaction> {
        self.transactions.last().and_then(ComposedTransaction::as_trade)
    }

    pub fn appraisal_transaction(&self) -> Option<&Transaction> {
        self.transactions.iter().find_map(|tx| match tx {
            ComposedTransaction::Appraisal(tx) => Some(tx),
            ComposedTransaction::Trade(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0, Message},
    };

    fn v0_message(payer: &Pubkey) -> VersionedMessage {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(*payer, true)],
        );
        VersionedMessage::V0(v0::Message::try_compile(payer, &[ix], &[], Hash::new_unique()).unwrap())
    }

    #[test]
    fn test_unsigned_versioned_placeholders() {
        let payer = Pubkey::new_unique();
        let tx = unsigned_versioned(v0_message(&payer));
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.signatures[0], Default::default());

        let composed = ComposedTransaction::Trade(tx);
        assert_eq!(composed.required_signers(), vec![payer]);
        assert!(composed.is_trade());
    }

    #[test]
    fn test_to_base64_round_trips_through_bincode() {
        let payer = Pubkey::new_unique();
        let composed = ComposedTransaction::Trade(unsigned_versioned(v0_message(&payer)));
        let encoded = composed.to_base64().unwrap();
        let decoded: VersionedTransaction =
            bincode::deserialize(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(ComposedTransaction::Trade(decoded), composed);
    }

    #[test]
    fn test_failed_result() {
        let result = TransactionResult::failed(ComposeFailure::NoWallet, None);
        assert!(!result.status);
        assert!(result.transactions.is_empty());
        assert!(result.trade().is_none());
        assert_eq!(result.failure.unwrap().to_string(), "No connected wallet");
    }

    #[test]
    fn test_appraisal_transaction_lookup() {
        let payer = Pubkey::new_unique();
        let legacy = Transaction::new_unsigned(Message::new_with_blockhash(
            &[Instruction::new_with_bytes(
                Pubkey::new_unique(),
                &[2],
                vec![AccountMeta::new(payer, true)],
            )],
            Some(&payer),
            &Hash::new_unique(),
        ));
        let result = TransactionResult {
            transactions: vec![
                ComposedTransaction::Appraisal(legacy.clone()),
                ComposedTransaction::Trade(unsigned_versioned(v0_message(&payer))),
            ],
            steps: vec!["Appraising A".into(), "Buying A".into()],
            status: true,
            failure: None,
            appraisal: None,
        };
        assert_eq!(result.appraisal_transaction(), Some(&legacy));
        assert!(result.trade().is_some());
        assert_eq!(
            ComposedTransaction::Appraisal(legacy).required_signers(),
            vec![payer]
        );
    }
}
