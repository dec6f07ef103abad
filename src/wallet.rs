//! Wallet management module

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::sync::Arc;

use crate::tx_builder::ComposeError;

/// Signing capability the composer needs from a connected wallet
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Public key of the fee payer and trade initializer
    fn pubkey(&self) -> Pubkey;

    /// Add this wallet's signature, leaving other required signatures alone
    async fn partial_sign(&self, transaction: &mut Transaction) -> Result<(), ComposeError>;
}

/// Wallet manager for handling keypairs and signing
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    ///
    /// Accepts 64 raw bytes, the JSON byte array written by the Solana CLI,
    /// or a base58 secret key as exported by browser wallets.
    pub fn from_file(path: &str) -> Result<Self> {
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let bytes = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else if keypair_bytes.trim_ascii_start().starts_with(b"[") {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .context("Failed to parse keypair JSON")?
        } else {
            let text = std::str::from_utf8(&keypair_bytes).context("Keypair file is not text")?;
            bs58::decode(text.trim())
                .into_vec()
                .context("Failed to decode base58 keypair")?
        };
        Ok(Self::from_keypair(Self::keypair_from_bytes(&bytes)?))
    }

    fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        Keypair::try_from(bytes).context("Invalid keypair bytes")
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}

#[async_trait]
impl WalletSigner for WalletManager {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn partial_sign(&self, transaction: &mut Transaction) -> Result<(), ComposeError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| ComposeError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, instruction::AccountMeta, instruction::Instruction, message::Message};
    use std::io::Write;

    #[test]
    fn test_from_file_json_and_raw() {
        let keypair = Keypair::new();
        let bytes = keypair.to_bytes();

        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, "{}", serde_json::to_string(&bytes.to_vec()).unwrap()).unwrap();
        let wallet = WalletManager::from_file(json.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());

        let mut raw = tempfile::NamedTempFile::new().unwrap();
        raw.write_all(&bytes).unwrap();
        let wallet = WalletManager::from_file(raw.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_from_file_base58() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", bs58::encode(keypair.to_bytes()).into_string()).unwrap();
        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_zero_key() {
        let mut raw = tempfile::NamedTempFile::new().unwrap();
        raw.write_all(&[0u8; 64]).unwrap();
        assert!(WalletManager::from_file(raw.path().to_str().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_partial_sign_leaves_other_signers() {
        let wallet = WalletManager::from_keypair(Keypair::new());
        let cosigner = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0],
            vec![
                AccountMeta::new(wallet.pubkey(), true),
                AccountMeta::new_readonly(cosigner, true),
            ],
        );
        let message = Message::new_with_blockhash(&[ix], Some(&wallet.pubkey()), &Hash::new_unique());
        let mut tx = Transaction::new_unsigned(message);

        WalletSigner::partial_sign(&wallet, &mut tx).await.unwrap();

        assert_ne!(tx.signatures[0], Default::default());
        assert_eq!(tx.signatures[1], Default::default());
        assert!(!tx.is_signed());
    }
}
