//! Wallet provider boundary and a local private-key wallet.
//!
//! A [`WalletProvider`] is whatever holds the user's key: a browser extension
//! over RPC in production, or a [`LocalWallet`] during development and tests.

use std::str::FromStr;

use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::address::format_address;
use crate::error::WalletError;

/// Capabilities the authentication handshake needs from a wallet.
///
/// Absence of a provider is expressed by the caller passing `None`, which is
/// distinct from a provider returning [`WalletError::Rejected`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the user has exposed to this application. The first entry is
    /// the active account.
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, WalletError>;

    /// EIP-191 personal-sign `message` with `account`, returning the raw
    /// 65-byte signature.
    async fn sign_message(
        &self,
        account: Address,
        message: &[u8],
    ) -> std::result::Result<Vec<u8>, WalletError>;
}

/// A wallet with private key access, used as a local signing backend.
#[derive(Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl LocalWallet {
    /// Load wallet from the `WALLET_PRIVATE_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set or
    /// if the private key format is invalid.
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("WALLET_PRIVATE_KEY")
            .context("WALLET_PRIVATE_KEY environment variable not set")?;

        Self::from_private_key(&private_key)
    }

    /// Create a wallet from a hex-encoded private key, optionally `0x` prefixed.
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key_clean = key.trim().trim_start_matches("0x");

        let signer = PrivateKeySigner::from_str(key_clean)
            .context("Invalid private key format - expected 64 hex characters")?;

        let address = signer.address();

        Ok(Self { signer, address })
    }

    /// Create a wallet with a freshly generated key.
    pub fn random() -> Self {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        Self { signer, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lowercase hex rendering of the wallet address.
    pub fn address_string(&self) -> String {
        format_address(&self.address)
    }

    /// Sign an arbitrary message using the EIP-191 personal sign format
    /// (prefixed with "\x19Ethereum Signed Message:\n{len}").
    pub async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self.signer.sign_message(message).await?;
        Ok(signature.as_bytes().to_vec())
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, WalletError> {
        Ok(vec![self.address])
    }

    async fn sign_message(
        &self,
        account: Address,
        message: &[u8],
    ) -> std::result::Result<Vec<u8>, WalletError> {
        if account != self.address {
            return Err(WalletError::UnknownAccount(format_address(&account)));
        }
        self.sign(message)
            .await
            .map_err(|e| WalletError::Other(e.to_string()))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("LocalWallet")
            .field("address", &self.address_string())
            .finish()
    }
}
