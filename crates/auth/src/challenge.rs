//! Sign-in challenge messages.

use alloy_primitives::Address;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::address::format_address;
use crate::error::{AuthError, Result};

/// Fields rendered into every challenge message.
#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    pub domain: String,
    pub uri: String,
    pub chain_id: u64,
    pub statement: String,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            uri: "http://localhost:3000".to_string(),
            chain_id: 1,
            statement: "Sign in to Shatranj".to_string(),
        }
    }
}

/// A rendered challenge, ready to be signed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Generate a random 128-bit nonce, hex encoded.
pub fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

impl ChallengeConfig {
    /// Render the EIP-4361 style sign-in message for `address`.
    pub fn render(
        &self,
        address: &Address,
        nonce: &str,
        issued_at: DateTime<Utc>,
        validity: Duration,
    ) -> Result<Challenge> {
        let expires_at = issued_at
            .checked_add_signed(validity)
            .ok_or(AuthError::InvalidValidity {
                seconds: validity.num_seconds(),
            })?;

        let message = format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
            {address}\n\n\
            {statement}\n\n\
            URI: {uri}\n\
            Version: 1\n\
            Chain ID: {chain_id}\n\
            Nonce: {nonce}\n\
            Issued At: {issued_at}\n\
            Expiration Time: {expires_at}",
            domain = self.domain,
            address = format_address(address),
            statement = self.statement,
            uri = self.uri,
            chain_id = self.chain_id,
            nonce = nonce,
            issued_at = issued_at.to_rfc3339(),
            expires_at = expires_at.to_rfc3339(),
        );

        Ok(Challenge {
            nonce: nonce.to_string(),
            message,
            issued_at,
            expires_at,
        })
    }
}
