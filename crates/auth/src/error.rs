//! Error types for wallet authentication and session persistence.

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a wallet provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No wallet provider is reachable from this process.
    #[error("No wallet provider is available")]
    Unavailable,

    /// The user declined the request in the wallet.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The wallet is locked or not connected to the requesting account.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("{0}")]
    Other(String),
}

/// Failures reading or writing the persisted session record.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Authentication errors.
///
/// None of these are fatal: the orchestrator turns them into a notification
/// and leaves the current session untouched.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No wallet provider is available")]
    WalletUnavailable,

    #[error("Signing request rejected: {reason}")]
    UserRejected { reason: String },

    #[error("Signer address {actual} does not match active account {expected}")]
    AddressMismatch { expected: String, actual: String },

    /// The flow was superseded or already completed; the completion is ignored.
    #[error("Authentication flow {flow} is no longer active")]
    Cancelled { flow: Uuid },

    #[error("Signature could not be verified")]
    InvalidSignature,

    #[error("Session token expired")]
    TokenExpired,

    /// Requested token lifetime is not positive or is too long to represent.
    #[error("Session validity of {seconds}s is out of range")]
    InvalidValidity { seconds: i64 },

    #[error("Malformed session token: {reason}")]
    MalformedToken { reason: String },

    /// Any other wallet failure, surfaced with its original message.
    #[error("Wallet error: {message}")]
    Wallet { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the error should be reported to the user at all.
    pub fn is_silent(&self) -> bool {
        matches!(self, AuthError::Cancelled { .. })
    }
}

impl From<WalletError> for AuthError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable => AuthError::WalletUnavailable,
            WalletError::Rejected(reason) => AuthError::UserRejected { reason },
            WalletError::UnknownAccount(account) => AuthError::UserRejected {
                reason: format!("wallet is locked or not connected to {}", account),
            },
            WalletError::Other(message) => AuthError::Wallet { message },
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
