//! User-facing messages for authentication and move outcomes.

use auth::AuthError;
use serde::{Deserialize, Serialize};

use crate::error::{RejectedLoad, RejectedMove};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A short toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    fn new(title: &str, description: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level,
        }
    }

    /// Shown after a successful sign-in.
    pub fn connected(username: Option<&str>) -> Self {
        let description = match username {
            Some(name) => format!("Signed in as {}", name),
            None => "Signed in as an observer".to_string(),
        };
        Self::new("Successfully Connected", description, NotificationLevel::Success)
    }

    pub fn signed_out() -> Self {
        Self::new("Signed Out", "Your session was cleared", NotificationLevel::Info)
    }

    /// `None` for errors the user should not see, such as a superseded flow.
    pub fn from_auth_error(err: &AuthError) -> Option<Self> {
        if err.is_silent() {
            return None;
        }
        let notification = match err {
            AuthError::WalletUnavailable => Self::new(
                "Could Not Find Wallet",
                "Install or unlock a wallet to sign in",
                NotificationLevel::Error,
            ),
            AuthError::UserRejected { reason } => Self::new(
                "Could Not Connect to Wallet",
                reason.clone(),
                NotificationLevel::Error,
            ),
            AuthError::AddressMismatch { .. } | AuthError::InvalidSignature => Self::new(
                "Could Not Connect to Wallet",
                err.to_string(),
                NotificationLevel::Error,
            ),
            AuthError::TokenExpired | AuthError::MalformedToken { .. } => Self::new(
                "Session Ended",
                "Sign in again to continue playing",
                NotificationLevel::Info,
            ),
            _ => Self::new(
                "Could not connect wallet",
                err.to_string(),
                NotificationLevel::Error,
            ),
        };
        Some(notification)
    }

    pub fn from_rejected_move(err: &RejectedMove) -> Self {
        let title = match err {
            RejectedMove::Unauthenticated => "Not Signed In",
            RejectedMove::Observer => "Spectating",
            RejectedMove::NotYourTurn { .. } => "Not Your Turn",
            RejectedMove::Illegal(_) => "Illegal Move",
        };
        Self::new(title, err.to_string(), NotificationLevel::Error)
    }

    pub fn from_rejected_load(err: &RejectedLoad) -> Self {
        let title = match err {
            RejectedLoad::Malformed(_) => "Invalid Position",
            _ => "Cannot Load Position",
        };
        Self::new(title, err.to_string(), NotificationLevel::Error)
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
