//! Wallet Authentication
//!
//! Signature verification, sign-in challenges, session tokens, and the
//! persisted session store.

pub mod address;
pub mod challenge;
pub mod error;
pub mod issuer;
pub mod jwt;
pub mod store;
pub mod verifier;
pub mod wallet;

pub use address::{format_address, normalize_address, parse_address, Address, InvalidAddress};
pub use challenge::{Challenge, ChallengeConfig};
pub use error::{AuthError, StoreError, WalletError};
pub use issuer::{AuthFlow, FlowId, FlowState, SessionTokenIssuer, SignedChallenge};
pub use jwt::{
    check_validity, SessionClaims, SessionToken, TokenAuthority, TokenConfig, MAX_VALIDITY_HOURS,
};
pub use store::{PersistedRecord, SameSite, SessionStore, SessionStoreProvider};
pub use verifier::SignatureVerifier;
pub use wallet::{LocalWallet, WalletProvider};
