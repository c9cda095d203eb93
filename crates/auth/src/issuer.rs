//! Wallet sign-in handshake producing session tokens.
//!
//! Each sign-in attempt is an [`AuthFlow`] with its own id. Starting a new
//! flow supersedes the previous one; a completion for a flow that is no
//! longer active, or that already produced a token, is dropped with
//! [`AuthError::Cancelled`].

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::address::format_address;
use crate::challenge::{generate_nonce, Challenge, ChallengeConfig};
use crate::error::{AuthError, Result};
use crate::jwt::{check_validity, SessionClaims, SessionToken, TokenAuthority};
use crate::verifier::SignatureVerifier;
use crate::wallet::WalletProvider;

pub type FlowId = Uuid;

/// Lifecycle of a single sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Pending,
    Issued,
    Failed,
    Superseded,
}

/// A started sign-in attempt.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    pub id: FlowId,
    pub nonce: String,
    pub started_at: DateTime<Utc>,
}

/// Result of the wallet round trip for a flow.
#[derive(Debug, Clone)]
pub struct SignedChallenge {
    pub flow: FlowId,
    /// Active account reported by the wallet.
    pub account: Address,
    pub challenge: Challenge,
    pub signature: Vec<u8>,
}

/// Issues session tokens from wallet signatures.
pub struct SessionTokenIssuer {
    authority: Arc<TokenAuthority>,
    verifier: SignatureVerifier,
    challenge: ChallengeConfig,
    active: Option<FlowId>,
    /// Most recently started flow. Only it and its successor are tracked.
    latest: Option<FlowId>,
    flows: HashMap<FlowId, FlowState>,
}

impl SessionTokenIssuer {
    pub fn new(authority: Arc<TokenAuthority>, challenge: ChallengeConfig) -> Self {
        Self {
            authority,
            verifier: SignatureVerifier::new(),
            challenge,
            active: None,
            latest: None,
            flows: HashMap::new(),
        }
    }

    pub fn authority(&self) -> &Arc<TokenAuthority> {
        &self.authority
    }

    /// State of a flow, if it is still tracked.
    ///
    /// Only the latest flow and the one before it are remembered.
    pub fn flow_state(&self, id: FlowId) -> Option<FlowState> {
        self.flows.get(&id).copied()
    }

    /// Id of the flow whose completion would currently be accepted.
    pub fn active_flow(&self) -> Option<FlowId> {
        self.active
    }

    /// Start a new flow, superseding any pending one.
    ///
    /// Flows older than the previous one are forgotten; a completion for them
    /// is still rejected because it is not the active flow.
    pub fn begin(&mut self) -> AuthFlow {
        if let Some(previous) = self.active.take() {
            if let Some(state) = self.flows.get_mut(&previous) {
                if *state == FlowState::Pending {
                    *state = FlowState::Superseded;
                    debug!(flow = %previous, "Superseded pending sign-in flow");
                }
            }
        }

        let previous = self.latest;
        self.flows.retain(|id, _| Some(*id) == previous);

        let flow = AuthFlow {
            id: Uuid::new_v4(),
            nonce: generate_nonce(),
            started_at: Utc::now(),
        };
        self.flows.insert(flow.id, FlowState::Pending);
        self.active = Some(flow.id);
        self.latest = Some(flow.id);
        flow
    }

    /// Ask the wallet to sign the flow's challenge.
    ///
    /// This is the only suspension point of the handshake. It does not touch
    /// issuer state, so a new flow may be started while it is outstanding.
    pub async fn sign(
        &self,
        flow: &AuthFlow,
        wallet: Option<&dyn WalletProvider>,
        validity: Duration,
    ) -> Result<SignedChallenge> {
        let wallet = wallet.ok_or(AuthError::WalletUnavailable)?;
        let validity = self.window(validity)?;

        let accounts = wallet.request_accounts().await?;
        let account = *accounts.first().ok_or_else(|| AuthError::UserRejected {
            reason: "wallet exposed no accounts".to_string(),
        })?;

        let challenge = self
            .challenge
            .render(&account, &flow.nonce, Utc::now(), validity)?;

        debug!(flow = %flow.id, address = %format_address(&account), "Requesting wallet signature");
        let signature = wallet
            .sign_message(account, challenge.message.as_bytes())
            .await?;

        Ok(SignedChallenge {
            flow: flow.id,
            account,
            challenge,
            signature,
        })
    }

    /// Commit the outcome of a flow's wallet round trip.
    ///
    /// Stale or duplicate completions return [`AuthError::Cancelled`] and
    /// change nothing.
    pub fn complete(
        &mut self,
        flow: FlowId,
        outcome: Result<SignedChallenge>,
        validity: Duration,
    ) -> Result<SessionToken> {
        if self.active != Some(flow) {
            debug!(flow = %flow, state = ?self.flows.get(&flow), "Ignoring completion of inactive flow");
            return Err(AuthError::Cancelled { flow });
        }
        if matches!(&outcome, Ok(signed) if signed.flow != flow) {
            warn!(flow = %flow, "Signed challenge belongs to a different flow");
            return Err(AuthError::Cancelled { flow });
        }

        match self.finish(outcome, validity) {
            Ok(token) => {
                self.settle(flow, FlowState::Issued);
                info!(flow = %flow, address = %token.claims().sub, "Issued session token");
                Ok(token)
            }
            Err(e) => {
                self.settle(flow, FlowState::Failed);
                warn!(flow = %flow, error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    /// Run a complete flow: begin, sign, complete.
    pub async fn issue(
        &mut self,
        wallet: Option<&dyn WalletProvider>,
        validity: Duration,
    ) -> Result<SessionToken> {
        let flow = self.begin();
        let outcome = self.sign(&flow, wallet, validity).await;
        self.complete(flow.id, outcome, validity)
    }

    fn settle(&mut self, flow: FlowId, state: FlowState) {
        self.flows.insert(flow, state);
        self.active = None;
    }

    /// Validity actually granted for a `requested` window.
    fn window(&self, requested: Duration) -> Result<Duration> {
        check_validity(requested.min(self.authority.validity()))
    }

    fn finish(&self, outcome: Result<SignedChallenge>, validity: Duration) -> Result<SessionToken> {
        let signed = outcome?;
        let validity = self.window(validity)?;

        let recovered = self
            .verifier
            .recover(signed.challenge.message.as_bytes(), &signed.signature)
            .ok_or(AuthError::InvalidSignature)?;

        if recovered != signed.account {
            return Err(AuthError::AddressMismatch {
                expected: format_address(&signed.account),
                actual: format_address(&recovered),
            });
        }

        let claims = SessionClaims::new(
            &recovered,
            Utc::now(),
            validity,
            signed.challenge.nonce.clone(),
            signed.challenge.message.clone(),
            &signed.signature,
        );
        self.authority.sign(claims)
    }
}
