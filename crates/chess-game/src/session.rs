//! Game session orchestration.
//!
//! [`GameSession`] is the only writer of the position, the move history and
//! the persisted session. It combines them into one state machine:
//!
//! ```text
//! Unauthenticated ──login / restore──▶ Observer | Player(colour)
//!        ▲                                     │
//!        └────────── logout / expiry ──────────┘
//! ```
//!
//! Every operation is all-or-nothing. A rejected move, load or login leaves
//! the position, history, auth state and stored records exactly as they were.

use auth::{
    format_address, Address, AuthError, AuthFlow, FlowId, SessionStore, SessionToken,
    SessionTokenIssuer, SignedChallenge, StoreError, WalletProvider,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RejectedLoad, RejectedMove};
use crate::position::{MoveRecord, Position, PositionState};
use crate::roster::{Player, Roster, Seat, TurnResolver};
use crate::rules::{LegalityChecker, ShakmatyRules};
use crate::types::Color;

/// Authentication state of the local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AuthState {
    Unauthenticated,
    /// Signed in with a wallet that holds no seat.
    Observer { address: Address },
    Player { address: Address, color: Color },
}

impl AuthState {
    pub fn address(&self) -> Option<&Address> {
        match self {
            AuthState::Unauthenticated => None,
            AuthState::Observer { address } | AuthState::Player { address, .. } => Some(address),
        }
    }

    pub fn seat(&self) -> Option<Seat> {
        match self {
            AuthState::Unauthenticated => None,
            AuthState::Observer { .. } => Some(Seat::Observer),
            AuthState::Player { color, .. } => Some(Seat::Player(*color)),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthState::Unauthenticated)
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "not signed in"),
            AuthState::Observer { address } => {
                write!(f, "{} (observer)", format_address(address))
            }
            AuthState::Player { address, color } => {
                write!(f, "{} (playing {})", format_address(address), color)
            }
        }
    }
}

/// One match seen from one user's seat.
pub struct GameSession<C: LegalityChecker = ShakmatyRules> {
    roster: Roster,
    position: PositionState<C>,
    store: SessionStore,
    issuer: SessionTokenIssuer,
    validity: Duration,
    state: AuthState,
    token: Option<SessionToken>,
}

impl<C: LegalityChecker> GameSession<C> {
    /// Create an unauthenticated session. Call [`restore`](Self::restore) to
    /// pick up a persisted login.
    pub fn new(
        roster: Roster,
        position: PositionState<C>,
        store: SessionStore,
        issuer: SessionTokenIssuer,
        validity: Duration,
    ) -> Self {
        Self {
            roster,
            position,
            store,
            issuer,
            validity,
            state: AuthState::Unauthenticated,
            token: None,
        }
    }

    pub fn restore(&mut self) -> &AuthState {
        self.restore_at(Utc::now())
    }

    /// Adopt the stored token if it is still valid at `now`.
    ///
    /// Repeated calls with the same token leave the state as it is. An
    /// expired or invalid token is cleared by the store and downgrades the
    /// session to unauthenticated.
    pub fn restore_at(&mut self, now: DateTime<Utc>) -> &AuthState {
        match self.store.load_at(now) {
            Some(token) => self.adopt(token),
            None => self.downgrade("no valid stored session"),
        }
        &self.state
    }

    /// Current state, downgrading first if the token has expired by `now`.
    pub fn state_at(&mut self, now: DateTime<Utc>) -> &AuthState {
        self.check_expiry(now);
        &self.state
    }

    /// State as of the last check. Does not look at the token's expiry;
    /// call [`Self::state_at`] first for a current answer.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Start a sign-in flow. Any flow still pending is superseded.
    pub fn begin_login(&mut self) -> AuthFlow {
        self.issuer.begin()
    }

    /// Wallet round trip for `flow`. Nothing in the session changes while it
    /// is outstanding.
    pub async fn sign_login(
        &self,
        flow: &AuthFlow,
        wallet: Option<&dyn WalletProvider>,
    ) -> Result<SignedChallenge, AuthError> {
        self.issuer.sign(flow, wallet, self.validity).await
    }

    pub fn complete_login(
        &mut self,
        flow: FlowId,
        outcome: Result<SignedChallenge, AuthError>,
    ) -> Result<AuthState, AuthError> {
        self.complete_login_at(flow, outcome, Utc::now())
    }

    /// Commit the outcome of a flow.
    ///
    /// A superseded or duplicate completion is ignored and returns the
    /// current state. A token already expired at `now` is refused. On any
    /// other failure the session is unchanged.
    pub fn complete_login_at(
        &mut self,
        flow: FlowId,
        outcome: Result<SignedChallenge, AuthError>,
        now: DateTime<Utc>,
    ) -> Result<AuthState, AuthError> {
        let token = match self.issuer.complete(flow, outcome, self.validity) {
            Ok(token) => token,
            Err(AuthError::Cancelled { flow }) => {
                debug!(flow = %flow, "Stale sign-in completion ignored");
                return Ok(self.state.clone());
            }
            Err(e) => return Err(e),
        };
        if token.is_expired_at(now) {
            warn!(expires_at = %token.expires_at(), "Refusing already expired session token");
            return Err(AuthError::TokenExpired);
        }

        self.store.save(&token)?;
        self.adopt(token);
        Ok(self.state.clone())
    }

    /// Run a complete sign-in with `wallet`.
    pub async fn login(
        &mut self,
        wallet: Option<&dyn WalletProvider>,
    ) -> Result<AuthState, AuthError> {
        let flow = self.begin_login();
        let outcome = self.sign_login(&flow, wallet).await;
        self.complete_login(flow.id, outcome)
    }

    /// Clear the persisted session and sign out.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.store.clear()?;
        self.downgrade("logout");
        Ok(())
    }

    pub fn submit_move(&mut self, mv: &str) -> Result<Position, RejectedMove> {
        self.submit_move_at(mv, Utc::now())
    }

    /// Apply `mv` for the signed-in player if it is their turn.
    pub fn submit_move_at(&mut self, mv: &str, now: DateTime<Utc>) -> Result<Position, RejectedMove> {
        let seat = self.seated_color(now).map_err(|e| match e {
            Unseated::Unauthenticated => RejectedMove::Unauthenticated,
            Unseated::Observer => RejectedMove::Observer,
        })?;

        let to_move = self.position.current_side_to_move();
        if seat != to_move {
            debug!(seat = %seat, to_move = %to_move, "Move submitted out of turn");
            return Err(RejectedMove::NotYourTurn { seat, to_move });
        }

        let position = self.position.apply_move(mv)?;
        info!(seat = %seat, uci = %mv, status = %position.status(), "Move accepted");
        Ok(position)
    }

    pub fn load_position(&mut self, fen: &str) -> Result<Position, RejectedLoad> {
        self.load_position_at(fen, Utc::now())
    }

    /// Replace the board. Only seated players may do this.
    pub fn load_position_at(&mut self, fen: &str, now: DateTime<Utc>) -> Result<Position, RejectedLoad> {
        self.seated_color(now).map_err(|e| match e {
            Unseated::Unauthenticated => RejectedLoad::Unauthenticated,
            Unseated::Observer => RejectedLoad::Observer,
        })?;
        Ok(self.position.load_position(fen)?)
    }

    pub fn undo(&mut self) -> Result<Option<Position>, RejectedMove> {
        self.undo_at(Utc::now())
    }

    /// Take back the last ply. Either seated player may do this at any time.
    pub fn undo_at(&mut self, now: DateTime<Utc>) -> Result<Option<Position>, RejectedMove> {
        self.seated_color(now).map_err(|e| match e {
            Unseated::Unauthenticated => RejectedMove::Unauthenticated,
            Unseated::Observer => RejectedMove::Observer,
        })?;
        Ok(self.position.undo())
    }

    /// Colour the board should be drawn from.
    ///
    /// Reads the last checked state, like [`Self::state`].
    pub fn orientation(&self) -> Color {
        match &self.state {
            AuthState::Player { color, .. } => *color,
            _ => Color::White,
        }
    }

    /// Seated player matching the signed-in address, as of the last check.
    pub fn current_player(&self) -> Option<&Player> {
        self.state
            .address()
            .and_then(|address| self.roster.player_for(address))
    }

    /// Expiry of the adopted session token.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().map(SessionToken::expires_at)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn position(&self) -> &Position {
        self.position.position()
    }

    pub fn history(&self) -> &[MoveRecord] {
        self.position.history()
    }

    pub fn move_list(&self) -> String {
        self.position.move_list()
    }

    pub fn legal_moves(&self) -> Vec<String> {
        self.position.legal_moves()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn adopt(&mut self, token: SessionToken) {
        let address = token.address();
        let next = match TurnResolver::resolve(Some(&address), &self.roster) {
            Seat::Player(color) => AuthState::Player { address, color },
            Seat::Observer => AuthState::Observer { address },
        };
        if next != self.state {
            info!(state = %next, expires_at = %token.expires_at(), "Session authenticated");
        }
        self.state = next;
        self.token = Some(token);
    }

    fn downgrade(&mut self, reason: &str) {
        if self.state.is_authenticated() {
            info!(reason = %reason, "Session signed out");
        }
        self.state = AuthState::Unauthenticated;
        self.token = None;
    }

    fn check_expiry(&mut self, now: DateTime<Utc>) {
        if self.token.as_ref().is_some_and(|t| t.is_expired_at(now)) {
            warn!("Session token expired");
            // Let the store drop its copy too.
            let _ = self.store.load_at(now);
            self.downgrade("token expired");
        }
    }

    fn seated_color(&mut self, now: DateTime<Utc>) -> Result<Color, Unseated> {
        self.check_expiry(now);
        match &self.state {
            AuthState::Unauthenticated => Err(Unseated::Unauthenticated),
            AuthState::Observer { .. } => Err(Unseated::Observer),
            AuthState::Player { color, .. } => Ok(*color),
        }
    }
}

enum Unseated {
    Unauthenticated,
    Observer,
}
