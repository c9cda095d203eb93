//! Chess Game
//!
//! Position state and move history, turn ownership by wallet address, and the
//! wallet-gated game session that ties them to a persisted login.

pub mod config;
pub mod error;
pub mod fen;
pub mod notification;
pub mod position;
pub mod roster;
pub mod rules;
pub mod session;
pub mod types;

pub use config::{AppConfig, SessionConfig};
pub use error::{IllegalMoveError, MalformedPositionError, RejectedLoad, RejectedMove};
pub use fen::{validate_fen, START_FEN};
pub use notification::{Notification, NotificationLevel};
pub use position::{MoveRecord, Position, PositionState};
pub use roster::{Player, Roster, RosterError, Seat, TurnResolver};
pub use rules::{AppliedMove, LegalityChecker, ShakmatyRules};
pub use session::{AuthState, GameSession};
pub use types::{Color, GameStatus};
