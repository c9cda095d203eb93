//! Shatranj: wallet-authenticated two-player chess.
//!
//! This is the root crate used by the integration tests and benchmarks.
//! For actual functionality, use the individual crates directly:
//!
//! - `auth`: Signature verification, session tokens, persisted sessions
//! - `chess-game`: Position state, turn resolution, game sessions

pub use auth;
pub use chess_game as game;
