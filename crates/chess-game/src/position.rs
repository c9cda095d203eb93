//! Current game position and move history.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{IllegalMoveError, MalformedPositionError};
use crate::fen::{validate_fen, START_FEN};
use crate::rules::{LegalityChecker, ShakmatyRules};
use crate::types::{Color, GameStatus};

/// A rules-checked snapshot of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    fen: String,
    side_to_move: Color,
    status: GameStatus,
}

impl Position {
    pub fn new(fen: String, side_to_move: Color, status: GameStatus) -> Self {
        Self {
            fen,
            side_to_move,
            status,
        }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Full-move number from the sixth FEN field.
    pub fn fullmove_number(&self) -> u32 {
        self.fen
            .split_whitespace()
            .nth(5)
            .and_then(|n| n.parse().ok())
            .unwrap_or(1)
    }
}

/// One applied ply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub number: u32,
    pub ply: usize,
    pub color: Color,
    pub uci: String,
    pub san: String,
    pub fen_after: String,
}

/// Holds the current position and the moves played since the last load.
///
/// Every mutation is all-or-nothing: a rejected move or position leaves the
/// state exactly as it was.
pub struct PositionState<C: LegalityChecker = ShakmatyRules> {
    checker: C,
    start: Position,
    current: Position,
    moves: Vec<MoveRecord>,
}

impl PositionState<ShakmatyRules> {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::with_checker(ShakmatyRules)
    }

    pub fn from_fen(fen: &str) -> Result<Self, MalformedPositionError> {
        let mut state = Self::new();
        state.load_position(fen)?;
        Ok(state)
    }
}

impl Default for PositionState<ShakmatyRules> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LegalityChecker> PositionState<C> {
    /// Start from the standard position using `checker` for rules.
    pub fn with_checker(checker: C) -> Self {
        let start = Position::new(START_FEN.to_string(), Color::White, GameStatus::Ongoing);
        Self {
            checker,
            current: start.clone(),
            start,
            moves: Vec::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.current
    }

    pub fn current_side_to_move(&self) -> Color {
        self.current.side_to_move
    }

    pub fn status(&self) -> GameStatus {
        self.current.status
    }

    /// Current position as FEN.
    pub fn serialize(&self) -> &str {
        &self.current.fen
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn legal_moves(&self) -> Vec<String> {
        self.checker.legal_moves(&self.current.fen)
    }

    /// Apply a UCI move for whichever side is to move.
    pub fn apply_move(&mut self, mv: &str) -> Result<Position, IllegalMoveError> {
        let applied = self.checker.apply(&self.current.fen, mv)?;

        let record = MoveRecord {
            number: self.current.fullmove_number(),
            ply: self.moves.len() + 1,
            color: self.current.side_to_move,
            uci: applied.uci,
            san: applied.san,
            fen_after: applied.position.fen.clone(),
        };
        debug!(uci = %record.uci, san = %record.san, "Move applied");

        self.moves.push(record);
        self.current = applied.position;
        Ok(self.current.clone())
    }

    /// Replace the position with `fen`, discarding the move history.
    pub fn load_position(&mut self, fen: &str) -> Result<Position, MalformedPositionError> {
        validate_fen(fen)?;
        let position = self.checker.inspect(fen)?;

        info!(fen = %position.fen, "Position loaded");
        self.start = position.clone();
        self.current = position;
        self.moves.clear();
        Ok(self.current.clone())
    }

    /// Take back the last ply by replaying the remaining moves from the
    /// loaded position. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Position> {
        let (_, kept) = self.moves.split_last()?;

        let mut position = self.start.clone();
        let mut replayed = Vec::with_capacity(kept.len());
        for record in kept {
            let applied = self.checker.apply(&position.fen, &record.uci).ok()?;
            replayed.push(MoveRecord {
                fen_after: applied.position.fen.clone(),
                ..record.clone()
            });
            position = applied.position;
        }

        debug!(remaining = replayed.len(), "Move taken back");
        self.moves = replayed;
        self.current = position;
        Some(self.current.clone())
    }

    /// Numbered SAN move list, e.g. `1. e4 e5 2. Nf3`.
    pub fn move_list(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.moves.iter().enumerate() {
            if !out.is_empty() {
                out.push(' ');
            }
            match record.color {
                Color::White => out.push_str(&format!("{}. ", record.number)),
                Color::Black if i == 0 => out.push_str(&format!("{}... ", record.number)),
                Color::Black => {}
            }
            out.push_str(&record.san);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{AppliedMove, MockLegalityChecker};

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn test_new_game() {
        let state = PositionState::new();
        assert_eq!(state.serialize(), START_FEN);
        assert_eq!(state.current_side_to_move(), Color::White);
        assert!(state.history().is_empty());
        assert_eq!(state.legal_moves().len(), 20);
    }

    #[test]
    fn test_apply_move_records_history() {
        let mut state = PositionState::new();
        state.apply_move("e2e4").unwrap();
        state.apply_move("e7e5").unwrap();
        state.apply_move("g1f3").unwrap();

        assert_eq!(state.current_side_to_move(), Color::Black);
        assert_eq!(state.history().len(), 3);
        assert_eq!(state.history()[1].color, Color::Black);
        assert_eq!(state.history()[2].number, 2);
        assert_eq!(state.move_list(), "1. e4 e5 2. Nf3");
    }

    #[test]
    fn test_illegal_move_leaves_state_untouched() {
        let mut state = PositionState::new();
        state.apply_move("e2e4").unwrap();
        let before = state.position().clone();

        assert!(state.apply_move("e2e4").is_err());
        assert_eq!(state.position(), &before);
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_load_round_trip() {
        let mut state = PositionState::new();
        state.apply_move("e2e4").unwrap();

        let mut copy = PositionState::from_fen(state.serialize()).unwrap();
        assert_eq!(copy.serialize(), AFTER_E4);
        assert_eq!(copy.current_side_to_move(), Color::Black);
        assert!(copy.history().is_empty());

        copy.apply_move("c7c5").unwrap();
        assert_eq!(copy.move_list(), "1... c5");
    }

    #[test]
    fn test_malformed_load_leaves_state_untouched() {
        let mut state = PositionState::new();
        state.apply_move("d2d4").unwrap();
        let before = state.serialize().to_string();

        assert!(matches!(
            state.load_position("not a fen"),
            Err(MalformedPositionError::FieldCount { found: 3 })
        ));
        assert!(matches!(
            state.load_position("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(MalformedPositionError::Illegal { .. })
        ));
        assert_eq!(state.serialize(), before);
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_undo() {
        let mut state = PositionState::new();
        assert!(state.undo().is_none());

        state.apply_move("e2e4").unwrap();
        state.apply_move("e7e5").unwrap();

        let position = state.undo().unwrap();
        assert_eq!(position.fen(), AFTER_E4);
        assert_eq!(state.history().len(), 1);

        state.undo().unwrap();
        assert_eq!(state.serialize(), START_FEN);
        assert!(state.undo().is_none());
    }

    #[test]
    fn test_undo_replays_from_loaded_position() {
        let mut state = PositionState::from_fen(AFTER_E4).unwrap();
        state.apply_move("e7e5").unwrap();
        state.apply_move("g1f3").unwrap();

        state.undo().unwrap();
        assert_eq!(state.current_side_to_move(), Color::White);
        assert_eq!(state.move_list(), "1... e5");
    }

    #[test]
    fn test_checker_rejection_is_atomic() {
        let mut checker = MockLegalityChecker::new();
        checker
            .expect_apply()
            .returning(|_, mv| {
                if mv == "a1a2" {
                    Ok(AppliedMove {
                        uci: mv.to_string(),
                        san: "Ra2".to_string(),
                        position: Position::new(
                            AFTER_E4.to_string(),
                            Color::Black,
                            GameStatus::Ongoing,
                        ),
                    })
                } else {
                    Err(IllegalMoveError::Engine {
                        reason: "refused".to_string(),
                    })
                }
            });

        let mut state = PositionState::with_checker(checker);
        assert!(state.apply_move("h2h4").is_err());
        assert_eq!(state.serialize(), START_FEN);

        state.apply_move("a1a2").unwrap();
        assert_eq!(state.current_side_to_move(), Color::Black);
        assert_eq!(state.history()[0].san, "Ra2");
    }

    #[test]
    fn test_fullmove_number() {
        let position = Position::new(
            "8/8/8/8/8/8/k7/4K3 w - - 12 40".to_string(),
            Color::White,
            GameStatus::Ongoing,
        );
        assert_eq!(position.fullmove_number(), 40);
    }
}
