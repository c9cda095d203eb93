//! Rules engine boundary.
//!
//! [`PositionState`](crate::position::PositionState) never interprets chess
//! rules itself; it hands FEN strings and UCI moves to a [`LegalityChecker`].
//! [`ShakmatyRules`] is the production implementation.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{
    attacks, CastlingMode, CastlingSide, Chess, EnPassantMode, Piece, Position as _, Rank, Role,
    Square,
};

use crate::error::{IllegalMoveError, MalformedPositionError};
use crate::position::Position;
use crate::types::{Color, GameStatus};

/// A move the engine accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Normalized UCI text of the move.
    pub uci: String,
    /// Standard algebraic notation, with `+`/`#` suffix.
    pub san: String,
    /// Position after the move.
    pub position: Position,
}

/// Chess rules capability.
#[cfg_attr(test, mockall::automock)]
pub trait LegalityChecker: Send + Sync {
    /// Parse and normalize a structurally valid FEN.
    fn inspect(&self, fen: &str) -> Result<Position, MalformedPositionError>;

    /// Apply a UCI move to the position described by `fen`.
    fn apply(&self, fen: &str, mv: &str) -> Result<AppliedMove, IllegalMoveError>;

    /// All legal moves in UCI notation.
    fn legal_moves(&self, fen: &str) -> Vec<String>;
}

/// Standard chess rules backed by `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl ShakmatyRules {
    pub fn new() -> Self {
        Self
    }

    fn parse(fen: &str) -> Result<Chess, String> {
        let setup: Fen = fen.trim().parse().map_err(|e| format!("{}", e))?;
        setup
            .into_position(CastlingMode::Standard)
            .map_err(|e| format!("{}", e))
    }

    fn describe(pos: &Chess) -> Position {
        let fen = Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string();
        Position::new(fen, side(pos.turn()), status_of(pos))
    }
}

impl LegalityChecker for ShakmatyRules {
    fn inspect(&self, fen: &str) -> Result<Position, MalformedPositionError> {
        let pos = Self::parse(fen).map_err(|reason| MalformedPositionError::Illegal { reason })?;
        Ok(Self::describe(&pos))
    }

    fn apply(&self, fen: &str, mv: &str) -> Result<AppliedMove, IllegalMoveError> {
        let pos = Self::parse(fen).map_err(|reason| IllegalMoveError::Engine { reason })?;

        let status = status_of(&pos);
        if status.is_over() {
            return Err(IllegalMoveError::GameOver { status });
        }

        let input = mv.trim().to_ascii_lowercase();
        let uci: UciMove = input.parse().map_err(|_| IllegalMoveError::Malformed {
            input: mv.to_string(),
        })?;

        let m = match uci.to_move(&pos) {
            Ok(m) => m,
            Err(_) => return Err(classify(&pos, &uci, &input)),
        };

        let san = San::from_move(&pos, &m);
        let after = pos
            .play(&m)
            .map_err(|_| IllegalMoveError::KingLeftInCheck { uci: input.clone() })?;

        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        Ok(AppliedMove {
            uci: uci.to_string(),
            san: format!("{}{}", san, suffix),
            position: Self::describe(&after),
        })
    }

    fn legal_moves(&self, fen: &str) -> Vec<String> {
        match Self::parse(fen) {
            Ok(pos) => pos
                .legal_moves()
                .iter()
                .map(|m| m.to_uci(CastlingMode::Standard).to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn side(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

fn status_of(pos: &Chess) -> GameStatus {
    if pos.is_checkmate() {
        GameStatus::Checkmate {
            winner: side(pos.turn()).opposite(),
        }
    } else if pos.is_stalemate() {
        GameStatus::Stalemate
    } else if pos.is_insufficient_material() {
        GameStatus::InsufficientMaterial
    } else if pos.is_check() {
        GameStatus::Check
    } else {
        GameStatus::Ongoing
    }
}

/// Explain why the engine refused `uci`.
fn classify(pos: &Chess, uci: &UciMove, input: &str) -> IllegalMoveError {
    let (from, to, promotion) = match uci {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => (*from, *to, *promotion),
        _ => {
            return IllegalMoveError::Malformed {
                input: input.to_string(),
            }
        }
    };

    let turn = pos.turn();
    let Some(piece) = pos.board().piece_at(from) else {
        return IllegalMoveError::NoPieceOnSquare {
            square: from.to_string(),
        };
    };

    if piece.color != turn {
        return IllegalMoveError::WrongSideToMove {
            square: from.to_string(),
            piece: side(piece.color),
            to_move: side(turn),
        };
    }

    if let Some(castle) = castling_side(piece, from, to) {
        let castles = pos.castles();
        let blocked = (castles.path(turn, castle) & pos.board().occupied()).any();
        if !castles.has(turn, castle) || blocked {
            return IllegalMoveError::UnreachableSquare {
                from: from.to_string(),
                to: to.to_string(),
            };
        }
        // Rights and path are fine, so the king starts in, crosses or lands
        // on an attacked square.
        return IllegalMoveError::KingLeftInCheck {
            uci: input.to_string(),
        };
    }

    if !pseudo_reachable(pos, piece, from, to) {
        return IllegalMoveError::UnreachableSquare {
            from: from.to_string(),
            to: to.to_string(),
        };
    }

    let last_rank = matches!(to.rank(), Rank::First | Rank::Eighth);
    match (piece.role == Role::Pawn && last_rank, promotion.is_some()) {
        (true, false) => IllegalMoveError::MissingPromotion {
            uci: input.to_string(),
        },
        (false, true) => IllegalMoveError::Malformed {
            input: input.to_string(),
        },
        _ => IllegalMoveError::KingLeftInCheck {
            uci: input.to_string(),
        },
    }
}

/// Side a king move castles towards, if it is two files along its home rank.
fn castling_side(piece: Piece, from: Square, to: Square) -> Option<CastlingSide> {
    let home = match piece.color {
        shakmaty::Color::White => Rank::First,
        shakmaty::Color::Black => Rank::Eighth,
    };
    if piece.role != Role::King || from.rank() != home || to.rank() != home {
        return None;
    }
    match to.file().char() as i32 - from.file().char() as i32 {
        2 => Some(CastlingSide::KingSide),
        -2 => Some(CastlingSide::QueenSide),
        _ => None,
    }
}

/// Whether `piece` could move from `from` to `to` ignoring king safety.
/// Castling is handled by [`castling_side`] before this is reached.
fn pseudo_reachable(pos: &Chess, piece: Piece, from: Square, to: Square) -> bool {
    let board = pos.board();
    let occupied = board.occupied();

    if board.by_color(piece.color).contains(to) {
        return false;
    }

    if piece.role != Role::Pawn {
        return attacks::attacks(from, piece, occupied).contains(to);
    }

    let (forward, start_rank) = match piece.color {
        shakmaty::Color::White => (8, Rank::Second),
        shakmaty::Color::Black => (-8, Rank::Seventh),
    };
    let empty = |sq: Square| !occupied.contains(sq);

    let single = from.offset(forward);
    if single == Some(to) {
        return empty(to);
    }
    if from.rank() == start_rank && from.offset(2 * forward) == Some(to) {
        return single.is_some_and(empty) && empty(to);
    }

    attacks::pawn_attacks(piece.color, from).contains(to)
        && (board.by_color(!piece.color).contains(to)
            || pos.ep_square(EnPassantMode::PseudoLegal) == Some(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::START_FEN;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn test_inspect_start() {
        let pos = ShakmatyRules.inspect(START_FEN).unwrap();
        assert_eq!(pos.fen(), START_FEN);
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.status(), GameStatus::Ongoing);
    }

    #[test]
    fn test_inspect_rejects_kingless_board() {
        let result = ShakmatyRules.inspect("8/8/8/8/8/8/8/8 w - - 0 1");
        assert!(matches!(result, Err(MalformedPositionError::Illegal { .. })));
    }

    #[test]
    fn test_apply_pawn_advance() {
        let applied = ShakmatyRules.apply(START_FEN, "e2e4").unwrap();
        assert_eq!(applied.uci, "e2e4");
        assert_eq!(applied.san, "e4");
        assert_eq!(applied.position.fen(), AFTER_E4);
        assert_eq!(applied.position.side_to_move(), Color::Black);
    }

    #[test]
    fn test_apply_accepts_uppercase() {
        let applied = ShakmatyRules.apply(START_FEN, " G1F3 ").unwrap();
        assert_eq!(applied.san, "Nf3");
    }

    #[test]
    fn test_malformed_move() {
        assert!(matches!(
            ShakmatyRules.apply(START_FEN, "hello"),
            Err(IllegalMoveError::Malformed { .. })
        ));
    }

    #[test]
    fn test_no_piece() {
        assert_eq!(
            ShakmatyRules.apply(START_FEN, "e4e5"),
            Err(IllegalMoveError::NoPieceOnSquare {
                square: "e4".to_string()
            })
        );
    }

    #[test]
    fn test_wrong_side() {
        assert_eq!(
            ShakmatyRules.apply(START_FEN, "e7e5"),
            Err(IllegalMoveError::WrongSideToMove {
                square: "e7".to_string(),
                piece: Color::Black,
                to_move: Color::White,
            })
        );
    }

    #[test]
    fn test_unreachable() {
        assert!(matches!(
            ShakmatyRules.apply(START_FEN, "e2e5"),
            Err(IllegalMoveError::UnreachableSquare { .. })
        ));
        // Bishop blocked by own pawn
        assert!(matches!(
            ShakmatyRules.apply(START_FEN, "f1c4"),
            Err(IllegalMoveError::UnreachableSquare { .. })
        ));
    }

    #[test]
    fn test_pinned_piece_leaves_king_in_check() {
        // Black bishop on b4 pins the white knight on c3 to the king on e1.
        let fen = "rnbqk1nr/pppp1ppp/8/4p3/1b1P4/2N5/PPP1PPPP/R1BQKBNR w KQkq - 2 3";
        assert!(matches!(
            ShakmatyRules.apply(fen, "c3d5"),
            Err(IllegalMoveError::KingLeftInCheck { .. })
        ));
    }

    #[test]
    fn test_castling_out_of_or_through_check() {
        // Rook on e8 gives check.
        assert!(matches!(
            ShakmatyRules.apply("4r1k1/8/8/8/8/8/8/4K2R w K - 0 1", "e1g1"),
            Err(IllegalMoveError::KingLeftInCheck { .. })
        ));
        // Rook on f8 covers f1.
        assert!(matches!(
            ShakmatyRules.apply("5rk1/8/8/8/8/8/8/4K2R w K - 0 1", "e1g1"),
            Err(IllegalMoveError::KingLeftInCheck { .. })
        ));
        // Queenside for black, d8 covered by the rook on d1.
        assert!(matches!(
            ShakmatyRules.apply("r3k3/8/8/8/8/8/8/3RK3 b q - 0 1", "e8c8"),
            Err(IllegalMoveError::KingLeftInCheck { .. })
        ));
    }

    #[test]
    fn test_castling_without_rights_or_path_is_unreachable() {
        assert!(matches!(
            ShakmatyRules.apply("4k3/8/8/8/8/8/8/4K2R w - - 0 1", "e1g1"),
            Err(IllegalMoveError::UnreachableSquare { .. })
        ));
        assert!(matches!(
            ShakmatyRules.apply(START_FEN, "e1g1"),
            Err(IllegalMoveError::UnreachableSquare { .. })
        ));
    }

    #[test]
    fn test_castling_when_allowed() {
        let applied = ShakmatyRules.apply("4k3/8/8/8/8/8/8/4K2R w K - 0 1", "e1g1").unwrap();
        assert_eq!(applied.san, "O-O");
    }

    #[test]
    fn test_missing_promotion() {
        let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        assert!(matches!(
            ShakmatyRules.apply(fen, "e7e8"),
            Err(IllegalMoveError::MissingPromotion { .. })
        ));
        let applied = ShakmatyRules.apply(fen, "e7e8q").unwrap();
        assert_eq!(applied.san, "e8=Q");
    }

    #[test]
    fn test_checkmate_is_reported() {
        // Fool's mate
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        let applied = ShakmatyRules.apply(fen, "d8h4").unwrap();
        assert_eq!(applied.san, "Qh4#");
        assert_eq!(
            applied.position.status(),
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );

        assert!(matches!(
            ShakmatyRules.apply(applied.position.fen(), "e2e3"),
            Err(IllegalMoveError::GameOver { .. })
        ));
    }

    #[test]
    fn test_legal_moves_from_start() {
        let moves = ShakmatyRules.legal_moves(START_FEN);
        assert_eq!(moves.len(), 20);
        assert!(moves.contains(&"e2e4".to_string()));
        assert!(moves.contains(&"g1f3".to_string()));
    }
}
