//! Error types for position handling and move submission.

use thiserror::Error;

use crate::types::{Color, GameStatus};

/// Why the rules engine refused a move. Position state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalMoveError {
    #[error("Malformed move: {input}")]
    Malformed { input: String },

    #[error("No piece on {square}")]
    NoPieceOnSquare { square: String },

    #[error("Piece on {square} is {piece}, but {to_move} is to move")]
    WrongSideToMove {
        square: String,
        piece: Color,
        to_move: Color,
    },

    #[error("{to} is not reachable from {from}")]
    UnreachableSquare { from: String, to: String },

    #[error("Move {uci} would leave the king in check")]
    KingLeftInCheck { uci: String },

    #[error("Move {uci} needs a promotion piece")]
    MissingPromotion { uci: String },

    #[error("Game is over: {status}")]
    GameOver { status: GameStatus },

    #[error("Rules engine error: {reason}")]
    Engine { reason: String },
}

/// Why a serialized position was refused. Position state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPositionError {
    #[error("Position must contain six space-delimited fields, found {found}")]
    FieldCount { found: usize },

    #[error("Piece placement must contain 8 '/'-delimited rows, found {found}")]
    PiecePlacementRows { found: usize },

    #[error("Invalid piece character '{ch}'")]
    InvalidPiece { ch: char },

    #[error("Row {row} has consecutive digits")]
    ConsecutiveDigits { row: usize },

    #[error("Row {row} describes {width} squares instead of 8")]
    RowWidth { row: usize, width: usize },

    #[error("Invalid side to move '{token}'")]
    SideToMove { token: String },

    #[error("Invalid castling availability '{token}'")]
    Castling { token: String },

    #[error("Invalid en-passant square '{token}'")]
    EnPassant { token: String },

    #[error("Half-move clock must be a non-negative integer, got '{token}'")]
    HalfMoveClock { token: String },

    #[error("Full-move number must be a positive integer, got '{token}'")]
    FullMoveNumber { token: String },

    /// Structurally fine but not a legal chess position.
    #[error("Illegal position: {reason}")]
    Illegal { reason: String },
}

/// Why a move submission was refused. Nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedMove {
    #[error("Sign in with your wallet to play")]
    Unauthenticated,

    #[error("Observers cannot submit moves")]
    Observer,

    #[error("Not your turn: you play {seat}, {to_move} is to move")]
    NotYourTurn { seat: Color, to_move: Color },

    #[error(transparent)]
    Illegal(#[from] IllegalMoveError),
}

/// Why a position load was refused. Nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedLoad {
    #[error("Sign in with your wallet to load a position")]
    Unauthenticated,

    #[error("Observers cannot load positions")]
    Observer,

    #[error(transparent)]
    Malformed(#[from] MalformedPositionError),
}
