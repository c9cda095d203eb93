//! Structural validation of FEN strings.
//!
//! This only checks shape: field count, row layout, and token syntax.
//! Whether the position is playable (kings present, side not to move not in
//! check, ...) is left to the rules engine.

use crate::error::MalformedPositionError;

/// Standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const PIECES: &str = "pnbrqkPNBRQK";
const CASTLING_ORDER: &str = "KQkq";

/// Check that `fen` has the six-field FEN structure.
pub fn validate_fen(fen: &str) -> Result<(), MalformedPositionError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(MalformedPositionError::FieldCount {
            found: fields.len(),
        });
    }

    let full_move = fields[5];
    if !full_move.parse::<u32>().is_ok_and(|n| n > 0) {
        return Err(MalformedPositionError::FullMoveNumber {
            token: full_move.to_string(),
        });
    }

    let half_move = fields[4];
    if half_move.parse::<u32>().is_err() {
        return Err(MalformedPositionError::HalfMoveClock {
            token: half_move.to_string(),
        });
    }

    let side = fields[1];
    if side != "w" && side != "b" {
        return Err(MalformedPositionError::SideToMove {
            token: side.to_string(),
        });
    }

    validate_en_passant(fields[3], side)?;
    validate_castling(fields[2])?;
    validate_placement(fields[0])
}

fn validate_en_passant(token: &str, side: &str) -> Result<(), MalformedPositionError> {
    if token == "-" {
        return Ok(());
    }
    let err = || MalformedPositionError::EnPassant {
        token: token.to_string(),
    };

    let bytes = token.as_bytes();
    if bytes.len() != 2 || !(b'a'..=b'h').contains(&bytes[0]) {
        return Err(err());
    }
    // The target square sits behind the pawn that just double-stepped.
    match (bytes[1], side) {
        (b'6', "w") | (b'3', "b") => Ok(()),
        _ => Err(err()),
    }
}

fn validate_castling(token: &str) -> Result<(), MalformedPositionError> {
    if token == "-" {
        return Ok(());
    }
    let err = || MalformedPositionError::Castling {
        token: token.to_string(),
    };

    // Each flag at most once, in KQkq order.
    let mut last = None;
    for ch in token.chars() {
        let index = CASTLING_ORDER.find(ch).ok_or_else(err)?;
        if last.is_some_and(|prev| index <= prev) {
            return Err(err());
        }
        last = Some(index);
    }
    if last.is_none() {
        return Err(err());
    }
    Ok(())
}

fn validate_placement(placement: &str) -> Result<(), MalformedPositionError> {
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != 8 {
        return Err(MalformedPositionError::PiecePlacementRows { found: rows.len() });
    }

    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 1;
        let mut width = 0usize;
        let mut previous_was_digit = false;

        for ch in row.chars() {
            if let Some(skip) = ch.to_digit(10).filter(|d| (1..=8).contains(d)) {
                if previous_was_digit {
                    return Err(MalformedPositionError::ConsecutiveDigits { row: row_number });
                }
                width += skip as usize;
                previous_was_digit = true;
            } else if PIECES.contains(ch) {
                width += 1;
                previous_was_digit = false;
            } else {
                return Err(MalformedPositionError::InvalidPiece { ch });
            }
        }

        if width != 8 {
            return Err(MalformedPositionError::RowWidth {
                row: row_number,
                width,
            });
        }
    }

    Ok(())
}
