//! Seated players and address-to-colour resolution.

use auth::{format_address, parse_address, Address, InvalidAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Color;

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub address: Address,
}

impl Player {
    pub fn new(username: impl Into<String>, address: Address) -> Self {
        Self {
            username: username.into(),
            address,
        }
    }

    /// Build a player from an address string in any letter case.
    pub fn parse(username: impl Into<String>, address: &str) -> Result<Self, InvalidAddress> {
        Ok(Self::new(username, parse_address(address)?))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("White and black cannot share wallet {address}")]
    DuplicateAddress { address: String },
}

/// The two players of a match. Fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    white: Player,
    black: Player,
}

impl Roster {
    pub fn new(white: Player, black: Player) -> Result<Self, RosterError> {
        if white.address == black.address {
            return Err(RosterError::DuplicateAddress {
                address: format_address(&white.address),
            });
        }
        Ok(Self { white, black })
    }

    pub fn white(&self) -> &Player {
        &self.white
    }

    pub fn black(&self) -> &Player {
        &self.black
    }

    pub fn player(&self, color: Color) -> &Player {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Colour seated at `address`, if any.
    pub fn seat_of(&self, address: &Address) -> Option<Color> {
        if *address == self.white.address {
            Some(Color::White)
        } else if *address == self.black.address {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn player_for(&self, address: &Address) -> Option<&Player> {
        self.seat_of(address).map(|color| self.player(color))
    }
}

/// Where a caller sits relative to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Player(Color),
    Observer,
}

impl Seat {
    pub fn color(&self) -> Option<Color> {
        match self {
            Seat::Player(color) => Some(*color),
            Seat::Observer => None,
        }
    }
}

/// Maps a session's address to a seat.
pub struct TurnResolver;

impl TurnResolver {
    /// Addresses are compared as bytes, so letter case never matters.
    /// No address at all resolves to [`Seat::Observer`].
    pub fn resolve(address: Option<&Address>, roster: &Roster) -> Seat {
        address
            .and_then(|address| roster.seat_of(address))
            .map_or(Seat::Observer, Seat::Player)
    }

    /// Resolve a textual address. Unparseable input is an observer.
    pub fn resolve_str(address: &str, roster: &Roster) -> Seat {
        Self::resolve(parse_address(address).ok().as_ref(), roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: &str = "0xAAA1000000000000000000000000000000000001";
    const BLACK: &str = "0xBBB2000000000000000000000000000000000002";

    fn create_roster() -> Roster {
        Roster::new(
            Player::parse("white", WHITE).unwrap(),
            Player::parse("black", BLACK).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let roster = create_roster();
        assert_eq!(
            TurnResolver::resolve_str(&BLACK.to_lowercase(), &roster),
            Seat::Player(Color::Black)
        );
        assert_eq!(
            TurnResolver::resolve_str(BLACK, &roster),
            TurnResolver::resolve_str(&BLACK.to_lowercase(), &roster)
        );
        assert_eq!(
            TurnResolver::resolve_str("0xaaa1000000000000000000000000000000000001", &roster),
            Seat::Player(Color::White)
        );
    }

    #[test]
    fn test_unknown_address_is_observer() {
        let roster = create_roster();
        assert_eq!(
            TurnResolver::resolve_str("0x0000000000000000000000000000000000000003", &roster),
            Seat::Observer
        );
        assert_eq!(TurnResolver::resolve_str("garbage", &roster), Seat::Observer);
        assert_eq!(TurnResolver::resolve(None, &roster), Seat::Observer);
    }

    #[test]
    fn test_player_lookup() {
        let roster = create_roster();
        let black = parse_address(BLACK).unwrap();
        assert_eq!(roster.player_for(&black).unwrap().username, "black");
        assert_eq!(roster.player(Color::White).username, "white");
        assert_eq!(Seat::Player(Color::Black).color(), Some(Color::Black));
        assert_eq!(Seat::Observer.color(), None);
    }

    #[test]
    fn test_duplicate_seat_rejected() {
        let result = Roster::new(
            Player::parse("a", WHITE).unwrap(),
            Player::parse("b", &WHITE.to_lowercase()).unwrap(),
        );
        assert!(matches!(result, Err(RosterError::DuplicateAddress { .. })));
    }
}
