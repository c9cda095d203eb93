//! Wallet address parsing and normalization.
//!
//! Addresses are compared as 20-byte values, so two hex strings that differ
//! only in letter case always refer to the same wallet.

use std::str::FromStr;

pub use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid wallet address: {0}")]
pub struct InvalidAddress(pub String);

/// Validate Ethereum address format (`0x` followed by 40 hex characters).
pub fn validate_address(address: &str) -> bool {
    if !address.starts_with("0x") || address.len() != 42 {
        return false;
    }
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize address to lowercase.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Parse an address in any letter case. Checksums are not enforced.
pub fn parse_address(address: &str) -> Result<Address, InvalidAddress> {
    let normalized = normalize_address(address);
    if !validate_address(&normalized) {
        return Err(InvalidAddress(address.to_string()));
    }
    Address::from_str(&normalized).map_err(|_| InvalidAddress(address.to_string()))
}

/// Lowercase `0x`-prefixed rendering used for persistence and token subjects.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}
