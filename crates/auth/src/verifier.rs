//! EIP-191 signature verification.

use alloy_primitives::{Address, Signature};
use tracing::debug;

/// Raw signature length: r (32) + s (32) + v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Checks that a personal-sign signature over a message was produced by a
/// given address.
///
/// Verification fails closed: malformed input yields `false`/`None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Recover the signing address, or `None` if the signature is malformed.
    pub fn recover(&self, message: &[u8], signature: &[u8]) -> Option<Address> {
        if signature.len() != SIGNATURE_LEN {
            debug!(len = signature.len(), "Signature has wrong length");
            return None;
        }

        // Only legacy (27/28) and raw parity (0/1) recovery ids; EIP-155
        // style values would alias a different byte onto the same parity.
        if !matches!(signature[64], 0 | 1 | 27 | 28) {
            debug!(v = signature[64], "Signature has invalid recovery id");
            return None;
        }

        let signature = match Signature::try_from(signature) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(error = %e, "Failed to parse signature");
                return None;
            }
        };

        match signature.recover_address_from_msg(message) {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(error = %e, "Failed to recover signer");
                None
            }
        }
    }

    /// Whether `signature` over `message` recovers to `claimed`.
    pub fn verify(&self, message: &[u8], signature: &[u8], claimed: &Address) -> bool {
        self.recover(message, signature)
            .is_some_and(|recovered| recovered == *claimed)
    }

    /// Same as [`verify`](Self::verify) for a `0x`-prefixed hex signature.
    pub fn verify_hex(&self, message: &[u8], signature_hex: &str, claimed: &Address) -> bool {
        match hex::decode(signature_hex.trim_start_matches("0x")) {
            Ok(bytes) => self.verify(message, &bytes, claimed),
            Err(_) => false,
        }
    }
}
