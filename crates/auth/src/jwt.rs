//! Session tokens: HMAC-signed JWTs binding a wallet address to a validity
//! window.
//!
//! The token embeds the sign-in challenge and the wallet's signature over it,
//! so a stored token can be re-checked without contacting the wallet again.

use alloy_primitives::Address;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::{format_address, parse_address};
use crate::error::{AuthError, Result};
use crate::verifier::SignatureVerifier;

/// Default validity window for session tokens.
pub const DEFAULT_VALIDITY_HOURS: i64 = 24;
/// Longest validity window a token may carry.
pub const MAX_VALIDITY_HOURS: i64 = 24 * 365;

/// Accept `validity` only if it is positive and at most
/// [`MAX_VALIDITY_HOURS`].
pub fn check_validity(validity: Duration) -> Result<Duration> {
    if validity <= Duration::zero() || validity > Duration::hours(MAX_VALIDITY_HOURS) {
        return Err(AuthError::InvalidValidity {
            seconds: validity.num_seconds(),
        });
    }
    Ok(validity)
}

/// JWT claims payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: lowercase wallet address.
    pub sub: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID (unique identifier for this token).
    pub jti: String,
    /// Nonce of the challenge that was signed.
    pub nonce: String,
    /// The challenge message the wallet signed.
    pub challenge: String,
    /// Wallet signature over `challenge`, hex encoded.
    pub wallet_sig: String,
    /// Issuer claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl SessionClaims {
    /// Build claims for `address` issued at `issued_at`.
    pub fn new(
        address: &Address,
        issued_at: DateTime<Utc>,
        validity: Duration,
        nonce: impl Into<String>,
        challenge: impl Into<String>,
        wallet_sig: &[u8],
    ) -> Self {
        Self {
            sub: format_address(address),
            iat: issued_at.timestamp(),
            // An unrepresentable window yields an already-expired token.
            exp: issued_at
                .checked_add_signed(validity)
                .unwrap_or(issued_at)
                .timestamp(),
            jti: Uuid::new_v4().to_string(),
            nonce: nonce.into(),
            challenge: challenge.into(),
            wallet_sig: format!("0x{}", hex::encode(wallet_sig)),
            iss: None,
        }
    }

    /// Check if the token is expired at `now`. Valid only strictly before `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Get remaining validity duration.
    pub fn remaining_validity(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.exp - now.timestamp();
        if remaining > 0 {
            Some(Duration::seconds(remaining))
        } else {
            None
        }
    }
}

/// A signed session credential together with its decoded claims.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    raw: String,
    claims: SessionClaims,
    address: Address,
}

impl SessionToken {
    /// The encoded JWT.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// Wallet address the token was issued to.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        timestamp(self.claims.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.claims.exp)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.claims.is_expired_at(now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("address", &format_address(&self.address))
            .field("iat", &self.claims.iat)
            .field("exp", &self.claims.exp)
            .field("jti", &self.claims.jti)
            .finish()
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Configuration for session tokens.
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Token validity window in hours.
    pub validity_hours: i64,
    /// Issuer claim.
    pub issuer: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            validity_hours: DEFAULT_VALIDITY_HOURS,
            issuer: None,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("validity_hours", &self.validity_hours)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Signs and validates session tokens.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: TokenConfig,
    validation: Validation,
    verifier: SignatureVerifier,
}

impl TokenAuthority {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked against an explicit clock in `validate_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        if let Some(ref iss) = config.issuer {
            validation.set_issuer(&[iss]);
        }

        Self {
            encoding_key,
            decoding_key,
            config,
            validation,
            verifier: SignatureVerifier::new(),
        }
    }

    /// Fixed validity window applied to every issued token.
    pub fn validity(&self) -> Duration {
        Duration::try_hours(self.config.validity_hours).unwrap_or(Duration::MAX)
    }

    /// Sign claims into a token.
    pub fn sign(&self, mut claims: SessionClaims) -> Result<SessionToken> {
        if claims.iss.is_none() {
            claims.iss = self.config.issuer.clone();
        }
        let address = parse_address(&claims.sub).map_err(|e| AuthError::MalformedToken {
            reason: e.to_string(),
        })?;
        let raw = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| AuthError::MalformedToken {
                reason: format!("token encoding failed: {}", e),
            },
        )?;

        Ok(SessionToken {
            raw,
            claims,
            address,
        })
    }

    /// Validate a token at `now`: HMAC signature, validity window, and the
    /// embedded wallet signature.
    pub fn validate_at(&self, raw: &str, now: DateTime<Utc>) -> Result<SessionToken> {
        let claims = decode::<SessionClaims>(raw, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::MalformedToken {
                reason: e.to_string(),
            })?
            .claims;

        let address = parse_address(&claims.sub).map_err(|e| AuthError::MalformedToken {
            reason: e.to_string(),
        })?;

        let window = claims.exp - claims.iat;
        if window <= 0 || window > self.validity().num_seconds() {
            return Err(AuthError::MalformedToken {
                reason: format!("validity window of {}s is out of range", window),
            });
        }

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        if !self
            .verifier
            .verify_hex(claims.challenge.as_bytes(), &claims.wallet_sig, &address)
        {
            return Err(AuthError::MalformedToken {
                reason: "embedded wallet signature does not match subject".to_string(),
            });
        }

        Ok(SessionToken {
            raw: raw.to_string(),
            claims,
            address,
        })
    }

    pub fn validate(&self, raw: &str) -> Result<SessionToken> {
        self.validate_at(raw, Utc::now())
    }
}
