//! Configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use auth::{
    ChallengeConfig, SessionStore, SessionStoreProvider, SessionTokenIssuer, TokenAuthority,
    TokenConfig, MAX_VALIDITY_HOURS,
};
use chrono::Duration;

use crate::position::PositionState;
use crate::roster::{Player, Roster};
use crate::session::GameSession;

pub const DEFAULT_STORE_PATH: &str = "./.shatranj/session.json";
pub const DEFAULT_WHITE_USERNAME: &str = "altstream";
pub const DEFAULT_WHITE_ADDRESS: &str = "0x246fd79365CA79BEB812B5635E8bE38453e2BF1C";
pub const DEFAULT_BLACK_USERNAME: &str = "rehesamay";
pub const DEFAULT_BLACK_ADDRESS: &str = "0xC89337a02D3A3b913147aACF8F5b06Ad046663A9";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub roster: Roster,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub token: TokenConfig,
    pub challenge: ChallengeConfig,
    pub store: SessionStoreProvider,
}

impl AppConfig {
    /// Load configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("SESSION_SECRET")
            .filter(|s| !s.is_empty())
            .context("SESSION_SECRET environment variable not set")?;

        let validity_hours = match lookup("SESSION_VALIDITY_HOURS") {
            Some(raw) => {
                let hours: i64 = raw
                    .parse()
                    .with_context(|| format!("SESSION_VALIDITY_HOURS is not a number: {}", raw))?;
                if hours <= 0 {
                    bail!("SESSION_VALIDITY_HOURS must be positive, got {}", hours);
                }
                if hours > MAX_VALIDITY_HOURS {
                    bail!(
                        "SESSION_VALIDITY_HOURS must be at most {}, got {}",
                        MAX_VALIDITY_HOURS,
                        hours
                    );
                }
                hours
            }
            None => auth::jwt::DEFAULT_VALIDITY_HOURS,
        };

        let store = match lookup("SESSION_STORE_PATH").as_deref() {
            Some("memory") => SessionStoreProvider::Memory,
            Some(path) => SessionStoreProvider::File {
                path: PathBuf::from(path),
            },
            None => SessionStoreProvider::File {
                path: PathBuf::from(DEFAULT_STORE_PATH),
            },
        };

        let defaults = ChallengeConfig::default();
        let chain_id = match lookup("CHAIN_ID") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CHAIN_ID is not a number: {}", raw))?,
            None => defaults.chain_id,
        };
        let challenge = ChallengeConfig {
            domain: lookup("APP_DOMAIN").unwrap_or(defaults.domain),
            uri: lookup("APP_URI").unwrap_or(defaults.uri),
            chain_id,
            statement: defaults.statement,
        };

        let seat = |color: &str, username: &str, address: &str| -> Result<Player> {
            let username = lookup(&format!("{}_USERNAME", color)).unwrap_or_else(|| username.to_string());
            let address = lookup(&format!("{}_ADDRESS", color)).unwrap_or_else(|| address.to_string());
            Player::parse(username, &address).with_context(|| format!("Invalid {}_ADDRESS", color))
        };
        let roster = Roster::new(
            seat("WHITE", DEFAULT_WHITE_USERNAME, DEFAULT_WHITE_ADDRESS)?,
            seat("BLACK", DEFAULT_BLACK_USERNAME, DEFAULT_BLACK_ADDRESS)?,
        )?;

        Ok(Self {
            session: SessionConfig {
                token: TokenConfig {
                    secret,
                    validity_hours,
                    ..Default::default()
                },
                challenge,
                store,
            },
            roster,
        })
    }

    /// Token validity window.
    pub fn validity(&self) -> Duration {
        Duration::try_hours(self.session.token.validity_hours).unwrap_or(Duration::MAX)
    }

    /// Wire a game session from this configuration, starting from the
    /// standard position and restoring any persisted login.
    pub fn build_session(&self) -> Result<GameSession> {
        let authority = Arc::new(TokenAuthority::new(self.session.token.clone()));
        let store = SessionStore::open(self.session.store.clone(), authority.clone())
            .context("Failed to open session store")?;
        let issuer = SessionTokenIssuer::new(authority, self.session.challenge.clone());

        let mut session = GameSession::new(
            self.roster.clone(),
            PositionState::new(),
            store,
            issuer,
            self.validity(),
        );
        session.restore();
        Ok(session)
    }
}
