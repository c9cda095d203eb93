//! Persisted session storage.
//!
//! Two records are kept, the way a browser keeps a cookie and a local-storage
//! entry: `token` holds the JSON-encoded session token and `user` holds the
//! last authenticated address. Both carry cookie-style attributes and expire
//! after `max_age_secs`. An expired or invalid token is never handed back:
//! [`SessionStore::load`] clears the store instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::{format_address, parse_address};
use crate::error::StoreError;
use crate::jwt::{SessionToken, TokenAuthority};

/// Record key of the serialized session token.
pub const TOKEN_KEY: &str = "token";
/// Record key of the last authenticated address.
pub const USER_KEY: &str = "user";

/// SameSite policy of persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

/// A single persisted value with its cookie-style attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub value: String,
    pub path: String,
    pub same_site: SameSite,
    pub max_age_secs: i64,
    /// Unix timestamp of the write.
    pub stored_at: i64,
}

impl PersistedRecord {
    /// Whether the record is still within its retention window.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.stored_at + self.max_age_secs
    }
}

/// Backend holding the records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SessionStoreProvider {
    /// Keep records in memory only (testing).
    #[default]
    Memory,
    /// Keep records in a JSON file that survives restarts.
    File { path: PathBuf },
}

/// Owner of the persisted session.
pub struct SessionStore {
    provider: SessionStoreProvider,
    authority: Arc<TokenAuthority>,
    path: String,
    same_site: SameSite,
    records: BTreeMap<String, PersistedRecord>,
}

impl SessionStore {
    /// Open the store, reading any previously persisted records.
    pub fn open(
        provider: SessionStoreProvider,
        authority: Arc<TokenAuthority>,
    ) -> Result<Self, StoreError> {
        let records = match &provider {
            SessionStoreProvider::Memory => BTreeMap::new(),
            SessionStoreProvider::File { path } => read_records(path)?,
        };
        debug!(provider = ?provider, records = records.len(), "Opened session store");

        Ok(Self {
            provider,
            authority,
            path: "/".to_string(),
            same_site: SameSite::Strict,
            records,
        })
    }

    /// In-memory store, mostly for tests.
    pub fn in_memory(authority: Arc<TokenAuthority>) -> Self {
        Self {
            provider: SessionStoreProvider::Memory,
            authority,
            path: "/".to_string(),
            same_site: SameSite::Strict,
            records: BTreeMap::new(),
        }
    }

    pub fn provider(&self) -> &SessionStoreProvider {
        &self.provider
    }

    /// Raw record, for inspection.
    pub fn record(&self, key: &str) -> Option<&PersistedRecord> {
        self.records.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save(&mut self, token: &SessionToken) -> Result<(), StoreError> {
        self.save_at(token, Utc::now())
    }

    /// Persist `token` and its address. On error nothing changes.
    pub fn save_at(&mut self, token: &SessionToken, now: DateTime<Utc>) -> Result<(), StoreError> {
        let max_age_secs = self.authority.validity().num_seconds();
        let record = |value: String| PersistedRecord {
            value,
            path: self.path.clone(),
            same_site: self.same_site,
            max_age_secs,
            stored_at: now.timestamp(),
        };

        let mut next = self.records.clone();
        next.insert(
            TOKEN_KEY.to_string(),
            record(serde_json::to_string(token.as_str())?),
        );
        next.insert(
            USER_KEY.to_string(),
            record(format_address(&token.address())),
        );

        self.commit(next)?;
        info!(address = %format_address(&token.address()), "Saved session");
        Ok(())
    }

    pub fn load(&mut self) -> Option<SessionToken> {
        self.load_at(Utc::now())
    }

    /// Return the stored token if it is still valid at `now`.
    ///
    /// Expired, tampered, or unreadable tokens clear the store and yield
    /// `None`.
    pub fn load_at(&mut self, now: DateTime<Utc>) -> Option<SessionToken> {
        let record = self.records.get(TOKEN_KEY)?;

        if !record.is_live_at(now) {
            self.expire("record max-age elapsed");
            return None;
        }

        let raw: String = match serde_json::from_str(&record.value) {
            Ok(raw) => raw,
            Err(e) => {
                self.expire(&format!("unreadable token record: {}", e));
                return None;
            }
        };

        match self.authority.validate_at(&raw, now) {
            Ok(token) => Some(token),
            Err(e) => {
                self.expire(&e.to_string());
                None
            }
        }
    }

    /// Last authenticated address, without decoding the token.
    pub fn stored_address_at(&self, now: DateTime<Utc>) -> Option<Address> {
        self.records
            .get(USER_KEY)
            .filter(|record| record.is_live_at(now))
            .and_then(|record| parse_address(&record.value).ok())
    }

    pub fn stored_address(&self) -> Option<Address> {
        self.stored_address_at(Utc::now())
    }

    /// Remove both records.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        if self.records.is_empty() {
            return Ok(());
        }
        self.commit(BTreeMap::new())?;
        info!("Cleared session");
        Ok(())
    }

    fn expire(&mut self, reason: &str) {
        debug!(reason = %reason, "Discarding stored session");
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear stale session");
            // Forget it in memory anyway so it is not served again.
            self.records.clear();
        }
    }

    /// Write `next` to the backend, then adopt it in memory.
    fn commit(&mut self, next: BTreeMap<String, PersistedRecord>) -> Result<(), StoreError> {
        if let SessionStoreProvider::File { path } = &self.provider {
            write_records(path, &next)?;
        }
        self.records = next;
        Ok(())
    }
}

fn read_records(path: &Path) -> Result<BTreeMap<String, PersistedRecord>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                Ok(BTreeMap::new())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the file through a temporary sibling so readers never see a
/// partial write.
fn write_records(path: &Path, records: &BTreeMap<String, PersistedRecord>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
