//! Connection profile and its persistence.
//!
//! The profile holds the base URL and token pair for one catalog
//! deployment. It is mutated in place when a token refresh succeeds and
//! persisted on every mutation; all writes are serialized behind a
//! mutex so concurrent refreshes cannot race the credential file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Result, StacksmithError};

/// Credentials and endpoint for one catalog deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Base URL of the catalog, e.g. "https://catalog.example.com"
    #[serde(alias = "alation_url")]
    pub base_url: String,

    /// Current API access token
    #[serde(default)]
    pub access_token: String,

    /// Long-lived refresh token, exchanged for new access tokens
    #[serde(default)]
    pub refresh_token: String,

    /// User the refresh token belongs to
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl ConnectionProfile {
    /// Base URL with a scheme guaranteed and no trailing slash.
    pub fn normalized_base_url(&self) -> String {
        normalize_url(&self.base_url)
    }

    /// An API call may only be attempted with both a URL and a token.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(StacksmithError::ProfileNotReady(
                "base URL is missing from the profile".into(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(StacksmithError::ProfileNotReady(
                "access token is missing from the profile".into(),
            ));
        }
        Ok(())
    }
}

/// Ensure a URL has a scheme (defaults to https) and no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    with_scheme.trim_end_matches('/').to_string()
}

/// Persistence port for the connection profile.
///
/// The shell decides where profiles live; the core only asks for the
/// current state to be made durable after a successful refresh.
pub trait ProfileStore: Send + Sync {
    fn save(&self, profile: &ConnectionProfile) -> Result<()>;
}

/// JSON-file profile store (the desktop tool's `config.json`).
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<ConnectionProfile> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            StacksmithError::Config(format!(
                "could not read profile at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let profile: ConnectionProfile = serde_json::from_str(&raw)?;
        Ok(profile)
    }
}

impl ProfileStore for JsonProfileStore {
    fn save(&self, profile: &ConnectionProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, body)?;
        debug!(path = %self.path.display(), "profile persisted");
        Ok(())
    }
}

/// New credentials handed back by a successful token refresh.
#[derive(Debug, Clone)]
pub struct RefreshedCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Option<i64>,
}

/// Shared, mutex-guarded view of the profile plus its store.
///
/// Single-writer: `apply_refresh` holds the lock across both the
/// in-memory mutation and the durable save.
#[derive(Clone)]
pub struct SharedProfile {
    inner: Arc<Mutex<ConnectionProfile>>,
    store: Arc<dyn ProfileStore>,
}

impl SharedProfile {
    pub fn new(profile: ConnectionProfile, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profile)),
            store,
        }
    }

    pub fn snapshot(&self) -> ConnectionProfile {
        self.inner.lock().expect("profile lock poisoned").clone()
    }

    pub fn access_token(&self) -> String {
        self.inner
            .lock()
            .expect("profile lock poisoned")
            .access_token
            .clone()
    }

    pub fn base_url(&self) -> String {
        self.inner
            .lock()
            .expect("profile lock poisoned")
            .normalized_base_url()
    }

    pub fn ensure_ready(&self) -> Result<()> {
        self.inner.lock().expect("profile lock poisoned").ensure_ready()
    }

    /// Install refreshed credentials and persist them in one critical
    /// section. A missing refresh token in the response keeps the old one.
    pub fn apply_refresh(&self, creds: RefreshedCredentials) -> Result<()> {
        let mut guard = self.inner.lock().expect("profile lock poisoned");
        guard.access_token = creds.access_token;
        if let Some(refresh) = creds.refresh_token {
            guard.refresh_token = refresh;
        }
        if creds.user_id.is_some() {
            guard.user_id = creds.user_id;
        }
        self.store.save(&guard)
    }
}
