//! HTTP request engine with bounded auth-retry.
//!
//! One place owns the retry policy: every request carries the current
//! access token; a 401/403 answer triggers exactly one token refresh
//! through the pluggable refresher and one retry of the same request.
//! Transport failures are retried within the same fixed budget. Any
//! other HTTP status is handed back untouched for the caller to branch
//! on.
//!
//! The refresh operation itself must never be able to trigger another
//! refresh, so the non-refreshing path is a separate method that cannot
//! carry a refresher at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use tracing::{debug, warn};

use crate::config::DEFAULT_TIMEOUT;
use crate::profile::SharedProfile;
use crate::types::{Result, StacksmithError};

/// Header carrying the access token on every request.
pub const AUTH_HEADER: &str = "TOKEN";

/// One extra attempt after the first, fixed by design.
const RETRY_BUDGET: usize = 1;

/// Exchanges the stored refresh token for a new access token.
///
/// Implementations mutate the shared profile on success; the engine
/// re-reads the token from the profile before retrying.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns (succeeded, operator-facing message).
    async fn refresh_token(&self) -> (bool, String);
}

/// Refresher that always reports failure without any HTTP call.
///
/// Used by tests to prove an operation cannot recurse into a refresh.
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh_token(&self) -> (bool, String) {
        (false, "token refresh disabled for this request".into())
    }
}

/// A single API request, path-relative to the profile's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve against a base URL, or use the path as-is when it is
    /// already absolute (pagination headers may carry full URLs).
    fn url(&self, base_url: &str) -> String {
        if self.path.starts_with("http://") || self.path.starts_with("https://") {
            self.path.clone()
        } else {
            format!("{}{}", base_url, self.path)
        }
    }
}

/// Issues catalog API calls with the shared profile's credentials.
pub struct RequestEngine {
    http: Client,
    profile: SharedProfile,
}

impl RequestEngine {
    pub fn new(profile: SharedProfile) -> Self {
        Self {
            http: Client::new(),
            profile,
        }
    }

    pub fn profile(&self) -> &SharedProfile {
        &self.profile
    }

    /// Send with auth-retry: one refresh-and-retry cycle on 401/403.
    pub async fn send(
        &self,
        request: ApiRequest,
        refresher: &Arc<dyn TokenRefresher>,
    ) -> Result<Response> {
        self.dispatch(request, Some(refresher.as_ref())).await
    }

    /// Send without any refresh capability. The token lifecycle manager
    /// uses this for its own calls so a refresh can never recurse.
    pub async fn send_without_refresh(&self, request: ApiRequest) -> Result<Response> {
        self.dispatch(request, None).await
    }

    async fn dispatch(
        &self,
        request: ApiRequest,
        refresher: Option<&dyn TokenRefresher>,
    ) -> Result<Response> {
        self.profile.ensure_ready()?;
        let base_url = self.profile.base_url();
        let url = request.url(&base_url);

        let mut last_transport_error = String::new();

        for attempt in 0..=RETRY_BUDGET {
            let token = self.profile.access_token();
            let mut builder = self
                .http
                .request(request.method.clone(), &url)
                .header(AUTH_HEADER, token.trim())
                .header("accept", "application/json")
                .timeout(request.timeout);

            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_transport_error = e.to_string();
                    if attempt < RETRY_BUDGET {
                        warn!(%url, error = %last_transport_error, "request failed, retrying");
                        continue;
                    }
                    return Err(StacksmithError::Transport(last_transport_error));
                }
            };

            let status = response.status().as_u16();
            if (status == 401 || status == 403) && attempt < RETRY_BUDGET {
                if let Some(refresher) = refresher {
                    warn!(%url, status, "auth failure, attempting token refresh");
                    let (refreshed, message) = refresher.refresh_token().await;
                    debug!("{}", message);
                    if refreshed {
                        debug!("token refreshed, retrying request");
                        continue;
                    }
                    return Err(StacksmithError::RefreshFailed(message));
                }
            }

            // Every other status, auth failures with no budget included,
            // is the caller's to inspect.
            return Ok(response);
        }

        Err(StacksmithError::Transport(last_transport_error))
    }
}
