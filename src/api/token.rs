//! Token lifecycle: validation and refresh.
//!
//! `refresh` exchanges the stored refresh token for a new access token
//! and persists the result through the shared profile. Its own HTTP
//! call goes through the engine's non-refreshing path, so a refresh can
//! never trigger another refresh.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::http::{ApiRequest, RequestEngine, TokenRefresher};
use crate::profile::{RefreshedCredentials, SharedProfile};

/// Lightweight authenticated endpoint used to probe token validity.
const VALIDATE_PATH: &str = "/integration/v1/user/";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "api_access_token")]
    token: String,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Validates and refreshes the profile's access token.
pub struct TokenManager {
    engine: Arc<RequestEngine>,
    profile: SharedProfile,
    refresh_path: String,
}

impl TokenManager {
    pub fn new(engine: Arc<RequestEngine>, profile: SharedProfile, refresh_path: String) -> Self {
        Self {
            engine,
            profile,
            refresh_path,
        }
    }

    /// Probe the API with the current token.
    ///
    /// A 401/403 answer gets one inline refresh-and-recheck cycle (the
    /// engine performs it); the recheck's outcome is what is returned.
    pub async fn validate(&self) -> (bool, String) {
        if self.profile.access_token().trim().is_empty() {
            return (false, "Access token is missing from the profile.".into());
        }

        let refresher: Arc<dyn TokenRefresher> = Arc::new(SelfRefresher {
            manager: self.clone_parts(),
        });

        match self
            .engine
            .send(ApiRequest::get(VALIDATE_PATH), &refresher)
            .await
        {
            Ok(response) if response.status().as_u16() == 200 => {
                (true, "Token is valid.".into())
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                (
                    false,
                    format!("Token is likely invalid. API returned: {} - {}", status, body),
                )
            }
            Err(e) => (
                false,
                format!("Failed to validate token: {}. Check URL and network, or re-authenticate.", e),
            ),
        }
    }

    /// Exchange the refresh token for a new access token and persist it.
    ///
    /// On failure nothing is mutated; the message tells the operator to
    /// re-authenticate out-of-band.
    pub async fn refresh(&self) -> (bool, String) {
        let snapshot = self.profile.snapshot();
        if snapshot.refresh_token.trim().is_empty() {
            return (
                false,
                "Refresh token is missing from the profile. Cannot refresh.".into(),
            );
        }

        let mut body = serde_json::json!({ "refresh_token": snapshot.refresh_token });
        if let Some(user_id) = snapshot.user_id {
            body["user_id"] = serde_json::json!(user_id);
        }

        let request = ApiRequest::post(self.refresh_path.clone(), body);

        // Non-refreshing path: structurally unable to recurse.
        let response = match self.engine.send_without_refresh(request).await {
            Ok(response) => response,
            Err(e) => return (false, format!("Failed to reach the catalog to refresh token: {}", e)),
        };

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let body = response.text().await.unwrap_or_default();
            return (
                false,
                format!("Token refresh call failed with status {}: {}", status, body),
            );
        }

        let parsed: RefreshResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => return (false, format!("Could not parse refresh response: {}", e)),
        };

        let user_id = parsed.user_id;
        if let Err(e) = self.profile.apply_refresh(RefreshedCredentials {
            access_token: parsed.token,
            refresh_token: parsed.refresh_token,
            user_id,
        }) {
            return (false, format!("Failed to persist refreshed token: {}", e));
        }

        let message = match user_id {
            Some(id) => format!("New access token for user_id {} obtained and saved.", id),
            None => "New access token obtained and saved.".into(),
        };
        info!("{}", message);
        (true, message)
    }

    fn clone_parts(&self) -> TokenManager {
        TokenManager {
            engine: Arc::clone(&self.engine),
            profile: self.profile.clone(),
            refresh_path: self.refresh_path.clone(),
        }
    }
}

/// Adapter so the engine can call back into `TokenManager::refresh`.
struct SelfRefresher {
    manager: TokenManager,
}

#[async_trait]
impl TokenRefresher for SelfRefresher {
    async fn refresh_token(&self) -> (bool, String) {
        self.manager.refresh().await
    }
}

#[async_trait]
impl TokenRefresher for TokenManager {
    async fn refresh_token(&self) -> (bool, String) {
        self.refresh().await
    }
}
