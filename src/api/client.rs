//! Catalog API client: endpoint map, pagination, and cached fetches.
//!
//! Collection fetches degrade lossily by design: a failure mid-way
//! returns whatever was accumulated so far and logs the problem, so a
//! flaky network yields a shorter list instead of a dead window.

use std::sync::Arc;

use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::http::{ApiRequest, RequestEngine, TokenRefresher};
use super::models::{Document, Folder, GroupRecord, Template, UserRecord, VisualConfig};
use crate::cache::{CacheKind, CollectionCache};
use crate::config::{BULK_TIMEOUT, PAGE_TIMEOUT};
use crate::types::{LogSink, Result};

/// Response header chaining document pages.
pub const NEXT_PAGE_HEADER: &str = "X-Next-Page";

const DOCUMENTS_PATH: &str = "/integration/v2/document/";
const TEMPLATES_PATH: &str = "/integration/v1/custom_template/";
const FOLDERS_PATH: &str = "/integration/v2/folder/";
const HUB_DETAILS_PATH: &str = "/integration/v2/document_hub/";
const USERS_PATH: &str = "/integration/v1/user/";
const GROUPS_PATH: &str = "/integration/v1/group/";

/// High-level client over the request engine, with the disk cache.
pub struct CatalogClient {
    engine: Arc<RequestEngine>,
    refresher: Arc<dyn TokenRefresher>,
    cache: CollectionCache,
    visual_config_path: String,
    log: Arc<dyn LogSink>,
}

impl CatalogClient {
    pub fn new(
        engine: Arc<RequestEngine>,
        refresher: Arc<dyn TokenRefresher>,
        cache: CollectionCache,
        visual_config_path: String,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            engine,
            refresher,
            cache,
            visual_config_path,
            log,
        }
    }

    /// Same client, different operator-message sink. The refresh worker
    /// uses this to route progress lines over its event channel.
    pub fn with_log(&self, log: Arc<dyn LogSink>) -> CatalogClient {
        CatalogClient {
            engine: Arc::clone(&self.engine),
            refresher: Arc::clone(&self.refresher),
            cache: self.cache.clone(),
            visual_config_path: self.visual_config_path.clone(),
            log,
        }
    }

    /// All documents, from cache unless expired or forced.
    ///
    /// Live fetches follow the `X-Next-Page` header until absent and
    /// concatenate pages in receipt order.
    pub async fn documents(&self, force_refresh: bool) -> Vec<Document> {
        if !force_refresh {
            if let Some(cached) = self.cache.load::<Document>(CacheKind::Documents) {
                self.log.log(&format!("Loaded {} documents from cache.", cached.len()));
                return cached;
            }
        }

        let mut collected: Vec<Document> = Vec::new();
        let mut complete = false;
        let mut request = ApiRequest::get(DOCUMENTS_PATH)
            .query("deleted", "false")
            .query("limit", "1000")
            .timeout(PAGE_TIMEOUT);

        loop {
            let response = match self.engine.send(request, &self.refresher).await {
                Ok(response) => response,
                Err(e) => {
                    self.log.log(&format!(
                        "Document fetch stopped early: {}. Keeping {} documents fetched so far.",
                        e,
                        collected.len()
                    ));
                    break;
                }
            };

            if response.status().as_u16() != 200 {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                self.log.log(&format!(
                    "Document fetch stopped early: API returned {} - {}. Keeping {} documents.",
                    status,
                    body,
                    collected.len()
                ));
                break;
            }

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            let page: Vec<Document> = match response.json().await {
                Ok(page) => page,
                Err(e) => {
                    self.log.log(&format!(
                        "Could not parse a document page: {}. Keeping {} documents.",
                        e,
                        collected.len()
                    ));
                    break;
                }
            };

            debug!(page_len = page.len(), "document page received");
            collected.extend(page);

            match next_page {
                Some(next) if !next.is_empty() => {
                    request = ApiRequest::get(next).timeout(PAGE_TIMEOUT);
                }
                _ => {
                    complete = true;
                    break;
                }
            }
        }

        // Only a fully paginated snapshot may be cached; a partial one
        // would be served as complete for the next hour.
        if complete && !collected.is_empty() {
            self.cache.store(CacheKind::Documents, &collected);
        }
        collected
    }

    /// All templates, from cache unless expired or forced. Single page.
    pub async fn templates(&self, force_refresh: bool) -> Vec<Template> {
        if !force_refresh {
            if let Some(cached) = self.cache.load::<Template>(CacheKind::Templates) {
                self.log.log(&format!("Loaded {} templates from cache.", cached.len()));
                return cached;
            }
        }

        let templates: Vec<Template> = self
            .fetch_list(ApiRequest::get(TEMPLATES_PATH), "templates")
            .await;
        if !templates.is_empty() {
            self.cache.store(CacheKind::Templates, &templates);
        }
        templates
    }

    /// Full details for one template.
    pub async fn template_details(&self, template_id: i64) -> Option<Template> {
        let path = format!("{}{}/", TEMPLATES_PATH, template_id);
        self.fetch_one(ApiRequest::get(path), &format!("template {}", template_id))
            .await
    }

    /// Folders scoped to one hub.
    pub async fn folders_for_hub(&self, hub_id: i64) -> Vec<Folder> {
        let request =
            ApiRequest::get(FOLDERS_PATH).query("document_hub_id", hub_id.to_string());
        self.fetch_list(request, &format!("folders for hub {}", hub_id))
            .await
    }

    /// Full details for one hub.
    pub async fn hub_details(&self, hub_id: i64) -> Option<Document> {
        let path = format!("{}{}/", HUB_DETAILS_PATH, hub_id);
        self.fetch_one(ApiRequest::get(path), &format!("hub {}", hub_id))
            .await
    }

    /// All visual configs (hub/template compatibility records).
    pub async fn visual_configs(&self) -> Vec<VisualConfig> {
        self.fetch_list(
            ApiRequest::get(self.visual_config_path.clone()),
            "visual configs",
        )
        .await
    }

    /// Users matching a name or email, exact-matched client-side later.
    pub async fn search_users(&self, needle: &str) -> Vec<UserRecord> {
        let request = if needle.contains('@') {
            ApiRequest::get(USERS_PATH).query("email", needle)
        } else {
            ApiRequest::get(USERS_PATH).query("display_name", needle)
        };
        self.fetch_list(request, "user search").await
    }

    /// Groups matching a name.
    pub async fn search_groups(&self, needle: &str) -> Vec<GroupRecord> {
        let request = ApiRequest::get(GROUPS_PATH).query("name", needle);
        self.fetch_list(request, "group search").await
    }

    /// One POST for the whole batch. The caller interprets the status
    /// and body; engine-level failure means the batch did not go out.
    pub async fn bulk_create(&self, payloads: &[super::models::DocumentPayload]) -> Result<Response> {
        let body = serde_json::to_value(payloads)?;
        let request = ApiRequest::post(DOCUMENTS_PATH, body).timeout(BULK_TIMEOUT);
        self.engine.send(request, &self.refresher).await
    }

    /// Force the next document fetch to hit the API.
    pub fn invalidate_documents_cache(&self) {
        self.cache.invalidate(CacheKind::Documents);
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: ApiRequest, what: &str) -> Vec<T> {
        let response = match self.engine.send(request, &self.refresher).await {
            Ok(response) => response,
            Err(e) => {
                self.log.log(&format!("Error fetching {}: {}", what, e));
                return Vec::new();
            }
        };

        if response.status().as_u16() != 200 {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            self.log
                .log(&format!("Error fetching {}: {} - {}", what, status, body));
            return Vec::new();
        }

        match response.json().await {
            Ok(items) => items,
            Err(e) => {
                self.log.log(&format!("Could not parse {}: {}", what, e));
                Vec::new()
            }
        }
    }

    async fn fetch_one<T: DeserializeOwned>(&self, request: ApiRequest, what: &str) -> Option<T> {
        let response = match self.engine.send(request, &self.refresher).await {
            Ok(response) => response,
            Err(e) => {
                self.log.log(&format!("Error fetching {}: {}", what, e));
                return None;
            }
        };

        if response.status().as_u16() != 200 {
            let status = response.status().as_u16();
            warn!(what, status, "detail fetch failed");
            self.log.log(&format!("Error fetching {}: status {}", what, status));
            return None;
        }

        match response.json().await {
            Ok(item) => Some(item),
            Err(e) => {
                self.log.log(&format!("Could not parse {}: {}", what, e));
                None
            }
        }
    }
}
