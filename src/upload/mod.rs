//! Bulk upload pipeline: rows in, one bulk-create call out.
//!
//! Row-level problems (missing titles, unresolvable object-set names)
//! are logged and excluded; the batch itself is submitted in a single
//! POST and is all-or-nothing at the HTTP level. Every invocation ends
//! with a written audit log, success or not.

pub mod audit;
pub mod lookup;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::models::{
    BuiltinField, CreatedDocument, CustomFieldValue, Document, DocumentPayload, FieldKind,
    FieldValue, JobAccepted, Template,
};
use crate::api::CatalogClient;
use crate::config::DuplicatePolicy;
use crate::sheet::RowSet;
use crate::types::{LogSink, Result, StacksmithError};

use audit::AuditLog;
use lookup::{DirectoryResolver, ObjectHint};

/// Where the uploaded documents land. Targeting the hub root uses the
/// hub's own id as the parent folder id.
#[derive(Debug, Clone, Copy)]
pub struct UploadTarget {
    pub hub_id: i64,
    pub folder_id: i64,
}

impl UploadTarget {
    pub fn hub_root(hub_id: i64) -> Self {
        Self { hub_id, folder_id: hub_id }
    }
}

/// One incoming row colliding with an existing document.
#[derive(Debug, Clone)]
pub struct DuplicateDetail {
    pub incoming_title: String,
    pub incoming_description: String,
    pub existing_title: String,
    pub existing_description: String,
    pub existing_id: i64,
    pub row_index: usize,
}

/// The operator's answer to a duplicate collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    SkipDuplicates,
    UploadAll,
    Cancel,
}

/// External decision point for duplicate collisions; the UI collaborator
/// implements this (the CLI answers from a flag).
#[async_trait]
pub trait DuplicateResolver: Send + Sync {
    async fn resolve(&self, duplicates: &[DuplicateDetail]) -> DuplicateDecision;
}

#[async_trait]
impl DuplicateResolver for DuplicatePolicy {
    async fn resolve(&self, _duplicates: &[DuplicateDetail]) -> DuplicateDecision {
        match self {
            DuplicatePolicy::Skip => DuplicateDecision::SkipDuplicates,
            DuplicatePolicy::All => DuplicateDecision::UploadAll,
            DuplicatePolicy::Cancel => DuplicateDecision::Cancel,
        }
    }
}

/// What one upload invocation did.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub prepared: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the API accepted the batch for async processing
    pub job_id: Option<String>,
    pub log_path: Option<PathBuf>,
    pub cancelled: bool,
}

/// Optional zero-argument hook fired after a confirmed success (the UI
/// uses it to refresh dropdowns).
pub type SuccessHook<'a> = Option<&'a (dyn Fn() + Send + Sync)>;

/// Drives row mapping, duplicate resolution, submission, and auditing.
pub struct UploadPipeline {
    client: Arc<CatalogClient>,
    log: Arc<dyn LogSink>,
    log_dir: PathBuf,
}

impl UploadPipeline {
    pub fn new(client: Arc<CatalogClient>, log: Arc<dyn LogSink>, log_dir: PathBuf) -> Self {
        Self { client, log, log_dir }
    }

    /// Case-insensitive title collisions against existing documents in
    /// the same hub+folder target.
    pub fn find_duplicates(
        rows: &RowSet,
        existing: &[Document],
        target: &UploadTarget,
    ) -> Vec<DuplicateDetail> {
        let mut index = std::collections::HashMap::new();
        for doc in existing {
            if doc.document_hub_id == Some(target.hub_id)
                && doc.parent_folder_id == Some(target.folder_id)
            {
                if let Some(title) = &doc.title {
                    index.insert(title.to_lowercase(), doc);
                }
            }
        }

        let mut duplicates = Vec::new();
        for row in 0..rows.len() {
            let Some(title) = rows.cell(row, "Title") else {
                continue;
            };
            if let Some(existing_doc) = index.get(&title.to_lowercase()) {
                duplicates.push(DuplicateDetail {
                    incoming_title: title.to_string(),
                    incoming_description: rows
                        .cell(row, "Description")
                        .unwrap_or_default()
                        .to_string(),
                    existing_title: existing_doc.title.clone().unwrap_or_default(),
                    existing_description: existing_doc.description.clone().unwrap_or_default(),
                    existing_id: existing_doc.id,
                    row_index: row,
                });
            }
        }
        duplicates
    }

    /// Sheet-driven entry point: map rows to payloads, resolve
    /// duplicates, submit, audit.
    pub async fn upload_from_rows(
        &self,
        rows: &RowSet,
        target: UploadTarget,
        template: &Template,
        existing_docs: &[Document],
        resolver: &dyn DuplicateResolver,
        context: &str,
        on_success: SuccessHook<'_>,
    ) -> Result<UploadOutcome> {
        let mut audit = AuditLog::new(context.to_string());

        if rows.is_empty() {
            self.log.log("Sheet contains no rows. No documents to upload.");
            audit.push("No documents to upload (empty sheet).");
            let log_path = audit.write(&self.log_dir)?;
            debug!(log = %log_path.display(), "empty upload audited");
            return Err(StacksmithError::NoRows);
        }

        let duplicates = Self::find_duplicates(rows, existing_docs, &target);
        let effective_rows;
        let rows = if duplicates.is_empty() {
            rows
        } else {
            self.log.log(&format!(
                "Found {} duplicate title(s) in the target hub/folder.",
                duplicates.len()
            ));
            match resolver.resolve(&duplicates).await {
                DuplicateDecision::Cancel => {
                    self.log.log("Upload cancelled by operator.");
                    audit.push("Upload cancelled at duplicate resolution.");
                    let log_path = audit.write(&self.log_dir)?;
                    return Ok(UploadOutcome {
                        cancelled: true,
                        log_path: Some(log_path),
                        ..Default::default()
                    });
                }
                DuplicateDecision::UploadAll => {
                    self.log.log("Proceeding with upload, including duplicates.");
                    rows
                }
                DuplicateDecision::SkipDuplicates => {
                    let drop: Vec<usize> = duplicates.iter().map(|d| d.row_index).collect();
                    self.log
                        .log(&format!("Skipping {} duplicate document(s).", drop.len()));
                    effective_rows = rows.without_rows(&drop);
                    if effective_rows.is_empty() {
                        self.log.log(
                            "No non-duplicate documents remaining for upload. Upload cancelled.",
                        );
                        audit.push("All rows were duplicates; nothing uploaded.");
                        let log_path = audit.write(&self.log_dir)?;
                        return Ok(UploadOutcome {
                            cancelled: true,
                            log_path: Some(log_path),
                            ..Default::default()
                        });
                    }
                    &effective_rows
                }
            }
        };

        let payloads = self.build_payloads(rows, target, template, &mut audit).await;
        self.submit(payloads, audit, on_success).await
    }

    /// Simpler entry point: submit caller-supplied payloads directly
    /// (bulk-creating placeholder documents). Shares submit + audit.
    pub async fn create_empty_documents(
        &self,
        payloads: Vec<DocumentPayload>,
        on_success: SuccessHook<'_>,
    ) -> Result<UploadOutcome> {
        let audit = AuditLog::new("Empty document creation");
        self.submit(payloads, audit, on_success).await
    }

    /// Map rows to typed payloads. Rows without a title are skipped
    /// with a warning; object-set names that resolve to nothing are
    /// dropped per-field with an audit entry, and the row proceeds.
    async fn build_payloads(
        &self,
        rows: &RowSet,
        target: UploadTarget,
        template: &Template,
        audit: &mut AuditLog,
    ) -> Vec<DocumentPayload> {
        let defs = template.field_defs();
        let resolver = DirectoryResolver::new(&self.client);
        let mut payloads = Vec::new();

        for row in 0..rows.len() {
            let Some(title) = rows.cell(row, "Title") else {
                self.log.log(&format!(
                    "Skipping row {}: 'Title' column is missing or empty. Each document must have a title.",
                    row + 2
                ));
                continue;
            };
            let title = title.to_string();
            self.log.log(&format!("Processing document: '{}'", title));

            let description = rows.cell(row, "Description").unwrap_or_default().to_string();

            let mut custom_fields = Vec::new();
            for def in &defs {
                // Built-ins travel as top-level payload attributes.
                if matches!(def.builtin, Some(BuiltinField::Title | BuiltinField::Description)) {
                    continue;
                }
                let Some(value) = rows.cell(row, &def.name) else {
                    continue;
                };

                match &def.kind {
                    FieldKind::RichText | FieldKind::Picker { .. } | FieldKind::Text(_) => {
                        custom_fields.push(CustomFieldValue {
                            field_id: def.id,
                            value: FieldValue::Scalar(value.to_string()),
                        });
                    }
                    FieldKind::ObjectSet { allowed_otypes, allow_multiple } => {
                        let names: Vec<&str> = if *allow_multiple {
                            value.split(',').map(str::trim).filter(|n| !n.is_empty()).collect()
                        } else {
                            vec![value.trim()]
                        };
                        let hint = ObjectHint::from_allowed_otypes(allowed_otypes);

                        let mut refs = Vec::new();
                        for name in names {
                            match resolver.resolve(name, hint).await {
                                Some(obj) => refs.push(obj),
                                None => {
                                    let fail = format!(
                                        "Could not find a catalog object for '{}' in field '{}'. Skipping this entry for this document.",
                                        name, def.name
                                    );
                                    self.log.log(&fail);
                                    audit.push(format!(
                                        "FAILED OBJECT SET: Doc '{}' - {}",
                                        title, fail
                                    ));
                                }
                            }
                        }

                        if refs.is_empty() {
                            self.log.log(&format!(
                                "No valid catalog objects found for '{}' (value: '{}'). Omitting this field.",
                                def.name, value
                            ));
                        } else {
                            custom_fields.push(CustomFieldValue {
                                field_id: def.id,
                                value: FieldValue::Objects(refs),
                            });
                        }
                    }
                }
            }

            payloads.push(DocumentPayload {
                title,
                document_hub_id: target.hub_id,
                parent_folder_id: target.folder_id,
                template_id: Some(template.id),
                description,
                custom_fields,
            });
        }

        payloads
    }

    /// One POST for the batch, result accounting, cache invalidation on
    /// success, and the audit log regardless of outcome.
    async fn submit(
        &self,
        payloads: Vec<DocumentPayload>,
        mut audit: AuditLog,
        on_success: SuccessHook<'_>,
    ) -> Result<UploadOutcome> {
        audit.prepared = payloads.len();

        if payloads.is_empty() {
            self.log.log(&format!(
                "No documents found for {}. Skipping API call.",
                audit.context()
            ));
            audit.push("No documents to upload.");
            let log_path = audit.write(&self.log_dir)?;
            return Ok(UploadOutcome {
                log_path: Some(log_path),
                ..Default::default()
            });
        }

        let mut job_id = None;
        let mut confirmed_success = false;

        match self.client.bulk_create(&payloads).await {
            Err(e) => {
                audit.failed = payloads.len();
                let message = format!("Connection error during {}: {}", audit.context(), e);
                self.log.log(&message);
                audit.push(format!("FAILED: {} - {}", audit.context(), e));
            }
            Ok(response) => {
                let status = response.status().as_u16();
                if (200..300).contains(&status) {
                    let body: serde_json::Value =
                        response.json().await.unwrap_or(serde_json::Value::Null);

                    let accepted_job = if status == 202 {
                        serde_json::from_value::<JobAccepted>(body.clone())
                            .ok()
                            .and_then(|accepted| accepted.job_id)
                    } else {
                        None
                    };

                    if let Some(raw_id) = accepted_job {
                        let id = raw_id.to_string().trim_matches('"').to_string();
                        audit.succeeded = payloads.len();
                        self.log.log(&format!(
                            "{} initiated successfully. Job ID: {}. Check the catalog for status.",
                            audit.context(),
                            id
                        ));
                        audit.push(format!("SUCCESS: {} initiated. Job ID: {}", audit.context(), id));
                        job_id = Some(id);
                    } else if let Ok(items) = serde_json::from_value::<Vec<CreatedDocument>>(body) {
                        for item in items {
                            audit.succeeded += 1;
                            let title = item.title.as_deref().unwrap_or("N/A");
                            let line = match item.id {
                                Some(id) => format!("'{}' (ID: {})", title, id),
                                None => format!("'{}' (ID: N/A)", title),
                            };
                            self.log.log(&format!("Uploaded {}", line));
                            audit.push(format!("SUCCESS: {}", line));
                        }
                    } else {
                        audit.succeeded = payloads.len();
                        let message = format!(
                            "{} successful, but unexpected response format. Status: {}",
                            audit.context(),
                            status
                        );
                        self.log.log(&message);
                        audit.push(format!("SUCCESS: {}, unexpected response. Status: {}", audit.context(), status));
                    }

                    confirmed_success = true;
                } else {
                    audit.failed = payloads.len();
                    let body = response.text().await.unwrap_or_default();
                    let message = format!(
                        "Failed to perform {}: {} - {}",
                        audit.context(),
                        status,
                        body
                    );
                    self.log.log(&message);
                    audit.push(format!("FAILED: {} - {} - {}", audit.context(), status, body));
                }
            }
        }

        if confirmed_success {
            self.log.log("Invalidating document cache after successful upload...");
            self.client.invalidate_documents_cache();
            if let Some(hook) = on_success {
                self.log.log("Triggering refresh callback.");
                hook();
            }
        }

        let log_path = audit.write(&self.log_dir)?;
        self.log.log(&format!(
            "{} complete. See log file: {}",
            audit.context(),
            log_path.display()
        ));

        Ok(UploadOutcome {
            prepared: audit.prepared,
            succeeded: audit.succeeded,
            failed: audit.failed,
            job_id,
            log_path: Some(log_path),
            cancelled: false,
        })
    }
}
