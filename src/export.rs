//! Export a hub's folder structure as a local directory tree.
//!
//! One directory per hub, one subdirectory per folder, titles
//! sanitized down to filesystem-safe names. The tree mirrors only the
//! containers; documents are not exported.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::CatalogClient;
use crate::types::{LogSink, Result};

/// Keep alphanumerics, spaces, and underscores; drop everything else
/// and trailing whitespace.
pub fn sanitize_dir_name(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// What the export created, for reporting.
#[derive(Debug)]
pub struct HubExport {
    pub root: PathBuf,
    pub folder_dirs: Vec<PathBuf>,
}

/// Create `{base_dir}/{hub title}/{folder title}/...` for one hub.
///
/// The hub title comes from the detail endpoint; untitled hubs and
/// folders get id-based directory names.
pub async fn export_hub_structure(
    client: &CatalogClient,
    log: &dyn LogSink,
    hub_id: i64,
    base_dir: &Path,
) -> Result<HubExport> {
    let hub_title = client
        .hub_details(hub_id)
        .await
        .and_then(|hub| hub.title)
        .unwrap_or_else(|| format!("Hub_{}", hub_id));
    log.log(&format!("Processing Hub: '{}' (ID: {})", hub_title, hub_id));

    let safe_hub_title = {
        let safe = sanitize_dir_name(&hub_title);
        if safe.is_empty() {
            format!("Hub_{}", hub_id)
        } else {
            safe
        }
    };
    let root = base_dir.join(safe_hub_title);
    std::fs::create_dir_all(&root)?;
    log.log(&format!("Created root directory: {}", root.display()));

    let folders = client.folders_for_hub(hub_id).await;
    if folders.is_empty() {
        log.log("No sub-folders found within this hub.");
        return Ok(HubExport { root, folder_dirs: Vec::new() });
    }

    let mut folder_dirs = Vec::new();
    for folder in folders {
        let folder_title = folder
            .title
            .unwrap_or_else(|| format!("Untitled_Folder_{}", folder.id));
        let safe = {
            let safe = sanitize_dir_name(&folder_title);
            if safe.is_empty() {
                format!("Folder_{}", folder.id)
            } else {
                safe
            }
        };
        let folder_dir = root.join(safe);
        std::fs::create_dir_all(&folder_dir)?;
        log.log(&format!("Created sub-directory: {}", folder_dir.display()));
        folder_dirs.push(folder_dir);
    }

    debug!(hub_id, count = folder_dirs.len(), "hub structure exported");
    Ok(HubExport { root, folder_dirs })
}
