//! Hub / folder / template relationships derived from flat collections.
//!
//! Pure functions over already-fetched data; the only I/O lives in the
//! client. Display labels double as a serialization: an id can be
//! recovered from the user-facing selection string.

use std::collections::HashSet;

use crate::api::models::{Document, Template, VisualConfig};

/// Which source of truth decides hub/template compatibility.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateScope {
    /// Templates actually used by the hub's existing documents
    #[value(name = "documents")]
    UsedByDocuments,
    /// Templates with a visual config bound to the hub (configured
    /// intent, the recommended strategy)
    #[value(name = "visual-configs")]
    VisualConfigs,
}

/// Hubs are parentless, template-less documents.
pub fn hubs(documents: &[Document]) -> Vec<&Document> {
    documents
        .iter()
        .filter(|doc| doc.parent_folder_id.is_none() && doc.template_id.is_none())
        .collect()
}

/// Templates compatible with a hub, per the chosen strategy.
pub fn templates_for_hub<'a>(
    hub_id: i64,
    documents: &[Document],
    templates: &'a [Template],
    visual_configs: &[VisualConfig],
    scope: TemplateScope,
) -> Vec<&'a Template> {
    let wanted: HashSet<i64> = match scope {
        TemplateScope::UsedByDocuments => documents
            .iter()
            .filter(|doc| doc.document_hub_id == Some(hub_id))
            .filter_map(|doc| doc.template_id)
            .collect(),
        TemplateScope::VisualConfigs => visual_configs
            .iter()
            .filter(|vc| vc.collection_type_id == Some(hub_id))
            .filter_map(|vc| vc.template_id)
            .collect(),
    };

    templates
        .iter()
        .filter(|template| wanted.contains(&template.id))
        .collect()
}

/// `"{title} (ID: {id})"`, the display form for hubs and templates.
pub fn format_label(title: Option<&str>, id: i64) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("{} (ID: {})", title, id),
        _ => format!("Hub ID: {}", id),
    }
}

/// Folder labels carry their own marker so root-of-hub entries stay
/// distinguishable.
pub fn format_folder_label(title: Option<&str>, id: i64) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("{} (Folder ID: {})", title, id),
        _ => format!("Untitled Folder (Folder ID: {})", id),
    }
}

/// Pseudo-entry for uploading straight into the hub root.
pub fn root_of_hub_label(hub_title: Option<&str>, hub_id: i64) -> String {
    match hub_title {
        Some(title) if !title.is_empty() => format!("{} (Root of Hub) (ID: {})", title, hub_id),
        _ => format!("Root of Hub (ID: {})", hub_id),
    }
}

/// Recover an id from a display label, or parse a bare numeric id.
///
/// Labels are parsed at the *last* `(… ID: ` marker so titles that
/// themselves contain parentheses survive the round trip.
pub fn parse_id(selection: &str) -> Option<i64> {
    let trimmed = selection.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Some(id);
    }

    for marker in ["(Folder ID: ", "(ID: ", "Hub ID: ", "Folder ID: "] {
        if let Some(pos) = trimmed.rfind(marker) {
            let rest = &trimmed[pos + marker.len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(id) = digits.parse::<i64>() {
                return Some(id);
            }
        }
    }
    None
}
