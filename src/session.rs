//! Per-run session state: fetched collections and current selections.
//!
//! All state lives in this struct and is passed explicitly; nothing is
//! process-global, so two sessions against different catalogs can
//! coexist in one process.

use crate::api::models::{Document, Template, VisualConfig};
use crate::hierarchy::{self, TemplateScope};
use crate::types::{Result, StacksmithError};

#[derive(Debug, Default)]
pub struct SessionState {
    pub documents: Vec<Document>,
    pub templates: Vec<Template>,
    pub visual_configs: Vec<VisualConfig>,
    pub selected_hub: Option<i64>,
    pub selected_folder: Option<i64>,
    pub selected_template: Option<i64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the data collections wholesale (after a refresh) and
    /// drop selections that no longer resolve.
    pub fn set_data(
        &mut self,
        documents: Vec<Document>,
        templates: Vec<Template>,
        visual_configs: Vec<VisualConfig>,
    ) {
        self.documents = documents;
        self.templates = templates;
        self.visual_configs = visual_configs;

        if let Some(hub_id) = self.selected_hub {
            if !self.hubs().iter().any(|h| h.id == hub_id) {
                self.selected_hub = None;
                self.selected_folder = None;
                self.selected_template = None;
            }
        }
    }

    pub fn hubs(&self) -> Vec<&Document> {
        hierarchy::hubs(&self.documents)
    }

    /// Resolve a hub selection string (numeric id or display label)
    /// against the known hubs.
    pub fn select_hub(&mut self, selection: &str) -> Result<i64> {
        let id = hierarchy::parse_id(selection)
            .or_else(|| self.hub_id_by_title(selection))
            .ok_or_else(|| {
                StacksmithError::Config(format!("could not resolve hub from '{}'", selection))
            })?;

        if !self.hubs().iter().any(|h| h.id == id) {
            return Err(StacksmithError::Config(format!(
                "'{}' does not name a known document hub",
                selection
            )));
        }
        self.selected_hub = Some(id);
        Ok(id)
    }

    fn hub_id_by_title(&self, title: &str) -> Option<i64> {
        let lowered = title.trim().to_lowercase();
        self.hubs()
            .iter()
            .find(|h| {
                h.title
                    .as_deref()
                    .map(|t| t.to_lowercase() == lowered)
                    .unwrap_or(false)
            })
            .map(|h| h.id)
    }

    /// Templates compatible with the selected hub, per strategy.
    pub fn compatible_templates(&self, scope: TemplateScope) -> Vec<&Template> {
        match self.selected_hub {
            Some(hub_id) => hierarchy::templates_for_hub(
                hub_id,
                &self.documents,
                &self.templates,
                &self.visual_configs,
                scope,
            ),
            None => Vec::new(),
        }
    }

    /// Resolve a template selection string (id, label, or title).
    pub fn select_template(&mut self, selection: &str) -> Result<i64> {
        let by_id = hierarchy::parse_id(selection)
            .filter(|id| self.templates.iter().any(|t| t.id == *id));
        let id = by_id
            .or_else(|| self.template_id_by_title(selection))
            .ok_or_else(|| {
                StacksmithError::Config(format!("could not resolve template from '{}'", selection))
            })?;
        self.selected_template = Some(id);
        Ok(id)
    }

    fn template_id_by_title(&self, title: &str) -> Option<i64> {
        let lowered = title.trim().to_lowercase();
        self.templates
            .iter()
            .find(|t| t.display_title().to_lowercase() == lowered)
            .map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, title: &str, hub: Option<i64>, parent: Option<i64>, template: Option<i64>) -> Document {
        Document {
            id,
            title: Some(title.into()),
            description: None,
            document_hub_id: hub,
            parent_folder_id: parent,
            template_id: template,
            custom_fields: vec![],
        }
    }

    fn template(id: i64, title: &str) -> Template {
        Template { id, title: Some(title.into()), fields: vec![] }
    }

    fn session() -> SessionState {
        let mut state = SessionState::new();
        state.set_data(
            vec![doc(1, "Finance", None, None, None), doc(2, "Note", Some(1), Some(3), Some(7))],
            vec![template(7, "Report")],
            vec![],
        );
        state
    }

    #[test]
    fn test_select_hub_by_id_label_and_title() {
        let mut state = session();
        assert_eq!(state.select_hub("1").unwrap(), 1);
        assert_eq!(state.select_hub("Finance (ID: 1)").unwrap(), 1);
        assert_eq!(state.select_hub("finance").unwrap(), 1);
        assert!(state.select_hub("2").is_err()); // not a hub
        assert!(state.select_hub("Marketing").is_err());
    }

    #[test]
    fn test_select_template_by_id_and_title() {
        let mut state = session();
        assert_eq!(state.select_template("7").unwrap(), 7);
        assert_eq!(state.select_template("report").unwrap(), 7);
        assert!(state.select_template("99").is_err());
    }

    #[test]
    fn test_refresh_drops_stale_hub_selection() {
        let mut state = session();
        state.select_hub("1").unwrap();
        state.set_data(vec![doc(5, "Other", None, None, None)], vec![], vec![]);
        assert_eq!(state.selected_hub, None);
    }
}
