//! Typed models for the catalog REST API.
//!
//! Field definitions are decoded once at the API boundary into the
//! `FieldKind` sum type so payload construction is an exhaustive match
//! instead of string comparisons scattered through the pipeline.

use serde::{Deserialize, Serialize};

/// A catalog document. A document with no parent folder is a hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub document_hub_id: Option<i64>,
    #[serde(default)]
    pub parent_folder_id: Option<i64>,
    #[serde(default)]
    pub template_id: Option<i64>,
    #[serde(default)]
    pub custom_fields: Vec<serde_json::Value>,
}

/// A folder inside a hub, from the hub-scoped folder endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub document_hub_id: Option<i64>,
}

/// Raw template field as the API serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: i64,
    #[serde(default)]
    pub name_singular: Option<String>,
    #[serde(default)]
    pub name_plural: Option<String>,
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub builtin_name: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub allowed_otypes: Option<Vec<String>>,
    #[serde(default)]
    pub options: Option<Vec<PickerOption>>,
}

/// One entry of a picker field's option list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerOption {
    #[serde(default)]
    pub title: Option<String>,
}

/// A document template and its custom-field schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "custom_fields")]
    pub fields: Vec<TemplateField>,
}

/// Hub/template compatibility record configured in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    pub id: i64,
    #[serde(default)]
    pub template_id: Option<i64>,
    /// The hub this layout is configured for
    #[serde(default)]
    pub collection_type_id: Option<i64>,
}

/// Built-in fields handled as top-level payload attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinField {
    Title,
    Description,
}

/// Decoded field behavior, matched exhaustively during payload build.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    RichText,
    Picker { options: Vec<String> },
    ObjectSet { allowed_otypes: Vec<String>, allow_multiple: bool },
    /// Any other scalar type; carries the raw type tag for diagnostics
    Text(String),
}

/// A template field after boundary decoding.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub id: i64,
    pub name: String,
    pub builtin: Option<BuiltinField>,
    pub kind: FieldKind,
}

impl From<&TemplateField> for FieldDef {
    fn from(raw: &TemplateField) -> Self {
        let name = raw
            .name_singular
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| raw.name_plural.clone().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| format!("Field ID: {}", raw.id));

        let builtin = match raw.builtin_name.as_deref() {
            Some("title") => Some(BuiltinField::Title),
            Some("description") => Some(BuiltinField::Description),
            _ => None,
        };

        let kind = match raw.field_type.as_deref() {
            Some("RICH_TEXT") => FieldKind::RichText,
            Some("PICKER") => FieldKind::Picker {
                options: raw
                    .options
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|o| o.title.clone())
                    .collect(),
            },
            Some("OBJECT_SET") => FieldKind::ObjectSet {
                allowed_otypes: raw.allowed_otypes.clone().unwrap_or_default(),
                allow_multiple: raw.allow_multiple,
            },
            other => FieldKind::Text(other.unwrap_or("UNKNOWN").to_string()),
        };

        Self {
            id: raw.id,
            name,
            builtin,
            kind,
        }
    }
}

impl Template {
    /// Field schema decoded once, in template order.
    pub fn field_defs(&self) -> Vec<FieldDef> {
        self.fields.iter().map(FieldDef::from).collect()
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Untitled Template (ID: {})", self.id))
    }
}

/// Reference to another catalog entity (user, group), the value shape
/// of OBJECT_SET fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub otype: String,
    pub oid: i64,
}

/// User record from the user search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Some deployments serve a separate full name
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Group record from the group search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One custom-field entry of a document payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub field_id: i64,
    pub value: FieldValue,
}

/// Custom-field value: a scalar string or a list of object references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Objects(Vec<ObjectRef>),
}

/// Per-document payload for the bulk create call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub title: String,
    pub document_hub_id: i64,
    pub parent_folder_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    pub description: String,
    pub custom_fields: Vec<CustomFieldValue>,
}

/// Body of a 202 bulk-create response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobAccepted {
    #[serde(default)]
    pub job_id: Option<serde_json::Value>,
}

/// One element of a synchronous bulk-create result array.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDocument {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_field(field_type: &str) -> TemplateField {
        TemplateField {
            id: 10,
            name_singular: Some("Owner".into()),
            name_plural: None,
            field_type: Some(field_type.into()),
            builtin_name: None,
            allow_multiple: true,
            allowed_otypes: Some(vec!["user".into()]),
            options: None,
        }
    }

    #[test]
    fn test_field_kind_decoding() {
        assert_eq!(FieldDef::from(&raw_field("RICH_TEXT")).kind, FieldKind::RichText);

        let picker = TemplateField {
            options: Some(vec![
                PickerOption { title: Some("Low".into()) },
                PickerOption { title: Some("High".into()) },
            ]),
            ..raw_field("PICKER")
        };
        assert_eq!(
            FieldDef::from(&picker).kind,
            FieldKind::Picker { options: vec!["Low".into(), "High".into()] }
        );

        match FieldDef::from(&raw_field("OBJECT_SET")).kind {
            FieldKind::ObjectSet { allowed_otypes, allow_multiple } => {
                assert_eq!(allowed_otypes, vec!["user".to_string()]);
                assert!(allow_multiple);
            }
            other => panic!("expected object set, got {:?}", other),
        }

        assert_eq!(
            FieldDef::from(&raw_field("DATE")).kind,
            FieldKind::Text("DATE".into())
        );
    }

    #[test]
    fn test_field_name_fallbacks() {
        let mut raw = raw_field("RICH_TEXT");
        raw.name_singular = None;
        raw.name_plural = Some("Owners".into());
        assert_eq!(FieldDef::from(&raw).name, "Owners");

        raw.name_plural = None;
        assert_eq!(FieldDef::from(&raw).name, "Field ID: 10");
    }

    #[test]
    fn test_builtin_detection() {
        let mut raw = raw_field("RICH_TEXT");
        raw.builtin_name = Some("description".into());
        assert_eq!(FieldDef::from(&raw).builtin, Some(BuiltinField::Description));
    }

    #[test]
    fn test_template_accepts_custom_fields_alias() {
        let template: Template = serde_json::from_str(
            r#"{"id": 3, "title": "Report", "custom_fields": [{"id": 1, "field_type": "PICKER"}]}"#,
        )
        .unwrap();
        assert_eq!(template.fields.len(), 1);
    }

    #[test]
    fn test_payload_serialization_shape() {
        let payload = DocumentPayload {
            title: "T1".into(),
            document_hub_id: 1,
            parent_folder_id: 2,
            template_id: Some(3),
            description: String::new(),
            custom_fields: vec![
                CustomFieldValue { field_id: 9, value: FieldValue::Scalar("High".into()) },
                CustomFieldValue {
                    field_id: 11,
                    value: FieldValue::Objects(vec![ObjectRef { otype: "user".into(), oid: 4 }]),
                },
            ],
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["custom_fields"][0]["value"], "High");
        assert_eq!(json["custom_fields"][1]["value"][0]["otype"], "user");
        assert_eq!(json["parent_folder_id"], 2);
    }
}
