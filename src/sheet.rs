//! Sheet schema generation and tabular row access.
//!
//! A template's field schema becomes a `SheetSpec`: ordered column
//! headers, per-column allowed-value constraints for picker fields, and
//! provenance metadata naming the hub/folder/template the sheet was
//! generated for. Rendering the spec to an actual spreadsheet file is a
//! collaborator concern behind the `SheetStore` port; the default store
//! writes a CSV data sheet plus a hidden metadata sidecar, and enforces
//! the picker constraints when reading rows back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::models::{FieldKind, Template};
use crate::types::{Result, StacksmithError};

/// Constraints apply to data rows 2 through 1000 of the rendered sheet.
pub const CONSTRAINT_FIRST_ROW: u32 = 2;
pub const CONSTRAINT_LAST_ROW: u32 = 1000;

/// Where a generated sheet came from; written for human debugging,
/// never re-read programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub hub_id: i64,
    pub folder_id: i64,
    pub template_id: i64,
    pub template_title: String,
}

/// One column of the generated sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub header: String,
    /// Present for enumerated picker fields: cells must come from this set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

/// The full schema of a generated sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub provenance: Provenance,
}

impl SheetSpec {
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.clone()).collect()
    }
}

/// Build a sheet spec from a template's field schema.
///
/// "Title" and "Description" always lead; builtin title/description
/// fields are excluded from the dynamic list so they never appear
/// twice. A template with no fields is a loud, user-visible error.
pub fn build_sheet_spec(template: &Template, hub_id: i64, folder_id: i64) -> Result<SheetSpec> {
    let defs = template.field_defs();
    if defs.is_empty() {
        return Err(StacksmithError::EmptyTemplate(template.display_title()));
    }

    let mut columns = vec![
        ColumnSpec { header: "Title".into(), allowed_values: None },
        ColumnSpec { header: "Description".into(), allowed_values: None },
    ];

    for def in &defs {
        if def.builtin.is_some() {
            continue;
        }
        if columns.iter().any(|c| c.header == def.name) {
            continue;
        }
        let allowed_values = match &def.kind {
            FieldKind::Picker { options } if !options.is_empty() => Some(options.clone()),
            _ => None,
        };
        columns.push(ColumnSpec { header: def.name.clone(), allowed_values });
    }

    Ok(SheetSpec {
        name: template.display_title(),
        columns,
        provenance: Provenance {
            hub_id,
            folder_id,
            template_id: template.id,
            template_title: template.display_title(),
        },
    })
}

/// Pre-parsed tabular input: ordered headers plus row cells.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell by row index and header name; empty cells come back as None.
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == header)?;
        let value = self.rows.get(row)?.get(col)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Drop the given row indices (used after duplicate resolution).
    pub fn without_rows(&self, drop: &[usize]) -> RowSet {
        RowSet {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, r)| r.clone())
                .collect(),
        }
    }
}

/// Sheet file I/O port. The spreadsheet library itself is out of scope;
/// this is its interface.
pub trait SheetStore: Send + Sync {
    /// Render the spec to a fillable sheet at `path`.
    fn write_spec(&self, spec: &SheetSpec, path: &Path) -> Result<()>;

    /// Read a filled-in sheet back as rows, enforcing any constraints
    /// the sheet was generated with.
    fn read_rows(&self, path: &Path) -> Result<RowSet>;
}

/// Sidecar carrying provenance and constraints next to the CSV data file.
#[derive(Debug, Serialize, Deserialize)]
struct SheetMeta {
    provenance: Provenance,
    /// header -> allowed values, applied to rows 2..=1000
    constraints: BTreeMap<String, Vec<String>>,
    constraint_rows: (u32, u32),
}

/// Default store: CSV data sheet plus a `.meta.json` sidecar standing
/// in for the hidden metadata sheet.
pub struct CsvSheetStore;

impl CsvSheetStore {
    fn meta_path(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sheet".into());
        path.with_file_name(format!("{}.meta.json", stem))
    }

    fn load_meta(path: &Path) -> Option<SheetMeta> {
        let raw = std::fs::read_to_string(Self::meta_path(path)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

impl SheetStore for CsvSheetStore {
    fn write_spec(&self, spec: &SheetSpec, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| StacksmithError::Sheet(format!("could not create {}: {}", path.display(), e)))?;
        writer
            .write_record(spec.headers())
            .map_err(|e| StacksmithError::Sheet(e.to_string()))?;
        writer.flush()?;

        let constraints: BTreeMap<String, Vec<String>> = spec
            .columns
            .iter()
            .filter_map(|c| c.allowed_values.clone().map(|v| (c.header.clone(), v)))
            .collect();
        let meta = SheetMeta {
            provenance: spec.provenance.clone(),
            constraints,
            constraint_rows: (CONSTRAINT_FIRST_ROW, CONSTRAINT_LAST_ROW),
        };
        std::fs::write(Self::meta_path(path), serde_json::to_string_pretty(&meta)?)?;

        debug!(path = %path.display(), columns = spec.columns.len(), "sheet written");
        Ok(())
    }

    fn read_rows(&self, path: &Path) -> Result<RowSet> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| StacksmithError::Sheet(format!("could not read {}: {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| StacksmithError::Sheet(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StacksmithError::Sheet(e.to_string()))?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        let rows = RowSet { headers, rows };

        // Enforce the constraints the sheet was generated with, the way
        // a spreadsheet UI would have rejected the entry.
        if let Some(meta) = Self::load_meta(path) {
            for (header, allowed) in &meta.constraints {
                let Some(col) = rows.headers.iter().position(|h| h == header) else {
                    continue;
                };
                for (i, row) in rows.rows.iter().enumerate() {
                    let sheet_row = (i as u32) + 2; // header occupies row 1
                    if sheet_row < meta.constraint_rows.0 || sheet_row > meta.constraint_rows.1 {
                        continue;
                    }
                    let value = row.get(col).map(|v| v.trim()).unwrap_or("");
                    if !value.is_empty() && !allowed.iter().any(|a| a == value) {
                        return Err(StacksmithError::Sheet(format!(
                            "row {}: '{}' is not a valid value for '{}'; must be one of: {}",
                            sheet_row,
                            value,
                            header,
                            allowed.join(", ")
                        )));
                    }
                }
            }
        }

        Ok(rows)
    }
}
