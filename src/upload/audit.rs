//! Plain-text audit log, one file per upload operation.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::types::Result;

/// Accumulates per-item results and writes the durable record.
pub struct AuditLog {
    context: String,
    timestamp: String,
    entries: Vec<String>,
    pub prepared: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl AuditLog {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            timestamp: Local::now().format("%Y%m%d-%H%M%S").to_string(),
            entries: Vec::new(),
            prepared: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// `logs/upload_log_{label}_{timestamp}.txt`
    pub fn file_name(&self) -> String {
        let label: String = self
            .context
            .chars()
            .map(|c| if c == ' ' { '_' } else { c })
            .filter(|c| *c != ':' && *c != '\'')
            .collect();
        format!("upload_log_{}_{}.txt", label, self.timestamp)
    }

    /// Write the log under `dir`, creating it when needed.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());

        let mut body = String::new();
        body.push_str(&format!("--- {} Log ---\n", self.context));
        body.push_str(&format!("Timestamp: {}\n", self.timestamp));
        body.push_str(&format!("Total documents prepared: {}\n", self.prepared));
        body.push_str(&format!("Successfully uploaded: {}\n", self.succeeded));
        body.push_str(&format!("Failed uploads: {}\n\n", self.failed));
        body.push_str("--- Individual Upload Results / Details ---\n");
        for entry in &self.entries {
            body.push_str(entry);
            body.push('\n');
        }

        std::fs::write(&path, body)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_and_counts() {
        let dir = tempfile::tempdir().unwrap();

        let mut log = AuditLog::new("Sheet upload from 'report.csv'");
        log.prepared = 5;
        log.succeeded = 5;
        log.failed = 0;
        log.push("SUCCESS: 'T1' (ID: 101)");

        let path = log.write(dir.path()).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();

        assert!(body.contains("Total documents prepared: 5"));
        assert!(body.contains("Successfully uploaded: 5"));
        assert!(body.contains("Failed uploads: 0"));
        assert!(body.contains("SUCCESS: 'T1' (ID: 101)"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("upload_log_Sheet_upload_from_report.csv_"));
        assert!(!name.contains(' '));
    }
}
