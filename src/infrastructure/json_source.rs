//! Source backed by a document-store export file
//!
//! Two shapes are accepted:
//! - an object keyed by document id: `{"A1": {...}, "B2": {...}}`
//! - an array of documents carrying their id in `id_field`
//!
//! Document order follows the file.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::repositories::{ProductSource, SourceError, SourceRecord, SourceResult};

#[derive(Debug, Clone)]
pub struct JsonExportSource {
    path: PathBuf,
    id_field: String,
}

impl JsonExportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_field: "id".to_string(),
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Splits an already-parsed export into records
    pub fn parse_export(&self, export: Value) -> SourceResult<Vec<SourceRecord>> {
        match export {
            Value::Object(documents) => Ok(documents
                .into_iter()
                .map(|(id, raw)| SourceRecord::new(id, raw))
                .collect()),
            Value::Array(documents) => Ok(documents
                .into_iter()
                .map(|raw| self.keyed_record(raw))
                .collect()),
            other => Err(SourceError::InvalidExport(format!(
                "expected an object or array of documents, found {}",
                json_type(&other)
            ))),
        }
    }

    /// An array entry without a usable id yields an empty identifier, which
    /// the normalizer reports as a per-record skip.
    fn keyed_record(&self, mut raw: Value) -> SourceRecord {
        let identifier = raw
            .as_object_mut()
            .and_then(|doc| doc.remove(&self.id_field))
            .and_then(|id| match id {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        if identifier.is_empty() {
            warn!(id_field = %self.id_field, "export entry without identifier");
        }
        SourceRecord::new(identifier, raw)
    }
}

#[async_trait]
impl ProductSource for JsonExportSource {
    async fn list_all(&self) -> SourceResult<Vec<SourceRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let export: Value = serde_json::from_str(&content)?;
        let records = self.parse_export(export)?;

        debug!(path = %self.path.display(), count = records.len(), "read export file");
        Ok(records)
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn export_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn reads_object_keyed_by_id_in_file_order() {
        let file = export_file(
            r#"{
                "B2": {"name": "Jazz Night", "price": 15, "image": "j.jpg"},
                "A1": {"name": "New Title", "price": 12.5, "imageUrl": "x.jpg"}
            }"#,
        );

        let records = JsonExportSource::new(file.path()).list_all().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["B2", "A1"]);
        assert_eq!(records[1].raw["price"], json!(12.5));
    }

    #[tokio::test]
    async fn reads_array_with_custom_id_field() {
        let file = export_file(
            r#"[
                {"docId": "A1", "name": "Poster"},
                {"docId": 42, "name": "Numbered"},
                {"name": "No id"}
            ]"#,
        );

        let source = JsonExportSource::new(file.path()).with_id_field("docId");
        let records = source.list_all().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identifier, "A1");
        assert_eq!(records[0].raw, json!({"name": "Poster"}));
        assert_eq!(records[1].identifier, "42");
        assert_eq!(records[2].identifier, "");
    }

    #[tokio::test]
    async fn scalar_export_is_rejected() {
        let file = export_file("42");
        let err = JsonExportSource::new(file.path()).list_all().await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidExport(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let file = export_file("{\"A1\": ");
        let err = JsonExportSource::new(file.path()).list_all().await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = JsonExportSource::new("/nonexistent/export.json")
            .list_all()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
