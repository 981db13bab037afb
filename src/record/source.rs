//! Wide-row read path.
//!
//! The object store itself is reached through `RowSource`; the crate only
//! ships a reader for JSON dumps of the `obj_uuid_table`, which is what
//! offline syncs and tests feed it.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use super::{ColumnSet, SourceError};

/// Fetch the columns stored for one resource identifier.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_columns(&self, id: &str) -> Result<ColumnSet, SourceError>;
}

/// Row source backed by a dump of the form
/// `{ "<uuid>": { "<column>": "<raw json value>" } }`.
#[derive(Debug, Clone, Default)]
pub struct JsonDumpSource {
    rows: HashMap<String, ColumnSet>,
}

impl JsonDumpSource {
    pub fn from_rows(rows: HashMap<String, ColumnSet>) -> Self {
        Self { rows }
    }

    pub fn from_json_str(content: &str) -> Result<Self, SourceError> {
        let rows: HashMap<String, ColumnSet> = serde_json::from_str(content)?;
        Ok(Self { rows })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Identifiers present in the dump, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rows.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn insert(&mut self, id: impl Into<String>, columns: ColumnSet) {
        self.rows.insert(id.into(), columns);
    }
}

#[async_trait]
impl RowSource for JsonDumpSource {
    async fn fetch_columns(&self, id: &str) -> Result<ColumnSet, SourceError> {
        self.rows
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_dump_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"vn-1": {{"type": "\"virtual_network\"", "prop:display_name": "\"blue\""}}}}"#
        )
        .unwrap();

        let source = JsonDumpSource::from_file(file.path()).unwrap();
        assert_eq!(source.ids(), vec!["vn-1".to_string()]);

        let columns = source.fetch_columns("vn-1").await.unwrap();
        assert_eq!(columns["type"], "\"virtual_network\"");

        assert!(matches!(
            source.fetch_columns("missing").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_dump_parse_error() {
        assert!(matches!(
            JsonDumpSource::from_json_str("[1, 2]"),
            Err(SourceError::Parse(_))
        ));
    }
}
