//! Persistence of the document object graph.

use docxtable_core::Document;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads, creates and saves documents. Parts of a document the object graph
/// does not interpret must survive a load/save round trip unchanged.
pub trait DocumentCodec: Send + Sync {
    fn load(&self, path: &Path) -> Result<Document, CodecError>;

    fn create_empty(&self) -> Document;

    fn save(&self, document: &Document, path: &Path) -> Result<(), CodecError>;
}

/// Stores the object graph as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentCodec for JsonCodec {
    fn load(&self, path: &Path) -> Result<Document, CodecError> {
        let bytes = fs::read(path)?;
        Ok(Document::from_json_slice(&bytes)?)
    }

    fn create_empty(&self) -> Document {
        Document::new()
    }

    fn save(&self, document: &Document, path: &Path) -> Result<(), CodecError> {
        let json = if self.pretty {
            document.to_json_pretty()?
        } else {
            document.to_json()?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxtable_core::TablePosition;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.docx");
        let codec = JsonCodec::pretty();

        let mut doc = codec.create_empty();
        doc.add_paragraph("Quarterly numbers");
        doc.create_table(2, 3, TablePosition::End, None).unwrap();
        doc.set_cell(0, 1, 2, "42", None, true).unwrap();
        codec.save(&doc, &path).unwrap();

        let loaded = codec.load(&path).unwrap();
        assert_eq!(loaded.paragraph_count(), 1);
        assert_eq!(loaded.table(0).unwrap().column_count(), 3);
        assert_eq!(loaded.table(0).unwrap().cell_text(1, 2), "42");
        assert_eq!(loaded.default_text, doc.default_text);
    }

    #[test]
    fn test_unknown_parts_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let json = r#"{"body":[],"settings":{"zoom":1.50,"b":1,"a":2},"custom_xml":["<a/>"]}"#;
        fs::write(&path, json).unwrap();

        let codec = JsonCodec::default();
        let doc = codec.load(&path).unwrap();
        codec.save(&doc, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), json);
    }

    #[test]
    fn test_short_rows_are_padded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.docx");
        fs::write(
            &path,
            r#"{"body": [{"type": "table", "rows": [
                {"cells": [{}, {}, {}]},
                {"cells": [{}]}
            ]}]}"#,
        )
        .unwrap();

        let doc = JsonCodec::default().load(&path).unwrap();
        let table = doc.table(0).unwrap();
        assert_eq!(table.rows()[1].cells.len(), 3);
        assert_eq!(table.grid.len(), 3);
    }

    #[test]
    fn test_binary_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packaged.docx");
        fs::write(&path, b"PK\x03\x04\x14\x00\xC3\x28\xFF\xFE").unwrap();

        assert!(matches!(
            JsonCodec::default().load(&path),
            Err(CodecError::Parse(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, "PK\u{3}\u{4} not json").unwrap();

        assert!(matches!(
            JsonCodec::default().load(&path),
            Err(CodecError::Parse(_))
        ));
    }
}
