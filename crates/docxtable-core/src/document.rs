use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::cell::{sanitize_text, CellView};
use crate::error::TableError;
use crate::format::{CellStyle, HorizontalAlign, StyleDelta, TextStyle};
use crate::table::Table;

/// A run of text sharing one set of text properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
    pub props: TextStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, props: TextStyle) -> Self {
        Run {
            text: text.into(),
            props,
        }
    }
}

/// A paragraph: an ordered list of runs with an optional alignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<HorizontalAlign>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph holding a single unformatted run
    pub fn with_text(text: impl Into<String>) -> Self {
        Paragraph {
            runs: vec![Run::new(text, TextStyle::default())],
            alignment: None,
        }
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Top-level block of the document body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
}

/// Where a new table goes in the document body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePosition {
    Start,
    End,
    /// After the N-th paragraph (0-indexed, counting body paragraphs only)
    AfterParagraph(usize),
}

impl TablePosition {
    /// Parse the `position` / `anchor_index` pair used by tool callers
    pub fn parse(position: &str, anchor_index: Option<usize>) -> Result<Self, TableError> {
        match position.trim().to_lowercase().as_str() {
            "start" | "beginning" => Ok(TablePosition::Start),
            "end" => Ok(TablePosition::End),
            "after_paragraph" | "after-paragraph" => anchor_index
                .map(TablePosition::AfterParagraph)
                .ok_or_else(|| {
                    TableError::DataFormat(
                        "anchor_index required for 'after_paragraph' position".to_string(),
                    )
                }),
            other => Err(TableError::DataFormat(format!(
                "Invalid position '{}'. Valid options: start, end, after_paragraph",
                other
            ))),
        }
    }
}

/// In-memory object graph of one word-processing document
#[derive(Debug, Clone)]
pub struct Document {
    /// Paragraphs and tables in document order
    pub body: Vec<BodyElement>,
    /// Document-wide default run properties
    pub default_text: TextStyle,
    /// Parts this model does not interpret, kept as their original JSON text
    /// and in their original order
    pub extra: IndexMap<String, Box<RawValue>>,
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("body", &self.body)?;
        if !self.default_text.is_empty() {
            map.serialize_entry("default_text", &self.default_text)?;
        }
        for (key, raw) in &self.extra {
            map.serialize_entry(key, raw)?;
        }
        map.end()
    }
}

// Unknown parts are captured as raw text, so the known ones are decoded from
// the same raw map afterwards
impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut parts = IndexMap::<String, Box<RawValue>>::deserialize(deserializer)?;

        let body = match parts.shift_remove("body") {
            Some(raw) => serde_json::from_str(raw.get()).map_err(D::Error::custom)?,
            None => Vec::new(),
        };
        let default_text = match parts.shift_remove("default_text") {
            Some(raw) => serde_json::from_str(raw.get()).map_err(D::Error::custom)?,
            None => TextStyle::default(),
        };

        Ok(Document {
            body,
            default_text,
            extra: parts,
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with the word processor's stock defaults
    pub fn new() -> Self {
        Self {
            body: Vec::new(),
            default_text: TextStyle::new()
                .with_font_family("Calibri")
                .with_font_size(11.0),
            extra: IndexMap::new(),
        }
    }

    /// Append a paragraph of plain text
    pub fn add_paragraph(&mut self, text: &str) -> usize {
        self.body
            .push(BodyElement::Paragraph(Paragraph::with_text(sanitize_text(text))));
        self.paragraph_count() - 1
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Paragraph(p) => Some(p),
            BodyElement::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Table(t) => Some(t),
            BodyElement::Paragraph(_) => None,
        })
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    /// Get a table by its index in document order
    pub fn table(&self, index: usize) -> Result<&Table, TableError> {
        let count = self.table_count();
        self.tables()
            .nth(index)
            .ok_or(TableError::TableNotFound { index, count })
    }

    /// Get a mutable table by its index in document order
    pub fn table_mut(&mut self, index: usize) -> Result<&mut Table, TableError> {
        let count = self.table_count();
        self.body
            .iter_mut()
            .filter_map(|element| match element {
                BodyElement::Table(t) => Some(t),
                BodyElement::Paragraph(_) => None,
            })
            .nth(index)
            .ok_or(TableError::TableNotFound { index, count })
    }

    /// Body position of the N-th table
    fn table_body_index(&self, index: usize) -> Option<usize> {
        self.body
            .iter()
            .enumerate()
            .filter(|(_, element)| matches!(element, BodyElement::Table(_)))
            .map(|(i, _)| i)
            .nth(index)
    }

    /// Insert a table and return its table index
    pub fn insert_table(&mut self, position: TablePosition, table: Table) -> Result<usize, TableError> {
        let at = match position {
            TablePosition::Start => 0,
            TablePosition::End => self.body.len(),
            TablePosition::AfterParagraph(paragraph) => {
                let count = self.paragraph_count();
                self.body
                    .iter()
                    .enumerate()
                    .filter(|(_, element)| matches!(element, BodyElement::Paragraph(_)))
                    .map(|(i, _)| i + 1)
                    .nth(paragraph)
                    .ok_or_else(|| {
                        TableError::InvalidCellPosition(format!(
                            "Paragraph index {} out of range. Document has {} paragraphs.",
                            paragraph, count
                        ))
                    })?
            }
        };

        let table_index = self.body[..at]
            .iter()
            .filter(|element| matches!(element, BodyElement::Table(_)))
            .count();
        self.body.insert(at, BodyElement::Table(table));
        Ok(table_index)
    }

    /// Create a `rows` x `cols` table, optionally with a header row
    pub fn create_table(
        &mut self,
        rows: usize,
        cols: usize,
        position: TablePosition,
        headers: Option<&[String]>,
    ) -> Result<usize, TableError> {
        let mut table = Table::new(rows, cols)?;
        if let Some(headers) = headers {
            if headers.len() != cols {
                return Err(TableError::DataFormat(format!(
                    "Headers length ({}) must match columns ({})",
                    headers.len(),
                    cols
                )));
            }
            table.set_header_row(headers);
        }
        self.insert_table(position, table)
    }

    /// Remove a table; later table indices shift down by one
    pub fn delete_table(&mut self, index: usize) -> Result<Table, TableError> {
        let count = self.table_count();
        let at = self
            .table_body_index(index)
            .ok_or(TableError::TableNotFound { index, count })?;
        match self.body.remove(at) {
            BodyElement::Table(table) => Ok(table),
            BodyElement::Paragraph(_) => Err(TableError::TableOperation(format!(
                "Body element {} is not a table",
                at
            ))),
        }
    }

    /// Read a cell, resolving inherited style from the document defaults
    pub fn get_cell(&self, table: usize, row: usize, col: usize) -> Result<CellView, TableError> {
        self.table(table)?.get_cell(row, col, &self.default_text)
    }

    /// Write a cell's text (and optionally its style) and return the resulting view
    pub fn set_cell(
        &mut self,
        table: usize,
        row: usize,
        col: usize,
        text: &str,
        style: Option<&StyleDelta>,
        preserve_existing_format: bool,
    ) -> Result<CellView, TableError> {
        self.table_mut(table)?
            .set_cell(row, col, text, style, preserve_existing_format)?;
        self.get_cell(table, row, col)
    }

    /// Apply a style delta to a cell and return its effective style
    pub fn format_cell(
        &mut self,
        table: usize,
        row: usize,
        col: usize,
        delta: &StyleDelta,
        preserve_existing: bool,
    ) -> Result<CellStyle, TableError> {
        self.table_mut(table)?
            .format_cell(row, col, delta, preserve_existing)?;
        Ok(self.get_cell(table, row, col)?.style)
    }

    /// Serialize the document to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the document to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Deserialize a document from raw bytes; invalid UTF-8 is a parse error
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_table_positions() {
        let mut doc = Document::new();
        doc.add_paragraph("Intro");
        doc.add_paragraph("Body");

        assert_eq!(doc.create_table(2, 2, TablePosition::End, None).unwrap(), 0);
        assert_eq!(doc.create_table(1, 1, TablePosition::Start, None).unwrap(), 0);
        // After "Intro": the table at the start precedes it, the end table follows
        assert_eq!(
            doc.create_table(3, 1, TablePosition::AfterParagraph(0), None).unwrap(),
            1
        );

        assert_eq!(doc.table_count(), 3);
        assert_eq!(doc.table(0).unwrap().row_count(), 1);
        assert_eq!(doc.table(1).unwrap().row_count(), 3);
        assert_eq!(doc.table(2).unwrap().row_count(), 2);
    }

    #[test]
    fn test_create_table_rejects_bad_input() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.create_table(0, 2, TablePosition::End, None),
            Err(TableError::InvalidDimensions(_))
        ));
        assert!(matches!(
            doc.create_table(2, 2, TablePosition::End, Some(&headers(&["A"]))),
            Err(TableError::DataFormat(_))
        ));
        assert!(matches!(
            doc.create_table(2, 2, TablePosition::AfterParagraph(4), None),
            Err(TableError::InvalidCellPosition(_))
        ));
        assert_eq!(doc.table_count(), 0);
    }

    #[test]
    fn test_delete_table_twice_is_not_found() {
        let mut doc = Document::new();
        doc.create_table(1, 1, TablePosition::End, None).unwrap();
        doc.create_table(2, 2, TablePosition::End, None).unwrap();

        doc.delete_table(0).unwrap();
        assert_eq!(doc.table(0).unwrap().row_count(), 2);
        doc.delete_table(0).unwrap();
        assert_eq!(
            doc.delete_table(0).unwrap_err(),
            TableError::TableNotFound { index: 0, count: 0 }
        );
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(TablePosition::parse("beginning", None).unwrap(), TablePosition::Start);
        assert_eq!(
            TablePosition::parse("after_paragraph", Some(2)).unwrap(),
            TablePosition::AfterParagraph(2)
        );
        assert!(TablePosition::parse("after_paragraph", None).is_err());
        assert!(TablePosition::parse("middle", None).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_unknown_parts() {
        let json = r#"{
            "body": [
                {"type": "paragraph", "runs": [{"text": "Hello"}]},
                {"type": "table", "rows": [{"cells": [{"paragraphs": []}, {"paragraphs": []}]}]}
            ],
            "styles": {"Normal": {"font": "Calibri"}},
            "core_properties": {"title": "Report"}
        }"#;

        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.paragraph_count(), 1);
        assert_eq!(doc.table(0).unwrap().column_count(), 2);

        let written: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(written["styles"]["Normal"]["font"], "Calibri");
        assert_eq!(written["core_properties"]["title"], "Report");
    }

    #[test]
    fn test_unknown_parts_written_back_verbatim() {
        let json = r#"{"body":[],"settings":{"zoom":1.50,"b":1,"a":2},"custom":[1e3, "x"]}"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.to_json().unwrap(), json);

        let pretty = doc.to_json_pretty().unwrap();
        assert!(pretty.contains(r#"{"zoom":1.50,"b":1,"a":2}"#));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        assert!(Document::from_json(r#"{"body": {"not": "a list"}}"#).is_err());
        assert!(Document::from_json_slice(b"\xFF\xFE").is_err());
    }
}
