use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analysis::StructureAnalyzer;
use crate::error::TableError;
use crate::format::TextStyle;
use crate::table::Table;

/// Shape of exported table data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Rows of cell strings
    #[default]
    Array,
    /// One object per data row keyed by header text
    Object,
    /// CSV text
    Csv,
}

impl FromStr for DataFormat {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "array" => Ok(DataFormat::Array),
            "object" => Ok(DataFormat::Object),
            "csv" => Ok(DataFormat::Csv),
            other => Err(TableError::DataFormat(format!(
                "Invalid format '{}'. Valid options: array, object, csv",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableValues {
    Array(Vec<Vec<String>>),
    Object(Vec<IndexMap<String, String>>),
    Csv(String),
}

/// Table contents exported in one of the [`DataFormat`]s
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableData {
    pub table_index: usize,
    pub format: DataFormat,
    pub rows: usize,
    pub columns: usize,
    pub has_headers: bool,
    pub headers: Vec<String>,
    pub data: TableValues,
}

impl TableData {
    /// Export a table's text. Covered cells repeat their anchor's text so every
    /// row has one value per grid column.
    pub fn extract(
        table: &Table,
        table_index: usize,
        doc_defaults: &TextStyle,
        include_headers: bool,
        format: DataFormat,
    ) -> Result<Self, TableError> {
        let (rows, columns) = (table.row_count(), table.column_count());
        let grid: Vec<Vec<String>> = (0..rows)
            .map(|r| (0..columns).map(|c| table.cell_text(r, c)).collect())
            .collect();

        let has_headers = StructureAnalyzer::has_header_row(table, doc_defaults);
        let headers = if has_headers {
            grid.first().cloned().unwrap_or_default()
        } else {
            Vec::new()
        };

        let data = match format {
            DataFormat::Array => {
                let skip = usize::from(has_headers && !include_headers);
                TableValues::Array(grid.into_iter().skip(skip).collect())
            }
            DataFormat::Object => TableValues::Object(Self::objects(&grid, has_headers)),
            DataFormat::Csv => {
                let skip = usize::from(has_headers && !include_headers);
                TableValues::Csv(Self::csv(&grid[skip..])?)
            }
        };

        Ok(TableData {
            table_index,
            format,
            rows,
            columns,
            has_headers,
            headers,
            data,
        })
    }

    /// Key each data row by header text, falling back to `Column_{i}` for
    /// blank headers and tables without a header row
    fn objects(grid: &[Vec<String>], has_headers: bool) -> Vec<IndexMap<String, String>> {
        let width = grid.first().map_or(0, Vec::len);
        let keys: Vec<String> = (0..width)
            .map(|i| {
                let header = grid
                    .first()
                    .filter(|_| has_headers)
                    .map(|row| row[i].trim())
                    .unwrap_or("");
                if header.is_empty() {
                    format!("Column_{}", i)
                } else {
                    header.to_string()
                }
            })
            .collect();

        let body = if has_headers { &grid[1..] } else { grid };
        body.iter()
            .map(|row| keys.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    fn csv(rows: &[Vec<String>]) -> Result<String, TableError> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| TableError::DataFormat(format!("CSV export failed: {}", e)))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TableError::DataFormat(format!("CSV export failed: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| TableError::DataFormat(format!("CSV export failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::RawCell;
    use crate::table::Row;

    fn defaults() -> TextStyle {
        TextStyle::new().with_font_family("Calibri").with_font_size(11.0)
    }

    fn people() -> Table {
        let mut table = Table::new(3, 2).unwrap();
        table.set_header_row(&["Name".to_string(), "City, Country".to_string()]);
        table.set_cell(1, 0, "Alice", None, true).unwrap();
        table.set_cell(1, 1, "Paris, FR", None, true).unwrap();
        table.set_cell(2, 0, "Bob", None, true).unwrap();
        table
    }

    #[test]
    fn test_array_with_and_without_headers() {
        let table = people();
        let data = TableData::extract(&table, 0, &defaults(), true, DataFormat::Array).unwrap();
        assert!(data.has_headers);
        assert_eq!(data.headers, vec!["Name", "City, Country"]);
        match data.data {
            TableValues::Array(rows) => assert_eq!(rows.len(), 3),
            other => panic!("unexpected {:?}", other),
        }

        let data = TableData::extract(&table, 0, &defaults(), false, DataFormat::Array).unwrap();
        match data.data {
            TableValues::Array(rows) => assert_eq!(rows[0], vec!["Alice", "Paris, FR"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_keys_follow_headers() {
        let data = TableData::extract(&people(), 0, &defaults(), true, DataFormat::Object).unwrap();
        let TableValues::Object(rows) = data.data else {
            panic!("expected objects");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], "Alice");
        assert_eq!(rows[1]["City, Country"], "");
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["Name", "City, Country"]);
    }

    #[test]
    fn test_object_without_headers_uses_column_keys() {
        let mut table = Table::new(1, 2).unwrap();
        table.set_cell(0, 1, "v", None, true).unwrap();
        let data = TableData::extract(&table, 0, &defaults(), true, DataFormat::Object).unwrap();
        let TableValues::Object(rows) = data.data else {
            panic!("expected objects");
        };
        assert_eq!(rows[0]["Column_0"], "");
        assert_eq!(rows[0]["Column_1"], "v");
    }

    #[test]
    fn test_csv_quotes_fields() {
        let data = TableData::extract(&people(), 0, &defaults(), true, DataFormat::Csv).unwrap();
        let TableValues::Csv(text) = data.data else {
            panic!("expected csv");
        };
        assert_eq!(text, "Name,\"City, Country\"\nAlice,\"Paris, FR\"\nBob,\n");
    }

    #[test]
    fn test_merged_cells_repeat_anchor_text() {
        let table = Table::from_rows(vec![
            Row::new(vec![RawCell::text("wide").with_span(2)]),
            Row::new(vec![RawCell::text("a"), RawCell::text("b")]),
        ]);
        let data = TableData::extract(&table, 0, &defaults(), true, DataFormat::Array).unwrap();
        assert_eq!(
            data.data,
            TableValues::Array(vec![
                vec!["wide".to_string(), "wide".to_string()],
                vec!["a".to_string(), "b".to_string()],
            ])
        );
    }

    #[test]
    fn test_unknown_format() {
        let err = "xml".parse::<DataFormat>().unwrap_err();
        assert_eq!(err.code(), "DATA_FORMAT_ERROR");
    }
}
