use chrono::{DateTime, Utc};
use docxtable_core::{
    CellCoord, CellStyle, CellView, MatchMode, MergeRange, SearchMatch, StructureAnalyzer,
    StructureReport, Table, TableData, TextStyle,
};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::ToolOutput;
use crate::store::{LoadedDocument, Resolution};

/// Response for `open`
#[derive(Debug, Clone, Serialize)]
pub struct OpenResult {
    pub path: PathBuf,
    pub created: bool,
    pub resolution: Resolution,
    pub table_count: usize,
    pub paragraph_count: usize,
}

impl ToolOutput for OpenResult {
    fn message(&self) -> String {
        match self.resolution {
            Resolution::Created => format!("Created new document: {}", self.path.display()),
            Resolution::Loaded => format!("Opened existing document: {}", self.path.display()),
            Resolution::Cached => format!("Document already open: {}", self.path.display()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    pub path_written: PathBuf,
}

impl ToolOutput for SaveResult {
    fn message(&self) -> String {
        format!("Document saved to: {}", self.path_written.display())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseResult {
    pub path: PathBuf,
    pub closed: bool,
}

impl ToolOutput for CloseResult {
    fn message(&self) -> String {
        if self.closed {
            format!("Document closed: {}", self.path.display())
        } else {
            format!("Document not loaded: {}", self.path.display())
        }
    }

    fn is_warning(&self) -> bool {
        !self.closed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedDocuments {
    pub documents: Vec<LoadedDocument>,
    pub count: usize,
}

impl ToolOutput for LoadedDocuments {
    fn message(&self) -> String {
        format!("Found {} loaded documents", self.count)
    }
}

/// One table as listed in document info and `list_tables`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub index: usize,
    pub rows: usize,
    pub columns: usize,
    pub has_headers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_row_data: Option<Vec<String>>,
}

impl TableSummary {
    pub fn new(index: usize, table: &Table, doc_defaults: &TextStyle) -> Self {
        Self {
            index,
            rows: table.row_count(),
            columns: table.column_count(),
            has_headers: StructureAnalyzer::has_header_row(table, doc_defaults),
            style: table.style_name.clone(),
            first_row_data: None,
        }
    }

    /// Builder pattern: include the text of row 0
    pub fn with_first_row(mut self, table: &Table) -> Self {
        if table.row_count() > 0 {
            self.first_row_data = Some(
                (0..table.column_count())
                    .map(|c| table.cell_text(0, c))
                    .collect(),
            );
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub table_count: usize,
    pub paragraph_count: usize,
    pub dirty: bool,
    pub tables: Vec<TableSummary>,
}

impl ToolOutput for DocumentInfo {
    fn message(&self) -> String {
        "Document information retrieved".to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableList {
    pub tables: Vec<TableSummary>,
    pub total_count: usize,
}

impl ToolOutput for TableList {
    fn message(&self) -> String {
        format!("Found {} tables", self.total_count)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTableResult {
    pub table_index: usize,
    pub rows: usize,
    pub columns: usize,
    pub has_headers: bool,
}

impl ToolOutput for CreateTableResult {
    fn message(&self) -> String {
        format!(
            "Table created with {} rows and {} columns",
            self.rows, self.columns
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteTableResult {
    pub table_index: usize,
    pub remaining_tables: usize,
}

impl ToolOutput for DeleteTableResult {
    fn message(&self) -> String {
        format!("Table {} deleted", self.table_index)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowsAdded {
    pub table_index: usize,
    pub rows_added: usize,
    /// Index of the first inserted row
    pub first_row: usize,
    pub total_rows: usize,
}

impl ToolOutput for RowsAdded {
    fn message(&self) -> String {
        format!("Added {} rows to table {}", self.rows_added, self.table_index)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnsAdded {
    pub table_index: usize,
    pub columns_added: usize,
    /// Index of the first inserted column
    pub first_column: usize,
    pub total_columns: usize,
}

impl ToolOutput for ColumnsAdded {
    fn message(&self) -> String {
        format!(
            "Added {} columns to table {}",
            self.columns_added, self.table_index
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowsDeleted {
    pub table_index: usize,
    pub deleted_rows: Vec<usize>,
    pub remaining_rows: usize,
}

impl ToolOutput for RowsDeleted {
    fn message(&self) -> String {
        format!(
            "Deleted {} rows from table {}",
            self.deleted_rows.len(),
            self.table_index
        )
    }
}

/// A cell as returned by `get_cell` and `set_cell`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellResult {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<CellStyle>,
    pub is_header: bool,
    pub is_covered: bool,
    pub anchor: CellCoord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeRange>,
}

impl CellResult {
    pub fn new(table_index: usize, view: CellView, include_formatting: bool) -> Self {
        Self {
            table_index,
            row: view.row,
            col: view.col,
            text: view.text,
            style: include_formatting.then_some(view.style),
            is_header: view.is_header,
            is_covered: view.is_covered,
            anchor: view.anchor,
            merge: view.merge,
        }
    }
}

impl ToolOutput for CellResult {
    fn message(&self) -> String {
        format!(
            "Cell at table {}, row {}, column {}",
            self.table_index, self.row, self.col
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormatResult {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    pub style: CellStyle,
}

impl ToolOutput for FormatResult {
    fn message(&self) -> String {
        format!(
            "Formatting applied to table {}, row {}, column {}",
            self.table_index, self.row, self.col
        )
    }
}

impl ToolOutput for TableData {
    fn message(&self) -> String {
        format!(
            "Retrieved {} rows x {} columns from table {}",
            self.rows, self.columns, self.table_index
        )
    }
}

impl ToolOutput for StructureReport {
    fn message(&self) -> String {
        format!("Table {} analyzed", self.table_index)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub path: PathBuf,
    pub total_tables: usize,
    pub analysis_timestamp: DateTime<Utc>,
    pub tables: Vec<StructureReport>,
}

impl ToolOutput for DocumentAnalysis {
    fn message(&self) -> String {
        format!("Analyzed {} tables", self.total_tables)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub mode: MatchMode,
    pub case_sensitive: bool,
    pub total_matches: usize,
    pub matches: Vec<SearchMatch>,
}

impl ToolOutput for SearchResults {
    fn message(&self) -> String {
        format!("Found {} matches for '{}'", self.total_matches, self.query)
    }
}
