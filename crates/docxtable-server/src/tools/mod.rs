//! Table operations exposed to tool callers.
//!
//! Every operation names its document by path and resolves it through the
//! [`DocumentStore`], loading or creating it on first use. Inputs are parsed
//! before the document is touched, and a failed operation leaves the document
//! unchanged. Nothing is written to storage until [`TableTools::save`].

mod responses;

pub use responses::*;

use chrono::Utc;
use docxtable_core::{
    DataFormat, Document, InsertPosition, MatchMode, SearchEngine, SearchOptions,
    StructureAnalyzer, StructureReport, StyleDelta, TableData, TableError, TablePosition,
};
use std::path::Path;
use tracing::debug;

use crate::codec::{DocumentCodec, JsonCodec};
use crate::config::Config;
use crate::error::ToolError;
use crate::store::{normalize_path, DocumentStore, Resolution};

pub struct TableTools {
    store: DocumentStore,
    config: Config,
}

impl TableTools {
    /// Tools over JSON-encoded documents
    pub fn new(config: Config) -> Self {
        Self::with_codec(JsonCodec::default(), config)
    }

    pub fn with_codec(codec: impl DocumentCodec + 'static, config: Config) -> Self {
        Self {
            store: DocumentStore::new(codec, &config),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    fn read<T>(
        &self,
        tool: &'static str,
        path: &Path,
        f: impl FnOnce(&Document) -> Result<T, TableError>,
    ) -> Result<T, ToolError> {
        debug!(tool, path = %path.display(), "Tool call");
        self.store
            .with_document(path, self.config.auto_create, |handle| Ok(f(handle.document())?))
    }

    fn write<T>(
        &self,
        tool: &'static str,
        path: &Path,
        f: impl FnOnce(&mut Document) -> Result<T, TableError>,
    ) -> Result<T, ToolError> {
        debug!(tool, path = %path.display(), "Tool call");
        self.store
            .with_document(path, self.config.auto_create, |handle| Ok(handle.mutate(f)?))
    }

    /// Open (or create) a document and report what it contains
    pub fn open(&self, path: impl AsRef<Path>, create_if_not_exists: bool) -> Result<OpenResult, ToolError> {
        let path = path.as_ref();
        debug!(tool = "open", path = %path.display(), "Tool call");
        self.store.access(path, create_if_not_exists, |handle, resolution| {
            Ok(OpenResult {
                path: handle.path().to_path_buf(),
                created: resolution == Resolution::Created,
                resolution,
                table_count: handle.document().table_count(),
                paragraph_count: handle.document().paragraph_count(),
            })
        })
    }

    /// Write a document to storage, optionally under a new path
    pub fn save(&self, path: impl AsRef<Path>, save_as: Option<&Path>) -> Result<SaveResult, ToolError> {
        let path = path.as_ref();
        debug!(tool = "save", path = %path.display(), "Tool call");
        let path_written = self.store.save(path, save_as)?;
        Ok(SaveResult { path_written })
    }

    pub fn get_document_info(&self, path: impl AsRef<Path>) -> Result<DocumentInfo, ToolError> {
        let path = path.as_ref();
        debug!(tool = "get_document_info", path = %path.display(), "Tool call");
        self.store
            .with_document(path, self.config.auto_create, |handle| {
                let doc = handle.document();
                Ok(DocumentInfo {
                    path: handle.path().to_path_buf(),
                    table_count: doc.table_count(),
                    paragraph_count: doc.paragraph_count(),
                    dirty: handle.is_dirty(),
                    tables: doc
                        .tables()
                        .enumerate()
                        .map(|(i, table)| TableSummary::new(i, table, &doc.default_text))
                        .collect(),
                })
            })
    }

    /// Drop a document from the cache without saving it
    pub fn close_document(&self, path: impl AsRef<Path>) -> Result<CloseResult, ToolError> {
        let path = path.as_ref();
        debug!(tool = "close_document", path = %path.display(), "Tool call");
        let closed = self.store.close(path)?;
        Ok(CloseResult {
            path: normalize_path(path)?,
            closed,
        })
    }

    pub fn list_loaded_documents(&self) -> LoadedDocuments {
        let documents = self.store.list_loaded();
        LoadedDocuments {
            count: documents.len(),
            documents,
        }
    }

    pub fn create_table(
        &self,
        path: impl AsRef<Path>,
        rows: usize,
        cols: usize,
        position: &str,
        anchor_index: Option<usize>,
        headers: Option<&[String]>,
    ) -> Result<CreateTableResult, ToolError> {
        let position = TablePosition::parse(position, anchor_index)?;
        let table_index = self.write("create_table", path.as_ref(), |doc| {
            doc.create_table(rows, cols, position, headers)
        })?;
        Ok(CreateTableResult {
            table_index,
            rows,
            columns: cols,
            has_headers: headers.is_some(),
        })
    }

    pub fn delete_table(&self, path: impl AsRef<Path>, table_index: usize) -> Result<DeleteTableResult, ToolError> {
        self.write("delete_table", path.as_ref(), |doc| {
            doc.delete_table(table_index)?;
            Ok(DeleteTableResult {
                table_index,
                remaining_tables: doc.table_count(),
            })
        })
    }

    pub fn add_rows(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        count: usize,
        position: &str,
        row_index: Option<usize>,
    ) -> Result<RowsAdded, ToolError> {
        let position = InsertPosition::parse(position, row_index)?;
        self.write("add_rows", path.as_ref(), |doc| {
            let table = doc.table_mut(table_index)?;
            let first_row = table.add_rows(count, position)?;
            Ok(RowsAdded {
                table_index,
                rows_added: count,
                first_row,
                total_rows: table.row_count(),
            })
        })
    }

    pub fn add_columns(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        count: usize,
        position: &str,
        column_index: Option<usize>,
    ) -> Result<ColumnsAdded, ToolError> {
        let position = InsertPosition::parse(position, column_index)?;
        self.write("add_columns", path.as_ref(), |doc| {
            let table = doc.table_mut(table_index)?;
            let first_column = table.add_columns(count, position)?;
            Ok(ColumnsAdded {
                table_index,
                columns_added: count,
                first_column,
                total_columns: table.column_count(),
            })
        })
    }

    pub fn delete_rows(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        row_indices: &[usize],
    ) -> Result<RowsDeleted, ToolError> {
        self.write("delete_rows", path.as_ref(), |doc| {
            let table = doc.table_mut(table_index)?;
            let deleted_rows = table.delete_rows(row_indices)?;
            Ok(RowsDeleted {
                table_index,
                deleted_rows,
                remaining_rows: table.row_count(),
            })
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_cell(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        row: usize,
        col: usize,
        value: &str,
        style: Option<&StyleDelta>,
        preserve_existing_format: bool,
    ) -> Result<CellResult, ToolError> {
        self.write("set_cell", path.as_ref(), |doc| {
            let view = doc.set_cell(table_index, row, col, value, style, preserve_existing_format)?;
            Ok(CellResult::new(table_index, view, true))
        })
    }

    pub fn get_cell(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        row: usize,
        col: usize,
        include_formatting: bool,
    ) -> Result<CellResult, ToolError> {
        self.read("get_cell", path.as_ref(), |doc| {
            let view = doc.get_cell(table_index, row, col)?;
            Ok(CellResult::new(table_index, view, include_formatting))
        })
    }

    pub fn get_table_data(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        include_headers: bool,
        format: &str,
    ) -> Result<TableData, ToolError> {
        let format: DataFormat = format.parse()?;
        self.read("get_table_data", path.as_ref(), |doc| {
            TableData::extract(
                doc.table(table_index)?,
                table_index,
                &doc.default_text,
                include_headers,
                format,
            )
        })
    }

    pub fn list_tables(&self, path: impl AsRef<Path>, include_summary: bool) -> Result<TableList, ToolError> {
        self.read("list_tables", path.as_ref(), |doc| {
            let tables: Vec<TableSummary> = doc
                .tables()
                .enumerate()
                .map(|(i, table)| {
                    let summary = TableSummary::new(i, table, &doc.default_text);
                    if include_summary {
                        summary.with_first_row(table)
                    } else {
                        summary
                    }
                })
                .collect();
            Ok(TableList {
                total_count: tables.len(),
                tables,
            })
        })
    }

    /// Apply text, alignment, background and border formatting to one cell
    pub fn format_cell(
        &self,
        path: impl AsRef<Path>,
        table_index: usize,
        row: usize,
        col: usize,
        style: &StyleDelta,
        preserve_existing: bool,
    ) -> Result<FormatResult, ToolError> {
        if style.is_empty() {
            return Err(TableError::DataFormat("No formatting specified".to_string()).into());
        }
        self.write("format_cell", path.as_ref(), |doc| {
            let style = doc.format_cell(table_index, row, col, style, preserve_existing)?;
            Ok(FormatResult {
                table_index,
                row,
                col,
                style,
            })
        })
    }

    pub fn analyze_table(&self, path: impl AsRef<Path>, table_index: usize) -> Result<StructureReport, ToolError> {
        self.read("analyze_table", path.as_ref(), |doc| {
            Ok(StructureAnalyzer::analyze(
                doc.table(table_index)?,
                table_index,
                &doc.default_text,
            ))
        })
    }

    pub fn analyze_all_tables(&self, path: impl AsRef<Path>) -> Result<DocumentAnalysis, ToolError> {
        let path = path.as_ref();
        let tables = self.read("analyze_all_tables", path, |doc| {
            Ok(StructureAnalyzer::analyze_all(doc))
        })?;
        Ok(DocumentAnalysis {
            path: normalize_path(path)?,
            total_tables: tables.len(),
            analysis_timestamp: Utc::now(),
            tables,
        })
    }

    /// Search cell text. A missing `max_results` falls back to the configured limit.
    pub fn search(&self, path: impl AsRef<Path>, mut options: SearchOptions) -> Result<SearchResults, ToolError> {
        options.max_results = options.max_results.or(self.config.search_limit);
        let matches = self.read("search", path.as_ref(), |doc| {
            SearchEngine::search(doc, &options)
        })?;
        Ok(SearchResults {
            total_matches: matches.len(),
            matches,
            query: options.query,
            mode: options.mode,
            case_sensitive: options.case_sensitive,
        })
    }

    /// Search only the header rows of each table
    pub fn search_headers(
        &self,
        path: impl AsRef<Path>,
        query: &str,
        mode: MatchMode,
        case_sensitive: bool,
    ) -> Result<SearchResults, ToolError> {
        let options = SearchOptions::new(query)
            .with_mode(mode)
            .with_case_sensitive(case_sensitive)
            .headers_only();
        self.search(path, options)
    }
}
