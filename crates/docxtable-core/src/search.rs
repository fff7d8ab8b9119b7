use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analysis::StructureAnalyzer;
use crate::document::Document;
use crate::error::TableError;
use crate::format::TextStyle;
use crate::table::Table;

/// How the query is compared against cell text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whole (trimmed) cell text equals the query
    Exact,
    /// Query occurs anywhere in the cell text
    #[default]
    Contains,
    /// Query is a regular expression
    Regex,
}

impl FromStr for MatchMode {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "contains" => Ok(MatchMode::Contains),
            "regex" => Ok(MatchMode::Regex),
            other => Err(TableError::DataFormat(format!(
                "Invalid search mode '{}'. Valid options: exact, contains, regex",
                other
            ))),
        }
    }
}

/// Options for searching cell text in a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// The search query (literal text or regex pattern)
    pub query: String,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Tables to search (None = all tables)
    #[serde(default)]
    pub table_indices: Option<Vec<usize>>,
    /// Only scan rows classified as header rows
    #[serde(default)]
    pub headers_only: bool,
    /// Stop after this many matches
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        SearchOptions {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set match mode
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder pattern: set case sensitivity
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Builder pattern: restrict to specific tables
    pub fn with_tables(mut self, tables: Vec<usize>) -> Self {
        self.table_indices = Some(tables);
        self
    }

    /// Builder pattern: scan header rows only
    pub fn headers_only(mut self) -> Self {
        self.headers_only = true;
        self
    }

    /// Builder pattern: cap the number of matches
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    /// The matched portion of text
    pub matched_text: String,
    /// The full cell text (for context)
    pub cell_text: String,
}

/// Matcher trait for different matching strategies
trait Matcher {
    fn find_match(&self, text: &str) -> Option<String>;
}

/// Whole-cell literal matcher
struct ExactMatcher {
    query: String,
    case_sensitive: bool,
}

impl Matcher for ExactMatcher {
    fn find_match(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        let query = self.query.trim();
        let hit = if self.case_sensitive {
            trimmed == query
        } else {
            trimmed.to_lowercase() == query.to_lowercase()
        };
        hit.then(|| trimmed.to_string())
    }
}

/// Regex matcher; literal substring search compiles to an escaped pattern
struct RegexMatcher {
    regex: Regex,
}

impl Matcher for RegexMatcher {
    fn find_match(&self, text: &str) -> Option<String> {
        self.regex.find(text).map(|m| m.as_str().to_string())
    }
}

/// Search engine for finding text in document tables
pub struct SearchEngine;

impl SearchEngine {
    /// Search for cells matching the given options
    ///
    /// Results are ordered by table index, then row, then column. Covered cells
    /// of a merge are skipped; their text is matched once at the anchor.
    pub fn search(document: &Document, options: &SearchOptions) -> Result<Vec<SearchMatch>, TableError> {
        let matcher = Self::build_matcher(options)?;

        let count = document.table_count();
        let table_indices: Vec<usize> = match &options.table_indices {
            Some(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= count) {
                    return Err(TableError::TableNotFound { index, count });
                }
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                sorted.dedup();
                sorted
            }
            None => (0..count).collect(),
        };

        let limit = options.max_results.unwrap_or(usize::MAX);
        let mut results = Vec::new();
        for table_index in table_indices {
            if results.len() >= limit {
                break;
            }
            let table = document.table(table_index)?;
            Self::search_table(
                table,
                table_index,
                &document.default_text,
                matcher.as_ref(),
                options.headers_only,
                limit,
                &mut results,
            );
        }

        Ok(results)
    }

    /// Build a matcher from search options
    fn build_matcher(options: &SearchOptions) -> Result<Box<dyn Matcher>, TableError> {
        let pattern = match options.mode {
            MatchMode::Exact => {
                return Ok(Box::new(ExactMatcher {
                    query: options.query.clone(),
                    case_sensitive: options.case_sensitive,
                }))
            }
            MatchMode::Contains => regex::escape(&options.query),
            MatchMode::Regex => options.query.clone(),
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map(|regex| Box::new(RegexMatcher { regex }) as Box<dyn Matcher>)
            .map_err(|e| TableError::DataFormat(format!("Invalid regex pattern: {}", e)))
    }

    /// Search a single table, appending matches until `limit` is reached
    fn search_table(
        table: &Table,
        table_index: usize,
        doc_defaults: &TextStyle,
        matcher: &dyn Matcher,
        headers_only: bool,
        limit: usize,
        results: &mut Vec<SearchMatch>,
    ) {
        let rows = if headers_only {
            if !StructureAnalyzer::has_header_row(table, doc_defaults) {
                return;
            }
            1
        } else {
            table.row_count()
        };

        for anchor in table.index().anchors().filter(|a| a.row < rows) {
            if results.len() >= limit {
                return;
            }
            let cell_text = table.cell_text(anchor.row, anchor.col);
            if let Some(matched_text) = matcher.find_match(&cell_text) {
                results.push(SearchMatch {
                    table_index,
                    row: anchor.row,
                    col: anchor.col,
                    matched_text,
                    cell_text,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{RawCell, VMerge};
    use crate::document::{BodyElement, TablePosition};
    use crate::table::Row;

    fn create_test_document() -> Document {
        let mut doc = Document::new();
        let headers = vec!["Name".to_string(), "City".to_string()];
        doc.create_table(3, 2, TablePosition::End, Some(&headers)).unwrap();
        doc.set_cell(0, 1, 0, "alice", None, true).unwrap();
        doc.set_cell(0, 1, 1, "Paris", None, true).unwrap();
        doc.set_cell(0, 2, 0, "Bob", None, true).unwrap();
        doc.set_cell(0, 2, 1, "Alice Springs", None, true).unwrap();

        doc.create_table(1, 2, TablePosition::End, None).unwrap();
        doc.set_cell(1, 0, 0, "ALICE", None, true).unwrap();
        doc.set_cell(1, 0, 1, "order 42", None, true).unwrap();
        doc
    }

    fn positions(results: &[SearchMatch]) -> Vec<(usize, usize, usize)> {
        results.iter().map(|m| (m.table_index, m.row, m.col)).collect()
    }

    #[test]
    fn test_exact_case_insensitive() {
        let doc = create_test_document();
        let options = SearchOptions::new("Alice")
            .with_mode(MatchMode::Exact)
            .with_tables(vec![0]);
        let results = SearchEngine::search(&doc, &options).unwrap();

        assert_eq!(positions(&results), vec![(0, 1, 0)]);
        assert_eq!(results[0].cell_text, "alice");
    }

    #[test]
    fn test_contains_orders_by_table_row_col() {
        let doc = create_test_document();
        let results = SearchEngine::search(&doc, &SearchOptions::new("alice")).unwrap();
        assert_eq!(positions(&results), vec![(0, 1, 0), (0, 2, 1), (1, 0, 0)]);
        assert_eq!(results[1].matched_text, "Alice");
    }

    #[test]
    fn test_case_sensitive() {
        let doc = create_test_document();
        let options = SearchOptions::new("ALICE").with_case_sensitive(true);
        let results = SearchEngine::search(&doc, &options).unwrap();
        assert_eq!(positions(&results), vec![(1, 0, 0)]);
    }

    #[test]
    fn test_contains_treats_query_literally() {
        let mut doc = Document::new();
        doc.create_table(1, 1, TablePosition::End, None).unwrap();
        doc.set_cell(0, 0, 0, "cost (net)", None, true).unwrap();

        let results = SearchEngine::search(&doc, &SearchOptions::new("(net)")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_text, "(net)");
    }

    #[test]
    fn test_regex() {
        let doc = create_test_document();
        let options = SearchOptions::new(r"\d+").with_mode(MatchMode::Regex);
        let results = SearchEngine::search(&doc, &options).unwrap();
        assert_eq!(positions(&results), vec![(1, 0, 1)]);
        assert_eq!(results[0].matched_text, "42");
    }

    #[test]
    fn test_invalid_regex_fails() {
        let doc = create_test_document();
        let options = SearchOptions::new("[unclosed").with_mode(MatchMode::Regex);
        assert!(matches!(
            SearchEngine::search(&doc, &options),
            Err(TableError::DataFormat(_))
        ));
    }

    #[test]
    fn test_max_results_truncates_in_order() {
        let doc = create_test_document();
        let options = SearchOptions::new("alice").with_max_results(2);
        let results = SearchEngine::search(&doc, &options).unwrap();
        assert_eq!(positions(&results), vec![(0, 1, 0), (0, 2, 1)]);
    }

    #[test]
    fn test_headers_only() {
        let doc = create_test_document();
        let options = SearchOptions::new("a").headers_only();
        let results = SearchEngine::search(&doc, &options).unwrap();
        // Table 1 has no header row
        assert_eq!(positions(&results), vec![(0, 0, 0)]);
        assert_eq!(results[0].cell_text, "Name");
    }

    #[test]
    fn test_invalid_table_index() {
        let doc = create_test_document();
        let options = SearchOptions::new("x").with_tables(vec![0, 7]);
        assert_eq!(
            SearchEngine::search(&doc, &options).unwrap_err(),
            TableError::TableNotFound { index: 7, count: 2 }
        );
    }

    #[test]
    fn test_merged_cell_matched_once() {
        let mut doc = Document::new();
        doc.body.push(BodyElement::Table(Table::from_rows(vec![
            Row::new(vec![
                RawCell::text("merged").with_span(2).with_v_merge(VMerge::Restart),
            ]),
            Row::new(vec![RawCell::spanning(2, Some(VMerge::Continue))]),
        ])));

        let results = SearchEngine::search(&doc, &SearchOptions::new("merged")).unwrap();
        assert_eq!(positions(&results), vec![(0, 0, 0)]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Regex".parse::<MatchMode>().unwrap(), MatchMode::Regex);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }
}
