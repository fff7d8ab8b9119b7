use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::document::Document;
use crate::format::{CellStyle, Color, TextStyle};
use crate::range::{CellCoord, MergeKind, MergeRange};
use crate::style;
use crate::table::Table;

/// One grid cell in a structure report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub style: CellStyle,
    pub is_header: bool,
    pub is_covered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    #[serde(flatten)]
    pub range: MergeRange,
    pub kind: MergeKind,
    pub row_span: usize,
    pub col_span: usize,
}

impl From<MergeRange> for MergeReport {
    fn from(range: MergeRange) -> Self {
        MergeReport {
            range,
            kind: range.kind(),
            row_span: range.row_span(),
            col_span: range.col_span(),
        }
    }
}

/// Whether all anchor cells agree on each style aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleConsistency {
    pub consistent_fonts: bool,
    pub consistent_alignment: bool,
    pub consistent_borders: bool,
}

/// Distinct style values used across the table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleSummary {
    pub font_families: Vec<String>,
    pub font_sizes: Vec<f32>,
    pub font_colors: Vec<String>,
    pub background_colors: Vec<String>,
}

/// Read-only snapshot of a table's structure at the time of analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureReport {
    pub table_index: usize,
    pub rows: usize,
    pub cols: usize,
    pub style_name: Option<String>,
    pub has_header_row: bool,
    pub header_row_index: Option<usize>,
    pub header_cells: Vec<String>,
    pub merges: Vec<MergeReport>,
    /// Grid cells belonging to a multi-cell merge, anchors included
    pub merged_cells_count: usize,
    pub cells: Vec<Vec<CellReport>>,
    pub consistency: StyleConsistency,
    pub summary: StyleSummary,
}

pub struct StructureAnalyzer;

impl StructureAnalyzer {
    /// Analyze one table against the current grid state
    pub fn analyze(table: &Table, table_index: usize, doc_defaults: &TextStyle) -> StructureReport {
        let index = table.index();
        let styles = anchor_styles(table, doc_defaults);
        let has_header_row = classify_header(table, &styles);
        let header_row_index = has_header_row.then_some(0);

        let cells: Vec<Vec<CellReport>> = (0..index.rows())
            .map(|r| {
                (0..index.cols())
                    .map(|c| {
                        let anchor = index.anchor_of(r, c).unwrap_or(CellCoord::new(r, c));
                        CellReport {
                            row: r,
                            col: c,
                            text: table.cell_text(r, c),
                            style: styles.get(&anchor).cloned().unwrap_or_default(),
                            is_header: header_row_index == Some(r),
                            is_covered: index.is_covered(r, c),
                        }
                    })
                    .collect()
            })
            .collect();

        let header_cells = match header_row_index {
            Some(r) => cells[r].iter().map(|c| c.text.clone()).collect(),
            None => Vec::new(),
        };

        let ranges = index.merge_ranges();
        let merged_cells_count = ranges.iter().map(MergeRange::cell_count).sum();

        let anchor_styles: Vec<&CellStyle> = index.anchors().filter_map(|a| styles.get(&a)).collect();

        StructureReport {
            table_index,
            rows: index.rows(),
            cols: index.cols(),
            style_name: table.style_name.clone(),
            has_header_row,
            header_row_index,
            header_cells,
            merges: ranges.into_iter().map(MergeReport::from).collect(),
            merged_cells_count,
            cells,
            consistency: consistency(&anchor_styles),
            summary: summary(&anchor_styles),
        }
    }

    /// Analyze every table in document order
    pub fn analyze_all(document: &Document) -> Vec<StructureReport> {
        document
            .tables()
            .enumerate()
            .map(|(i, table)| Self::analyze(table, i, &document.default_text))
            .collect()
    }

    /// Whether row 0 is a header row
    pub fn has_header_row(table: &Table, doc_defaults: &TextStyle) -> bool {
        classify_header(table, &anchor_styles(table, doc_defaults))
    }
}

/// Effective style of every merge anchor
fn anchor_styles(table: &Table, doc_defaults: &TextStyle) -> HashMap<CellCoord, CellStyle> {
    let index = table.index();
    index
        .anchors()
        .filter_map(|anchor| {
            let cell = table.raw_cell(index.anchor_raw(anchor)?)?;
            Some((anchor, style::effective_style(cell, &table.default_text, doc_defaults)))
        })
        .collect()
}

/// Most frequent background across the grid. Ties go to "no background",
/// then to the color seen first in row-major order.
fn modal_background(table: &Table, styles: &HashMap<CellCoord, CellStyle>) -> Option<Color> {
    let index = table.index();
    let mut counts: Vec<(Option<Color>, usize)> = vec![(None, 0)];
    for r in 0..index.rows() {
        for c in 0..index.cols() {
            let background = index
                .anchor_of(r, c)
                .and_then(|a| styles.get(&a))
                .and_then(|s| s.background_color);
            match counts.iter_mut().find(|(color, _)| *color == background) {
                Some((_, n)) => *n += 1,
                None => counts.push((background, 1)),
            }
        }
    }

    let mut best = counts[0];
    for &(color, n) in &counts[1..] {
        if n > best.1 {
            best = (color, n);
        }
    }
    best.0
}

/// Row 0 is a header when explicitly flagged, or when a strict majority of its
/// cells are bold or stand out from the modal background
fn classify_header(table: &Table, styles: &HashMap<CellCoord, CellStyle>) -> bool {
    let Some(first) = table.rows().first() else {
        return false;
    };
    if first.is_header {
        return true;
    }

    let index = table.index();
    // A horizontal merge repeats its anchor across the columns it spans
    let mut anchors: Vec<CellCoord> = (0..index.cols())
        .filter_map(|c| index.anchor_of(0, c))
        .collect();
    anchors.dedup();
    if anchors.is_empty() {
        return false;
    }

    let modal = modal_background(table, styles);
    let marked = anchors
        .iter()
        .filter_map(|a| styles.get(a))
        .filter(|s| s.text.is_bold() || s.background_color != modal)
        .count();
    marked * 2 > anchors.len()
}

fn all_equal<T: PartialEq>(mut values: impl Iterator<Item = T>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

fn consistency(styles: &[&CellStyle]) -> StyleConsistency {
    StyleConsistency {
        consistent_fonts: all_equal(
            styles
                .iter()
                .map(|s| (s.text.font_family.as_deref(), s.text.font_size)),
        ),
        consistent_alignment: all_equal(styles.iter().map(|s| s.horizontal_alignment)),
        consistent_borders: all_equal(styles.iter().map(|s| &s.borders)),
    }
}

fn summary(styles: &[&CellStyle]) -> StyleSummary {
    let font_families: BTreeSet<String> = styles
        .iter()
        .filter_map(|s| s.text.font_family.clone())
        .collect();
    let font_colors: BTreeSet<String> = styles
        .iter()
        .filter_map(|s| s.text.font_color.map(|c| c.to_hex()))
        .collect();
    let background_colors: BTreeSet<String> = styles
        .iter()
        .filter_map(|s| s.background_color.map(|c| c.to_hex()))
        .collect();

    let mut font_sizes: Vec<f32> = styles.iter().filter_map(|s| s.text.font_size).collect();
    font_sizes.sort_by(|a, b| a.total_cmp(b));
    font_sizes.dedup();

    StyleSummary {
        font_families: font_families.into_iter().collect(),
        font_sizes,
        font_colors: font_colors.into_iter().collect(),
        background_colors: background_colors.into_iter().collect(),
    }
}
