use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

use crate::analysis::StructureAnalyzer;
use crate::cell::{sanitize_text, CellView, RawCell, VMerge};
use crate::error::TableError;
use crate::format::{StyleDelta, TextStyle};
use crate::grid::{GridIndex, RawPos, Slot};
use crate::range::CellCoord;
use crate::style;

fn is_false(b: &bool) -> bool {
    !*b
}

/// One column of the table grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    /// Preferred width in twentieths of a point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// A raw table row: cells left to right, each covering `grid_span` columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<RawCell>,
    /// Marked as a repeating header row in the document
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_header: bool,
}

impl Row {
    pub fn new(cells: Vec<RawCell>) -> Self {
        Row {
            cells,
            is_header: false,
        }
    }

    /// A row of `cols` empty, unmerged cells
    pub fn empty(cols: usize) -> Self {
        Row::new((0..cols).map(|_| RawCell::empty()).collect())
    }

    /// Number of grid columns covered by this row's cells
    pub fn span_width(&self) -> usize {
        self.cells.iter().map(RawCell::span).sum()
    }
}

/// Where new rows or columns are inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Start,
    End,
    Before(usize),
    After(usize),
}

impl InsertPosition {
    /// Parse a position string and its optional index
    pub fn parse(position: &str, index: Option<usize>) -> Result<Self, TableError> {
        let require = |kind: &str| {
            index.ok_or_else(|| {
                TableError::DataFormat(format!("An index is required for position '{}'", kind))
            })
        };

        match position.trim().to_lowercase().as_str() {
            "start" | "beginning" => Ok(InsertPosition::Start),
            "end" => Ok(InsertPosition::End),
            "before" | "at_index" => Ok(InsertPosition::Before(require("before")?)),
            "after" => Ok(InsertPosition::After(require("after")?)),
            other => Err(TableError::DataFormat(format!(
                "Invalid position '{}'. Valid options: start, end, before, after, at_index",
                other
            ))),
        }
    }

    /// Insertion boundary in `0..=len` for a sequence of `len` items
    pub fn boundary(&self, len: usize, what: &str) -> Result<usize, TableError> {
        let check = |i: usize| {
            if i < len {
                Ok(i)
            } else {
                Err(TableError::InvalidCellPosition(format!(
                    "{} index {} out of range. Table has {} {}s.",
                    what,
                    i,
                    len,
                    what.to_lowercase()
                )))
            }
        };

        match *self {
            InsertPosition::Start => Ok(0),
            InsertPosition::End => Ok(len),
            InsertPosition::Before(i) => check(i),
            InsertPosition::After(i) => check(i).map(|i| i + 1),
        }
    }
}

/// A table: raw span-encoded rows plus a lazily built dense grid index
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    /// Named table style applied by the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
    /// Run properties every cell in the table inherits
    #[serde(skip_serializing_if = "TextStyle::is_empty")]
    pub default_text: TextStyle,
    pub grid: Vec<GridColumn>,
    rows: Vec<Row>,
    #[serde(skip)]
    index: OnceCell<GridIndex>,
}

impl Table {
    /// Create a `rows` x `cols` table of empty cells
    pub fn new(rows: usize, cols: usize) -> Result<Self, TableError> {
        if rows == 0 || cols == 0 {
            return Err(TableError::InvalidDimensions(format!(
                "Rows and columns must be at least 1 (got {}x{})",
                rows, cols
            )));
        }
        Ok(Table::from_rows((0..rows).map(|_| Row::empty(cols)).collect()))
    }

    /// Build a table from raw rows, padding short rows to the widest
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut table = Table {
            style_name: None,
            default_text: TextStyle::default(),
            grid: Vec::new(),
            rows,
            index: OnceCell::new(),
        };
        table.normalize();
        table
    }

    /// Pad every row to the table width and extend the column grid to match
    pub fn normalize(&mut self) {
        let width = self
            .rows
            .iter()
            .map(Row::span_width)
            .max()
            .unwrap_or(0)
            .max(self.grid.len());

        for row in &mut self.rows {
            let missing = width - row.span_width();
            row.cells.extend((0..missing).map(|_| RawCell::empty()));
        }
        self.grid.resize_with(width, GridColumn::default);
        self.invalidate();
    }

    /// Dense grid index, rebuilt on first use after a structural change
    pub fn index(&self) -> &GridIndex {
        self.index
            .get_or_init(|| GridIndex::build(&self.rows, self.grid.len()))
    }

    /// Drop the grid index; must follow any change to rows, spans or merge markers
    pub fn invalidate(&mut self) {
        self.index = OnceCell::new();
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.index().cols()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn raw_cell(&self, pos: RawPos) -> Option<&RawCell> {
        self.rows.get(pos.row)?.cells.get(pos.cell)
    }

    fn raw_cell_mut(&mut self, pos: RawPos) -> Option<&mut RawCell> {
        self.rows.get_mut(pos.row)?.cells.get_mut(pos.cell)
    }

    /// Raw cell holding the content shown at (row, col); covered cells resolve to their anchor
    pub fn anchor_cell(&self, row: usize, col: usize) -> Option<&RawCell> {
        let index = self.index();
        let anchor = index.anchor_of(row, col)?;
        self.raw_cell(index.anchor_raw(anchor)?)
    }

    /// Text shown at (row, col)
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        self.anchor_cell(row, col)
            .map(RawCell::text_content)
            .unwrap_or_default()
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), TableError> {
        let (rows, cols) = (self.row_count(), self.column_count());
        if CellCoord::new(row, col).is_valid(rows, cols) {
            Ok(())
        } else {
            Err(TableError::InvalidCellPosition(format!(
                "Cell ({}, {}) out of range. Table has {} rows and {} columns.",
                row, col, rows, cols
            )))
        }
    }

    fn slot(&self, row: usize, col: usize) -> Result<Slot, TableError> {
        self.check_bounds(row, col)?;
        self.index().slot(row, col).copied().ok_or_else(|| {
            TableError::TableOperation(format!("No raw cell occupies grid position ({}, {})", row, col))
        })
    }

    /// Slot of (row, col), rejecting non-anchor members of a merge
    fn writable_slot(&self, row: usize, col: usize) -> Result<Slot, TableError> {
        let slot = self.slot(row, col)?;
        if slot.anchor != CellCoord::new(row, col) {
            return Err(TableError::InvalidCellPosition(format!(
                "Cell ({}, {}) is covered by the merged cell anchored at {}; modify the anchor instead",
                row, col, slot.anchor
            )));
        }
        Ok(slot)
    }

    /// Populate row 0 with header text, bold runs, and flag it as the header row
    pub fn set_header_row(&mut self, headers: &[String]) {
        let targets: Vec<(RawPos, &String)> = headers
            .iter()
            .enumerate()
            .filter_map(|(col, text)| {
                let slot = self.index().slot(0, col)?;
                (slot.anchor == CellCoord::new(0, col)).then_some((slot.raw, text))
            })
            .collect();

        let bold = TextStyle::new().with_bold(true);
        for (pos, text) in targets {
            if let Some(cell) = self.raw_cell_mut(pos) {
                cell.set_text(&sanitize_text(text), false);
                for run in cell.runs_mut() {
                    run.props.merge(&bold);
                }
            }
        }
        if let Some(first) = self.rows.first_mut() {
            first.is_header = true;
        }
    }

    /// Read the cell at (row, col). Covered cells report their anchor's content.
    pub fn get_cell(&self, row: usize, col: usize, doc_defaults: &TextStyle) -> Result<CellView, TableError> {
        let slot = self.slot(row, col)?;
        let index = self.index();
        let anchor = index
            .anchor_raw(slot.anchor)
            .and_then(|pos| self.raw_cell(pos))
            .ok_or_else(|| {
                TableError::TableOperation(format!("Merge anchor {} has no raw cell", slot.anchor))
            })?;

        Ok(CellView {
            row,
            col,
            text: anchor.text_content(),
            style: style::effective_style(anchor, &self.default_text, doc_defaults),
            is_header: row == 0 && StructureAnalyzer::has_header_row(self, doc_defaults),
            is_covered: index.is_covered(row, col),
            anchor: slot.anchor,
            merge: index.merge_at(row, col).filter(|m| !m.is_single()),
        })
    }

    /// Replace the text of an anchor cell, optionally applying a style delta
    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        text: &str,
        delta: Option<&StyleDelta>,
        preserve_existing_format: bool,
    ) -> Result<(), TableError> {
        if let Some(delta) = delta {
            delta.validate()?;
        }
        let slot = self.writable_slot(row, col)?;
        let cell = self.raw_cell_mut(slot.raw).ok_or_else(|| {
            TableError::TableOperation(format!("Grid position ({}, {}) has no raw cell", row, col))
        })?;

        cell.set_text(&sanitize_text(text), preserve_existing_format);
        if let Some(delta) = delta {
            style::apply_style(cell, delta, preserve_existing_format);
        }
        Ok(())
    }

    /// Apply a style delta to an anchor cell
    pub fn format_cell(
        &mut self,
        row: usize,
        col: usize,
        delta: &StyleDelta,
        preserve_existing: bool,
    ) -> Result<(), TableError> {
        delta.validate()?;
        let slot = self.writable_slot(row, col)?;
        let cell = self.raw_cell_mut(slot.raw).ok_or_else(|| {
            TableError::TableOperation(format!("Grid position ({}, {}) has no raw cell", row, col))
        })?;
        style::apply_style(cell, delta, preserve_existing);
        Ok(())
    }

    fn check_count(count: usize) -> Result<(), TableError> {
        if count == 0 {
            return Err(TableError::InvalidDimensions(
                "Count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Row inserted at boundary `at`: empty cells, except that vertical merges
    /// passing through the boundary are continued
    fn row_template(&self, at: usize) -> Row {
        let width = self.column_count();
        let Some(below) = self.rows.get(at).filter(|_| at > 0) else {
            return Row::empty(width);
        };

        let index = self.index();
        let mut cells = Vec::with_capacity(below.cells.len());
        let mut col = 0;
        for cell in &below.cells {
            let continues = cell.v_merge == Some(VMerge::Continue)
                && index.anchor_of(at, col).map_or(false, |a| a.row < at);
            if continues {
                cells.push(RawCell::spanning(cell.grid_span, Some(VMerge::Continue)));
            } else {
                cells.extend((0..cell.span()).map(|_| RawCell::empty()));
            }
            col += cell.span();
        }
        Row::new(cells)
    }

    /// Insert `count` rows and return the index of the first new row
    pub fn add_rows(&mut self, count: usize, position: InsertPosition) -> Result<usize, TableError> {
        Self::check_count(count)?;
        let at = position.boundary(self.row_count(), "Row")?;
        let template = self.row_template(at);

        self.rows
            .splice(at..at, std::iter::repeat(template).take(count));
        self.invalidate();
        Ok(at)
    }

    /// Insert `count` columns in every row and return the index of the first new column.
    /// A cell spanning the insertion point grows instead of being split.
    pub fn add_columns(&mut self, count: usize, position: InsertPosition) -> Result<usize, TableError> {
        Self::check_count(count)?;
        let width = self.column_count();
        let at = position.boundary(width, "Column")?;

        let mut rows = self.rows.clone();
        for row in &mut rows {
            let mut col = 0;
            let mut insert_at = row.cells.len();
            let mut grown = false;
            for (i, cell) in row.cells.iter_mut().enumerate() {
                let span = cell.span();
                if col == at {
                    insert_at = i;
                    break;
                }
                if col < at && at < col + span {
                    cell.grid_span += count as u32;
                    grown = true;
                    break;
                }
                col += span;
            }
            if !grown {
                row.cells
                    .splice(insert_at..insert_at, (0..count).map(|_| RawCell::empty()));
            }
        }

        let expected = width + count;
        if let Some((r, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.span_width() != expected)
        {
            return Err(TableError::TableOperation(format!(
                "Row {} spans {} columns after insertion, expected {}",
                r,
                row.span_width(),
                expected
            )));
        }

        self.rows = rows;
        self.grid
            .splice(at..at, (0..count).map(|_| GridColumn::default()));
        self.invalidate();
        Ok(at)
    }

    /// Delete the given rows in one pass and return the deleted indices in ascending order.
    ///
    /// A vertical merge that loses its anchor row moves the anchor's content to
    /// its first surviving row; a merge left with one row becomes a plain cell.
    pub fn delete_rows(&mut self, row_indices: &[usize]) -> Result<Vec<usize>, TableError> {
        if row_indices.is_empty() {
            return Err(TableError::DataFormat(
                "row_indices cannot be empty".to_string(),
            ));
        }

        let len = self.row_count();
        let mut targets = row_indices.to_vec();
        targets.sort_unstable();
        targets.dedup();
        if let Some(&bad) = targets.iter().find(|&&r| r >= len) {
            return Err(TableError::InvalidCellPosition(format!(
                "Row index {} out of range. Table has {} rows.",
                bad, len
            )));
        }
        if targets.len() == len {
            return Err(TableError::TableOperation(
                "Cannot delete every row of a table; delete the table instead".to_string(),
            ));
        }

        let mut removed: BitVec = BitVec::repeat(false, len);
        for &r in &targets {
            removed.set(r, true);
        }

        let index = self.index().clone();
        for range in index.merge_ranges().into_iter().filter(|m| m.row_span() > 1) {
            let survivors: Vec<usize> = (range.row_start..=range.row_end)
                .filter(|&r| !removed[r])
                .collect();
            let Some(&first) = survivors.first() else {
                continue;
            };
            let raw_at = |r: usize| index.slot(r, range.col_start).map(|s| s.raw);

            if first != range.row_start {
                let content = raw_at(range.row_start)
                    .and_then(|pos| self.raw_cell_mut(pos))
                    .map(RawCell::take_content);
                if let (Some(content), Some(target)) =
                    (content, raw_at(first).and_then(|pos| self.raw_cell_mut(pos)))
                {
                    target.put_content(content);
                }
            }

            let single = survivors.len() == 1;
            for (i, &r) in survivors.iter().enumerate() {
                if let Some(cell) = raw_at(r).and_then(|pos| self.raw_cell_mut(pos)) {
                    cell.v_merge = match (single, i) {
                        (true, _) => None,
                        (false, 0) => Some(VMerge::Restart),
                        (false, _) => Some(VMerge::Continue),
                    };
                }
            }
        }

        let mut r = 0;
        self.rows.retain(|_| {
            let keep = !removed[r];
            r += 1;
            keep
        });
        self.invalidate();
        Ok(targets)
    }
}

// Rebuild derived state after deserialization
impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TableHelper {
            #[serde(default)]
            style_name: Option<String>,
            #[serde(default)]
            default_text: TextStyle,
            #[serde(default)]
            grid: Vec<GridColumn>,
            #[serde(default)]
            rows: Vec<Row>,
        }

        let helper = TableHelper::deserialize(deserializer)?;
        let mut table = Table {
            style_name: helper.style_name,
            default_text: helper.default_text,
            grid: helper.grid,
            rows: helper.rows,
            index: OnceCell::new(),
        };
        table.normalize();
        Ok(table)
    }
}
