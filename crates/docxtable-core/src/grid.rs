//! Dense row x column view over a table whose merges are stored as spans.
//!
//! Each raw row lists its cells left to right; a cell covers `grid_span`
//! grid columns, and a `Continue` vertical-merge marker attaches it to the
//! cell starting at the same grid column in the row above. [`GridIndex`]
//! flattens that into one slot per grid coordinate pointing at the merge
//! anchor and the raw cell that physically occupies the slot.

use bitvec::vec::BitVec;
use std::collections::BTreeMap;

use crate::cell::VMerge;
use crate::range::{CellCoord, MergeRange};
use crate::table::Row;

/// Location of a raw cell: row index and position within that row's cell list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPos {
    pub row: usize,
    pub cell: usize,
}

/// One grid coordinate's entry in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Top-left cell of the merge this coordinate belongs to
    pub anchor: CellCoord,
    /// Raw cell occupying this coordinate
    pub raw: RawPos,
}

#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    rows: usize,
    cols: usize,
    slots: Vec<Option<Slot>>,
    covered: BitVec,
}

impl GridIndex {
    /// Build the index from raw rows. The grid is at least `min_cols` wide.
    pub fn build(rows: &[Row], min_cols: usize) -> Self {
        let cols = rows
            .iter()
            .map(Row::span_width)
            .max()
            .unwrap_or(0)
            .max(min_cols);
        let size = rows.len() * cols;
        let mut index = GridIndex {
            rows: rows.len(),
            cols,
            slots: vec![None; size],
            covered: BitVec::repeat(false, size),
        };

        for (r, row) in rows.iter().enumerate() {
            let mut col = 0;
            for (i, cell) in row.cells.iter().enumerate() {
                let span = cell.span();
                let own = CellCoord::new(r, col);
                let anchor = match cell.v_merge {
                    Some(VMerge::Continue) if r > 0 => {
                        index.continued_anchor(rows, r, col, span).unwrap_or(own)
                    }
                    _ => own,
                };

                for c in col..(col + span).min(cols) {
                    let at = r * cols + c;
                    index.slots[at] = Some(Slot {
                        anchor,
                        raw: RawPos { row: r, cell: i },
                    });
                    index.covered.set(at, anchor != CellCoord::new(r, c));
                }
                col += span;
            }
        }

        index
    }

    /// Anchor of the region a `Continue` cell at (row, col) extends, if the row above
    /// has a merge-marked cell starting at the same column with the same width
    fn continued_anchor(&self, rows: &[Row], row: usize, col: usize, span: usize) -> Option<CellCoord> {
        let above = self.slot(row - 1, col)?;
        if above.anchor.col != col {
            return None;
        }
        let above_cell = rows.get(above.raw.row)?.cells.get(above.raw.cell)?;
        if above_cell.v_merge.is_none() || above_cell.span() != span {
            return None;
        }
        Some(above.anchor)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn slot(&self, row: usize, col: usize) -> Option<&Slot> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slots[row * self.cols + col].as_ref()
    }

    pub fn is_covered(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.covered[row * self.cols + col]
    }

    pub fn anchor_of(&self, row: usize, col: usize) -> Option<CellCoord> {
        self.slot(row, col).map(|s| s.anchor)
    }

    /// Raw cell holding the content of the merge anchored at `anchor`
    pub fn anchor_raw(&self, anchor: CellCoord) -> Option<RawPos> {
        self.slot(anchor.row, anchor.col).map(|s| s.raw)
    }

    /// Anchor coordinates in row-major order, each once
    pub fn anchors(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| CellCoord::new(r, c)))
            .filter(move |coord| {
                self.slot(coord.row, coord.col)
                    .map_or(false, |s| s.anchor == *coord)
            })
    }

    /// Every multi-cell merge region, ordered by anchor
    pub fn merge_ranges(&self) -> Vec<MergeRange> {
        let mut extents: BTreeMap<CellCoord, (usize, usize)> = BTreeMap::new();
        for r in 0..self.rows {
            for c in 0..self.cols {
                if let Some(slot) = self.slot(r, c) {
                    let extent = extents.entry(slot.anchor).or_insert((r, c));
                    extent.0 = extent.0.max(r);
                    extent.1 = extent.1.max(c);
                }
            }
        }

        extents
            .into_iter()
            .map(|(anchor, (row_end, col_end))| {
                MergeRange::new(anchor.row, row_end, anchor.col, col_end)
            })
            .filter(|range| !range.is_single())
            .collect()
    }

    /// Region containing (row, col); a 1x1 range for unmerged cells
    pub fn merge_at(&self, row: usize, col: usize) -> Option<MergeRange> {
        let anchor = self.anchor_of(row, col)?;
        let mut row_end = anchor.row;
        while self.anchor_of(row_end + 1, anchor.col) == Some(anchor) {
            row_end += 1;
        }
        let mut col_end = anchor.col;
        while self.anchor_of(anchor.row, col_end + 1) == Some(anchor) {
            col_end += 1;
        }
        Some(MergeRange::new(anchor.row, row_end, anchor.col, col_end))
    }
}
