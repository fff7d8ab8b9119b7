use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical grid coordinate inside a table (0-indexed)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        CellCoord { row, col }
    }

    /// Check if this coord is within bounds
    pub fn is_valid(&self, max_rows: usize, max_cols: usize) -> bool {
        self.row < max_rows && self.col < max_cols
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Direction(s) in which a merged region extends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    None,
    Horizontal,
    Vertical,
    Both,
}

/// Inclusive rectangular region of grid cells sharing one anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRange {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl MergeRange {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        // Normalize so start is top-left and end is bottom-right
        MergeRange {
            row_start: row_start.min(row_end),
            row_end: row_start.max(row_end),
            col_start: col_start.min(col_end),
            col_end: col_start.max(col_end),
        }
    }

    /// A 1x1 range covering a single cell
    pub fn single(coord: CellCoord) -> Self {
        MergeRange::new(coord.row, coord.row, coord.col, coord.col)
    }

    /// Top-left cell of the region
    pub fn anchor(&self) -> CellCoord {
        CellCoord::new(self.row_start, self.col_start)
    }

    pub fn row_span(&self) -> usize {
        self.row_end - self.row_start + 1
    }

    pub fn col_span(&self) -> usize {
        self.col_end - self.col_start + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_span() * self.col_span()
    }

    pub fn is_single(&self) -> bool {
        self.row_span() == 1 && self.col_span() == 1
    }

    pub fn kind(&self) -> MergeKind {
        match (self.row_span() > 1, self.col_span() > 1) {
            (false, false) => MergeKind::None,
            (false, true) => MergeKind::Horizontal,
            (true, false) => MergeKind::Vertical,
            (true, true) => MergeKind::Both,
        }
    }

    /// Check if a coordinate is within this range
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= self.row_start
            && coord.row <= self.row_end
            && coord.col >= self.col_start
            && coord.col <= self.col_end
    }

    /// Check if two ranges share at least one cell
    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..={}, cols {}..={}",
            self.row_start, self.row_end, self.col_start, self.col_end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_range_normalizes() {
        let range = MergeRange::new(3, 1, 4, 2);
        assert_eq!(range.anchor(), CellCoord::new(1, 2));
        assert_eq!(range.row_span(), 3);
        assert_eq!(range.col_span(), 3);
        assert_eq!(range.cell_count(), 9);
    }

    #[test]
    fn test_merge_kind() {
        assert_eq!(MergeRange::single(CellCoord::new(0, 0)).kind(), MergeKind::None);
        assert_eq!(MergeRange::new(0, 0, 0, 2).kind(), MergeKind::Horizontal);
        assert_eq!(MergeRange::new(0, 1, 0, 0).kind(), MergeKind::Vertical);
        assert_eq!(MergeRange::new(0, 1, 0, 1).kind(), MergeKind::Both);
    }

    #[test]
    fn test_contains_and_overlaps() {
        let a = MergeRange::new(0, 1, 0, 1);
        let b = MergeRange::new(1, 2, 1, 3);
        let c = MergeRange::new(2, 2, 0, 0);

        assert!(a.contains(CellCoord::new(1, 1)));
        assert!(!a.contains(CellCoord::new(2, 0)));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&b));
    }
}
