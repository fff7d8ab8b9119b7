use thiserror::Error;

/// Failures raised by table, style and search operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The table index does not exist in the document
    #[error("Table index {index} out of range. Document has {count} tables.")]
    TableNotFound { index: usize, count: usize },

    /// Non-positive row, column or count values
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Row/column outside the grid, or a write aimed at a merge-covered cell
    #[error("Invalid cell position: {0}")]
    InvalidCellPosition(String),

    /// Malformed color, style value, regex, header list or export format
    #[error("Invalid data format: {0}")]
    DataFormat(String),

    /// Structural invariant violation while mutating a table
    #[error("Table operation failed: {0}")]
    TableOperation(String),
}

impl TableError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            TableError::TableNotFound { .. } => "NOT_FOUND",
            TableError::InvalidDimensions(_) => "INVALID_DIMENSIONS",
            TableError::InvalidCellPosition(_) => "INVALID_CELL_POSITION",
            TableError::DataFormat(_) => "DATA_FORMAT_ERROR",
            TableError::TableOperation(_) => "TABLE_OPERATION_ERROR",
        }
    }
}
