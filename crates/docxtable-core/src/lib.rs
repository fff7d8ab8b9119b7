pub mod analysis;
pub mod cell;
pub mod data;
pub mod document;
pub mod error;
pub mod format;
pub mod grid;
pub mod range;
pub mod search;
pub mod style;
pub mod table;

pub use analysis::{CellReport, MergeReport, StructureAnalyzer, StructureReport, StyleConsistency, StyleSummary};
pub use cell::{sanitize_text, CellView, RawCell, VMerge};
pub use data::{DataFormat, TableData, TableValues};
pub use document::{BodyElement, Document, Paragraph, Run, TablePosition};
pub use error::TableError;
pub use format::{
    Alignment, ApplyMode, AxisModes, Border, BorderStyle, BorderWidth, Borders, CellStyle, Color,
    HorizontalAlign, StyleDelta, TextStyle, VerticalAlign, MAX_FONT_SIZE,
};
pub use grid::{GridIndex, RawPos, Slot};
pub use range::{CellCoord, MergeKind, MergeRange};
pub use search::{MatchMode, SearchEngine, SearchMatch, SearchOptions};
pub use table::{GridColumn, InsertPosition, Row, Table};
