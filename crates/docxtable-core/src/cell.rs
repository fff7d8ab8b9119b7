use serde::{Deserialize, Serialize};

use crate::document::{Paragraph, Run};
use crate::format::{Borders, CellStyle, Color, TextStyle, VerticalAlign};
use crate::range::{CellCoord, MergeRange};

/// Vertical merge marker stored on a raw cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VMerge {
    /// First row of a vertically merged region
    Restart,
    /// Continues the region started in a row above
    Continue,
}

fn one() -> u32 {
    1
}

fn is_one(n: &u32) -> bool {
    *n == 1
}

/// A cell as stored in a table row: content plus its horizontal/vertical span record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    /// Number of grid columns this cell occupies
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub grid_span: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_merge: Option<VMerge>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    /// Background fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shading: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_align: Option<VerticalAlign>,
    #[serde(default, skip_serializing_if = "Borders::is_empty")]
    pub borders: Borders,
}

impl Default for RawCell {
    fn default() -> Self {
        RawCell::empty()
    }
}

impl RawCell {
    /// An empty single-column cell (one empty paragraph, as the format requires)
    pub fn empty() -> Self {
        RawCell {
            grid_span: 1,
            v_merge: None,
            paragraphs: vec![Paragraph::new()],
            shading: None,
            v_align: None,
            borders: Borders::default(),
        }
    }

    /// A single-column cell with plain text
    pub fn text(text: impl Into<String>) -> Self {
        RawCell {
            paragraphs: vec![Paragraph::with_text(text)],
            ..RawCell::empty()
        }
    }

    /// An empty cell with the given span record
    pub fn spanning(grid_span: u32, v_merge: Option<VMerge>) -> Self {
        RawCell {
            grid_span: grid_span.max(1),
            v_merge,
            ..RawCell::empty()
        }
    }

    /// Builder pattern: set the vertical merge marker
    pub fn with_v_merge(mut self, v_merge: VMerge) -> Self {
        self.v_merge = Some(v_merge);
        self
    }

    /// Builder pattern: set the column span
    pub fn with_span(mut self, grid_span: u32) -> Self {
        self.grid_span = grid_span.max(1);
        self
    }

    /// Column span, never less than one
    pub fn span(&self) -> usize {
        self.grid_span.max(1) as usize
    }

    /// Cell text, paragraphs joined by newlines
    pub fn text_content(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.paragraphs.iter().flat_map(|p| p.runs.iter())
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }

    /// Run carrying the most text; the first run wins ties
    pub fn dominant_run(&self) -> Option<&Run> {
        let mut best: Option<&Run> = None;
        for run in self.runs() {
            let len = run.text.chars().count();
            if best.map_or(true, |b| len > b.text.chars().count()) {
                best = Some(run);
            }
        }
        best
    }

    /// Make sure every paragraph has a run to carry text properties
    pub fn ensure_runs(&mut self) {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(Paragraph::new());
        }
        for paragraph in &mut self.paragraphs {
            if paragraph.runs.is_empty() {
                paragraph.runs.push(Run::default());
            }
        }
    }

    /// Replace the cell text. The first paragraph's alignment always carries
    /// over; with `preserve_format` the dominant run's properties do too.
    pub fn set_text(&mut self, text: &str, preserve_format: bool) {
        let alignment = self.paragraphs.first().and_then(|p| p.alignment);
        let props = if preserve_format {
            self.dominant_run().map(|r| r.props.clone()).unwrap_or_default()
        } else {
            TextStyle::default()
        };

        self.paragraphs = text
            .split('\n')
            .map(|line| Paragraph {
                runs: vec![Run::new(line, props.clone())],
                alignment,
            })
            .collect();
    }

    /// Move content and cell properties out, leaving an empty cell with the same span record
    pub fn take_content(&mut self) -> RawCell {
        let replacement = RawCell::spanning(self.grid_span, self.v_merge);
        std::mem::replace(self, replacement)
    }

    /// Install content and cell properties taken from another cell, keeping this cell's span record
    pub fn put_content(&mut self, content: RawCell) {
        let (grid_span, v_merge) = (self.grid_span, self.v_merge);
        *self = RawCell {
            grid_span,
            v_merge,
            ..content
        };
    }
}

/// Strip control characters other than newline and tab
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect()
}

/// What a caller sees when reading one grid cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub style: CellStyle,
    pub is_header: bool,
    /// True when (row, col) is a non-anchor member of a merge
    pub is_covered: bool,
    pub anchor: CellCoord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("a\u{0}b\u{7}c"), "abc");
        assert_eq!(sanitize_text("line1\nline2\tx"), "line1\nline2\tx");
    }

    #[test]
    fn test_set_text_preserves_dominant_format() {
        let mut cell = RawCell::empty();
        cell.paragraphs = vec![Paragraph {
            runs: vec![
                Run::new("a", TextStyle::new().with_italic(true)),
                Run::new("longer", TextStyle::new().with_bold(true)),
            ],
            alignment: Some(crate::format::HorizontalAlign::Right),
        }];

        cell.set_text("new", true);
        assert_eq!(cell.text_content(), "new");
        assert_eq!(cell.dominant_run().unwrap().props.bold, Some(true));
        assert_eq!(cell.dominant_run().unwrap().props.italic, None);
        assert_eq!(
            cell.paragraphs[0].alignment,
            Some(crate::format::HorizontalAlign::Right)
        );

        cell.set_text("plain", false);
        assert!(cell.dominant_run().unwrap().props.is_empty());
        assert_eq!(
            cell.paragraphs[0].alignment,
            Some(crate::format::HorizontalAlign::Right)
        );
    }

    #[test]
    fn test_multiline_text_becomes_paragraphs() {
        let mut cell = RawCell::empty();
        cell.set_text("one\ntwo", false);
        assert_eq!(cell.paragraphs.len(), 2);
        assert_eq!(cell.text_content(), "one\ntwo");
    }

    #[test]
    fn test_take_and_put_content_keep_span_records() {
        let mut anchor = RawCell::text("keep me").with_span(2).with_v_merge(VMerge::Restart);
        anchor.shading = Some(Color::WHITE);
        let mut next = RawCell::spanning(2, Some(VMerge::Continue));

        let content = anchor.take_content();
        next.put_content(content);

        assert_eq!(anchor.text_content(), "");
        assert_eq!(anchor.grid_span, 2);
        assert_eq!(next.text_content(), "keep me");
        assert_eq!(next.v_merge, Some(VMerge::Continue));
        assert_eq!(next.shading, Some(Color::WHITE));
    }
}
