//! Reading and applying cell styles.
//!
//! A cell's style lives in three places of the raw model: run properties
//! (text axis), paragraph alignment plus the cell's vertical alignment
//! (alignment axis), and cell shading and borders. These functions move
//! between that layout and the flat [`CellStyle`] value.

use crate::cell::RawCell;
use crate::format::{ApplyMode, CellStyle, StyleDelta, TextStyle};

/// Style stored on the cell itself, without inherited defaults
pub fn own_style(cell: &RawCell) -> CellStyle {
    CellStyle {
        text: cell
            .dominant_run()
            .map(|run| run.props.clone())
            .unwrap_or_default(),
        horizontal_alignment: cell.paragraphs.iter().find_map(|p| p.alignment),
        vertical_alignment: cell.v_align,
        background_color: cell.shading,
        borders: cell.borders.clone(),
    }
}

/// Style as displayed: unset run properties fall back to the table default,
/// then the document default
pub fn effective_style(cell: &RawCell, table_default: &TextStyle, doc_default: &TextStyle) -> CellStyle {
    let mut style = own_style(cell);
    style.text = style.text.inherit(table_default).inherit(doc_default);
    style
}

/// Apply a validated style delta. Axes absent from the delta are not touched.
pub fn apply_style(cell: &mut RawCell, delta: &StyleDelta, preserve_existing: bool) {
    if let Some(text) = &delta.text {
        cell.ensure_runs();
        let mode = delta.text_mode(preserve_existing);
        for run in cell.runs_mut() {
            match mode {
                ApplyMode::Merge => run.props.merge(text),
                ApplyMode::Replace => run.props = text.clone(),
            }
        }
    }

    if let Some(alignment) = &delta.alignment {
        cell.ensure_runs();
        match delta.alignment_mode(preserve_existing) {
            ApplyMode::Merge => {
                if let Some(horizontal) = alignment.horizontal {
                    for paragraph in &mut cell.paragraphs {
                        paragraph.alignment = Some(horizontal);
                    }
                }
                if alignment.vertical.is_some() {
                    cell.v_align = alignment.vertical;
                }
            }
            ApplyMode::Replace => {
                for paragraph in &mut cell.paragraphs {
                    paragraph.alignment = alignment.horizontal;
                }
                cell.v_align = alignment.vertical;
            }
        }
    }

    if let Some(color) = delta.background_color {
        cell.shading = Some(color);
    }

    if let Some(borders) = &delta.borders {
        match delta.borders_mode(preserve_existing) {
            ApplyMode::Merge => cell.borders.merge(borders),
            ApplyMode::Replace => cell.borders = borders.clone(),
        }
    }
}
