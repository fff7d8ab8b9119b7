use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TableError;

/// Largest font size the document format can store, in points
pub const MAX_FONT_SIZE: f32 = 1638.0;

/// RGB color, written as six hex digits (e.g. `1F4E79`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Convert to the upper-case hex form used in documents
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse a 6-digit hex color, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Result<Self, TableError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TableError::DataFormat(format!(
                "Invalid color '{}': expected 6 hex digits",
                hex
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| TableError::DataFormat(format!("Invalid color '{}': {}", hex, e)))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    // Common colors
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = TableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl FromStr for HorizontalAlign {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(HorizontalAlign::Left),
            "center" => Ok(HorizontalAlign::Center),
            "right" => Ok(HorizontalAlign::Right),
            "justify" => Ok(HorizontalAlign::Justify),
            other => Err(TableError::DataFormat(format!(
                "Invalid horizontal alignment '{}'. Valid options: left, center, right, justify",
                other
            ))),
        }
    }
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl FromStr for VerticalAlign {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(VerticalAlign::Top),
            "middle" | "center" => Ok(VerticalAlign::Middle),
            "bottom" => Ok(VerticalAlign::Bottom),
            other => Err(TableError::DataFormat(format!(
                "Invalid vertical alignment '{}'. Valid options: top, middle, bottom",
                other
            ))),
        }
    }
}

/// Line style of a cell border
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    None,
    #[default]
    Solid,
    Dashed,
    Dotted,
    Double,
}

/// Border thickness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderWidth {
    #[default]
    Thin,
    Medium,
    Thick,
}

impl BorderWidth {
    /// Width in eighths of a point, as stored in the document
    pub fn eighth_points(&self) -> u8 {
        match self {
            BorderWidth::Thin => 4,
            BorderWidth::Medium => 8,
            BorderWidth::Thick => 12,
        }
    }
}

/// One side of a cell border
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Border {
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default)]
    pub width: BorderWidth,
    #[serde(default)]
    pub color: Color,
}

impl Border {
    pub fn new(style: BorderStyle, width: BorderWidth, color: Color) -> Self {
        Border {
            style,
            width,
            color,
        }
    }
}

/// Cell border sides
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Borders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Border>,
}

impl Borders {
    /// The same border on all four sides
    pub fn all(border: Border) -> Self {
        Borders {
            top: Some(border),
            bottom: Some(border),
            left: Some(border),
            right: Some(border),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }

    /// Merge another border set into this one (other's sides override)
    pub fn merge(&mut self, other: &Borders) {
        if other.top.is_some() {
            self.top = other.top;
        }
        if other.bottom.is_some() {
            self.bottom = other.bottom;
        }
        if other.left.is_some() {
            self.left = other.left;
        }
        if other.right.is_some() {
            self.right = other.right;
        }
    }
}

/// Run-level text properties. `None` means inherited from the table or document defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscript: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superscript: Option<bool>,
}

impl TextStyle {
    /// Create a new style with every property unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set font family
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    /// Builder pattern: set font size in points
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Builder pattern: set font color
    pub fn with_font_color(mut self, color: Color) -> Self {
        self.font_color = Some(color);
        self
    }

    /// Builder pattern: set bold
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Builder pattern: set italic
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Builder pattern: set underline
    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = Some(underline);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TextStyle::default()
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    /// Reject values the document format cannot represent
    pub fn validate(&self) -> Result<(), TableError> {
        if let Some(size) = self.font_size {
            if !size.is_finite() || !(1.0..=MAX_FONT_SIZE).contains(&size) {
                return Err(TableError::DataFormat(format!(
                    "Font size {} out of range (1-{} points)",
                    size, MAX_FONT_SIZE
                )));
            }
        }
        if let Some(family) = &self.font_family {
            if family.trim().is_empty() {
                return Err(TableError::DataFormat(
                    "Font family cannot be empty".to_string(),
                ));
            }
        }
        if self.subscript == Some(true) && self.superscript == Some(true) {
            return Err(TableError::DataFormat(
                "Text cannot be both subscript and superscript".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge another style into this one (other's set values override)
    pub fn merge(&mut self, other: &TextStyle) {
        if other.font_family.is_some() {
            self.font_family = other.font_family.clone();
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.font_color.is_some() {
            self.font_color = other.font_color;
        }
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.strikethrough.is_some() {
            self.strikethrough = other.strikethrough;
        }
        // Vertical position is a single property in the document: raising one lowers the other
        if other.subscript.is_some() {
            self.subscript = other.subscript;
            if other.subscript == Some(true) {
                self.superscript = Some(false);
            }
        }
        if other.superscript.is_some() {
            self.superscript = other.superscript;
            if other.superscript == Some(true) {
                self.subscript = Some(false);
            }
        }
    }

    /// Fill unset properties from `fallback`
    pub fn inherit(&self, fallback: &TextStyle) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone().or_else(|| fallback.font_family.clone()),
            font_size: self.font_size.or(fallback.font_size),
            font_color: self.font_color.or(fallback.font_color),
            bold: self.bold.or(fallback.bold),
            italic: self.italic.or(fallback.italic),
            underline: self.underline.or(fallback.underline),
            strikethrough: self.strikethrough.or(fallback.strikethrough),
            subscript: self.subscript.or(fallback.subscript),
            superscript: self.superscript.or(fallback.superscript),
        }
    }
}

/// Horizontal and vertical alignment axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalAlign>,
}

/// Complete style of one cell: text, alignment, background and borders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(flatten)]
    pub text: TextStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_alignment: Option<HorizontalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_alignment: Option<VerticalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Borders::is_empty")]
    pub borders: Borders,
}

/// How a style axis present in a [`StyleDelta`] is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Only the provided properties change; the rest keep their value
    Merge,
    /// Provided properties are set; omitted ones reset to the default
    Replace,
}

impl ApplyMode {
    pub fn from_preserve(preserve_existing: bool) -> Self {
        if preserve_existing {
            ApplyMode::Merge
        } else {
            ApplyMode::Replace
        }
    }
}

/// Per-axis overrides of the caller's `preserve_existing` choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisModes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<ApplyMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<ApplyMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<ApplyMode>,
}

/// A requested style change. Each axis left as `None` is not touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<Borders>,
    #[serde(default)]
    pub modes: AxisModes,
}

impl StyleDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set the text axis
    pub fn with_text(mut self, text: TextStyle) -> Self {
        self.text = Some(text);
        self
    }

    /// Builder pattern: set horizontal alignment
    pub fn with_horizontal_align(mut self, align: HorizontalAlign) -> Self {
        self.alignment.get_or_insert_with(Alignment::default).horizontal = Some(align);
        self
    }

    /// Builder pattern: set vertical alignment
    pub fn with_vertical_align(mut self, align: VerticalAlign) -> Self {
        self.alignment.get_or_insert_with(Alignment::default).vertical = Some(align);
        self
    }

    /// Builder pattern: set background color
    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    /// Builder pattern: set the border axis
    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = Some(borders);
        self
    }

    /// Builder pattern: pin the apply mode of the text axis
    pub fn with_text_mode(mut self, mode: ApplyMode) -> Self {
        self.modes.text = Some(mode);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.alignment.is_none()
            && self.background_color.is_none()
            && self.borders.is_none()
    }

    /// Parse a delta from caller-supplied JSON; malformed values are data format errors
    pub fn from_value(value: serde_json::Value) -> Result<Self, TableError> {
        let delta: StyleDelta = serde_json::from_value(value)
            .map_err(|e| TableError::DataFormat(format!("Invalid style: {}", e)))?;
        delta.validate()?;
        Ok(delta)
    }

    pub fn validate(&self) -> Result<(), TableError> {
        match &self.text {
            Some(text) => text.validate(),
            None => Ok(()),
        }
    }

    pub fn text_mode(&self, preserve_existing: bool) -> ApplyMode {
        self.modes
            .text
            .unwrap_or_else(|| ApplyMode::from_preserve(preserve_existing))
    }

    pub fn alignment_mode(&self, preserve_existing: bool) -> ApplyMode {
        self.modes
            .alignment
            .unwrap_or_else(|| ApplyMode::from_preserve(preserve_existing))
    }

    pub fn borders_mode(&self, preserve_existing: bool) -> ApplyMode {
        self.modes
            .borders
            .unwrap_or_else(|| ApplyMode::from_preserve(preserve_existing))
    }
}
