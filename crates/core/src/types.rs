//! Domain types: style configuration, check issues and input formats.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Paragraph alignment for body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Parse an alignment name, case-insensitively. Unknown names become `Left`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "center" | "centre" => Self::Center,
            "right" => Self::Right,
            "justify" | "justified" | "both" => Self::Justify,
            _ => Self::Left,
        }
    }

    /// Display name, as stored in presets.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
            Self::Justify => "Justify",
        }
    }
}

impl From<String> for Alignment {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<Alignment> for String {
    fn from(value: Alignment) -> Self {
        value.name().to_string()
    }
}

/// Alignment for header and footer paragraphs. There is no justify option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeaderFooterAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl HeaderFooterAlignment {
    /// Parse an alignment name, case-insensitively. Anything else, including
    /// "Justify", becomes `Left`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "center" | "centre" => Self::Center,
            "right" => Self::Right,
            _ => Self::Left,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
        }
    }
}

impl From<String> for HeaderFooterAlignment {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<HeaderFooterAlignment> for String {
    fn from(value: HeaderFooterAlignment) -> Self {
        value.name().to_string()
    }
}

impl From<HeaderFooterAlignment> for Alignment {
    fn from(value: HeaderFooterAlignment) -> Self {
        match value {
            HeaderFooterAlignment::Left => Alignment::Left,
            HeaderFooterAlignment::Center => Alignment::Center,
            HeaderFooterAlignment::Right => Alignment::Right,
        }
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// The same margin on every side.
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            bottom: inches,
            left: inches,
            right: inches,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// Formatting parameters applied to a document.
///
/// Missing fields in a stored preset fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredStyle")]
pub struct StyleConfig {
    pub font_name: String,

    /// Body font size in points.
    pub font_size: f64,

    /// Line spacing as a multiple of single spacing.
    pub line_spacing: f64,

    pub alignment: Alignment,

    pub margins: Margins,

    pub header_text: String,

    pub footer_text: String,

    /// Header/footer font size in points.
    pub header_footer_size: f64,

    pub header_footer_alignment: HeaderFooterAlignment,

    /// Logo width in inches.
    pub logo_width: f64,

    /// Logo height in inches.
    pub logo_height: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_name: "Times New Roman".to_string(),
            font_size: 12.0,
            line_spacing: 1.15,
            alignment: Alignment::Left,
            margins: Margins::default(),
            header_text: String::new(),
            footer_text: String::new(),
            header_footer_size: 10.0,
            header_footer_alignment: HeaderFooterAlignment::Center,
            logo_width: 1.0,
            logo_height: 1.0,
        }
    }
}

/// Preset layout as read from disk.
///
/// Besides the field names written by `StyleConfig`, this accepts the
/// short `hf_size`/`hf_align` keys, `margins` as a `[top, bottom, left,
/// right]` list and flat `margin_*` keys, which override `margins`.
#[derive(Deserialize)]
#[serde(default)]
struct StoredStyle {
    font_name: String,
    font_size: f64,
    line_spacing: f64,
    alignment: Alignment,
    margins: Margins,
    margin_top: Option<f64>,
    margin_bottom: Option<f64>,
    margin_left: Option<f64>,
    margin_right: Option<f64>,
    header_text: String,
    footer_text: String,
    #[serde(alias = "hf_size")]
    header_footer_size: f64,
    #[serde(alias = "hf_align")]
    header_footer_alignment: HeaderFooterAlignment,
    logo_width: f64,
    logo_height: f64,
}

impl Default for StoredStyle {
    fn default() -> Self {
        let style = StyleConfig::default();
        Self {
            font_name: style.font_name,
            font_size: style.font_size,
            line_spacing: style.line_spacing,
            alignment: style.alignment,
            margins: style.margins,
            margin_top: None,
            margin_bottom: None,
            margin_left: None,
            margin_right: None,
            header_text: style.header_text,
            footer_text: style.footer_text,
            header_footer_size: style.header_footer_size,
            header_footer_alignment: style.header_footer_alignment,
            logo_width: style.logo_width,
            logo_height: style.logo_height,
        }
    }
}

impl From<StoredStyle> for StyleConfig {
    fn from(stored: StoredStyle) -> Self {
        let mut margins = stored.margins;
        margins.top = stored.margin_top.unwrap_or(margins.top);
        margins.bottom = stored.margin_bottom.unwrap_or(margins.bottom);
        margins.left = stored.margin_left.unwrap_or(margins.left);
        margins.right = stored.margin_right.unwrap_or(margins.right);

        Self {
            font_name: stored.font_name,
            font_size: stored.font_size,
            line_spacing: stored.line_spacing,
            alignment: stored.alignment,
            margins,
            header_text: stored.header_text,
            footer_text: stored.footer_text,
            header_footer_size: stored.header_footer_size,
            header_footer_alignment: stored.header_footer_alignment,
            logo_width: stored.logo_width,
            logo_height: stored.logo_height,
        }
    }
}

impl StyleConfig {
    /// Check that every dimensional field is positive and finite and that a
    /// font name is set.
    pub fn validate(&self) -> Result<()> {
        if self.font_name.trim().is_empty() {
            return Err(Error::ConfigError("font_name must not be empty".to_string()));
        }

        let dimensions = [
            ("font_size", self.font_size),
            ("line_spacing", self.line_spacing),
            ("margins.top", self.margins.top),
            ("margins.bottom", self.margins.bottom),
            ("margins.left", self.margins.left),
            ("margins.right", self.margins.right),
            ("header_footer_size", self.header_footer_size),
            ("logo_width", self.logo_width),
            ("logo_height", self.logo_height),
        ];

        for (field, value) in dimensions {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{} must be a positive number, got {}",
                    field, value
                )));
            }
        }

        Ok(())
    }
}

/// Where a figure caption goes relative to its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptionPosition {
    Above,
    #[default]
    Below,
}

impl CaptionPosition {
    /// Parse "Above"/"Below", case-insensitively. Unknown names become `Below`.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("above") {
            Self::Above
        } else {
            Self::Below
        }
    }
}

/// Kind of finding reported by the suggestion checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    Spelling,
    Grammar,
    CommonConfusion,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spelling => "Spelling",
            Self::Grammar => "Grammar/Spelling",
            Self::CommonConfusion => "Common Confusion",
        }
    }
}

/// One spelling, grammar or confusion finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,

    /// The original text span.
    pub original: String,

    /// The suggested replacement.
    pub suggestion: String,

    /// Bounded window of surrounding original text.
    pub context: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        original: impl Into<String>,
        suggestion: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            original: original.into(),
            suggestion: suggestion.into(),
            context: context.into(),
        }
    }
}

/// MIME type of a Word 2007+ document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME type of a legacy Word 97-2003 document.
pub const MSWORD_MIME: &str = "application/msword";

/// Format of a file submitted for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Word 2007+ (Office Open XML).
    Docx,
    /// Legacy Word 97-2003 (OLE/CFB binary).
    Doc,
    /// UTF-8 plain text.
    PlainText,
}

impl DocumentFormat {
    /// Detect format from a declared MIME type or short type name.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_lowercase();
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence {
            "application/pdf" | "pdf" => Some(Self::Pdf),
            DOCX_MIME | "docx" => Some(Self::Docx),
            MSWORD_MIME | "doc" | "msword" => Some(Self::Doc),
            "text/plain" | "txt" | "text" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" | "text" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        // DOCX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Docx);
        }

        // DOC is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Doc);
        }

        None
    }

    /// Canonical MIME type for this format.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => DOCX_MIME,
            Self::Doc => MSWORD_MIME,
            Self::PlainText => "text/plain",
        }
    }
}
