//! Explicit per-user session state driving an export.

use crate::types::{CaptionPosition, StyleConfig};

/// Raw image bytes uploaded for a logo or figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,

    /// Original file name, if known. Used for the drawing's display name.
    pub filename: Option<String>,
}

impl ImageAsset {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// A figure to append at the end of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureRequest {
    pub image: ImageAsset,

    /// Width in inches.
    pub width: f64,

    /// Height in inches.
    pub height: f64,

    pub caption: String,

    pub position: CaptionPosition,
}

impl FigureRequest {
    /// A 4 x 3 inch figure with no caption.
    pub fn new(image: ImageAsset) -> Self {
        Self {
            image,
            width: 4.0,
            height: 3.0,
            caption: String::new(),
            position: CaptionPosition::Below,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>, position: CaptionPosition) -> Self {
        self.caption = caption.into();
        self.position = position;
        self
    }
}

/// Supplementary content appended during export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentRequest {
    pub section_title: String,
    pub bullets: Vec<String>,
    pub logo: Option<ImageAsset>,
    pub figure: Option<FigureRequest>,
}

/// Everything one export needs: the styling and the extra content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub style: StyleConfig,
    pub content: ContentRequest,
}

impl Session {
    pub fn new(style: StyleConfig) -> Self {
        Self {
            style,
            content: ContentRequest::default(),
        }
    }

    /// Replace the whole style configuration, e.g. after loading a preset.
    pub fn apply_preset(&mut self, style: StyleConfig) {
        self.style = style;
    }
}

/// Split multi-line input into bullet items: one per line, trimmed, blank
/// lines dropped.
pub fn bullets_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullets_from_text() {
        let items = bullets_from_text("  first\n\n second \r\n\t\nthird");
        assert_eq!(items, vec!["first", "second", "third"]);
        assert!(bullets_from_text("   \n ").is_empty());
    }

    #[test]
    fn test_figure_defaults() {
        let figure = FigureRequest::new(ImageAsset::new(vec![1, 2, 3]));
        assert_eq!(figure.width, 4.0);
        assert_eq!(figure.height, 3.0);
        assert_eq!(figure.position, CaptionPosition::Below);
        assert!(figure.caption.is_empty());
    }

    #[test]
    fn test_apply_preset_replaces_whole_style() {
        let mut session = Session::default();
        session.content.section_title = "Intro".to_string();

        let mut style = StyleConfig::default();
        style.font_name = "Georgia".to_string();
        session.apply_preset(style.clone());

        assert_eq!(session.style, style);
        assert_eq!(session.content.section_title, "Intro");
    }
}
