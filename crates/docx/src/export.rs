//! The export pipeline: a session applied to a base document.

use crate::engine::FormattingEngine;
use docmorph_core::{Result, Session};

/// Default file name of an exported document.
pub const OUTPUT_FILENAME: &str = "formatted.docx";

/// Format `base` (DOCX bytes, or a blank document when `None`) according
/// to `session` and return the resulting DOCX bytes.
///
/// Steps run in a fixed order and the first failure aborts the export.
pub fn export_document(session: &Session, base: Option<&[u8]>) -> Result<Vec<u8>> {
    let style = &session.style;
    let content = &session.content;
    style.validate()?;

    let mut engine = match base {
        Some(bytes) => FormattingEngine::open(bytes)?,
        None => FormattingEngine::blank()?,
    };

    engine.set_font(&style.font_name, style.font_size)?;
    engine.set_line_spacing(style.line_spacing)?;
    engine.set_alignment(style.alignment)?;
    engine.set_margins(&style.margins)?;

    if let Some(logo) = &content.logo {
        engine.add_logo(logo, style.logo_width, style.logo_height)?;
    }

    engine.set_header_footer(
        &style.header_text,
        &style.footer_text,
        style.header_footer_size,
        style.header_footer_alignment,
    )?;

    let title = content.section_title.trim();
    if !title.is_empty() {
        engine.add_section_title(title)?;
    }
    if !content.bullets.is_empty() {
        engine.add_bullet_list(&content.bullets)?;
    }
    if let Some(figure) = &content.figure {
        engine.add_figure(figure)?;
    }

    let bytes = engine.save()?;
    log::debug!("Exported document ({} bytes)", bytes.len());
    Ok(bytes)
}
