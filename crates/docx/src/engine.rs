//! The formatting engine: styling directives applied to a loaded document.
//!
//! Every operation mutates the document in place. Calling an operation
//! again applies it again on top of the current state.

use crate::document::{DocxDocument, HeaderFooterKind};
use crate::ooxml::{inches_to_twips, SECTPR_ORDER};
use crate::paragraph::{
    new_paragraph, runs_mut, set_alignment, set_line_spacing, set_numbering, set_run_font_name,
    set_run_font_size, set_text, styled_paragraph,
};
use crate::picture::inspect_image;
use crate::styles::{CAPTION, HEADING_1, LIST_BULLET};
use docmorph_core::{
    Alignment, CaptionPosition, FigureRequest, HeaderFooterAlignment, ImageAsset, Margins, Result,
};

/// Applies formatting to one document it exclusively owns.
#[derive(Debug, Clone)]
pub struct FormattingEngine {
    document: DocxDocument,
}

impl FormattingEngine {
    pub fn new(document: DocxDocument) -> Self {
        Self { document }
    }

    /// Load the base document from DOCX bytes.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(DocxDocument::open(bytes)?))
    }

    /// Start from an empty document.
    pub fn blank() -> Result<Self> {
        Ok(Self::new(DocxDocument::blank()?))
    }

    pub fn document(&self) -> &DocxDocument {
        &self.document
    }

    pub fn into_document(self) -> DocxDocument {
        self.document
    }

    /// Set the font name and size (points) of every run in every body
    /// paragraph.
    pub fn set_font(&mut self, name: &str, size: f64) -> Result<()> {
        let mut count = 0;
        for paragraph in self.document.paragraphs_mut()? {
            for run in runs_mut(paragraph) {
                set_run_font_name(run, name);
                set_run_font_size(run, size);
                count += 1;
            }
        }
        log::debug!("Set font {} {}pt on {} runs", name, size, count);
        Ok(())
    }

    /// Set every body paragraph's line spacing to a multiple of single.
    pub fn set_line_spacing(&mut self, value: f64) -> Result<()> {
        for paragraph in self.document.paragraphs_mut()? {
            set_line_spacing(paragraph, value);
        }
        Ok(())
    }

    pub fn set_alignment(&mut self, alignment: Alignment) -> Result<()> {
        for paragraph in self.document.paragraphs_mut()? {
            set_alignment(paragraph, alignment);
        }
        Ok(())
    }

    /// Set the page margins (inches) of the first section. Later sections
    /// keep their own margins.
    pub fn set_margins(&mut self, margins: &Margins) -> Result<()> {
        let positions = self.document.ensure_sections()?;
        let sect_pr = self.document.section_properties_mut(positions[0])?;

        let pg_mar = sect_pr.get_or_insert_ordered("w:pgMar", SECTPR_ORDER);
        for (attr, default) in [("w:header", "720"), ("w:footer", "720"), ("w:gutter", "0")] {
            if pg_mar.attr(attr).is_none() {
                pg_mar.set_attr(attr, default);
            }
        }
        pg_mar.set_attr("w:top", inches_to_twips(margins.top).to_string());
        pg_mar.set_attr("w:bottom", inches_to_twips(margins.bottom).to_string());
        pg_mar.set_attr("w:left", inches_to_twips(margins.left).to_string());
        pg_mar.set_attr("w:right", inches_to_twips(margins.right).to_string());
        Ok(())
    }

    /// Append `image` to the first paragraph of the first section's header.
    pub fn add_logo(&mut self, image: &ImageAsset, width: f64, height: f64) -> Result<()> {
        inspect_image(&image.bytes)?;

        let part = self.document.header_footer_part(0, HeaderFooterKind::Header)?;
        let run = self.document.picture_run(&part, image, width, height)?;
        self.document.first_part_paragraph_mut(&part)?.push(run);
        Ok(())
    }

    /// Replace the text of the first header and footer paragraph of every
    /// section, creating headers and footers where none apply.
    pub fn set_header_footer(
        &mut self,
        header_text: &str,
        footer_text: &str,
        size: f64,
        alignment: HeaderFooterAlignment,
    ) -> Result<()> {
        let sections = self.document.ensure_sections()?.len();

        for section in 0..sections {
            for (kind, text) in [
                (HeaderFooterKind::Header, header_text),
                (HeaderFooterKind::Footer, footer_text),
            ] {
                let part = self.document.header_footer_part(section, kind)?;
                let paragraph = self.document.first_part_paragraph_mut(&part)?;

                set_text(paragraph, text);
                if let Some(run) = runs_mut(paragraph).last() {
                    set_run_font_size(run, size);
                }
                set_alignment(paragraph, alignment.into());
            }
        }

        log::debug!("Set header and footer on {} section(s)", sections);
        Ok(())
    }

    /// Append a level-1 heading at the end of the document.
    pub fn add_section_title(&mut self, text: &str) -> Result<()> {
        let style = self.document.ensure_paragraph_style(&HEADING_1)?;
        self.document.append_block(styled_paragraph(&style, text))
    }

    /// Append one bulleted paragraph per item, in order.
    pub fn add_bullet_list<S: AsRef<str>>(&mut self, items: &[S]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let style = self.document.ensure_paragraph_style(&LIST_BULLET)?;
        let num_id = self.document.ensure_bullet_numbering()?;

        for item in items {
            let mut paragraph = styled_paragraph(&style, item.as_ref());
            set_numbering(&mut paragraph, &num_id, 0);
            self.document.append_block(paragraph)?;
        }

        log::debug!("Added {} bullet(s)", items.len());
        Ok(())
    }

    /// Append a picture paragraph, with its caption above or below it when
    /// the caption is not empty.
    pub fn add_figure(&mut self, figure: &FigureRequest) -> Result<()> {
        inspect_image(&figure.image.bytes)?;

        let caption = if figure.caption.is_empty() {
            None
        } else {
            let style = self.document.ensure_paragraph_style(&CAPTION)?;
            Some(styled_paragraph(&style, &figure.caption))
        };

        let main_part = self.document.main_part().to_string();
        let run = self
            .document
            .picture_run(&main_part, &figure.image, figure.width, figure.height)?;
        let mut picture = new_paragraph();
        picture.push(run);

        match (caption, figure.position) {
            (Some(caption), CaptionPosition::Above) => {
                self.document.append_block(caption)?;
                self.document.append_block(picture)?;
            }
            (Some(caption), CaptionPosition::Below) => {
                self.document.append_block(picture)?;
                self.document.append_block(caption)?;
            }
            (None, _) => self.document.append_block(picture)?,
        }
        Ok(())
    }

    /// Serialize the current document.
    pub fn save(&self) -> Result<Vec<u8>> {
        self.document.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{document_with_paragraphs, two_section_document};
    use crate::document::ParagraphInfo;
    use crate::picture::tests::png_bytes;
    use crate::xml::XmlElement;
    use docmorph_core::Error;

    fn engine(texts: &[&str]) -> FormattingEngine {
        FormattingEngine::new(document_with_paragraphs(texts))
    }

    fn texts(paragraphs: &[ParagraphInfo]) -> Vec<&str> {
        paragraphs.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_set_font_touches_every_run() {
        let mut engine = engine(&["one", "two", "three"]);
        engine.set_font("Arial", 14.0).unwrap();

        let paragraphs = engine.document().paragraphs();
        assert_eq!(texts(&paragraphs), vec!["one", "two", "three"]);
        for p in &paragraphs {
            for run in &p.runs {
                assert_eq!(run.font_name.as_deref(), Some("Arial"));
                assert_eq!(run.font_size, Some(14.0));
            }
        }
    }

    #[test]
    fn test_set_font_skips_empty_paragraphs() {
        let mut engine = engine(&[]);
        engine
            .document
            .append_block(XmlElement::new("w:p"))
            .unwrap();
        engine.set_font("Arial", 12.0).unwrap();

        let paragraphs = engine.document().paragraphs();
        assert_eq!(paragraphs.len(), 1);
        assert!(paragraphs[0].runs.is_empty());
    }

    #[test]
    fn test_spacing_and_alignment_on_every_paragraph() {
        let mut engine = engine(&["a", "b"]);
        engine.set_line_spacing(1.5).unwrap();
        engine.set_alignment(Alignment::Justify).unwrap();

        let paragraphs = engine.document().paragraphs();
        assert_eq!(paragraphs.len(), 2);
        for p in &paragraphs {
            assert_eq!(p.line_spacing, Some(1.5));
            assert_eq!(p.alignment, Some(Alignment::Justify));
        }
        assert_eq!(texts(&paragraphs), vec!["a", "b"]);
    }

    #[test]
    fn test_operations_are_cumulative() {
        let mut engine = engine(&["a"]);
        engine.set_alignment(Alignment::Center).unwrap();
        engine.set_alignment(Alignment::Right).unwrap();
        engine.add_section_title("One").unwrap();
        engine.add_section_title("One").unwrap();

        let paragraphs = engine.document().paragraphs();
        assert_eq!(paragraphs[0].alignment, Some(Alignment::Right));
        assert_eq!(texts(&paragraphs), vec!["a", "One", "One"]);
    }

    #[test]
    fn test_set_margins_first_section_only() {
        let mut engine = FormattingEngine::new(two_section_document());
        engine
            .set_margins(&Margins {
                top: 0.5,
                bottom: 0.75,
                left: 1.25,
                right: 2.0,
            })
            .unwrap();

        let sections = engine.document().sections();
        assert_eq!(sections.len(), 2);
        let first = sections[0].margins.unwrap();
        assert_eq!((first.top, first.bottom, first.left, first.right), (0.5, 0.75, 1.25, 2.0));
        assert_eq!(sections[1].margins, Some(Margins::uniform(1.0)));
    }

    #[test]
    fn test_add_bullet_list() {
        let mut engine = engine(&["intro"]);
        engine.add_bullet_list::<&str>(&[]).unwrap();
        assert_eq!(engine.document().paragraphs().len(), 1);

        engine.add_bullet_list(&["a", "b", "c"]).unwrap();
        let paragraphs = engine.document().paragraphs();
        assert_eq!(texts(&paragraphs), vec!["intro", "a", "b", "c"]);
        for p in &paragraphs[1..] {
            assert!(p.numbered);
            assert_eq!(p.style_name.as_deref(), Some("List Bullet"));
        }
        assert!(!paragraphs[0].numbered);
    }

    #[test]
    fn test_section_title_is_heading() {
        let mut engine = engine(&["body"]);
        engine.add_section_title("Results").unwrap();

        let last = engine.document().paragraphs().pop().unwrap();
        assert_eq!(last.text, "Results");
        assert_eq!(last.style_name.as_deref(), Some("heading 1"));
    }

    #[test]
    fn test_header_footer_created_when_missing() {
        let mut engine = engine(&["body"]);
        engine
            .set_header_footer("Report", "Page", 9.0, HeaderFooterAlignment::Right)
            .unwrap();

        let doc = engine.document();
        let header = doc.header_footer_paragraphs(0, HeaderFooterKind::Header);
        let footer = doc.header_footer_paragraphs(0, HeaderFooterKind::Footer);
        assert_eq!(texts(&header), vec!["Report"]);
        assert_eq!(texts(&footer), vec!["Page"]);
        assert_eq!(header[0].alignment, Some(Alignment::Right));
        assert_eq!(header[0].runs.len(), 1);
        assert_eq!(header[0].runs[0].font_size, Some(9.0));
    }

    #[test]
    fn test_header_footer_replaces_first_paragraph_text() {
        let mut engine = engine(&["body"]);
        engine
            .set_header_footer("Old", "Old", 10.0, HeaderFooterAlignment::Center)
            .unwrap();
        engine
            .set_header_footer("New", "", 11.0, HeaderFooterAlignment::Left)
            .unwrap();

        let doc = engine.document();
        let header = doc.header_footer_paragraphs(0, HeaderFooterKind::Header);
        assert_eq!(texts(&header), vec!["New"]);
        assert_eq!(header[0].alignment, Some(Alignment::Left));
        assert_eq!(
            texts(&doc.header_footer_paragraphs(0, HeaderFooterKind::Footer)),
            vec![""]
        );
    }

    #[test]
    fn test_header_footer_linked_sections_share_definition() {
        let mut engine = FormattingEngine::new(two_section_document());
        engine
            .set_header_footer("H", "F", 10.0, HeaderFooterAlignment::Center)
            .unwrap();

        let doc = engine.document();
        assert_eq!(
            doc.linked_header_footer_part(0, HeaderFooterKind::Header),
            doc.linked_header_footer_part(1, HeaderFooterKind::Header)
        );
        assert_eq!(
            texts(&doc.header_footer_paragraphs(1, HeaderFooterKind::Footer)),
            vec!["F"]
        );
    }

    #[test]
    fn test_logo_appended_to_existing_header_paragraph() {
        let mut engine = engine(&["body"]);
        engine
            .set_header_footer("Company", "", 10.0, HeaderFooterAlignment::Center)
            .unwrap();
        engine
            .add_logo(&ImageAsset::new(png_bytes()), 1.0, 0.5)
            .unwrap();

        let header = engine
            .document()
            .header_footer_paragraphs(0, HeaderFooterKind::Header);
        assert_eq!(header.len(), 1);
        assert_eq!(header[0].text, "Company");
        assert!(header[0].has_picture);
        assert_eq!(header[0].runs.len(), 2);
        assert_eq!(engine.document().media_count(), 1);
    }

    #[test]
    fn test_logo_creates_header() {
        let mut engine = engine(&["body"]);
        engine
            .add_logo(&ImageAsset::new(png_bytes()), 1.0, 1.0)
            .unwrap();

        let header = engine
            .document()
            .header_footer_paragraphs(0, HeaderFooterKind::Header);
        assert_eq!(header.len(), 1);
        assert!(header[0].has_picture);
    }

    #[test]
    fn test_header_text_keeps_logo() {
        let mut engine = engine(&["body"]);
        engine
            .add_logo(&ImageAsset::new(png_bytes()), 1.0, 1.0)
            .unwrap();
        engine
            .set_header_footer("Company", "", 8.0, HeaderFooterAlignment::Right)
            .unwrap();

        let header = engine
            .document()
            .header_footer_paragraphs(0, HeaderFooterKind::Header);
        assert_eq!(header[0].text, "Company");
        assert!(header[0].has_picture);
        assert_eq!(header[0].runs.len(), 2);
        assert_eq!(header[0].runs[1].font_size, Some(8.0));
    }

    #[test]
    fn test_invalid_image_rejected() {
        let mut engine = engine(&["body"]);
        let bogus = ImageAsset::new(b"not an image".to_vec());

        assert!(matches!(
            engine.add_logo(&bogus, 1.0, 1.0),
            Err(Error::InvalidImage(_))
        ));
        assert!(matches!(
            engine.add_figure(&FigureRequest::new(bogus)),
            Err(Error::InvalidImage(_))
        ));
        assert_eq!(engine.document().paragraphs().len(), 1);
        assert_eq!(engine.document().media_count(), 0);
    }

    #[test]
    fn test_figure_caption_placement() {
        for (position, expected) in [
            (CaptionPosition::Above, vec!["body", "Figure 1", ""]),
            (CaptionPosition::Below, vec!["body", "", "Figure 1"]),
        ] {
            let mut engine = engine(&["body"]);
            let figure = FigureRequest::new(ImageAsset::new(png_bytes()))
                .with_caption("Figure 1", position);
            engine.add_figure(&figure).unwrap();

            let paragraphs = engine.document().paragraphs();
            assert_eq!(texts(&paragraphs), expected);

            let picture = paragraphs.iter().find(|p| p.has_picture).unwrap();
            assert!(picture.text.is_empty());
            let caption = paragraphs.iter().find(|p| p.text == "Figure 1").unwrap();
            assert_eq!(caption.style_name.as_deref(), Some("caption"));
        }
    }

    #[test]
    fn test_figure_without_caption() {
        let mut engine = engine(&["body"]);
        engine
            .add_figure(&FigureRequest::new(ImageAsset::new(png_bytes())))
            .unwrap();

        let paragraphs = engine.document().paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[1].has_picture);
    }

    #[test]
    fn test_save_round_trip_keeps_formatting() {
        let mut engine = engine(&["hello"]);
        engine.set_font("Georgia", 11.0).unwrap();
        engine
            .add_logo(&ImageAsset::new(png_bytes()).with_filename("logo.png"), 1.0, 1.0)
            .unwrap();

        let reopened = DocxDocument::open(&engine.save().unwrap()).unwrap();
        let paragraphs = reopened.paragraphs();
        assert_eq!(paragraphs[0].runs[0].font_name.as_deref(), Some("Georgia"));
        assert!(reopened.header_footer_paragraphs(0, HeaderFooterKind::Header)[0].has_picture);
        assert_eq!(reopened.media_count(), 1);
    }
}
