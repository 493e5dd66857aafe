//! PDF text extraction.

use docmorph_core::{Error, Result};
use lopdf::Document;

/// Separator placed between the text of consecutive pages.
const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the text of every page, in page order.
///
/// Pages that yield no text (scanned images, blank pages, or pages whose
/// content cannot be decoded) are skipped.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| Error::PdfError(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text),
            Ok(_) => log::debug!("PDF page {} has no text", page_number),
            Err(e) => log::warn!("Skipping PDF page {}: {}", page_number, e),
        }
    }

    log::debug!("PDF: {} page(s) with text", pages.len());
    Ok(pages.join(PAGE_SEPARATOR))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a PDF with one page per entry; empty entries become pages
    /// without any text operators.
    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pages_joined_with_blank_line() {
        let pdf = pdf_with_pages(&["First page", "Second page"]);
        let text = extract_pdf_text(&pdf).unwrap();

        let first = text.find("First page").unwrap();
        let second = text.find("Second page").unwrap();
        assert!(first < second);
        assert!(text[first..second].contains(PAGE_SEPARATOR));
    }

    #[test]
    fn test_empty_pages_skipped() {
        let pdf = pdf_with_pages(&["", "Only text", ""]);
        let text = extract_pdf_text(&pdf).unwrap();
        assert_eq!(text.trim(), "Only text");
    }

    #[test]
    fn test_invalid_pdf() {
        let result = extract_pdf_text(b"%PDF-1.5 truncated");
        assert!(matches!(result, Err(Error::PdfError(_))));
    }
}
