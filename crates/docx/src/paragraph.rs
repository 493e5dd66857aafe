//! Paragraph and run level editing of `w:p` elements.

use crate::ooxml::{points_to_half_points, LINE_SPACING_UNIT, PPR_ORDER, RPR_ORDER};
use crate::xml::{XmlElement, XmlNode};
use docmorph_core::Alignment;

/// Direct `w:r` children of a paragraph.
pub fn runs_mut(paragraph: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    paragraph.elements_mut().filter(|e| e.name == "w:r")
}

pub fn runs(paragraph: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    paragraph.children_named("w:r")
}

fn properties_mut(paragraph: &mut XmlElement) -> &mut XmlElement {
    paragraph.get_or_insert_first("w:pPr")
}

fn run_properties_mut(run: &mut XmlElement) -> &mut XmlElement {
    run.get_or_insert_first("w:rPr")
}

/// Overwrite the ASCII and high-ANSI font of a run.
pub fn set_run_font_name(run: &mut XmlElement, name: &str) {
    let fonts = run_properties_mut(run).get_or_insert_ordered("w:rFonts", RPR_ORDER);
    fonts.set_attr("w:ascii", name);
    fonts.set_attr("w:hAnsi", name);
    // Theme fonts take precedence over explicit names.
    fonts.remove_attr("w:asciiTheme");
    fonts.remove_attr("w:hAnsiTheme");
}

pub fn set_run_font_size(run: &mut XmlElement, points: f64) {
    run_properties_mut(run)
        .get_or_insert_ordered("w:sz", RPR_ORDER)
        .set_attr("w:val", points_to_half_points(points).to_string());
}

pub fn set_alignment(paragraph: &mut XmlElement, alignment: Alignment) {
    properties_mut(paragraph)
        .get_or_insert_ordered("w:jc", PPR_ORDER)
        .set_attr("w:val", jc_value(alignment));
}

/// Set multiple line spacing, keeping before/after spacing.
pub fn set_line_spacing(paragraph: &mut XmlElement, multiple: f64) {
    let spacing = properties_mut(paragraph).get_or_insert_ordered("w:spacing", PPR_ORDER);
    spacing.set_attr("w:line", ((multiple * LINE_SPACING_UNIT).round() as i64).to_string());
    spacing.set_attr("w:lineRule", "auto");
}

pub fn set_style(paragraph: &mut XmlElement, style_id: &str) {
    properties_mut(paragraph)
        .get_or_insert_ordered("w:pStyle", PPR_ORDER)
        .set_attr("w:val", style_id);
}

/// Attach list numbering to a paragraph.
pub fn set_numbering(paragraph: &mut XmlElement, num_id: &str, level: u32) {
    let num_pr = properties_mut(paragraph).get_or_insert_ordered("w:numPr", PPR_ORDER);
    num_pr
        .get_or_insert_ordered("w:ilvl", &["w:ilvl", "w:numId"])
        .set_attr("w:val", level.to_string());
    num_pr
        .get_or_insert_ordered("w:numId", &["w:ilvl", "w:numId"])
        .set_attr("w:val", num_id);
}

/// Replace the text of a paragraph with one run. Paragraph properties and
/// runs holding pictures are kept.
pub fn set_text(paragraph: &mut XmlElement, text: &str) {
    paragraph.children.retain(|n| match n {
        XmlNode::Element(e) => {
            e.name == "w:pPr" || (e.name == "w:r" && e.has_descendant("w:drawing"))
        }
        XmlNode::Text(_) => false,
    });
    paragraph.push(text_run(text));
}

pub fn new_paragraph() -> XmlElement {
    XmlElement::new("w:p")
}

/// A paragraph with the given style holding one text run.
pub fn styled_paragraph(style_id: &str, text: &str) -> XmlElement {
    let mut paragraph = new_paragraph();
    set_style(&mut paragraph, style_id);
    if !text.is_empty() {
        paragraph.push(text_run(text));
    }
    paragraph
}

/// A run holding `text`, with tabs and line breaks as their own elements.
pub fn text_run(text: &str) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    let mut pending = String::new();

    let flush = |run: &mut XmlElement, pending: &mut String| {
        if !pending.is_empty() {
            run.push(
                XmlElement::new("w:t")
                    .with_attr("xml:space", "preserve")
                    .with_text(std::mem::take(pending)),
            );
        }
    };

    for c in text.chars() {
        match c {
            '\t' => {
                flush(&mut run, &mut pending);
                run.push(XmlElement::new("w:tab"));
            }
            '\n' => {
                flush(&mut run, &mut pending);
                run.push(XmlElement::new("w:br"));
            }
            '\r' => {}
            other => pending.push(other),
        }
    }
    flush(&mut run, &mut pending);
    run
}

/// Plain text of a paragraph, including runs nested in hyperlinks and
/// similar containers.
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut out = String::new();
    collect_run_text(paragraph, &mut out);
    out
}

pub fn run_text(run: &XmlElement) -> String {
    let mut out = String::new();
    collect_run_text(run, &mut out);
    out
}

fn collect_run_text(element: &XmlElement, out: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:t" => out.push_str(&child.text()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:pPr" | "w:rPr" | "w:drawing" | "w:pict" | "w:instrText" | "w:delText" => {}
            _ => collect_run_text(child, out),
        }
    }
}

fn jc_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
    }
}

pub fn alignment_from_jc(value: &str) -> Option<Alignment> {
    match value {
        "left" | "start" => Some(Alignment::Left),
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "both" | "distribute" => Some(Alignment::Justify),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(element: &XmlElement) -> Vec<&str> {
        element.elements().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_text_run_splits_tabs_and_breaks() {
        let run = text_run("a\tb\nc");
        assert_eq!(names(&run), vec!["w:t", "w:tab", "w:t", "w:br", "w:t"]);
        assert_eq!(run_text(&run), "a\tb\nc");
    }

    #[test]
    fn test_set_text_keeps_properties() {
        let mut p = new_paragraph();
        set_alignment(&mut p, Alignment::Right);
        p.push(text_run("old"));
        p.push(text_run(" text"));

        set_text(&mut p, "new");

        assert_eq!(names(&p), vec!["w:pPr", "w:r"]);
        assert_eq!(paragraph_text(&p), "new");
    }

    #[test]
    fn test_set_text_keeps_pictures() {
        let mut p = new_paragraph();
        p.push(text_run("old"));
        p.push(XmlElement::new("w:r").with_child(XmlElement::new("w:drawing")));

        set_text(&mut p, "new");

        assert_eq!(names(&p), vec!["w:r", "w:r"]);
        assert!(p.elements().next().is_some_and(|r| r.has_child("w:drawing")));
        assert_eq!(paragraph_text(&p), "new");
    }

    #[test]
    fn test_property_order() {
        let mut p = new_paragraph();
        set_alignment(&mut p, Alignment::Center);
        set_line_spacing(&mut p, 1.5);
        set_style(&mut p, "Heading1");
        set_numbering(&mut p, "3", 0);

        let ppr = p.child("w:pPr").unwrap();
        assert_eq!(names(ppr), vec!["w:pStyle", "w:numPr", "w:spacing", "w:jc"]);
        assert_eq!(ppr.child("w:spacing").unwrap().attr("w:line"), Some("360"));
        assert_eq!(ppr.child("w:jc").unwrap().attr("w:val"), Some("center"));
    }

    #[test]
    fn test_line_spacing_keeps_other_attributes() {
        let mut p = new_paragraph();
        p.get_or_insert_first("w:pPr")
            .push(XmlElement::new("w:spacing").with_attr("w:after", "200"));

        set_line_spacing(&mut p, 1.15);

        let spacing = p.child("w:pPr").unwrap().child("w:spacing").unwrap();
        assert_eq!(spacing.attr("w:after"), Some("200"));
        assert_eq!(spacing.attr("w:line"), Some("276"));
        assert_eq!(spacing.attr("w:lineRule"), Some("auto"));
    }

    #[test]
    fn test_run_font_replaces_theme_fonts() {
        let mut run = text_run("x");
        run.get_or_insert_first("w:rPr").push(
            XmlElement::new("w:rFonts")
                .with_attr("w:asciiTheme", "minorHAnsi")
                .with_attr("w:eastAsia", "SimSun"),
        );

        set_run_font_size(&mut run, 14.0);
        set_run_font_name(&mut run, "Arial");

        let rpr = run.child("w:rPr").unwrap();
        assert_eq!(names(rpr), vec!["w:rFonts", "w:sz"]);
        let fonts = rpr.child("w:rFonts").unwrap();
        assert_eq!(fonts.attr("w:ascii"), Some("Arial"));
        assert_eq!(fonts.attr("w:hAnsi"), Some("Arial"));
        assert_eq!(fonts.attr("w:eastAsia"), Some("SimSun"));
        assert_eq!(fonts.attr("w:asciiTheme"), None);
        assert_eq!(rpr.child("w:sz").unwrap().attr("w:val"), Some("28"));
    }

    #[test]
    fn test_paragraph_text_walks_hyperlinks() {
        let p = new_paragraph()
            .with_child(text_run("see "))
            .with_child(XmlElement::new("w:hyperlink").with_child(text_run("here")));
        assert_eq!(paragraph_text(&p), "see here");
    }

    #[test]
    fn test_alignment_from_jc() {
        assert_eq!(alignment_from_jc("both"), Some(Alignment::Justify));
        assert_eq!(alignment_from_jc("start"), Some(Alignment::Left));
        assert_eq!(alignment_from_jc("bogus"), None);
    }
}
