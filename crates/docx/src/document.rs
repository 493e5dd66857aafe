//! The in-memory Word document: package, main part, sections and
//! header/footer parts, plus read-only snapshots for inspection.

use crate::ooxml::{
    twips_to_inches, CT_FOOTER, CT_HEADER, PACKAGE_RELS_PART, PART_NAMESPACES, REL_FOOTER,
    REL_HEADER, REL_IMAGE, REL_OFFICE_DOCUMENT, REL_STYLES, SECTPR_ORDER,
};
use crate::package::Package;
use crate::paragraph::{alignment_from_jc, paragraph_text, run_text, runs};
use crate::picture::{inline_picture_run, inspect_image, ImageInfo};
use crate::template;
use crate::xml::{XmlElement, XmlNode};
use docmorph_core::{Alignment, Error, ImageAsset, Margins, Result};

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Which of a section's running parts to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

impl HeaderFooterKind {
    fn reference_tag(self) -> &'static str {
        match self {
            Self::Header => "w:headerReference",
            Self::Footer => "w:footerReference",
        }
    }

    fn root_tag(self) -> &'static str {
        match self {
            Self::Header => "w:hdr",
            Self::Footer => "w:ftr",
        }
    }

    fn rel_type(self) -> &'static str {
        match self {
            Self::Header => REL_HEADER,
            Self::Footer => REL_FOOTER,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Header => CT_HEADER,
            Self::Footer => CT_FOOTER,
        }
    }

    fn part_pattern(self) -> &'static str {
        match self {
            Self::Header => "word/header{}.xml",
            Self::Footer => "word/footer{}.xml",
        }
    }
}

/// Snapshot of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub text: String,
    pub font_name: Option<String>,
    /// Size in points.
    pub font_size: Option<f64>,
}

/// Snapshot of one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphInfo {
    pub text: String,
    /// Style id from `w:pStyle`.
    pub style_id: Option<String>,
    /// Display name of the style, when the styles part defines it.
    pub style_name: Option<String>,
    pub alignment: Option<Alignment>,
    /// Line spacing as a multiple of single spacing.
    pub line_spacing: Option<f64>,
    /// Carries a list numbering reference.
    pub numbered: bool,
    pub has_picture: bool,
    pub runs: Vec<RunInfo>,
}

/// Snapshot of one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionInfo {
    /// Page margins in inches, if the section sets them.
    pub margins: Option<Margins>,
    pub has_header_reference: bool,
    pub has_footer_reference: bool,
}

/// A loaded DOCX document.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    pub(crate) package: Package,
    pub(crate) main_part: String,
}

impl DocxDocument {
    /// Load a document from DOCX bytes.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)
            .map_err(|e| Error::FormattingError(format!("Invalid base document: {}", e)))?;
        Self::from_package(package)
    }

    /// A new empty document with one section and default styles.
    pub fn blank() -> Result<Self> {
        Self::from_package(template::blank_package()?)
    }

    fn from_package(mut package: Package) -> Result<Self> {
        let main_part = package
            .related_part("", REL_OFFICE_DOCUMENT)
            .or_else(|| {
                package
                    .contains(DEFAULT_MAIN_PART)
                    .then(|| DEFAULT_MAIN_PART.to_string())
            })
            .ok_or_else(|| {
                Error::FormattingError(format!(
                    "Invalid base document: no main document part in {}",
                    PACKAGE_RELS_PART
                ))
            })?;

        let root = package.xml_mut(&main_part).ok_or_else(|| {
            Error::FormattingError(format!(
                "Invalid base document: '{}' is missing or not XML",
                main_part
            ))
        })?;
        if !root.has_child("w:body") {
            return Err(Error::FormattingError(
                "Invalid base document: main part has no body".to_string(),
            ));
        }
        declare_namespaces(root);

        log::debug!("Loaded document with main part '{}'", main_part);
        Ok(Self { package, main_part })
    }

    /// Serialize the current state as DOCX bytes.
    pub fn save(&self) -> Result<Vec<u8>> {
        self.package
            .to_bytes()
            .map_err(|e| Error::FormattingError(format!("Failed to save document: {}", e)))
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    pub(crate) fn body(&self) -> Result<&XmlElement> {
        self.package
            .xml(&self.main_part)
            .and_then(|root| root.child("w:body"))
            .ok_or_else(|| Error::FormattingError("Document body is missing".to_string()))
    }

    pub(crate) fn body_mut(&mut self) -> Result<&mut XmlElement> {
        self.package
            .xml_mut(&self.main_part)
            .and_then(|root| root.child_mut("w:body"))
            .ok_or_else(|| Error::FormattingError("Document body is missing".to_string()))
    }

    /// Body paragraphs, mutable.
    pub(crate) fn paragraphs_mut(&mut self) -> Result<impl Iterator<Item = &mut XmlElement>> {
        Ok(self.body_mut()?.elements_mut().filter(|e| e.name == "w:p"))
    }

    /// Append a block element at the end of the body, before the final
    /// section properties.
    pub(crate) fn append_block(&mut self, element: XmlElement) -> Result<()> {
        let body = self.body_mut()?;
        let index = match body.children.iter().rposition(|n| matches!(n, XmlNode::Element(_))) {
            Some(last) if matches!(&body.children[last], XmlNode::Element(e) if e.name == "w:sectPr") => {
                last
            }
            _ => body.children.len(),
        };
        body.insert(index, element);
        Ok(())
    }

    /// Body child indices holding section properties, in document order.
    /// A body without any gets a default final `w:sectPr` first.
    pub(crate) fn ensure_sections(&mut self) -> Result<Vec<usize>> {
        let body = self.body_mut()?;
        let has_final = body.elements().last().is_some_and(|e| e.name == "w:sectPr");
        if !has_final {
            log::debug!("Document has no final section properties; adding defaults");
            body.push(template::default_section());
        }
        Ok(section_positions(body))
    }

    pub(crate) fn section_properties_mut(&mut self, position: usize) -> Result<&mut XmlElement> {
        let body = self.body_mut()?;
        sect_pr_at_mut(body, position)
            .ok_or_else(|| Error::FormattingError("Section properties not found".to_string()))
    }

    /// Part name of the header or footer that applies to `section`,
    /// following "linked to previous" back to earlier sections.
    pub fn linked_header_footer_part(
        &self,
        section: usize,
        kind: HeaderFooterKind,
    ) -> Option<String> {
        let body = self.body().ok()?;
        let positions = section_positions(body);
        let last = section.min(positions.len().checked_sub(1)?);

        (0..=last).rev().find_map(|idx| {
            let sect_pr = sect_pr_at(body, positions[idx])?;
            let id = sect_pr
                .children_named(kind.reference_tag())
                .find(|r| r.attr("w:type").unwrap_or("default") == "default")
                .and_then(|r| r.attr("r:id"))?;
            self.package
                .relationship_target(&self.main_part, id)
                .filter(|part| self.package.xml(part).is_some())
        })
    }

    /// Part name of the header or footer for `section`, creating a new
    /// definition on the first section when none applies yet.
    pub(crate) fn header_footer_part(
        &mut self,
        section: usize,
        kind: HeaderFooterKind,
    ) -> Result<String> {
        self.ensure_sections()?;
        if let Some(part) = self.linked_header_footer_part(section, kind) {
            return Ok(part);
        }

        let name = self.package.unused_part_name(kind.part_pattern());
        let mut root = XmlElement::new(kind.root_tag());
        for (prefix, ns) in PART_NAMESPACES {
            root.set_attr(prefix, *ns);
        }
        root.push(XmlElement::new("w:p"));

        self.package.set_xml(&name, root);
        self.package.ensure_override_content_type(&name, kind.content_type());
        let rel_id = self.package.add_relationship(&self.main_part, kind.rel_type(), &name);

        let positions = self.ensure_sections()?;
        let reference = XmlElement::new(kind.reference_tag())
            .with_attr("w:type", "default")
            .with_attr("r:id", rel_id);
        self.section_properties_mut(positions[0])?
            .insert_ordered(reference, SECTPR_ORDER);

        log::debug!("Created {:?} part '{}'", kind, name);
        Ok(name)
    }

    /// First paragraph of a header/footer part, created if the part has none.
    pub(crate) fn first_part_paragraph_mut(&mut self, part: &str) -> Result<&mut XmlElement> {
        let root = self.package.require_xml_mut(part)?;
        if !root.has_child("w:p") {
            root.push(XmlElement::new("w:p"));
        }
        root.child_mut("w:p")
            .ok_or_else(|| Error::FormattingError(format!("No paragraph in '{}'", part)))
    }

    /// Store an image as a media part related to `source_part` and return
    /// a run displaying it at `width` x `height` inches.
    pub(crate) fn picture_run(
        &mut self,
        source_part: &str,
        image: &ImageAsset,
        width: f64,
        height: f64,
    ) -> Result<XmlElement> {
        let info: ImageInfo = inspect_image(&image.bytes)?;

        let media = self
            .package
            .unused_part_name(&format!("word/media/image{{}}.{}", info.extension()));
        self.package.set_raw(&media, image.bytes.clone());
        self.package
            .ensure_default_content_type(info.extension(), info.content_type());
        let rel_id = self.package.add_relationship(source_part, REL_IMAGE, &media);

        let drawing_id = self.next_drawing_id();
        let name = image
            .filename
            .clone()
            .unwrap_or_else(|| media.rsplit('/').next().unwrap_or_default().to_string());

        log::debug!(
            "Added {}x{} px image as '{}' ({})",
            info.width_px,
            info.height_px,
            media,
            rel_id
        );
        Ok(inline_picture_run(&rel_id, drawing_id, &name, width, height))
    }

    /// One more than the largest drawing id used in any XML part.
    fn next_drawing_id(&self) -> u32 {
        let mut max = 0;
        let names: Vec<&str> = self.package.part_names().collect();
        for name in names {
            if let Some(root) = self.package.xml(name) {
                for doc_pr in root.descendants_named("wp:docPr") {
                    if let Some(id) = doc_pr.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                        max = max.max(id);
                    }
                }
            }
        }
        max + 1
    }

    pub(crate) fn styles_part(&self) -> Option<String> {
        self.package.related_part(&self.main_part, REL_STYLES)
    }

    /// Snapshots of the body paragraphs.
    pub fn paragraphs(&self) -> Vec<ParagraphInfo> {
        let Ok(body) = self.body() else {
            return Vec::new();
        };
        body.children_named("w:p")
            .map(|p| self.paragraph_info(p))
            .collect()
    }

    pub fn sections(&self) -> Vec<SectionInfo> {
        let Ok(body) = self.body() else {
            return Vec::new();
        };
        section_positions(body)
            .into_iter()
            .filter_map(|pos| sect_pr_at(body, pos))
            .map(|sect_pr| SectionInfo {
                margins: sect_pr.child("w:pgMar").map(margins_from_pg_mar),
                has_header_reference: sect_pr.has_child("w:headerReference"),
                has_footer_reference: sect_pr.has_child("w:footerReference"),
            })
            .collect()
    }

    /// Paragraphs of the header or footer that applies to `section`.
    pub fn header_footer_paragraphs(
        &self,
        section: usize,
        kind: HeaderFooterKind,
    ) -> Vec<ParagraphInfo> {
        self.linked_header_footer_part(section, kind)
            .and_then(|part| self.package.xml(&part))
            .map(|root| {
                root.children_named("w:p")
                    .map(|p| self.paragraph_info(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of media parts in the package.
    pub fn media_count(&self) -> usize {
        self.package
            .part_names()
            .filter(|n| n.starts_with("word/media/"))
            .count()
    }

    fn paragraph_info(&self, p: &XmlElement) -> ParagraphInfo {
        let ppr = p.child("w:pPr");
        let style_id = ppr
            .and_then(|ppr| ppr.child("w:pStyle"))
            .and_then(|s| s.attr("w:val"))
            .map(str::to_string);
        let style_name = style_id.as_deref().and_then(|id| self.style_name(id));

        let alignment = ppr
            .and_then(|ppr| ppr.child("w:jc"))
            .and_then(|jc| jc.attr("w:val"))
            .and_then(alignment_from_jc);

        let line_spacing = ppr.and_then(|ppr| ppr.child("w:spacing")).and_then(|s| {
            let rule = s.attr("w:lineRule").unwrap_or("auto");
            let line = s.attr("w:line")?.parse::<f64>().ok()?;
            (rule == "auto").then_some(line / crate::ooxml::LINE_SPACING_UNIT)
        });

        let runs = runs(p)
            .map(|r| {
                let rpr = r.child("w:rPr");
                RunInfo {
                    text: run_text(r),
                    font_name: rpr
                        .and_then(|rpr| rpr.child("w:rFonts"))
                        .and_then(|f| f.attr("w:ascii"))
                        .map(str::to_string),
                    font_size: rpr
                        .and_then(|rpr| rpr.child("w:sz"))
                        .and_then(|sz| sz.attr("w:val"))
                        .and_then(|v| v.parse::<f64>().ok())
                        .map(|half_points| half_points / 2.0),
                }
            })
            .collect();

        ParagraphInfo {
            text: paragraph_text(p),
            style_id,
            style_name,
            alignment,
            line_spacing,
            numbered: ppr.is_some_and(|ppr| ppr.has_child("w:numPr")),
            has_picture: p.has_descendant("w:drawing"),
            runs,
        }
    }

    /// Display name of a style id.
    pub fn style_name(&self, style_id: &str) -> Option<String> {
        let styles = self.package.xml(&self.styles_part()?)?;
        styles
            .children_named("w:style")
            .find(|s| s.attr("w:styleId") == Some(style_id))
            .and_then(|s| s.child("w:name"))
            .and_then(|n| n.attr("w:val"))
            .map(str::to_string)
    }
}

/// Add the namespace declarations new markup relies on.
fn declare_namespaces(root: &mut XmlElement) {
    for (prefix, ns) in PART_NAMESPACES {
        if root.attr(prefix).is_none() {
            root.set_attr(prefix, *ns);
        }
    }
}

/// Body child indices that carry section properties.
fn section_positions(body: &XmlElement) -> Vec<usize> {
    body.children
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| match node {
            XmlNode::Element(e) if e.name == "w:sectPr" => Some(idx),
            XmlNode::Element(e) if e.name == "w:p" => e
                .child("w:pPr")
                .is_some_and(|ppr| ppr.has_child("w:sectPr"))
                .then_some(idx),
            _ => None,
        })
        .collect()
}

fn sect_pr_at(body: &XmlElement, position: usize) -> Option<&XmlElement> {
    match body.children.get(position)? {
        XmlNode::Element(e) if e.name == "w:sectPr" => Some(e),
        XmlNode::Element(e) => e.child("w:pPr")?.child("w:sectPr"),
        XmlNode::Text(_) => None,
    }
}

fn sect_pr_at_mut(body: &mut XmlElement, position: usize) -> Option<&mut XmlElement> {
    match body.children.get_mut(position)? {
        XmlNode::Element(e) => {
            if e.name == "w:sectPr" {
                Some(e)
            } else {
                e.child_mut("w:pPr")?.child_mut("w:sectPr")
            }
        }
        XmlNode::Text(_) => None,
    }
}

fn margins_from_pg_mar(pg_mar: &XmlElement) -> Margins {
    let side = |name: &str| {
        pg_mar
            .attr(name)
            .and_then(|v| v.parse::<i64>().ok())
            .map_or(0.0, twips_to_inches)
    };
    Margins {
        top: side("w:top"),
        bottom: side("w:bottom"),
        left: side("w:left"),
        right: side("w:right"),
    }
}
