//! Parts of a minimal blank document.

use crate::ooxml::{
    inches_to_twips, CT_MAIN, CT_STYLES, PACKAGE_RELS_PART, PART_NAMESPACES, PKG_REL_NS,
    REL_OFFICE_DOCUMENT, REL_STYLES,
};
use crate::package::Package;
use crate::xml::XmlElement;
use docmorph_core::Result;

const MAIN_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// US Letter, in twips.
const PAGE_WIDTH: i64 = 12_240;
const PAGE_HEIGHT: i64 = 15_840;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults>
<w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault>
<w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault>
</w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>
<w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/><w:uiPriority w:val="1"/><w:semiHidden/><w:unhideWhenUsed/></w:style>
</w:styles>"#;

/// Section properties for a Letter page with one inch margins.
pub fn default_section() -> XmlElement {
    let inch = inches_to_twips(1.0).to_string();
    let half_inch = inches_to_twips(0.5).to_string();

    XmlElement::new("w:sectPr")
        .with_child(
            XmlElement::new("w:pgSz")
                .with_attr("w:w", PAGE_WIDTH.to_string())
                .with_attr("w:h", PAGE_HEIGHT.to_string()),
        )
        .with_child(
            XmlElement::new("w:pgMar")
                .with_attr("w:top", inch.as_str())
                .with_attr("w:right", inch.as_str())
                .with_attr("w:bottom", inch.as_str())
                .with_attr("w:left", inch.as_str())
                .with_attr("w:header", half_inch.as_str())
                .with_attr("w:footer", half_inch.as_str())
                .with_attr("w:gutter", "0"),
        )
        .with_child(XmlElement::new("w:cols").with_attr("w:space", "720"))
        .with_child(XmlElement::new("w:docGrid").with_attr("w:linePitch", "360"))
}

/// A package holding an empty single-section document.
pub fn blank_package() -> Result<Package> {
    let mut package = Package::new();

    package.ensure_override_content_type(MAIN_PART, CT_MAIN);
    package.ensure_override_content_type(STYLES_PART, CT_STYLES);

    package.set_xml(
        PACKAGE_RELS_PART,
        XmlElement::new("Relationships").with_attr("xmlns", PKG_REL_NS),
    );
    package.add_relationship("", REL_OFFICE_DOCUMENT, MAIN_PART);

    let mut document = XmlElement::new("w:document");
    for (prefix, ns) in PART_NAMESPACES {
        document.set_attr(prefix, *ns);
    }
    document.push(XmlElement::new("w:body").with_child(default_section()));
    package.set_xml(MAIN_PART, document);

    package.set_xml(STYLES_PART, XmlElement::parse(STYLES_XML.as_bytes())?);
    package.add_relationship(MAIN_PART, REL_STYLES, STYLES_PART);

    Ok(package)
}
