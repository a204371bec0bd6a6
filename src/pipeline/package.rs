//! PresentationML package writer: [`Deck`] → `.pptx` bytes.
//!
//! The package is a zip of XML parts. Entry order, compression and entry
//! timestamps are fixed, and no part carries a creation time, so the same
//! deck always serialises to the same bytes.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml, docProps/app.xml
//! ppt/presentation.xml (+ _rels)
//! ppt/presProps.xml, viewProps.xml, tableStyles.xml
//! ppt/slideMasters/slideMaster1.xml (+ _rels)
//! ppt/slideLayouts/slideLayout1.xml (+ _rels)
//! ppt/theme/theme1.xml
//! ppt/slides/slideN.xml (+ _rels), N = 1..=slide_count
//! ```

use crate::error::RenderError;
use crate::pipeline::deck::{Align, Anchor, Deck, Slide, TextBlock, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};
use crate::pipeline::template::{TemplateParts, NS_A, NS_P, NS_R};
use quick_xml::escape::escape;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// MIME type of the produced file.
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// File extension of the produced file.
pub const PPTX_EXTENSION: &str = "pptx";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument.presentationml";

/// Serialise `deck` into a complete `.pptx` package.
pub fn write_package(deck: &Deck, template: &TemplateParts) -> Result<Vec<u8>, RenderError> {
    let n = deck.slide_count();
    let mut pkg = PackageWriter::new();

    pkg.part("[Content_Types].xml", &content_types_xml(n))?;
    pkg.part("_rels/.rels", &root_rels_xml())?;
    pkg.part("docProps/core.xml", &core_xml(&deck.title))?;
    pkg.part("docProps/app.xml", &app_xml(n))?;
    pkg.part("ppt/presentation.xml", &presentation_xml(n))?;
    pkg.part("ppt/_rels/presentation.xml.rels", &presentation_rels_xml(n))?;
    pkg.part("ppt/presProps.xml", &pres_props_xml())?;
    pkg.part("ppt/viewProps.xml", &view_props_xml())?;
    pkg.part("ppt/tableStyles.xml", &table_styles_xml())?;
    pkg.part("ppt/slideMasters/slideMaster1.xml", &template.slide_master)?;
    pkg.part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ]),
    )?;
    pkg.part("ppt/slideLayouts/slideLayout1.xml", &template.slide_layout)?;
    pkg.part(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
    )?;
    pkg.part("ppt/theme/theme1.xml", &template.theme)?;

    let slide_rels = relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]);
    for (i, slide) in deck.slides.iter().enumerate() {
        let num = i + 1;
        pkg.part(&format!("ppt/slides/slide{num}.xml"), &slide_xml(slide))?;
        pkg.part(&format!("ppt/slides/_rels/slide{num}.xml.rels"), &slide_rels)?;
    }

    pkg.finish()
}

// ── Zip plumbing ─────────────────────────────────────────────────────────────

struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PackageWriter {
    fn new() -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options,
        }
    }

    fn part(&mut self, name: &str, xml: &str) -> Result<(), RenderError> {
        self.zip.start_file(name, self.options)?;
        self.zip
            .write_all(xml.as_bytes())
            .map_err(|e| RenderError::Package(format!("writing {name}: {e}")))
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

// ── Package-level parts ──────────────────────────────────────────────────────

fn content_types_xml(slides: usize) -> String {
    let mut xml = String::with_capacity(2048 + slides * 160);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let overrides = [
        ("/ppt/presentation.xml", format!("{CT_BASE}.presentation.main+xml")),
        ("/ppt/presProps.xml", format!("{CT_BASE}.presProps+xml")),
        ("/ppt/viewProps.xml", format!("{CT_BASE}.viewProps+xml")),
        ("/ppt/tableStyles.xml", format!("{CT_BASE}.tableStyles+xml")),
        ("/ppt/slideMasters/slideMaster1.xml", format!("{CT_BASE}.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml", format!("{CT_BASE}.slideLayout+xml")),
        (
            "/ppt/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
        ),
    ];
    for (part, ct) in &overrides {
        let _ = write!(xml, r#"<Override PartName="{part}" ContentType="{ct}"/>"#);
    }
    for num in 1..=slides {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{num}.xml" ContentType="{CT_BASE}.slide+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels_xml() -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<Relationships xmlns="{REL_NS}">"#);
    let _ = write!(
        xml,
        r#"<Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="ppt/presentation.xml"/>"#
    );
    xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
    let _ = write!(
        xml,
        r#"<Relationship Id="rId3" Type="{REL_BASE}/extended-properties" Target="docProps/app.xml"/>"#
    );
    xml.push_str("</Relationships>");
    xml
}

/// Relationship part with `(id, type suffix, target)` entries.
fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<Relationships xmlns="{REL_NS}">"#);
    for (id, kind, target) in entries {
        let _ = write!(
            xml,
            r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{target}"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_xml(title: &str) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    let _ = write!(xml, "<dc:title>{}</dc:title>", escape(title));
    xml.push_str("<dc:creator>qa2deck</dc:creator>");
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_xml(slides: usize) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#);
    let _ = write!(
        xml,
        "<Application>qa2deck</Application><Slides>{slides}</Slides>"
    );
    xml.push_str("</Properties>");
    xml
}

// ── Presentation part ────────────────────────────────────────────────────────

/// Relationship ids in `presentation.xml.rels`: five fixed parts, then slides.
const FIXED_PRESENTATION_RELS: usize = 5;
/// First id in `sldIdLst`; ids below 256 are reserved.
const FIRST_SLIDE_ID: usize = 256;

fn presentation_xml(slides: usize) -> String {
    let mut xml = String::with_capacity(1024 + slides * 48);
    xml.push_str(XML_DECL);
    let _ = write!(
        xml,
        r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1">"#
    );
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str("<p:sldIdLst>");
    for i in 0..slides {
        let _ = write!(
            xml,
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            FIRST_SLIDE_ID + i,
            FIXED_PRESENTATION_RELS + 1 + i
        );
    }
    xml.push_str("</p:sldIdLst>");
    let _ = write!(
        xml,
        r#"<p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/><p:notesSz cx="6858000" cy="9144000"/>"#
    );
    xml.push_str("</p:presentation>");
    xml
}

fn presentation_rels_xml(slides: usize) -> String {
    let mut entries: Vec<(String, &str, String)> = vec![
        ("rId1".into(), "slideMaster", "slideMasters/slideMaster1.xml".into()),
        ("rId2".into(), "presProps", "presProps.xml".into()),
        ("rId3".into(), "viewProps", "viewProps.xml".into()),
        ("rId4".into(), "theme", "theme/theme1.xml".into()),
        ("rId5".into(), "tableStyles", "tableStyles.xml".into()),
    ];
    for i in 0..slides {
        entries.push((
            format!("rId{}", FIXED_PRESENTATION_RELS + 1 + i),
            "slide",
            format!("slides/slide{}.xml", i + 1),
        ));
    }
    let borrowed: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    relationships(&borrowed)
}

fn pres_props_xml() -> String {
    format!(r#"{XML_DECL}<p:presentationPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"/>"#)
}

fn view_props_xml() -> String {
    format!(
        r#"{XML_DECL}<p:viewPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:normalViewPr><p:restoredLeft sz="15620"/><p:restoredTop sz="94660"/></p:normalViewPr><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#
    )
}

fn table_styles_xml() -> String {
    format!(
        r#"{XML_DECL}<a:tblStyleLst xmlns:a="{NS_A}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#
    )
}

// ── Slide parts ──────────────────────────────────────────────────────────────

fn slide_xml(slide: &Slide) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECL);
    let _ = write!(
        xml,
        r#"<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#
    );
    xml.push_str("<p:cSld><p:spTree>");
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
    xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
    // Shape id 1 is the group; text boxes start at 2.
    for (i, block) in slide.blocks.iter().enumerate() {
        text_box_xml(&mut xml, i + 2, block);
    }
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:sld>");
    xml
}

fn text_box_xml(xml: &mut String, id: usize, block: &TextBlock) {
    let f = block.frame;
    let anchor = match block.anchor {
        Anchor::Top => "t",
        Anchor::Middle => "ctr",
    };

    xml.push_str("<p:sp><p:nvSpPr>");
    let _ = write!(
        xml,
        r#"<p:cNvPr id="{id}" name="{} {id}"/>"#,
        block.role.shape_name()
    );
    xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);
    let _ = write!(
        xml,
        r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
        f.x, f.y, f.cx, f.cy
    );
    let _ = write!(
        xml,
        r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{anchor}"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#
    );

    // Empty text still needs one paragraph for the body to be valid.
    if block.text.is_empty() {
        paragraph_xml(xml, block, None);
    } else {
        for line in block.text.split('\n') {
            paragraph_xml(xml, block, Some(line));
        }
    }
    xml.push_str("</p:txBody></p:sp>");
}

fn paragraph_xml(xml: &mut String, block: &TextBlock, line: Option<&str>) {
    let algn = match block.align {
        Align::Left => "l",
        Align::Center => "ctr",
    };
    let sz = block.font_size * 100;
    let b = if block.bold { r#" b="1""# } else { "" };

    let _ = write!(xml, r#"<a:p><a:pPr algn="{algn}"/>"#);
    match line {
        Some(text) if !text.is_empty() => {
            let _ = write!(
                xml,
                r#"<a:r><a:rPr lang="en-US" sz="{sz}"{b} dirty="0"/><a:t>{}</a:t></a:r>"#,
                escape(text)
            );
        }
        _ => {
            let _ = write!(xml, r#"<a:endParaRPr lang="en-US" sz="{sz}"{b} dirty="0"/>"#);
        }
    }
    xml.push_str("</a:p>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::pipeline::deck::{build_deck, DeckLayout};
    use crate::pipeline::template::check_well_formed;
    use std::io::Read;
    use std::path::Path;
    use zip::ZipArchive;

    fn render(records: &[Record]) -> Vec<u8> {
        let deck = build_deck(records, &DeckLayout::default());
        write_package(&deck, &TemplateParts::builtin()).unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn package_contains_one_part_per_slide() {
        let bytes = render(&[Record::new("Capital of France?", "Paris")]);
        let archive = ZipArchive::new(Cursor::new(&bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"ppt/slides/slide1.xml"));
        assert!(names.contains(&"ppt/slides/slide2.xml"));
        assert!(!names.contains(&"ppt/slides/slide3.xml"));

        let pres = read_part(&bytes, "ppt/presentation.xml");
        assert_eq!(pres.matches("<p:sldId ").count(), 2);
        let app = read_part(&bytes, "docProps/app.xml");
        assert!(app.contains("<Slides>2</Slides>"));
    }

    #[test]
    fn content_types_is_first_entry() {
        let bytes = render(&[]);
        let mut archive = ZipArchive::new(Cursor::new(&bytes)).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
    }

    #[test]
    fn record_text_lands_on_its_slide() {
        let bytes = render(&[Record::new("Capital of France?", "Paris")]);
        let slide = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains("<a:t>Capital of France?</a:t>"));
        assert!(slide.contains("<a:t>Paris</a:t>"));

        let framing = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(framing.contains("<a:t>Questions &amp; Answers</a:t>"));
    }

    #[test]
    fn markup_in_cells_is_escaped() {
        let bytes = render(&[Record::new("<b>1 < 2</b> & \"q\"", "it's")]);
        let slide = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains("&lt;b&gt;1 &lt; 2&lt;/b&gt; &amp; &quot;q&quot;"));
        check_well_formed(Path::new("slide2.xml"), &slide, "sld").unwrap();
    }

    #[test]
    fn every_xml_part_is_well_formed() {
        let bytes = render(&[
            Record::new("multi\nline\n\nquestion", ""),
            Record::new("", "answer only"),
        ]);
        let mut archive = ZipArchive::new(Cursor::new(&bytes)).unwrap();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let name = file.name().to_string();
            let mut s = String::new();
            file.read_to_string(&mut s).unwrap();
            let mut reader = quick_xml::Reader::from_str(&s);
            loop {
                match reader.read_event() {
                    Ok(quick_xml::events::Event::Eof) => break,
                    Ok(_) => {}
                    Err(e) => panic!("{name} is not well-formed: {e}"),
                }
            }
        }
    }

    #[test]
    fn multiline_text_becomes_paragraphs() {
        let bytes = render(&[Record::new("q", "one\ntwo")]);
        let slide = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains("<a:t>one</a:t></a:r></a:p><a:p>"));
        assert!(slide.contains("<a:t>two</a:t>"));
    }

    #[test]
    fn output_is_deterministic() {
        let records = vec![Record::new("Q1", "A1"), Record::new("Q2", "A2")];
        assert_eq!(render(&records), render(&records));
    }

    #[test]
    fn template_override_is_packaged() {
        let mut template = TemplateParts::builtin();
        template.theme = template.theme.replace("Calibri", "Georgia");
        let deck = build_deck(&[], &DeckLayout::default());
        let bytes = write_package(&deck, &template).unwrap();
        assert!(read_part(&bytes, "ppt/theme/theme1.xml").contains("Georgia"));
    }
}
