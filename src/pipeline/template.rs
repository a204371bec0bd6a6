//! Fixed slide master, layout and theme parts.
//!
//! Every deck uses one master with a single blank layout; all visible content
//! lives in text boxes placed by [`crate::pipeline::deck`]. The built-in parts
//! are the bare minimum a PresentationML consumer needs. An operator can swap
//! in their own master/layout/theme (corporate colours, fonts) by pointing
//! `template_dir` at a directory holding the three files; those are checked
//! for well-formedness up front so a broken deployment fails as a
//! [`RenderError`] instead of producing an unreadable deck.

use crate::error::RenderError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MASTER_FILE: &str = "slideMaster1.xml";
pub const LAYOUT_FILE: &str = "slideLayout1.xml";
pub const THEME_FILE: &str = "theme1.xml";

/// The three structural parts shared by every slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParts {
    pub slide_master: String,
    pub slide_layout: String,
    pub theme: String,
}

impl TemplateParts {
    /// Built-in parts.
    pub fn builtin() -> Self {
        Self {
            slide_master: SLIDE_MASTER_XML.to_string(),
            slide_layout: SLIDE_LAYOUT_XML.to_string(),
            theme: THEME_XML.to_string(),
        }
    }

    /// Built-in parts, or the overrides in `dir` when one is configured.
    pub fn load(dir: Option<&Path>) -> Result<Self, RenderError> {
        match dir {
            None => Ok(Self::builtin()),
            Some(dir) => Self::load_dir(dir),
        }
    }

    fn load_dir(dir: &Path) -> Result<Self, RenderError> {
        debug!("Loading slide template overrides from {}", dir.display());
        Ok(Self {
            slide_master: read_part(&dir.join(MASTER_FILE), "sldMaster")?,
            slide_layout: read_part(&dir.join(LAYOUT_FILE), "sldLayout")?,
            theme: read_part(&dir.join(THEME_FILE), "theme")?,
        })
    }
}

fn read_part(path: &Path, root: &str) -> Result<String, RenderError> {
    let xml = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateMissing {
        path: path.to_path_buf(),
        source,
    })?;
    check_well_formed(path, &xml, root)?;
    Ok(xml)
}

/// Verify `xml` parses completely, closes every element, and has the
/// expected root element (local name, namespace prefix ignored).
pub fn check_well_formed(path: &Path, xml: &str, expected_root: &str) -> Result<(), RenderError> {
    let corrupt = |detail: String| RenderError::TemplateCorrupt {
        path: PathBuf::from(path),
        detail,
    };

    let mut reader = Reader::from_str(xml);
    let mut depth: usize = 0;
    let mut root: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_none() {
                    root = Some(e.local_name().as_ref().to_vec());
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if root.is_none() {
                    root = Some(e.local_name().as_ref().to_vec());
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(corrupt(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if depth != 0 {
        return Err(corrupt(format!("{depth} unclosed element(s) at end of file")));
    }
    match root {
        None => Err(corrupt("no root element".to_string())),
        Some(name) if name != expected_root.as_bytes() => Err(corrupt(format!(
            "root element is <{}>, expected <{}>",
            String::from_utf8_lossy(&name),
            expected_root
        ))),
        Some(_) => Ok(()),
    }
}

// ── Built-in parts ───────────────────────────────────────────────────────────

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

const SLIDE_MASTER_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#,
    r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"<p:txStyles>"#,
    r#"<p:titleStyle><a:lvl1pPr algn="ctr"><a:defRPr sz="4400" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle>"#,
    r#"<p:bodyStyle><a:lvl1pPr><a:defRPr sz="2400" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:bodyStyle>"#,
    r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:otherStyle>"#,
    r#"</p:txStyles>"#,
    r#"</p:sldMaster>"#
);

const SLIDE_LAYOUT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sldLayout>"#
);

const THEME_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
    r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F497D"/></a:dk2>"#,
    r#"<a:lt2><a:srgbClr val="EEECE1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4F81BD"/></a:accent1>"#,
    r#"<a:accent2><a:srgbClr val="C0504D"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="9BBB59"/></a:accent3>"#,
    r#"<a:accent4><a:srgbClr val="8064A2"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="4BACC6"/></a:accent5>"#,
    r#"<a:accent6><a:srgbClr val="F79646"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0000FF"/></a:hlink>"#,
    r#"<a:folHlink><a:srgbClr val="800080"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:tint val="50000"/></a:schemeClr></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:shade val="80000"/></a:schemeClr></a:solidFill>"#,
    r#"</a:fillStyleLst>"#,
    r#"<a:lnStyleLst>"#,
    r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst>"#,
    r#"<a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:tint val="95000"/></a:schemeClr></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:shade val="90000"/></a:schemeClr></a:solidFill>"#,
    r#"</a:bgFillStyleLst>"#,
    r#"</a:fmtScheme>"#,
    r#"</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#
);

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_parts_are_well_formed() {
        let parts = TemplateParts::builtin();
        let p = Path::new("builtin");
        check_well_formed(p, &parts.slide_master, "sldMaster").unwrap();
        check_well_formed(p, &parts.slide_layout, "sldLayout").unwrap();
        check_well_formed(p, &parts.theme, "theme").unwrap();
    }

    #[test]
    fn no_dir_means_builtin() {
        assert_eq!(TemplateParts::load(None).unwrap(), TemplateParts::builtin());
    }

    #[test]
    fn loads_override_dir() {
        let dir = TempDir::new().unwrap();
        let builtin = TemplateParts::builtin();
        std::fs::write(dir.path().join(MASTER_FILE), &builtin.slide_master).unwrap();
        std::fs::write(dir.path().join(LAYOUT_FILE), &builtin.slide_layout).unwrap();
        let theme = builtin.theme.replace("Calibri", "Georgia");
        std::fs::write(dir.path().join(THEME_FILE), &theme).unwrap();

        let parts = TemplateParts::load(Some(dir.path())).unwrap();
        assert!(parts.theme.contains("Georgia"));
    }

    #[test]
    fn missing_override_file_is_template_missing() {
        let dir = TempDir::new().unwrap();
        let err = TemplateParts::load(Some(dir.path())).unwrap_err();
        assert!(
            matches!(err, RenderError::TemplateMissing { ref path, .. } if path.ends_with(MASTER_FILE)),
            "got: {err}"
        );
    }

    #[test]
    fn truncated_xml_is_corrupt() {
        let err = check_well_formed(Path::new("t.xml"), "<a:theme><a:x>", "theme").unwrap_err();
        assert!(matches!(err, RenderError::TemplateCorrupt { .. }), "got: {err}");
    }

    #[test]
    fn mismatched_tags_are_corrupt() {
        let err = check_well_formed(Path::new("t.xml"), "<theme><x></y></theme>", "theme").unwrap_err();
        assert!(matches!(err, RenderError::TemplateCorrupt { .. }));
    }

    #[test]
    fn wrong_root_is_corrupt() {
        let err = check_well_formed(Path::new("t.xml"), "<p:sld/>", "sldMaster").unwrap_err();
        assert!(err.to_string().contains("expected <sldMaster>"), "got: {err}");
    }

    #[test]
    fn empty_file_is_corrupt() {
        let err = check_well_formed(Path::new("t.xml"), "", "theme").unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }
}
