//! EPUB extraction: OPF metadata plus spine text.
//!
//! Parsing sequence:
//!   1. META-INF/container.xml → OPF file path
//!   2. OPF → metadata (title, creator, language) + spine order
//!   3. Each spine XHTML file → paragraphs via text-node walk
//!
//! The spine item count doubles as the page count.

use std::collections::HashMap;
use std::io::Read;

use anyhow::{bail, Result};
use quick_xml::events::Event;

use lectern_common::kind::DocKind;

use crate::{DocMetadata, Extraction, Extractor};

pub struct EpubExtractor;

impl Extractor for EpubExtractor {
    fn name(&self) -> &'static str {
        "epub"
    }

    fn accepts(&self, kind: DocKind) -> bool {
        kind == DocKind::Epub
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor)?;

        let opf_path = {
            let mut entry = archive.by_name("META-INF/container.xml")?;
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            find_opf_path(&xml)?
        };

        let (metadata, spine_hrefs) = {
            let mut entry = archive.by_name(&opf_path)?;
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            let opf_dir = opf_path.rfind('/').map(|i| &opf_path[..i]).unwrap_or("");
            parse_opf(&xml, opf_dir)
        };

        let mut paragraphs: Vec<String> = Vec::new();
        for href in &spine_hrefs {
            let xml = match archive.by_name(href) {
                Ok(mut entry) => {
                    let mut s = String::new();
                    // Unreadable spine items are skipped, not fatal.
                    let _ = entry.read_to_string(&mut s);
                    s
                }
                Err(_) => continue,
            };
            paragraphs.extend(extract_xhtml_text(&xml));
        }

        Ok(Extraction {
            metadata,
            text: paragraphs.join("\n"),
            page_count: spine_hrefs.len(),
        })
    }
}

// ── container.xml ─────────────────────────────────────────────────────────────

/// The `full-path` attribute of the first `<rootfile>` element.
fn find_opf_path(xml: &str) -> Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"rootfile" =>
            {
                if let Some(path) = get_attr(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    bail!("rootfile not found in META-INF/container.xml")
}

// ── OPF ───────────────────────────────────────────────────────────────────────

/// Parse the OPF package document into metadata plus the ordered list of
/// content file paths (resolved relative to the OPF directory).
fn parse_opf(xml: &str, opf_dir: &str) -> (DocMetadata, Vec<String>) {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut metadata = DocMetadata::default();
    let mut manifest: HashMap<String, String> = HashMap::new();
    let mut spine_idrefs: Vec<String> = Vec::new();

    let mut current_field: Option<&'static str> = None;
    let mut in_manifest = false;
    let mut in_spine = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"manifest" => in_manifest = true,
                b"spine" => in_spine = true,
                b"title" => current_field = Some("title"),
                b"creator" => current_field = Some("creator"),
                b"language" => current_field = Some("language"),
                b"subject" => current_field = Some("subject"),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"manifest" => in_manifest = false,
                b"spine" => in_spine = false,
                _ => current_field = None,
            },
            Ok(Event::Empty(e)) => {
                if in_manifest && e.local_name().as_ref() == b"item" {
                    if let (Some(id), Some(href)) = (get_attr(&e, b"id"), get_attr(&e, b"href")) {
                        let full = if opf_dir.is_empty() {
                            href
                        } else {
                            format!("{}/{}", opf_dir, href)
                        };
                        manifest.insert(id, full);
                    }
                } else if in_spine && e.local_name().as_ref() == b"itemref" {
                    if let Some(idref) = get_attr(&e, b"idref") {
                        spine_idrefs.push(idref);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = current_field.take() {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            match field {
                                "title" => metadata.title.get_or_insert(text),
                                "creator" => metadata.author.get_or_insert(text),
                                "language" => metadata.language.get_or_insert(text),
                                _ => metadata.subject.get_or_insert(text),
                            };
                        }
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let spine_hrefs = spine_idrefs
        .into_iter()
        .filter_map(|id| manifest.get(&id).cloned())
        .collect();

    (metadata, spine_hrefs)
}

// ── XHTML content ─────────────────────────────────────────────────────────────

/// Block elements whose closing tag flushes a paragraph.
const BLOCK_ELEMENTS: &[&[u8]] = &[
    b"h1", b"h2", b"h3", b"h4", b"h5", b"h6",
    b"p", b"li", b"dt", b"dd",
    b"td", b"th",
    b"pre", b"blockquote", b"figcaption",
];

/// Elements whose content is invisible to readers.
const SKIP_ELEMENTS: &[&[u8]] = &[b"script", b"style", b"head"];

/// Walk XHTML and return non-empty paragraph strings.
fn extract_xhtml_text(xml: &str) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut skip_depth: usize = 0;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if SKIP_ELEMENTS.contains(&e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                if SKIP_ELEMENTS.contains(&local.as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 && BLOCK_ELEMENTS.contains(&local.as_ref()) {
                    let text = current.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                    current.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if skip_depth == 0 {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    paragraphs
}

fn get_attr(e: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Minimal one-chapter EPUB zipped in memory.
    fn build_epub(title: &str, creator: &str, chapter_html: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();

        zip.start_file("META-INF/container.xml", opts).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

        zip.start_file("OEBPS/content.opf", opts).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#
            )
            .as_bytes(),
        )
        .unwrap();

        zip.start_file("OEBPS/chapter1.xhtml", opts).unwrap();
        zip.write_all(chapter_html.as_bytes()).unwrap();

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_metadata_and_text() {
        let epub = build_epub(
            "Distributed Systems",
            "M. Tanaka",
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>
              <h1>Consensus</h1>
              <p>Paxos made practical.</p>
            </body></html>"#,
        );

        let out = EpubExtractor.extract(&epub).unwrap();
        assert_eq!(out.metadata.title.as_deref(), Some("Distributed Systems"));
        assert_eq!(out.metadata.author.as_deref(), Some("M. Tanaka"));
        assert_eq!(out.metadata.language.as_deref(), Some("en"));
        assert!(out.text.contains("Consensus"));
        assert!(out.text.contains("Paxos made practical."));
        assert_eq!(out.page_count, 1);
    }

    #[test]
    fn script_and_style_content_excluded() {
        let epub = build_epub(
            "T",
            "A",
            r#"<html><head><style>body{}</style></head><body>
              <p>Visible.</p><script>var x = 1;</script>
            </body></html>"#,
        );
        let out = EpubExtractor.extract(&epub).unwrap();
        assert!(out.text.contains("Visible."));
        assert!(!out.text.contains("var x"));
        assert!(!out.text.contains("body{}"));
    }

    #[test]
    fn not_a_zip_is_an_error() {
        assert!(EpubExtractor.extract(b"plainly not an epub").is_err());
    }

    #[test]
    fn spine_order_preserved() {
        let xml = r#"<package xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata><dc:title>Test</dc:title></metadata>
  <manifest>
    <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
    <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="b"/><itemref idref="a"/></spine>
</package>"#;
        let (_, hrefs) = parse_opf(xml, "");
        assert_eq!(hrefs, vec!["b.xhtml", "a.xhtml"]);
    }
}
