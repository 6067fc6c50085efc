//! PPTX package writer implementation.
//!
//! The package is assembled in a temp file next to the destination and
//! renamed into place only after the size sanity check, so a failed or
//! interrupted build never leaves a partial artifact behind.

use deck_core::{Artifact, Deck, DeckWrite, ElementKind, Error, PipelineConfig, Result, Slide};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{HashMap, HashSet};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Slide canvas in EMUs (16:9).
const EMU_SLIDE_CX: i64 = 12_192_000;
const EMU_SLIDE_CY: i64 = 6_858_000;

/// Notes page in EMUs (portrait).
const EMU_NOTES_CX: i64 = 6_858_000;
const EMU_NOTES_CY: i64 = 9_144_000;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_XML: &str = "application/xml";
const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_NOTES_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

/// One deduplicated media file referenced by the deck.
#[derive(Debug)]
struct MediaPart {
    /// Source path as written in the markup.
    source: String,
    /// File name under ppt/media/.
    part_name: String,
    /// Lowercased extension, used for the content-type default.
    extension: String,
    /// MIME type matching the extension.
    content_type: &'static str,
}

/// Writer that serializes a finalized deck into one .pptx package.
pub struct DeckWriter {
    canvas_width: f64,
    canvas_height: f64,
    min_artifact_bytes: u64,
    media_root: PathBuf,
}

impl DeckWriter {
    /// Create a writer from the pipeline configuration. Image sources are
    /// resolved against the current directory unless a media root is set.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            min_artifact_bytes: config.min_artifact_bytes,
            media_root: PathBuf::from("."),
        }
    }

    /// Resolve image sources against this directory.
    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = root.into();
        self
    }

    fn write_package<W: IoWrite + std::io::Seek>(&self, deck: &Deck, out: W) -> Result<()> {
        let mut zip = ZipWriter::new(out);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let media = collect_media(deck)?;

        put(&mut zip, options, "[Content_Types].xml", &content_types(deck, &media)?)?;
        put(&mut zip, options, "_rels/.rels", crate::parts::ROOT_RELS.as_bytes())?;
        put(&mut zip, options, "ppt/presentation.xml", &self.presentation_xml(deck)?)?;
        put(
            &mut zip,
            options,
            "ppt/_rels/presentation.xml.rels",
            &presentation_rels(deck)?,
        )?;
        put(
            &mut zip,
            options,
            "ppt/slideMasters/slideMaster1.xml",
            crate::parts::SLIDE_MASTER.as_bytes(),
        )?;
        put(
            &mut zip,
            options,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            crate::parts::SLIDE_MASTER_RELS.as_bytes(),
        )?;
        put(
            &mut zip,
            options,
            "ppt/slideLayouts/slideLayout1.xml",
            crate::parts::SLIDE_LAYOUT.as_bytes(),
        )?;
        put(
            &mut zip,
            options,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            crate::parts::SLIDE_LAYOUT_RELS.as_bytes(),
        )?;
        put(&mut zip, options, "ppt/theme/theme1.xml", crate::parts::THEME.as_bytes())?;

        let part_by_source: HashMap<&str, &str> = media
            .iter()
            .map(|m| (m.source.as_str(), m.part_name.as_str()))
            .collect();

        for (seq, slide) in deck.slides().iter().enumerate() {
            let seq = seq + 1;
            let image_rids = assign_image_rids(slide);

            put(
                &mut zip,
                options,
                &format!("ppt/slides/slide{}.xml", seq),
                &self.slide_xml(slide, &image_rids)?,
            )?;
            put(
                &mut zip,
                options,
                &format!("ppt/slides/_rels/slide{}.xml.rels", seq),
                &slide_rels(slide, seq, &image_rids, &part_by_source)?,
            )?;

            if slide.notes.is_some() {
                put(
                    &mut zip,
                    options,
                    &format!("ppt/notesSlides/notesSlide{}.xml", seq),
                    &notes_slide_xml(slide)?,
                )?;
                put(
                    &mut zip,
                    options,
                    &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", seq),
                    &notes_slide_rels(seq)?,
                )?;
            }
        }

        for part in &media {
            let source_path = self.media_root.join(&part.source);
            let bytes = std::fs::read(&source_path).map_err(|e| {
                Error::InvalidManifest(format!(
                    "cannot read image '{}': {}",
                    source_path.display(),
                    e
                ))
            })?;
            put(&mut zip, options, &format!("ppt/media/{}", part.part_name), &bytes)?;
        }

        zip.finish().map_err(|e| Error::Zip(e.to_string()))?;
        Ok(())
    }

    fn emu_x(&self, value: f64) -> i64 {
        ((value / self.canvas_width) * EMU_SLIDE_CX as f64).round() as i64
    }

    fn emu_y(&self, value: f64) -> i64 {
        ((value / self.canvas_height) * EMU_SLIDE_CY as f64).round() as i64
    }

    fn presentation_xml(&self, deck: &Deck) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open(
            "p:presentation",
            &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)],
        )?;

        xml.open("p:sldMasterIdLst", &[])?;
        xml.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
        xml.close("p:sldMasterIdLst")?;

        xml.open("p:sldIdLst", &[])?;
        for seq in 1..=deck.len() {
            xml.empty(
                "p:sldId",
                &[
                    ("id", &(255 + seq).to_string()),
                    ("r:id", &format!("rId{}", seq + 1)),
                ],
            )?;
        }
        xml.close("p:sldIdLst")?;

        xml.empty(
            "p:sldSz",
            &[
                ("cx", &EMU_SLIDE_CX.to_string()),
                ("cy", &EMU_SLIDE_CY.to_string()),
            ],
        )?;
        xml.empty(
            "p:notesSz",
            &[
                ("cx", &EMU_NOTES_CX.to_string()),
                ("cy", &EMU_NOTES_CY.to_string()),
            ],
        )?;
        xml.close("p:presentation")?;
        Ok(xml.finish())
    }

    fn slide_xml(&self, slide: &Slide, image_rids: &HashMap<String, String>) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open(
            "p:sld",
            &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)],
        )?;
        xml.open("p:cSld", &[])?;
        xml.open("p:spTree", &[])?;
        xml.open("p:nvGrpSpPr", &[])?;
        xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
        xml.empty("p:cNvGrpSpPr", &[])?;
        xml.empty("p:nvPr", &[])?;
        xml.close("p:nvGrpSpPr")?;
        xml.empty("p:grpSpPr", &[])?;

        for (idx, element) in slide.elements.iter().enumerate() {
            let shape_id = (idx + 2).to_string();
            let b = &element.bounds;
            let off = (self.emu_x(b.x), self.emu_y(b.y));
            let ext = (self.emu_x(b.width), self.emu_y(b.height));

            match &element.kind {
                ElementKind::Text { text } => {
                    xml.open("p:sp", &[])?;
                    xml.open("p:nvSpPr", &[])?;
                    xml.empty(
                        "p:cNvPr",
                        &[("id", &shape_id), ("name", &format!("TextBox {}", idx + 1))],
                    )?;
                    xml.empty("p:cNvSpPr", &[("txBox", "1")])?;
                    xml.empty("p:nvPr", &[])?;
                    xml.close("p:nvSpPr")?;
                    write_shape_properties(&mut xml, off, ext)?;
                    xml.open("p:txBody", &[])?;
                    xml.empty("a:bodyPr", &[])?;
                    xml.empty("a:lstStyle", &[])?;
                    write_paragraphs(&mut xml, text)?;
                    xml.close("p:txBody")?;
                    xml.close("p:sp")?;
                }
                ElementKind::Image { source } => {
                    let rid = image_rids.get(source).ok_or_else(|| {
                        Error::Xml(format!("no relationship id for image '{}'", source))
                    })?;
                    xml.open("p:pic", &[])?;
                    xml.open("p:nvPicPr", &[])?;
                    xml.empty(
                        "p:cNvPr",
                        &[("id", &shape_id), ("name", &format!("Picture {}", idx + 1))],
                    )?;
                    xml.empty("p:cNvPicPr", &[])?;
                    xml.empty("p:nvPr", &[])?;
                    xml.close("p:nvPicPr")?;
                    xml.open("p:blipFill", &[])?;
                    xml.empty("a:blip", &[("r:embed", rid)])?;
                    xml.open("a:stretch", &[])?;
                    xml.empty("a:fillRect", &[])?;
                    xml.close("a:stretch")?;
                    xml.close("p:blipFill")?;
                    write_shape_properties(&mut xml, off, ext)?;
                    xml.close("p:pic")?;
                }
            }
        }

        xml.close("p:spTree")?;
        xml.close("p:cSld")?;
        xml.open("p:clrMapOvr", &[])?;
        xml.empty("a:masterClrMapping", &[])?;
        xml.close("p:clrMapOvr")?;
        xml.close("p:sld")?;
        Ok(xml.finish())
    }
}

impl DeckWrite for DeckWriter {
    fn write(&self, deck: &Deck, path: &Path) -> Result<Artifact> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        let out = tmp.as_file().try_clone()?;
        self.write_package(deck, out)?;

        let bytes = tmp.as_file().metadata()?.len();
        if bytes < self.min_artifact_bytes {
            // Dropping the temp file removes it; nothing reaches `path`.
            return Err(Error::SuspiciouslySmallArtifact {
                size: bytes,
                minimum: self.min_artifact_bytes,
            });
        }

        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        log::debug!("persisted {} ({} bytes)", path.display(), bytes);

        Ok(Artifact {
            path: path.to_path_buf(),
            bytes,
        })
    }
}

/// Add one named part to the archive.
fn put<W: IoWrite + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: FileOptions,
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::Zip(format!("cannot start '{}': {}", name, e)))?;
    zip.write_all(bytes)?;
    Ok(())
}

/// Thin wrapper over the XML event writer keeping part generation terse.
struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(|e| Error::Xml(e.to_string()))?;
        Ok(Self { writer })
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut e = BytesStart::new(name.to_string());
        for (key, value) in attrs {
            e.push_attribute((*key, *value));
        }
        e
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.writer
            .write_event(Event::Start(Self::element(name, attrs)))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name.to_string())))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.writer
            .write_event(Event::Empty(Self::element(name, attrs)))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn write_shape_properties(xml: &mut Xml, off: (i64, i64), ext: (i64, i64)) -> Result<()> {
    xml.open("p:spPr", &[])?;
    xml.open("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", &off.0.to_string()), ("y", &off.1.to_string())])?;
    xml.empty("a:ext", &[("cx", &ext.0.to_string()), ("cy", &ext.1.to_string())])?;
    xml.close("a:xfrm")?;
    xml.open("a:prstGeom", &[("prst", "rect")])?;
    xml.empty("a:avLst", &[])?;
    xml.close("a:prstGeom")?;
    xml.close("p:spPr")
}

/// One a:p per text line; an empty body still gets one empty paragraph.
fn write_paragraphs(xml: &mut Xml, text: &str) -> Result<()> {
    if text.is_empty() {
        xml.empty("a:p", &[])?;
        return Ok(());
    }
    for line in text.split('\n') {
        xml.open("a:p", &[])?;
        xml.open("a:r", &[])?;
        xml.open("a:t", &[])?;
        xml.text(line)?;
        xml.close("a:t")?;
        xml.close("a:r")?;
        xml.close("a:p")?;
    }
    Ok(())
}

fn notes_slide_xml(slide: &Slide) -> Result<Vec<u8>> {
    let notes = slide.notes.as_deref().unwrap_or_default();

    let mut xml = Xml::new()?;
    xml.open(
        "p:notes",
        &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)],
    )?;
    xml.open("p:cSld", &[])?;
    xml.open("p:spTree", &[])?;
    xml.open("p:nvGrpSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    xml.empty("p:cNvGrpSpPr", &[])?;
    xml.empty("p:nvPr", &[])?;
    xml.close("p:nvGrpSpPr")?;
    xml.empty("p:grpSpPr", &[])?;

    xml.open("p:sp", &[])?;
    xml.open("p:nvSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "2"), ("name", "Notes Placeholder 1")])?;
    xml.empty("p:cNvSpPr", &[])?;
    xml.open("p:nvPr", &[])?;
    xml.empty("p:ph", &[("type", "body"), ("idx", "1")])?;
    xml.close("p:nvPr")?;
    xml.close("p:nvSpPr")?;
    xml.empty("p:spPr", &[])?;
    xml.open("p:txBody", &[])?;
    xml.empty("a:bodyPr", &[])?;
    xml.empty("a:lstStyle", &[])?;
    write_paragraphs(&mut xml, notes)?;
    xml.close("p:txBody")?;
    xml.close("p:sp")?;

    xml.close("p:spTree")?;
    xml.close("p:cSld")?;
    xml.open("p:clrMapOvr", &[])?;
    xml.empty("a:masterClrMapping", &[])?;
    xml.close("p:clrMapOvr")?;
    xml.close("p:notes")?;
    Ok(xml.finish())
}

fn relationships(entries: &[(String, &str, String)]) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.open("Relationships", &[("xmlns", NS_REL)])?;
    for (id, rel_type, target) in entries {
        xml.empty(
            "Relationship",
            &[("Id", id), ("Type", rel_type), ("Target", target)],
        )?;
    }
    xml.close("Relationships")?;
    Ok(xml.finish())
}

fn presentation_rels(deck: &Deck) -> Result<Vec<u8>> {
    let mut entries = vec![(
        "rId1".to_string(),
        REL_SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for seq in 1..=deck.len() {
        entries.push((
            format!("rId{}", seq + 1),
            REL_SLIDE,
            format!("slides/slide{}.xml", seq),
        ));
    }
    relationships(&entries)
}

/// Relationship ids for a slide part: rId1 is the layout, rId2 the notes
/// slide when present, images follow in declared order.
fn assign_image_rids(slide: &Slide) -> HashMap<String, String> {
    let mut rids = HashMap::new();
    let mut next = if slide.notes.is_some() { 3 } else { 2 };
    for source in slide.image_sources() {
        if !rids.contains_key(source) {
            rids.insert(source.to_string(), format!("rId{}", next));
            next += 1;
        }
    }
    rids
}

fn slide_rels(
    slide: &Slide,
    seq: usize,
    image_rids: &HashMap<String, String>,
    part_by_source: &HashMap<&str, &str>,
) -> Result<Vec<u8>> {
    let mut entries = vec![(
        "rId1".to_string(),
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml".to_string(),
    )];
    if slide.notes.is_some() {
        entries.push((
            "rId2".to_string(),
            REL_NOTES_SLIDE,
            format!("../notesSlides/notesSlide{}.xml", seq),
        ));
    }

    let mut image_entries: Vec<(&String, &String)> = image_rids.iter().collect();
    image_entries.sort_by_key(|(_, rid)| rid.trim_start_matches("rId").parse::<usize>().unwrap_or(0));
    for (source, rid) in image_entries {
        let part = part_by_source.get(source.as_str()).ok_or_else(|| {
            Error::Xml(format!("no media part collected for image '{}'", source))
        })?;
        entries.push((rid.clone(), REL_IMAGE, format!("../media/{}", part)));
    }

    relationships(&entries)
}

fn notes_slide_rels(seq: usize) -> Result<Vec<u8>> {
    relationships(&[(
        "rId1".to_string(),
        REL_SLIDE,
        format!("../slides/slide{}.xml", seq),
    )])
}

/// Deduplicate the deck's image sources into media parts.
fn collect_media(deck: &Deck) -> Result<Vec<MediaPart>> {
    let mut parts: Vec<MediaPart> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for slide in deck.slides() {
        for source in slide.image_sources() {
            if !seen.insert(source) {
                continue;
            }
            let extension = Path::new(source)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            let content_type = media_content_type(&extension).ok_or_else(|| {
                Error::InvalidManifest(format!("unsupported image format for '{}'", source))
            })?;
            let index = parts.len() + 1;
            parts.push(MediaPart {
                source: source.to_string(),
                part_name: format!("image{}.{}", index, extension),
                extension,
                content_type,
            });
        }
    }

    Ok(parts)
}

fn media_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn content_types(deck: &Deck, media: &[MediaPart]) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.open("Types", &[("xmlns", NS_CT)])?;
    xml.empty("Default", &[("Extension", "rels"), ("ContentType", CT_RELS)])?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", CT_XML)])?;

    let mut declared: Vec<&str> = Vec::new();
    for part in media {
        if declared.contains(&part.extension.as_str()) {
            continue;
        }
        declared.push(&part.extension);
        xml.empty(
            "Default",
            &[("Extension", &part.extension), ("ContentType", part.content_type)],
        )?;
    }

    xml.empty(
        "Override",
        &[("PartName", "/ppt/presentation.xml"), ("ContentType", CT_PRESENTATION)],
    )?;
    xml.empty(
        "Override",
        &[
            ("PartName", "/ppt/slideMasters/slideMaster1.xml"),
            ("ContentType", CT_SLIDE_MASTER),
        ],
    )?;
    xml.empty(
        "Override",
        &[
            ("PartName", "/ppt/slideLayouts/slideLayout1.xml"),
            ("ContentType", CT_SLIDE_LAYOUT),
        ],
    )?;
    xml.empty(
        "Override",
        &[("PartName", "/ppt/theme/theme1.xml"), ("ContentType", CT_THEME)],
    )?;

    for (seq, slide) in deck.slides().iter().enumerate() {
        let seq = seq + 1;
        xml.empty(
            "Override",
            &[
                ("PartName", &format!("/ppt/slides/slide{}.xml", seq)),
                ("ContentType", CT_SLIDE),
            ],
        )?;
        if slide.notes.is_some() {
            xml.empty(
                "Override",
                &[
                    ("PartName", &format!("/ppt/notesSlides/notesSlide{}.xml", seq)),
                    ("ContentType", CT_NOTES_SLIDE),
                ],
            )?;
        }
    }

    xml.close("Types")?;
    Ok(xml.finish())
}
