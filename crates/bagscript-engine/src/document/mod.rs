//! High-level documents: pages, metadata and finishing into a PDF.

mod page;
mod render;
mod xml;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{EngineError, Result};
use crate::lang::Lang;
use crate::node::{Node, NodeKind, NodeRef};
use crate::pdf::{dict, name, Dict, ImageFile, Name, ObjectNumber, OutputSink, PdfValue, PdfWriter};
use crate::units::ScaledPoint;

pub use page::{Page, PlacedObject};
use render::ContentStream;

/// Output format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Pdf,
    PdfA3b,
    PdfX3,
    PdfX4,
    PdfUa,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Pdf,
        Format::PdfA3b,
        Format::PdfX3,
        Format::PdfX4,
        Format::PdfUa,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Pdf => "PDF",
            Format::PdfA3b => "PDF/A-3b",
            Format::PdfX3 => "PDF/X-3",
            Format::PdfX4 => "PDF/X-4",
            Format::PdfUa => "PDF/UA",
        }
    }

    /// Parse a format name; the empty string selects plain PDF
    pub fn parse(text: &str) -> Option<Format> {
        if text.is_empty() {
            return Some(Format::Pdf);
        }
        Format::ALL.into_iter().find(|f| f.name() == text)
    }

    fn output_intent_subtype(self) -> Option<&'static str> {
        match self {
            Format::PdfA3b => Some("GTS_PDFA1"),
            Format::PdfX3 | Format::PdfX4 => Some("GTS_PDFX"),
            Format::Pdf | Format::PdfUa => None,
        }
    }
}

/// A file embedded into the PDF
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mimetype: String,
    pub description: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn from_file(path: &Path, mimetype: &str, description: &str) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Attachment {
            name,
            mimetype: mimetype.to_string(),
            description: description.to_string(),
            data,
        })
    }
}

/// ICC colour profile used for output intents
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfile {
    pub identifier: String,
    pub registry: String,
    pub info: String,
    pub condition: String,
    /// Number of colour components of the profile
    pub colors: i64,
    pub data: Vec<u8>,
}

impl ColorProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(ColorProfile {
            identifier: String::new(),
            registry: "http://www.color.org".to_string(),
            info: String::new(),
            condition: String::new(),
            colors: 4,
            data,
        })
    }
}

/// A document being built page by page
#[derive(Debug)]
pub struct Document {
    pub filename: PathBuf,
    writer: Rc<RefCell<PdfWriter>>,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    /// Creation date as `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`
    pub creation_date: Option<String>,
    pub bleed: ScaledPoint,
    pub compress_level: u32,
    pub default_page_width: ScaledPoint,
    pub default_page_height: ScaledPoint,
    pub dump_output: bool,
    pub format: Format,
    pub default_language: Option<Lang>,
    pub show_cutmarks: bool,
    pub show_hyperlinks: bool,
    pub suppress_info: bool,
    pub viewer_preferences: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
    pub color_profile: Option<Rc<RefCell<ColorProfile>>>,
    pages: Vec<Rc<RefCell<Page>>>,
    finished: bool,
}

impl Document {
    fn with_writer(filename: PathBuf, writer: PdfWriter) -> Self {
        Document {
            filename,
            writer: Rc::new(RefCell::new(writer)),
            title: String::new(),
            author: String::new(),
            subject: String::new(),
            keywords: String::new(),
            creator: String::new(),
            creation_date: None,
            bleed: ScaledPoint::ZERO,
            compress_level: 9,
            default_page_width: ScaledPoint::parse("210mm").unwrap_or_default(),
            default_page_height: ScaledPoint::parse("297mm").unwrap_or_default(),
            dump_output: false,
            format: Format::Pdf,
            default_language: None,
            show_cutmarks: false,
            show_hyperlinks: true,
            suppress_info: false,
            viewer_preferences: BTreeMap::new(),
            attachments: Vec::new(),
            color_profile: None,
            pages: Vec::new(),
            finished: false,
        }
    }

    /// Document writing to `path`
    pub fn create(path: &Path) -> Result<Self> {
        let writer = PdfWriter::create(path)?;
        Ok(Self::with_writer(path.to_path_buf(), writer))
    }

    /// Document kept in memory, mostly for tests
    pub fn in_memory() -> Self {
        Self::with_writer(PathBuf::new(), PdfWriter::in_memory())
    }

    /// The PDF writer shared with raw object construction
    pub fn writer(&self) -> Rc<RefCell<PdfWriter>> {
        self.writer.clone()
    }

    /// Create a page in the default size and append it to the document
    pub fn new_page(&mut self) -> Rc<RefCell<Page>> {
        let page = Rc::new(RefCell::new(Page::new(
            self.pages.len() + 1,
            self.default_page_width,
            self.default_page_height,
        )));
        self.pages.push(page.clone());
        page
    }

    pub fn pages(&self) -> &[Rc<RefCell<Page>>] {
        &self.pages
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn load_image_file(&self, path: &Path) -> Result<Rc<ImageFile>> {
        self.writer.borrow_mut().load_image_file(path)
    }

    /// Image node sized after the given page box of the image
    pub fn create_image_node(
        &self,
        image: &Rc<ImageFile>,
        page: u32,
        box_name: &str,
    ) -> Result<NodeRef> {
        let dimensions = image.get_pdf_box_dimensions(page, box_name)?;
        let to_sp = |key: &str| {
            let bp = dimensions.get(key).copied().unwrap_or_default();
            ScaledPoint::from_pt(bp * 72.27 / 72.0)
        };
        Ok(Node::new(NodeKind::Image {
            width: to_sp("w"),
            height: to_sp("h"),
            image: Some(image.clone()),
        }))
    }

    /// Write an XML description of all pages and their contents
    pub fn output_xml_dump<W: Write>(&self, out: W) -> Result<()> {
        xml::write_dump(self, out)
    }

    /// Render all shipped pages and finish the PDF
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(EngineError::Document("document already finished".to_string()));
        }
        let writer = self.writer.clone();
        let mut writer = writer.borrow_mut();
        for page in self.pages.clone() {
            let page = page.borrow();
            if !page.is_shipped() {
                log::warn!("page {} was not shipped out, skipping", page.number);
                continue;
            }
            self.write_page(&mut writer, &page)?;
        }
        self.write_catalog(&mut writer)?;
        if !self.suppress_info {
            writer.info = self.info_dict();
        }
        writer.finish()?;
        self.finished = true;
        if self.dump_output {
            if let OutputSink::File(path) = writer.sink() {
                let dump_path = path.with_extension("xml");
                let file = std::fs::File::create(&dump_path)?;
                self.output_xml_dump(std::io::BufWriter::new(file))?;
            }
        }
        Ok(())
    }

    fn write_page(&self, writer: &mut PdfWriter, page: &Page) -> Result<()> {
        let bleed = self.bleed;
        let mut content = ContentStream::default();
        for placed in page.objects() {
            content.vlist(&placed.vlist, placed.x + bleed, placed.y + bleed);
        }
        if self.show_cutmarks && !bleed.is_zero() {
            draw_cutmarks(&mut content, page.width, page.height, bleed);
        }

        let mut stream = writer.new_object();
        stream.data = content.ops.into_bytes();
        stream.set_compression(self.compress_level);
        stream.save(writer)?;

        let width = (page.width + bleed + bleed).to_bp();
        let height = (page.height + bleed + bleed).to_bp();
        let pdf_page = writer.add_page(width, height);
        let mut pdf_page = pdf_page.borrow_mut();
        pdf_page.contents = Some(stream.number);
        pdf_page.faces = content.faces;
        pdf_page.images = content.images;
        if !bleed.is_zero() {
            let b = bleed.to_bp();
            pdf_page.dict.insert(
                Name::new("TrimBox"),
                PdfValue::Array(
                    [b, b, width - b, height - b]
                        .into_iter()
                        .map(PdfValue::Float)
                        .collect(),
                ),
            );
        }
        Ok(())
    }

    fn write_catalog(&self, writer: &mut PdfWriter) -> Result<()> {
        let mut catalog = Dict::new();
        if let Some(lang) = &self.default_language {
            catalog.insert(Name::new("Lang"), PdfValue::String(lang.code.to_string()));
        }
        let mut preferences: Dict = self
            .viewer_preferences
            .iter()
            .map(|(k, v)| (Name::new(k.as_str()), preference_value(v)))
            .collect();
        if self.format == Format::PdfUa {
            preferences.insert(Name::new("DisplayDocTitle"), PdfValue::Bool(true));
            catalog.insert(
                Name::new("MarkInfo"),
                PdfValue::Dict(dict([("Marked", PdfValue::Bool(true))])),
            );
        }
        if !preferences.is_empty() {
            catalog.insert(Name::new("ViewerPreferences"), PdfValue::Dict(preferences));
        }

        if !self.attachments.is_empty() {
            let mut names = Vec::new();
            let mut specs = Vec::new();
            for attachment in &self.attachments {
                let spec = write_attachment(writer, attachment, self.compress_level)?;
                log::info!("Add attachment {}", attachment.name);
                names.push(PdfValue::String(attachment.name.clone()));
                names.push(PdfValue::Ref(spec));
                specs.push(PdfValue::Ref(spec));
            }
            catalog.insert(
                Name::new("Names"),
                PdfValue::Dict(dict([(
                    "EmbeddedFiles",
                    PdfValue::Dict(dict([("Names", PdfValue::Array(names))])),
                )])),
            );
            if self.format == Format::PdfA3b {
                catalog.insert(Name::new("AF"), PdfValue::Array(specs));
            }
        }

        if let Some(subtype) = self.format.output_intent_subtype() {
            match &self.color_profile {
                Some(profile) => {
                    let intent = write_output_intent(writer, &profile.borrow(), subtype)?;
                    catalog.insert(Name::new("OutputIntents"), PdfValue::Array(vec![intent]));
                }
                None => log::warn!(
                    "format {} without a color profile, no output intent written",
                    self.format.name()
                ),
            }
        }
        writer.catalog.extend(catalog);
        Ok(())
    }

    fn info_dict(&self) -> Dict {
        let mut info = Dict::new();
        let fields = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
            ("Creator", &self.creator),
        ];
        for (key, value) in fields {
            if !value.is_empty() {
                info.insert(Name::new(key), PdfValue::String(value.clone()));
            }
        }
        info.insert(
            Name::new("Producer"),
            PdfValue::String(format!("bagscript {}", crate::VERSION)),
        );
        if let Some(date) = &self.creation_date {
            let digits: String = date.chars().filter(char::is_ascii_digit).collect();
            info.insert(
                Name::new("CreationDate"),
                PdfValue::String(format!("D:{}", digits)),
            );
        }
        match self.format {
            Format::PdfX3 => {
                info.insert(Name::new("GTS_PDFXVersion"), PdfValue::String("PDF/X-3:2002".into()));
                info.insert(Name::new("Trapped"), name("False"));
            }
            Format::PdfX4 => {
                info.insert(Name::new("GTS_PDFXVersion"), PdfValue::String("PDF/X-4".into()));
                info.insert(Name::new("Trapped"), name("False"));
            }
            _ => {}
        }
        info
    }
}

/// Viewer preference values are booleans, numbers or names
fn preference_value(value: &str) -> PdfValue {
    match value {
        "true" => PdfValue::Bool(true),
        "false" => PdfValue::Bool(false),
        other => match other.parse::<i64>() {
            Ok(i) => PdfValue::Int(i),
            Err(_) => PdfValue::Name(Name::new(other.trim_start_matches('/'))),
        },
    }
}

fn write_attachment(writer: &mut PdfWriter, attachment: &Attachment, level: u32) -> Result<ObjectNumber> {
    let mut file = writer.new_object();
    file.dictionary = dict([
        ("Type", name("EmbeddedFile")),
        ("Subtype", name(&attachment.mimetype)),
    ]);
    file.data = attachment.data.clone();
    file.force_stream = true;
    file.set_compression(level);
    file.save(writer)?;

    let mut spec = writer.new_object();
    spec.dictionary = dict([
        ("Type", name("Filespec")),
        ("F", PdfValue::String(attachment.name.clone())),
        ("UF", PdfValue::String(attachment.name.clone())),
        ("Desc", PdfValue::String(attachment.description.clone())),
        ("AFRelationship", name("Unspecified")),
        ("EF", PdfValue::Dict(dict([("F", PdfValue::Ref(file.number))]))),
    ]);
    spec.save(writer)?;
    Ok(spec.number)
}

fn write_output_intent(writer: &mut PdfWriter, profile: &ColorProfile, subtype: &str) -> Result<PdfValue> {
    let mut stream = writer.new_object();
    stream.dictionary = dict([("N", PdfValue::Int(profile.colors))]);
    stream.data = profile.data.clone();
    stream.force_stream = true;
    stream.set_compression(6);
    stream.save(writer)?;
    Ok(PdfValue::Dict(dict([
        ("Type", name("OutputIntent")),
        ("S", name(subtype)),
        (
            "OutputConditionIdentifier",
            PdfValue::String(profile.identifier.clone()),
        ),
        ("RegistryName", PdfValue::String(profile.registry.clone())),
        ("Info", PdfValue::String(profile.info.clone())),
        ("OutputCondition", PdfValue::String(profile.condition.clone())),
        ("DestOutputProfile", PdfValue::Ref(stream.number)),
    ])))
}

fn draw_cutmarks(content: &mut ContentStream, width: ScaledPoint, height: ScaledPoint, bleed: ScaledPoint) {
    let zero = ScaledPoint::ZERO;
    let (left, bottom) = (bleed, bleed);
    let (right, top) = (bleed + width, bleed + height);
    let (outer_x, outer_y) = (right + bleed, top + bleed);
    for y in [bottom, top] {
        content.line((zero, y), (left, y));
        content.line((right, y), (outer_x, y));
    }
    for x in [left, right] {
        content.line((x, zero), (x, bottom));
        content.line((x, top), (x, outer_y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{link_all, vpack};

    fn pdf_text(doc: &Document) -> String {
        String::from_utf8_lossy(doc.writer().borrow().bytes()).into_owned()
    }

    fn rule_vlist() -> NodeRef {
        let rule = Node::new(NodeKind::Rule {
            width: ScaledPoint::from_pt(10.0),
            height: ScaledPoint::from_pt(10.0),
            depth: ScaledPoint::ZERO,
        });
        vpack(&link_all(&[rule]).unwrap())
    }

    #[test]
    fn test_format_names() {
        assert_eq!(Format::parse(""), Some(Format::Pdf));
        assert_eq!(Format::parse("PDF/X-4"), Some(Format::PdfX4));
        assert_eq!(Format::parse("PDF/Z"), None);
    }

    #[test]
    fn test_new_page_links_into_document() {
        let mut doc = Document::in_memory();
        let page = doc.new_page();
        assert_eq!(doc.pages().len(), 1);
        assert!(Rc::ptr_eq(&doc.pages()[0], &page));
        assert_eq!(page.borrow().number, 1);
        assert_eq!(page.borrow().width, doc.default_page_width);
    }

    #[test]
    fn test_finish_writes_shipped_pages_only() {
        let mut doc = Document::in_memory();
        doc.title = "Report".to_string();
        let shipped = doc.new_page();
        shipped
            .borrow_mut()
            .output_at(ScaledPoint::ZERO, ScaledPoint::from_pt(100.0), rule_vlist())
            .unwrap();
        shipped.borrow_mut().shipout().unwrap();
        doc.new_page();
        doc.compress_level = 0;
        doc.finish().unwrap();
        let out = pdf_text(&doc);
        assert!(out.contains("/Count 1"));
        assert!(out.contains("re f"));
        assert!(out.contains("/Title (Report)"));
        assert!(out.contains("/Producer (bagscript"));
        assert!(doc.finish().is_err());
    }

    #[test]
    fn test_suppress_info() {
        let mut doc = Document::in_memory();
        doc.suppress_info = true;
        doc.finish().unwrap();
        assert!(!pdf_text(&doc).contains("/Producer"));
    }

    #[test]
    fn test_catalog_language_and_preferences() {
        let mut doc = Document::in_memory();
        doc.default_language = Some(crate::lang::get_language("de").unwrap());
        doc.viewer_preferences
            .insert("DisplayDocTitle".to_string(), "true".to_string());
        doc.finish().unwrap();
        let out = pdf_text(&doc);
        assert!(out.contains("/Lang (de)"));
        assert!(out.contains("/DisplayDocTitle true"));
    }

    #[test]
    fn test_attachment_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xml");
        std::fs::write(&path, "<data/>").unwrap();
        let mut doc = Document::in_memory();
        doc.attachments
            .push(Attachment::from_file(&path, "text/xml", "invoice data").unwrap());
        doc.compress_level = 0;
        doc.finish().unwrap();
        let out = pdf_text(&doc);
        assert!(out.contains("/EmbeddedFiles"));
        assert!(out.contains("(data.xml)"));
        assert!(out.contains("/Subtype /text#2Fxml"));
        assert!(out.contains("<data/>"));
    }

    #[test]
    fn test_bleed_adds_trimbox() {
        let mut doc = Document::in_memory();
        doc.bleed = ScaledPoint::parse("3mm").unwrap();
        doc.show_cutmarks = true;
        doc.compress_level = 0;
        doc.new_page().borrow_mut().shipout().unwrap();
        doc.finish().unwrap();
        let out = pdf_text(&doc);
        assert!(out.contains("/TrimBox"));
        assert!(out.contains(" l S"));
    }

    #[test]
    fn test_xml_dump() {
        let mut doc = Document::in_memory();
        let page = doc.new_page();
        page.borrow_mut()
            .output_at(ScaledPoint::ZERO, ScaledPoint::ZERO, rule_vlist())
            .unwrap();
        let mut out = Vec::new();
        doc.output_xml_dump(&mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<pdfdocument"));
        assert!(xml.contains("<vlist"));
        assert!(xml.contains("<rule width=\"10pt\""));
    }
}
