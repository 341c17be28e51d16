use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{Dict, Face, ImageFile, Name, ObjectNumber, PdfObject, PdfPage, PdfValue};
use crate::error::{EngineError, Result};

/// Where the finished PDF goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    File(PathBuf),
    Memory,
}

/// Build a dictionary from `(key, value)` pairs
pub(crate) fn dict<'a>(entries: impl IntoIterator<Item = (&'a str, PdfValue)>) -> Dict {
    entries
        .into_iter()
        .map(|(k, v)| (Name::new(k), v))
        .collect()
}

pub(crate) fn name(n: &str) -> PdfValue {
    PdfValue::Name(Name::new(n))
}

/// Sequential PDF writer.
///
/// Objects are appended to an internal buffer as they are saved; the
/// buffer goes to the sink when [`PdfWriter::finish`] writes the page
/// tree, catalog and cross reference table.
#[derive(Debug)]
pub struct PdfWriter {
    sink: OutputSink,
    buf: Vec<u8>,
    offsets: BTreeMap<u32, usize>,
    next_number: u32,
    pages_number: ObjectNumber,
    faces: Vec<Rc<Face>>,
    images: Vec<Rc<ImageFile>>,
    pages: Vec<Rc<RefCell<PdfPage>>>,
    /// Extra catalog entries
    pub catalog: Dict,
    /// Document information entries, omitted when empty
    pub info: Dict,
    finished: bool,
}

impl PdfWriter {
    pub fn new(sink: OutputSink) -> Self {
        let mut writer = PdfWriter {
            sink,
            buf: b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec(),
            offsets: BTreeMap::new(),
            next_number: 1,
            pages_number: ObjectNumber(0),
            faces: Vec::new(),
            images: Vec::new(),
            pages: Vec::new(),
            catalog: Dict::new(),
            info: Dict::new(),
            finished: false,
        };
        writer.pages_number = writer.next_object_number();
        writer
    }

    /// Writer for a file. The file is created right away so a bad path
    /// fails early.
    pub fn create(path: &Path) -> Result<Self> {
        File::create(path)?;
        Ok(Self::new(OutputSink::File(path.to_path_buf())))
    }

    pub fn in_memory() -> Self {
        Self::new(OutputSink::Memory)
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Reserve the next object number
    pub fn next_object_number(&mut self) -> ObjectNumber {
        let number = ObjectNumber(self.next_number);
        self.next_number += 1;
        number
    }

    /// A fresh object with a reserved number
    pub fn new_object(&mut self) -> PdfObject {
        let number = self.next_object_number();
        PdfObject::new(number)
    }

    /// Append an object body to the output
    pub fn write_object(&mut self, number: ObjectNumber, body: &[u8]) -> Result<()> {
        if self.finished {
            return Err(EngineError::Pdf("writer already finished".to_string()));
        }
        if number.0 == 0 || number.0 >= self.next_number {
            return Err(EngineError::Pdf(format!(
                "object number {} was not reserved",
                number
            )));
        }
        if self.offsets.contains_key(&number.0) {
            return Err(EngineError::Pdf(format!(
                "object {} written twice",
                number
            )));
        }
        self.offsets.insert(number.0, self.buf.len());
        self.buf
            .extend_from_slice(format!("{} 0 obj\n", number).as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
        Ok(())
    }

    /// Load a font face and register it for embedding
    pub fn load_face(&mut self, path: &Path, index: u32) -> Result<Rc<Face>> {
        let number = self.next_object_number();
        let face = Rc::new(Face::load(path, index, self.faces.len() + 1, number)?);
        self.faces.push(face.clone());
        Ok(face)
    }

    /// Load an image file and register it for embedding
    pub fn load_image_file(&mut self, path: &Path) -> Result<Rc<ImageFile>> {
        let number = self.next_object_number();
        let image = Rc::new(ImageFile::load(path, self.images.len() + 1, number)?);
        self.images.push(image.clone());
        Ok(image)
    }

    /// Append a page to the page tree
    pub fn add_page(&mut self, width: f64, height: f64) -> Rc<RefCell<PdfPage>> {
        let number = self.next_object_number();
        let page = Rc::new(RefCell::new(PdfPage::new(number, width, height)));
        self.pages.push(page.clone());
        page
    }

    pub fn pages(&self) -> &[Rc<RefCell<PdfPage>>] {
        &self.pages
    }

    pub fn faces(&self) -> &[Rc<Face>] {
        &self.faces
    }

    /// Bytes written so far
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn write_stream(&mut self, dictionary: Dict, data: Vec<u8>, level: u32) -> Result<ObjectNumber> {
        let mut obj = self.new_object();
        obj.dictionary = dictionary;
        obj.data = data;
        obj.set_compression(level);
        obj.save(self)?;
        Ok(obj.number)
    }

    fn write_dict(&mut self, number: ObjectNumber, dictionary: &Dict) -> Result<()> {
        self.write_object(number, super::serialize_dict(dictionary).as_bytes())
    }

    fn write_face(&mut self, face: &Face) -> Result<()> {
        let scale = 1000.0 / face.units_per_em.max(1) as f64;
        let font_file = self.write_stream(
            dict([("Length1", PdfValue::Int(face.data().len() as i64))]),
            face.data().to_vec(),
            6,
        )?;
        let base_font = name(&face.postscript_name);
        let ascent = PdfValue::Int((face.ascender as f64 * scale).round() as i64);
        let descent = PdfValue::Int((face.descender as f64 * scale).round() as i64);
        let descriptor_number = self.next_object_number();
        let descriptor = dict([
            ("Type", name("FontDescriptor")),
            ("FontName", base_font.clone()),
            ("Flags", PdfValue::Int(4)),
            (
                "FontBBox",
                PdfValue::Array(vec![
                    PdfValue::Int(0),
                    descent.clone(),
                    PdfValue::Int(1000),
                    ascent.clone(),
                ]),
            ),
            ("ItalicAngle", PdfValue::Int(0)),
            ("Ascent", ascent.clone()),
            ("Descent", descent),
            ("CapHeight", ascent),
            ("StemV", PdfValue::Int(80)),
            ("FontFile2", PdfValue::Ref(font_file)),
        ]);
        self.write_dict(descriptor_number, &descriptor)?;

        let mut widths = Vec::new();
        for glyph in face.registered() {
            let advance = (face.advance(glyph) as f64 * scale).round() as i64;
            widths.push(PdfValue::Int(glyph as i64));
            widths.push(PdfValue::Array(vec![PdfValue::Int(advance)]));
        }
        let cid_number = self.next_object_number();
        let cid_font = dict([
            ("Type", name("Font")),
            ("Subtype", name("CIDFontType2")),
            ("BaseFont", base_font.clone()),
            (
                "CIDSystemInfo",
                PdfValue::Dict(dict([
                    ("Registry", PdfValue::String("Adobe".to_string())),
                    ("Ordering", PdfValue::String("Identity".to_string())),
                    ("Supplement", PdfValue::Int(0)),
                ])),
            ),
            ("FontDescriptor", PdfValue::Ref(descriptor_number)),
            ("W", PdfValue::Array(widths)),
            ("CIDToGIDMap", name("Identity")),
        ]);
        self.write_dict(cid_number, &cid_font)?;

        let type0 = dict([
            ("Type", name("Font")),
            ("Subtype", name("Type0")),
            ("BaseFont", base_font),
            ("Encoding", name("Identity-H")),
            ("DescendantFonts", PdfValue::Array(vec![PdfValue::Ref(cid_number)])),
        ]);
        self.write_dict(face.object_number, &type0)
    }

    fn write_image(&mut self, image: &ImageFile) -> Result<()> {
        let mut obj = PdfObject::new(image.object_number);
        obj.dictionary = dict([
            ("Type", name("XObject")),
            ("Subtype", name("Image")),
            ("Width", PdfValue::Int(image.width as i64)),
            ("Height", PdfValue::Int(image.height as i64)),
            ("ColorSpace", name("DeviceRGB")),
            ("BitsPerComponent", PdfValue::Int(8)),
        ]);
        obj.data = image.rgb_pixels()?;
        obj.set_compression(6);
        obj.save(self)
    }

    /// Write fonts, images, the page tree, catalog, info and trailer, then
    /// hand the bytes to the sink
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(EngineError::Pdf("writer already finished".to_string()));
        }
        for face in self.faces.clone() {
            self.write_face(&face)?;
        }
        for image in self.images.clone() {
            self.write_image(&image)?;
        }
        let mut kids = Vec::new();
        for page in self.pages.clone() {
            let page = page.borrow();
            let body = page.serialize(self.pages_number);
            self.write_object(page.object_number, body.as_bytes())?;
            kids.push(PdfValue::Ref(page.object_number));
        }
        let count = kids.len() as i64;
        let pages = dict([
            ("Type", name("Pages")),
            ("Kids", PdfValue::Array(kids)),
            ("Count", PdfValue::Int(count)),
        ]);
        self.write_dict(self.pages_number, &pages)?;

        let mut catalog = self.catalog.clone();
        catalog.insert(Name::new("Type"), name("Catalog"));
        catalog.insert(Name::new("Pages"), PdfValue::Ref(self.pages_number));
        let catalog_number = self.next_object_number();
        self.write_dict(catalog_number, &catalog)?;

        let info_number = if self.info.is_empty() {
            None
        } else {
            let number = self.next_object_number();
            let info = self.info.clone();
            self.write_dict(number, &info)?;
            Some(number)
        };

        self.write_trailer(catalog_number, info_number);
        self.finished = true;
        if let OutputSink::File(path) = &self.sink {
            let mut file = File::create(path)?;
            file.write_all(&self.buf)?;
            file.flush()?;
        }
        log::info!(
            "PDF finished: {} pages, {} bytes",
            self.pages.len(),
            self.buf.len()
        );
        Ok(())
    }

    fn write_trailer(&mut self, catalog: ObjectNumber, info: Option<ObjectNumber>) {
        let xref_offset = self.buf.len();
        let size = self.next_number;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f\r\n", size);
        for number in 1..size {
            match self.offsets.get(&number) {
                Some(offset) => xref.push_str(&format!("{:010} 00000 n\r\n", offset)),
                None => xref.push_str("0000000000 65535 f\r\n"),
            }
        }
        let mut trailer = dict([
            ("Size", PdfValue::Int(size as i64)),
            ("Root", PdfValue::Ref(catalog)),
        ]);
        if let Some(info) = info {
            trailer.insert(Name::new("Info"), PdfValue::Ref(info));
        }
        xref.push_str(&format!(
            "trailer\n{}\nstartxref\n{}\n%%EOF\n",
            super::serialize_dict(&trailer),
            xref_offset
        ));
        self.buf.extend_from_slice(xref.as_bytes());
    }
}
