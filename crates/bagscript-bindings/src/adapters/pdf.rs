//! Raw PDF access: the writer, objects, pages, faces and image files.
//!
//! Dictionaries and arrays pass through [`crate::codec`], so a failed
//! conversion never leaves a half-assigned dictionary behind.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use bagscript_engine::pdf::{Face, ImageFile, Name, ObjectNumber, PdfObject, PdfPage, PdfWriter};
use rhai::{Array, Blob, Dynamic, Map, FLOAT, INT};

use crate::adapters::{wrap, Foreign};
use crate::args::{dynamic_type_name, expect, Args, FromDynamic};
use crate::codec::{dict_to_map, native_to_script, script_to_array, script_to_dict};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

/// A4 in PDF points
const DEFAULT_PAGE_WIDTH: FLOAT = 595.28;
const DEFAULT_PAGE_HEIGHT: FLOAT = 841.89;

fn native_err(function: &'static str) -> impl Fn(bagscript_engine::EngineError) -> BindingError {
    move |e| BindingError::native(function, e)
}

fn to_u32(args: &Args<'_>, index: usize, label: &str, value: INT) -> Result<u32> {
    u32::try_from(value).map_err(|_| args.type_error(index, label, "non-negative int"))
}

/// The low-level writer behind a document or created with `pdf::create`
#[derive(Debug, Clone)]
pub struct PdfHandle(pub Rc<RefCell<PdfWriter>>);

attributes! {
    PdfAttr {
        fields {
            Catalog => "catalog",
            Finished => "finished",
            Info => "info",
            Pages => "pages",
        }
        methods {
            Finish => "finish",
            LoadImagefile => "load_imagefile",
            NewFace => "new_face",
            NewObject => "new_object",
            NewPage => "new_page",
        }
    }
}

const PDF: &str = "pdf.pdf";

impl Wrapper for PdfHandle {
    type Native = Rc<RefCell<PdfWriter>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for PdfHandle {
    fn type_tag(&self) -> &'static str {
        PDF
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("pdf({} pages)", self.0.borrow().pages().len())
    }

    fn cost(&self) -> u64 {
        self.0.borrow().pages().len() as u64
    }
}

impl AttributeAccessible for PdfHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let writer = self.0.clone();
        let value = match PdfAttr::from_name(name)? {
            PdfAttr::Catalog => Dynamic::from_map(dict_to_map(&writer.borrow().catalog)),
            PdfAttr::Info => Dynamic::from_map(dict_to_map(&writer.borrow().info)),
            PdfAttr::Finished => Dynamic::from(writer.borrow().is_finished()),
            PdfAttr::Pages => Dynamic::from_array(
                writer
                    .borrow()
                    .pages()
                    .iter()
                    .map(|p| wrap(PdfPageHandle(p.clone())))
                    .collect(),
            ),
            PdfAttr::NewFace => method("pdf.new_face", Arity::Range(1, 2), move |_ctx, args| {
                let args = Args::new("pdf.new_face", args);
                let filename: String = args.get(0, "filename")?;
                let index = match args.opt::<INT>(1, "index")? {
                    Some(i) => to_u32(&args, 1, "index", i)?,
                    None => 0,
                };
                let face = writer
                    .borrow_mut()
                    .load_face(Path::new(&filename), index)
                    .map_err(native_err("pdf.new_face"))?;
                Ok(wrap(FaceHandle(face)))
            }),
            PdfAttr::NewObject => method("pdf.new_object", Arity::Exact(0), move |_ctx, _args| {
                let obj = writer.borrow_mut().new_object();
                Ok(wrap(PdfObjectHandle {
                    obj: Rc::new(RefCell::new(obj)),
                    writer: writer.clone(),
                }))
            }),
            PdfAttr::NewPage => method("pdf.new_page", Arity::Range(0, 2), move |_ctx, args| {
                let args = Args::new("pdf.new_page", args);
                let width = args.opt::<FLOAT>(0, "width")?.unwrap_or(DEFAULT_PAGE_WIDTH);
                let height = args.opt::<FLOAT>(1, "height")?.unwrap_or(DEFAULT_PAGE_HEIGHT);
                let page = writer.borrow_mut().add_page(width, height);
                Ok(wrap(PdfPageHandle(page)))
            }),
            PdfAttr::LoadImagefile => {
                method("pdf.load_imagefile", Arity::Exact(1), move |_ctx, args| {
                    let filename: String = Args::new("pdf.load_imagefile", args).get(0, "filename")?;
                    let image = writer
                        .borrow_mut()
                        .load_image_file(Path::new(&filename))
                        .map_err(native_err("pdf.load_imagefile"))?;
                    Ok(wrap(ImageFileHandle(image)))
                })
            }
            PdfAttr::Finish => method("pdf.finish", Arity::Exact(0), move |_ctx, _args| {
                writer.borrow_mut().finish().map_err(native_err("pdf.finish"))?;
                Ok(Dynamic::UNIT)
            }),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = PdfAttr::from_name(name).ok_or_else(|| BindingError::unknown_attribute(PDF, name))?;
        match attr {
            PdfAttr::Catalog => {
                let dict = script_to_dict(&expect::<Map>(&value, "pdf.catalog")?)?;
                self.0.borrow_mut().catalog = dict;
            }
            PdfAttr::Info => {
                let dict = script_to_dict(&expect::<Map>(&value, "pdf.info")?)?;
                self.0.borrow_mut().info = dict;
            }
            other => return Err(BindingError::read_only(PDF, other.name())),
        }
        Ok(())
    }
}

impl Comparable for PdfHandle {}
impl Truthy for PdfHandle {}
impl Operable for PdfHandle {}

/// An indirect object under construction. It keeps the writer it was
/// created by so that `save()` needs no argument.
#[derive(Debug, Clone)]
pub struct PdfObjectHandle {
    pub obj: Rc<RefCell<PdfObject>>,
    pub writer: Rc<RefCell<PdfWriter>>,
}

attributes! {
    PdfObjectAttr {
        fields {
            Array => "array",
            Compression => "compression",
            Data => "data",
            Dictionary => "dictionary",
            ForceStream => "force_stream",
            ObjectNumber => "object_number",
            Raw => "raw",
            Saved => "saved",
        }
        methods {
            Save => "save",
            SetCompression => "set_compression",
        }
    }
}

const PDF_OBJECT: &str = "pdf.object";

impl Wrapper for PdfObjectHandle {
    type Native = Rc<RefCell<PdfObject>>;

    fn native(&self) -> Self::Native {
        self.obj.clone()
    }
}

impl Identified for PdfObjectHandle {
    fn type_tag(&self) -> &'static str {
        PDF_OBJECT
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.obj) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("pdf object {}", self.obj.borrow().number.reference())
    }
}

impl AttributeAccessible for PdfObjectHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let obj = self.obj.clone();
        let value = match PdfObjectAttr::from_name(name)? {
            PdfObjectAttr::Array => Dynamic::from_array(
                obj.borrow().array.iter().map(native_to_script).collect(),
            ),
            PdfObjectAttr::Compression => Dynamic::from(obj.borrow().compression() as INT),
            PdfObjectAttr::Data => Dynamic::from_blob(obj.borrow().data.clone()),
            PdfObjectAttr::Dictionary => Dynamic::from_map(dict_to_map(&obj.borrow().dictionary)),
            PdfObjectAttr::ForceStream => Dynamic::from(obj.borrow().force_stream),
            PdfObjectAttr::ObjectNumber => wrap(ObjectNumberValue(obj.borrow().number)),
            PdfObjectAttr::Raw => Dynamic::from(obj.borrow().raw),
            PdfObjectAttr::Saved => Dynamic::from(obj.borrow().is_saved()),
            PdfObjectAttr::Save => {
                let writer = self.writer.clone();
                method("pdf_object.save", Arity::Exact(0), move |_ctx, _args| {
                    obj.borrow_mut()
                        .save(&mut writer.borrow_mut())
                        .map_err(native_err("pdf_object.save"))?;
                    Ok(Dynamic::UNIT)
                })
            }
            PdfObjectAttr::SetCompression => {
                method("pdf_object.set_compression", Arity::Exact(1), move |_ctx, args| {
                    let args = Args::new("pdf_object.set_compression", args);
                    let level: INT = args.get(0, "level")?;
                    if !(0..=9).contains(&level) {
                        return Err(args.type_error(0, "level", "int from 0 to 9"));
                    }
                    obj.borrow_mut().set_compression(level as u32);
                    Ok(Dynamic::UNIT)
                })
            }
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = PdfObjectAttr::from_name(name)
            .ok_or_else(|| BindingError::unknown_attribute(PDF_OBJECT, name))?;
        let context = format!("pdf_object.{}", name);
        match attr {
            PdfObjectAttr::Dictionary => {
                let dict = script_to_dict(&expect::<Map>(&value, &context)?)?;
                self.obj.borrow_mut().dictionary = dict;
            }
            PdfObjectAttr::Array => {
                let array = script_to_array(&expect::<Array>(&value, &context)?, true)?;
                self.obj.borrow_mut().array = array;
            }
            PdfObjectAttr::Data => {
                let data = match Blob::from_dynamic(&value) {
                    Some(blob) => blob,
                    None => expect::<String>(&value, &context)
                        .map_err(|_| {
                            BindingError::argument_type(
                                context.as_str(),
                                "blob or string",
                                dynamic_type_name(&value),
                            )
                        })?
                        .into_bytes(),
                };
                self.obj.borrow_mut().data = data;
            }
            PdfObjectAttr::ForceStream => self.obj.borrow_mut().force_stream = expect(&value, &context)?,
            PdfObjectAttr::Raw => self.obj.borrow_mut().raw = expect(&value, &context)?,
            other => return Err(BindingError::read_only(PDF_OBJECT, other.name())),
        }
        Ok(())
    }
}

impl Comparable for PdfObjectHandle {}
impl Truthy for PdfObjectHandle {}
impl Operable for PdfObjectHandle {}

#[derive(Debug, Clone)]
pub struct PdfPageHandle(pub Rc<RefCell<PdfPage>>);

attributes! {
    PdfPageAttr {
        fields {
            Contents => "contents",
            Dict => "dict",
            Faces => "faces",
            Height => "height",
            Images => "images",
            ObjectNumber => "object_number",
            OffsetX => "offset_x",
            OffsetY => "offset_y",
            Width => "width",
        }
        methods {}
    }
}

const PDF_PAGE: &str = "pdf.page";

/// Every element is checked before the list is returned
fn list_of<T: FromDynamic>(value: &Dynamic, context: &str) -> Result<Vec<T>> {
    let items: Array = expect(value, context)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| expect::<T>(item, &format!("{}[{}]", context, i)))
        .collect()
}

impl Wrapper for PdfPageHandle {
    type Native = Rc<RefCell<PdfPage>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for PdfPageHandle {
    fn type_tag(&self) -> &'static str {
        PDF_PAGE
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("pdf page ({})", self.0.borrow().size_label())
    }
}

impl AttributeAccessible for PdfPageHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let page = self.0.borrow();
        let value = match PdfPageAttr::from_name(name)? {
            PdfPageAttr::Contents => match page.contents {
                Some(number) => wrap(ObjectNumberValue(number)),
                None => Dynamic::UNIT,
            },
            PdfPageAttr::Dict => Dynamic::from_map(dict_to_map(&page.dict)),
            PdfPageAttr::Faces => Dynamic::from_array(
                page.faces.iter().map(|f| wrap(FaceHandle(f.clone()))).collect(),
            ),
            PdfPageAttr::Images => Dynamic::from_array(
                page.images
                    .iter()
                    .map(|i| wrap(ImageFileHandle(i.clone())))
                    .collect(),
            ),
            PdfPageAttr::Height => Dynamic::from(page.height as FLOAT),
            PdfPageAttr::Width => Dynamic::from(page.width as FLOAT),
            PdfPageAttr::OffsetX => Dynamic::from(page.offset_x as FLOAT),
            PdfPageAttr::OffsetY => Dynamic::from(page.offset_y as FLOAT),
            PdfPageAttr::ObjectNumber => wrap(ObjectNumberValue(page.object_number)),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = PdfPageAttr::from_name(name)
            .ok_or_else(|| BindingError::unknown_attribute(PDF_PAGE, name))?;
        let context = format!("pdf_page.{}", name);
        let context = context.as_str();
        match attr {
            PdfPageAttr::Width => self.0.borrow_mut().width = expect::<FLOAT>(&value, context)?,
            PdfPageAttr::Height => self.0.borrow_mut().height = expect::<FLOAT>(&value, context)?,
            PdfPageAttr::OffsetX => self.0.borrow_mut().offset_x = expect::<FLOAT>(&value, context)?,
            PdfPageAttr::OffsetY => self.0.borrow_mut().offset_y = expect::<FLOAT>(&value, context)?,
            PdfPageAttr::Dict => {
                let dict = script_to_dict(&expect::<Map>(&value, context)?)?;
                self.0.borrow_mut().dict = dict;
            }
            PdfPageAttr::Faces => {
                let faces = list_of::<Rc<Face>>(&value, context)?;
                self.0.borrow_mut().faces = faces;
            }
            PdfPageAttr::Images => {
                let images = list_of::<Rc<ImageFile>>(&value, context)?;
                self.0.borrow_mut().images = images;
            }
            PdfPageAttr::Contents => {
                let contents = match Foreign::from_dynamic(&value) {
                    _ if value.is::<()>() => None,
                    Some(Foreign::ObjectNumber(number)) => Some(number.0),
                    Some(Foreign::PdfObject(obj)) => Some(obj.obj.borrow().number),
                    _ => {
                        return Err(BindingError::argument_type(
                            context,
                            "pdf.objectnumber, pdf.object or nil",
                            dynamic_type_name(&value),
                        ))
                    }
                };
                self.0.borrow_mut().contents = contents;
            }
            PdfPageAttr::ObjectNumber => return Err(BindingError::read_only(PDF_PAGE, name)),
        }
        Ok(())
    }
}

impl Comparable for PdfPageHandle {}
impl Truthy for PdfPageHandle {}
impl Operable for PdfPageHandle {}

/// A loaded font face
#[derive(Debug, Clone)]
pub struct FaceHandle(pub Rc<Face>);

attributes! {
    FaceAttr {
        fields {
            FaceId => "face_id",
            Filename => "filename",
            InternalName => "internal_name",
            ObjectNumber => "object_number",
            PostscriptName => "postscript_name",
            UnitsPerEm => "units_per_em",
        }
        methods {
            Codepoint => "codepoint",
            Codepoints => "codepoints",
            RegisterCodepoint => "register_codepoint",
            RegisterCodepoints => "register_codepoints",
        }
    }
}

fn glyph_id(args: &Args<'_>, index: usize, value: &Dynamic) -> Result<u16> {
    value
        .as_int()
        .ok()
        .and_then(|g| u16::try_from(g).ok())
        .ok_or_else(|| args.type_error(index, "glyph", "glyph id from 0 to 65535"))
}

impl Wrapper for FaceHandle {
    type Native = Rc<Face>;

    fn native(&self) -> Rc<Face> {
        self.0.clone()
    }
}

impl Identified for FaceHandle {
    fn type_tag(&self) -> &'static str {
        "pdf.face"
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("face {} ({})", self.0.internal_name(), self.0.postscript_name)
    }
}

impl AttributeAccessible for FaceHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let face = self.0.clone();
        let value = match FaceAttr::from_name(name)? {
            FaceAttr::FaceId => Dynamic::from(face.face_id as INT),
            FaceAttr::Filename => Dynamic::from(face.filename.display().to_string()),
            FaceAttr::InternalName => Dynamic::from(face.internal_name()),
            FaceAttr::ObjectNumber => wrap(ObjectNumberValue(face.object_number)),
            FaceAttr::PostscriptName => Dynamic::from(face.postscript_name.clone()),
            FaceAttr::UnitsPerEm => Dynamic::from(face.units_per_em as INT),
            // a rune is a char, a one-character string or a Unicode scalar value
            FaceAttr::Codepoint => method("face.codepoint", Arity::Exact(1), move |_ctx, args| {
                let args = Args::new("face.codepoint", args);
                let value = args.raw(0).cloned().unwrap_or(Dynamic::UNIT);
                let rune = char::from_dynamic(&value)
                    .or_else(|| {
                        let text = String::from_dynamic(&value)?;
                        let mut chars = text.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Some(c),
                            _ => None,
                        }
                    })
                    .or_else(|| {
                        let scalar = u32::try_from(value.as_int().ok()?).ok()?;
                        char::from_u32(scalar)
                    })
                    .ok_or_else(|| args.type_error(0, "rune", "char, one-character string or int"))?;
                Ok(Dynamic::from(face.codepoint(rune) as INT))
            }),
            FaceAttr::Codepoints => method("face.codepoints", Arity::Exact(1), move |_ctx, args| {
                let text: String = Args::new("face.codepoints", args).get(0, "text")?;
                let chars: Vec<char> = text.chars().collect();
                Ok(Dynamic::from_array(
                    face.codepoints(&chars)
                        .into_iter()
                        .map(|g| Dynamic::from(g as INT))
                        .collect(),
                ))
            }),
            FaceAttr::RegisterCodepoint => {
                method("face.register_codepoint", Arity::Exact(1), move |_ctx, args| {
                    let args = Args::new("face.register_codepoint", args);
                    let value = args.raw(0).cloned().unwrap_or(Dynamic::UNIT);
                    face.register_codepoint(glyph_id(&args, 0, &value)?);
                    Ok(Dynamic::UNIT)
                })
            }
            FaceAttr::RegisterCodepoints => {
                method("face.register_codepoints", Arity::Exact(1), move |_ctx, args| {
                    let args = Args::new("face.register_codepoints", args);
                    let items: Array = args.get(0, "glyphs")?;
                    let glyphs = items
                        .iter()
                        .map(|item| glyph_id(&args, 0, item))
                        .collect::<Result<Vec<_>>>()?;
                    face.register_codepoints(&glyphs);
                    Ok(Dynamic::UNIT)
                })
            }
        };
        Some(value)
    }
}

impl Comparable for FaceHandle {}
impl Truthy for FaceHandle {}
impl Operable for FaceHandle {}

/// An image or PDF file loaded for placement
#[derive(Debug, Clone)]
pub struct ImageFileHandle(pub Rc<ImageFile>);

attributes! {
    ImageFileAttr {
        fields {
            Closed => "closed",
            Filename => "filename",
            Height => "height",
            InternalName => "internal_name",
            ObjectNumber => "object_number",
            PageNumber => "page_number",
            Width => "width",
        }
        methods {
            Close => "close",
            GetPdfBoxDimensions => "get_pdf_box_dimensions",
        }
    }
}

impl Wrapper for ImageFileHandle {
    type Native = Rc<ImageFile>;

    fn native(&self) -> Rc<ImageFile> {
        self.0.clone()
    }
}

impl Identified for ImageFileHandle {
    fn type_tag(&self) -> &'static str {
        "pdf.imagefile"
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("imagefile {}", self.0.filename.display())
    }
}

impl AttributeAccessible for ImageFileHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let image = self.0.clone();
        let value = match ImageFileAttr::from_name(name)? {
            ImageFileAttr::Closed => Dynamic::from(image.is_closed()),
            ImageFileAttr::Filename => Dynamic::from(image.filename.display().to_string()),
            ImageFileAttr::Height => Dynamic::from(image.height as INT),
            ImageFileAttr::InternalName => Dynamic::from(image.internal_name()),
            ImageFileAttr::ObjectNumber => wrap(ObjectNumberValue(image.object_number)),
            ImageFileAttr::PageNumber => Dynamic::from(image.page_number as INT),
            ImageFileAttr::Width => Dynamic::from(image.width as INT),
            ImageFileAttr::Close => method("imagefile.close", Arity::Exact(0), move |_ctx, _args| {
                image.close();
                Ok(Dynamic::UNIT)
            }),
            ImageFileAttr::GetPdfBoxDimensions => {
                let name = "imagefile.get_pdf_box_dimensions";
                method(name, Arity::Exact(2), move |_ctx, args| {
                    let args = Args::new(name, args);
                    let page: INT = args.get(0, "page")?;
                    let page = to_u32(&args, 0, "page", page)?;
                    let box_name: String = args.get(1, "box")?;
                    let dimensions = image
                        .get_pdf_box_dimensions(page, &box_name)
                        .map_err(native_err(name))?;
                    Ok(Dynamic::from_map(
                        dimensions
                            .into_iter()
                            .map(|(k, v)| (k.into(), Dynamic::from(v as FLOAT)))
                            .collect(),
                    ))
                })
            }
        };
        Some(value)
    }
}

impl Comparable for ImageFileHandle {}
impl Truthy for ImageFileHandle {}
impl Operable for ImageFileHandle {}

/// Number of an indirect object; compares by value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectNumberValue(pub ObjectNumber);

attributes! {
    ObjectNumberAttr {
        fields { Number => "number", Reference => "reference" }
        methods {}
    }
}

impl Wrapper for ObjectNumberValue {
    type Native = ObjectNumber;

    fn native(&self) -> ObjectNumber {
        self.0
    }
}

impl Identified for ObjectNumberValue {
    fn type_tag(&self) -> &'static str {
        "pdf.objectnumber"
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl AttributeAccessible for ObjectNumberValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match ObjectNumberAttr::from_name(name)? {
            ObjectNumberAttr::Number => Some(Dynamic::from(self.0 .0 as INT)),
            ObjectNumberAttr::Reference => Some(Dynamic::from(self.0.reference())),
        }
    }
}

impl Comparable for ObjectNumberValue {
    fn equals(&self, other: &Foreign) -> bool {
        matches!(other, Foreign::ObjectNumber(o) if o.0 == self.0)
    }
}

impl Truthy for ObjectNumberValue {}
impl Operable for ObjectNumberValue {}

/// A PDF name such as `/Catalog`. Plain strings always stay strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValue(pub Name);

attributes! {
    NameAttr {
        fields { Name => "name" }
        methods {}
    }
}

impl NameValue {
    /// `"Catalog"` and `"/Catalog"` give the same name
    pub fn parse(text: &str, context: &str) -> Result<Self> {
        let name = text.strip_prefix('/').unwrap_or(text);
        if name.is_empty() || name.chars().any(|c| c.is_whitespace()) {
            return Err(BindingError::argument_type(
                context,
                "a non-empty name without whitespace",
                format!("{:?}", text),
            ));
        }
        Ok(NameValue(Name::new(name)))
    }
}

impl Wrapper for NameValue {
    type Native = Name;

    fn native(&self) -> Name {
        self.0.clone()
    }
}

impl Identified for NameValue {
    fn type_tag(&self) -> &'static str {
        "pdf.name"
    }

    fn display(&self) -> String {
        format!("/{}", self.0.as_str())
    }
}

impl AttributeAccessible for NameValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match NameAttr::from_name(name)? {
            NameAttr::Name => Some(Dynamic::from(self.0.as_str().to_string())),
        }
    }
}

impl Comparable for NameValue {
    fn equals(&self, other: &Foreign) -> bool {
        matches!(other, Foreign::Name(o) if o.0 == self.0)
    }
}

impl Truthy for NameValue {}
impl Operable for NameValue {}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> PdfHandle {
        PdfHandle(Rc::new(RefCell::new(PdfWriter::in_memory())))
    }

    fn call(value: Dynamic, args: &[Dynamic]) -> Result<Dynamic> {
        let ctx = Context::default();
        match value.try_cast::<Foreign>() {
            Some(Foreign::Builtin(b)) => b.call(&ctx, args),
            _ => panic!("not a builtin"),
        }
    }

    fn font_path() -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../testdata/fonts/DejaVuSansMono-Oblique.ttf")
            .display()
            .to_string()
    }

    fn new_object(pdf: &PdfHandle) -> PdfObjectHandle {
        match call(pdf.get_attribute("new_object").unwrap(), &[])
            .unwrap()
            .try_cast::<Foreign>()
        {
            Some(Foreign::PdfObject(obj)) => obj,
            _ => panic!("expected a pdf object"),
        }
    }

    #[test]
    fn test_object_dictionary_is_atomic() {
        let ctx = Context::default();
        let pdf = writer();
        let obj = new_object(&pdf);

        let mut good = Map::new();
        good.insert("Type".into(), wrap(NameValue::parse("Example", "test").unwrap()));
        obj.set_attribute(&ctx, "dictionary", Dynamic::from_map(good)).unwrap();

        let mut inner = Map::new();
        inner.insert("bad".into(), Dynamic::from(true));
        let mut bad = Map::new();
        bad.insert("a".into(), Dynamic::from("x"));
        bad.insert(
            "b".into(),
            Dynamic::from_array(vec![Dynamic::from(1_i64), Dynamic::from_map(inner)]),
        );
        let err = obj
            .set_attribute(&ctx, "dictionary", Dynamic::from_map(bad))
            .unwrap_err();
        assert_eq!(err.kind(), "ConversionError");
        let dict = obj.obj.borrow().dictionary.clone();
        assert_eq!(dict.len(), 1);
        assert!(dict.contains_key(&bagscript_engine::pdf::Name::new("Type")));
    }

    #[test]
    fn test_object_save_once() {
        let ctx = Context::default();
        let pdf = writer();
        let obj = new_object(&pdf);
        obj.set_attribute(&ctx, "data", Dynamic::from("BT ET")).unwrap();
        call(obj.get_attribute("set_compression").unwrap(), &[Dynamic::from(0_i64)]).unwrap();
        let save = obj.get_attribute("save").unwrap();
        call(save.clone(), &[]).unwrap();
        let written = String::from_utf8_lossy(pdf.0.borrow().bytes()).into_owned();
        assert!(written.contains("BT ET"));
        assert!(obj.get_attribute("saved").unwrap().as_bool().unwrap());

        let err = call(save, &[]).unwrap_err();
        assert_eq!(err.kind(), "NativeOperationError");
        assert!(err.to_string().contains("already saved"));

        let err = call(obj.get_attribute("set_compression").unwrap(), &[Dynamic::from(11_i64)])
            .unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
    }

    #[test]
    fn test_object_array_allows_floats() {
        let ctx = Context::default();
        let obj = new_object(&writer());
        let array = Dynamic::from_array(vec![Dynamic::from(0_i64), Dynamic::from(595.28_f64)]);
        obj.set_attribute(&ctx, "array", array).unwrap();
        let back = obj.get_attribute("array").unwrap().try_cast::<Array>().unwrap();
        assert_eq!(back[1].as_float().unwrap(), 595.28);
        assert!(obj.set_attribute(&ctx, "object_number", Dynamic::from(1_i64)).is_err());
    }

    #[test]
    fn test_new_page_defaults_and_dimensions() {
        let ctx = Context::default();
        let pdf = writer();
        let page = call(pdf.get_attribute("new_page").unwrap(), &[]).unwrap();
        let Some(Foreign::PdfPage(page)) = page.try_cast::<Foreign>() else {
            panic!("expected a pdf page");
        };
        assert_eq!(page.display(), "pdf page (595.28 x 841.89)");
        page.set_attribute(&ctx, "width", Dynamic::from(200_i64)).unwrap();
        assert_eq!(page.0.borrow().width, 200.0);
        let err = page
            .set_attribute(&ctx, "height", Dynamic::from("tall"))
            .unwrap_err();
        assert_eq!(err.to_string(), "pdf_page.height expects number, got string");
        assert_eq!(page.0.borrow().height, 841.89);

        let err = call(pdf.get_attribute("new_page").unwrap(), &[Dynamic::from("a4")]).unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
    }

    #[test]
    fn test_page_contents_and_faces() {
        let ctx = Context::default();
        let pdf = writer();
        let obj = new_object(&pdf);
        let page = PdfPageHandle(pdf.0.borrow_mut().add_page(100.0, 100.0));
        page.set_attribute(&ctx, "contents", wrap(obj.clone())).unwrap();
        assert_eq!(page.0.borrow().contents, Some(obj.obj.borrow().number));
        page.set_attribute(&ctx, "contents", Dynamic::UNIT).unwrap();
        assert_eq!(page.0.borrow().contents, None);

        let face = call(pdf.get_attribute("new_face").unwrap(), &[Dynamic::from(font_path())]).unwrap();
        let faces = Dynamic::from_array(vec![face, Dynamic::from(1_i64)]);
        let err = page.set_attribute(&ctx, "faces", faces).unwrap_err();
        assert_eq!(err.to_string(), "pdf_page.faces[1] expects pdf.face, got int");
        assert!(page.0.borrow().faces.is_empty());
    }

    #[test]
    fn test_face_codepoints() {
        let pdf = writer();
        let face = call(pdf.get_attribute("new_face").unwrap(), &[Dynamic::from(font_path())]).unwrap();
        let Some(Foreign::Face(face)) = face.try_cast::<Foreign>() else {
            panic!("expected a face");
        };
        assert_eq!(face.get_attribute("internal_name").unwrap().into_string().unwrap(), "/F1");

        let by_char = call(face.get_attribute("codepoint").unwrap(), &[Dynamic::from('A')]).unwrap();
        let by_int = call(face.get_attribute("codepoint").unwrap(), &[Dynamic::from(65_i64)]).unwrap();
        assert_eq!(by_char.as_int().unwrap(), by_int.as_int().unwrap());
        assert!(by_char.as_int().unwrap() > 0);

        let glyphs = call(face.get_attribute("codepoints").unwrap(), &[Dynamic::from("AB")]).unwrap();
        let glyphs = glyphs.try_cast::<Array>().unwrap();
        assert_eq!(glyphs.len(), 2);

        call(face.get_attribute("register_codepoints").unwrap(), &[Dynamic::from_array(glyphs)]).unwrap();
        assert_eq!(face.0.registered().len(), 2);
        let err = call(
            face.get_attribute("register_codepoint").unwrap(),
            &[Dynamic::from(-1_i64)],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
    }

    #[test]
    fn test_missing_face_is_native_error() {
        let pdf = writer();
        let err = call(
            pdf.get_attribute("new_face").unwrap(),
            &[Dynamic::from("/no/such/font.ttf")],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "NativeOperationError");
    }

    #[test]
    fn test_catalog_through_codec() {
        let ctx = Context::default();
        let pdf = writer();
        let mut catalog = Map::new();
        catalog.insert("PageMode".into(), wrap(NameValue::parse("/UseOutlines", "test").unwrap()));
        catalog.insert("Note".into(), Dynamic::from("/tmp/a.xml"));
        pdf.set_attribute(&ctx, "catalog", Dynamic::from_map(catalog)).unwrap();
        let back = pdf.get_attribute("catalog").unwrap().try_cast::<Map>().unwrap();
        assert_eq!(Name::from_dynamic(&back["PageMode"]), Some(Name::new("UseOutlines")));
        assert_eq!(back["Note"].clone().into_string().unwrap(), "/tmp/a.xml");
        assert!(pdf.set_attribute(&ctx, "pages", Dynamic::UNIT).is_err());
    }

    #[test]
    fn test_object_number_value_equality() {
        let a = ObjectNumberValue(ObjectNumber(4));
        assert!(a.equals(&Foreign::ObjectNumber(ObjectNumberValue(ObjectNumber(4)))));
        assert!(!a.equals(&Foreign::ObjectNumber(ObjectNumberValue(ObjectNumber(5)))));
        assert_eq!(a.get_attribute("reference").unwrap().into_string().unwrap(), "4 0 R");
    }

    #[test]
    fn test_name_values() {
        let name = NameValue::parse("/Catalog", "pdf::name").unwrap();
        assert_eq!(name, NameValue::parse("Catalog", "pdf::name").unwrap());
        assert_eq!(name.display(), "/Catalog");
        assert_eq!(name.get_attribute("name").unwrap().into_string().unwrap(), "Catalog");
        assert!(name.equals(&Foreign::Name(NameValue(Name::new("Catalog")))));
        assert!(!name.equals(&Foreign::Name(NameValue(Name::new("Pages")))));
        for bad in ["", "/", "two words"] {
            let err = NameValue::parse(bad, "pdf::name").unwrap_err();
            assert_eq!(err.kind(), "ArgumentTypeError");
        }
    }
}
