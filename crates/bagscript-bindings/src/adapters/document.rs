//! Documents, their pages and colour profiles

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use bagscript_engine::document::{Attachment, ColorProfile, Document, Format, Page};
use bagscript_engine::lang::{get_language, Lang};
use bagscript_engine::node::NodeRef;
use bagscript_engine::pdf::ImageFile;
use bagscript_engine::{EngineError, ScaledPoint};
use rhai::{Array, Dynamic, Map, INT};

use crate::adapters::bag::SpValue;
use crate::adapters::lang::LangValue;
use crate::adapters::node::NodeHandle;
use crate::adapters::pdf::{ImageFileHandle, PdfHandle};
use crate::adapters::wrap;
use crate::args::{dynamic_type_name, expect, Args, FromDynamic};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

#[derive(Debug, Clone)]
pub struct DocumentHandle(pub Rc<RefCell<Document>>);

attributes! {
    DocumentAttr {
        fields {
            Attachments => "attachments",
            Author => "author",
            Bleed => "bleed",
            ColorProfile => "color_profile",
            CompressLevel => "compresslevel",
            CreationDate => "creation_date",
            Creator => "creator",
            DefaultPageHeight => "default_page_height",
            DefaultPageWidth => "default_page_width",
            DumpOutput => "dump_output",
            Filename => "filename",
            Format => "format",
            Keywords => "keywords",
            Language => "language",
            Pages => "pages",
            PdfWriter => "pdf_writer",
            ShowCutmarks => "show_cutmarks",
            ShowHyperlinks => "show_hyperlinks",
            Subject => "subject",
            SuppressInfo => "suppressinfo",
            Title => "title",
            ViewerPreferences => "viewer_preferences",
        }
        methods {
            CreateImageNode => "create_image_node_from_imagefile",
            Finish => "finish",
            LoadColorprofile => "load_colorprofile",
            LoadImagefile => "load_imagefile",
            NewPage => "new_page",
            OutputXmlDump => "output_xml_dump",
        }
    }
}

const DOCUMENT: &str = "backend.document";

fn format_choices() -> String {
    let names: Vec<&str> = Format::ALL.iter().map(|f| f.name()).collect();
    format!("one of {}", names.join(", "))
}

fn attachment_to_map(attachment: &Attachment) -> Dynamic {
    let mut map = Map::new();
    map.insert("filename".into(), Dynamic::from(attachment.name.clone()));
    map.insert("mimetype".into(), Dynamic::from(attachment.mimetype.clone()));
    map.insert("description".into(), Dynamic::from(attachment.description.clone()));
    Dynamic::from_map(map)
}

/// Read every attachment before any is stored
fn attachments_from_script(value: &Dynamic) -> Result<Vec<Attachment>> {
    let items: Array = expect(value, "document.attachments")?;
    let mut attachments = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let context = format!("document.attachments[{}]", i);
        let map: Map = expect(item, &context)?;
        let field = |key: &str, required: bool| -> Result<String> {
            match map.get(key) {
                Some(v) => expect::<String>(v, &format!("{}.{}", context, key)),
                None if required => Err(BindingError::argument_type(
                    format!("{}.{}", context, key),
                    "string",
                    "nil",
                )),
                None => Ok(String::new()),
            }
        };
        let filename = field("filename", true)?;
        let mimetype = field("mimetype", false)?;
        let description = field("description", false)?;
        let attachment = Attachment::from_file(Path::new(&filename), &mimetype, &description)
            .map_err(|e| BindingError::native("document.attachments", e))?;
        attachments.push(attachment);
    }
    Ok(attachments)
}

fn preferences_from_script(value: &Dynamic) -> Result<Vec<(String, String)>> {
    let map: Map = expect(value, "document.viewer_preferences")?;
    map.iter()
        .map(|(key, v)| {
            let text = if let Ok(b) = v.as_bool() {
                b.to_string()
            } else if let Ok(i) = v.as_int() {
                i.to_string()
            } else {
                expect::<String>(v, &format!("document.viewer_preferences.{}", key))
                    .map_err(|_| {
                        BindingError::argument_type(
                            format!("document.viewer_preferences.{}", key),
                            "string, int or bool",
                            dynamic_type_name(v),
                        )
                    })?
            };
            Ok((key.to_string(), text))
        })
        .collect()
}

impl DocumentHandle {
    fn method(&self, attr: DocumentAttr) -> Option<Dynamic> {
        let doc = self.0.clone();
        let value = match attr {
            DocumentAttr::NewPage => method("document.new_page", Arity::Exact(0), move |_ctx, _args| {
                let page = doc.borrow_mut().new_page();
                Ok(wrap(PageHandle(page)))
            }),
            DocumentAttr::Finish => method("document.finish", Arity::Exact(0), move |ctx, _args| {
                doc.borrow_mut()
                    .finish()
                    .map_err(|e| BindingError::native("document.finish", e))?;
                ctx.info(format!("finished {}", doc.borrow().filename.display()));
                Ok(Dynamic::UNIT)
            }),
            DocumentAttr::LoadImagefile => {
                method("document.load_imagefile", Arity::Exact(1), move |_ctx, args| {
                    let filename: String = Args::new("document.load_imagefile", args).get(0, "filename")?;
                    let image = doc
                        .borrow()
                        .load_image_file(Path::new(&filename))
                        .map_err(|e| BindingError::native("document.load_imagefile", e))?;
                    Ok(wrap(ImageFileHandle(image)))
                })
            }
            DocumentAttr::CreateImageNode => {
                let name = "document.create_image_node_from_imagefile";
                method(name, Arity::Range(1, 3), move |_ctx, args| {
                    let args = Args::new(name, args);
                    let image: Rc<ImageFile> = args.get(0, "imagefile")?;
                    let page = args.opt::<INT>(1, "page")?.unwrap_or(1);
                    let box_name = args
                        .opt::<String>(2, "box")?
                        .unwrap_or_else(|| "/MediaBox".to_string());
                    let page = u32::try_from(page)
                        .map_err(|_| args.type_error(1, "page", "positive int"))?;
                    let node = doc
                        .borrow()
                        .create_image_node(&image, page, &box_name)
                        .map_err(|e| BindingError::native(name, e))?;
                    Ok(wrap(NodeHandle(node)))
                })
            }
            DocumentAttr::OutputXmlDump => {
                method("document.output_xml_dump", Arity::Exact(1), move |_ctx, args| {
                    let name = "document.output_xml_dump";
                    let filename: String = Args::new(name, args).get(0, "filename")?;
                    let file = File::create(&filename)
                        .map_err(|e| BindingError::native(name, EngineError::Io(e)))?;
                    doc.borrow()
                        .output_xml_dump(BufWriter::new(file))
                        .map_err(|e| BindingError::native(name, e))?;
                    Ok(Dynamic::UNIT)
                })
            }
            DocumentAttr::LoadColorprofile => {
                method("document.load_colorprofile", Arity::Exact(1), move |_ctx, args| {
                    let name = "document.load_colorprofile";
                    let filename: String = Args::new(name, args).get(0, "filename")?;
                    let profile = ColorProfile::load(Path::new(&filename))
                        .map_err(|e| BindingError::native(name, e))?;
                    let profile = Rc::new(RefCell::new(profile));
                    doc.borrow_mut().color_profile = Some(profile.clone());
                    Ok(wrap(ColorProfileHandle(profile)))
                })
            }
            _ => return None,
        };
        Some(value)
    }
}

impl Wrapper for DocumentHandle {
    type Native = Rc<RefCell<Document>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for DocumentHandle {
    fn type_tag(&self) -> &'static str {
        DOCUMENT
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let doc = self.0.borrow();
        format!("document({}, {} pages)", doc.filename.display(), doc.pages().len())
    }

    /// Finishing renders every page
    fn cost(&self) -> u64 {
        self.0.borrow().pages().len() as u64
    }
}

impl AttributeAccessible for DocumentHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = DocumentAttr::from_name(name)?;
        if attr.is_method() {
            return self.method(attr);
        }
        let doc = self.0.borrow();
        let value = match attr {
            DocumentAttr::Attachments => {
                Dynamic::from_array(doc.attachments.iter().map(attachment_to_map).collect())
            }
            DocumentAttr::Author => Dynamic::from(doc.author.clone()),
            DocumentAttr::Bleed => wrap(SpValue(doc.bleed)),
            DocumentAttr::ColorProfile => match &doc.color_profile {
                Some(profile) => wrap(ColorProfileHandle(profile.clone())),
                None => Dynamic::UNIT,
            },
            DocumentAttr::CompressLevel => Dynamic::from(doc.compress_level as INT),
            DocumentAttr::CreationDate => match &doc.creation_date {
                Some(date) => Dynamic::from(date.clone()),
                None => Dynamic::UNIT,
            },
            DocumentAttr::Creator => Dynamic::from(doc.creator.clone()),
            DocumentAttr::DefaultPageHeight => wrap(SpValue(doc.default_page_height)),
            DocumentAttr::DefaultPageWidth => wrap(SpValue(doc.default_page_width)),
            DocumentAttr::DumpOutput => Dynamic::from(doc.dump_output),
            DocumentAttr::Filename => Dynamic::from(doc.filename.display().to_string()),
            DocumentAttr::Format => Dynamic::from(doc.format.name().to_string()),
            DocumentAttr::Keywords => Dynamic::from(doc.keywords.clone()),
            DocumentAttr::Language => match &doc.default_language {
                Some(lang) => wrap(LangValue(lang.clone())),
                None => Dynamic::UNIT,
            },
            DocumentAttr::Pages => Dynamic::from_array(
                doc.pages()
                    .iter()
                    .map(|p| wrap(PageHandle(p.clone())))
                    .collect(),
            ),
            DocumentAttr::PdfWriter => wrap(PdfHandle(doc.writer())),
            DocumentAttr::ShowCutmarks => Dynamic::from(doc.show_cutmarks),
            DocumentAttr::ShowHyperlinks => Dynamic::from(doc.show_hyperlinks),
            DocumentAttr::Subject => Dynamic::from(doc.subject.clone()),
            DocumentAttr::SuppressInfo => Dynamic::from(doc.suppress_info),
            DocumentAttr::Title => Dynamic::from(doc.title.clone()),
            DocumentAttr::ViewerPreferences => Dynamic::from_map(
                doc.viewer_preferences
                    .iter()
                    .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
                    .collect(),
            ),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = DocumentAttr::from_name(name)
            .ok_or_else(|| BindingError::unknown_attribute(DOCUMENT, name))?;
        let context = format!("document.{}", name);
        let context = context.as_str();
        // each arm validates before it borrows the document mutably
        match attr {
            DocumentAttr::Author => self.0.borrow_mut().author = expect(&value, context)?,
            DocumentAttr::Creator => self.0.borrow_mut().creator = expect(&value, context)?,
            DocumentAttr::Keywords => self.0.borrow_mut().keywords = expect(&value, context)?,
            DocumentAttr::Subject => self.0.borrow_mut().subject = expect(&value, context)?,
            DocumentAttr::Title => self.0.borrow_mut().title = expect(&value, context)?,
            DocumentAttr::CreationDate => {
                let date = if value.is::<()>() {
                    None
                } else {
                    Some(expect::<String>(&value, context)?)
                };
                self.0.borrow_mut().creation_date = date;
            }
            DocumentAttr::Bleed => {
                self.0.borrow_mut().bleed = expect::<ScaledPoint>(&value, context)?
            }
            DocumentAttr::DefaultPageHeight => {
                self.0.borrow_mut().default_page_height = expect::<ScaledPoint>(&value, context)?
            }
            DocumentAttr::DefaultPageWidth => {
                self.0.borrow_mut().default_page_width = expect::<ScaledPoint>(&value, context)?
            }
            DocumentAttr::CompressLevel => {
                let level: INT = expect(&value, context)?;
                if !(0..=9).contains(&level) {
                    return Err(BindingError::argument_type(context, "int from 0 to 9", level.to_string()));
                }
                self.0.borrow_mut().compress_level = level as u32;
            }
            DocumentAttr::DumpOutput => self.0.borrow_mut().dump_output = expect(&value, context)?,
            DocumentAttr::ShowCutmarks => {
                self.0.borrow_mut().show_cutmarks = expect(&value, context)?
            }
            DocumentAttr::ShowHyperlinks => {
                self.0.borrow_mut().show_hyperlinks = expect(&value, context)?
            }
            DocumentAttr::SuppressInfo => {
                self.0.borrow_mut().suppress_info = expect(&value, context)?
            }
            DocumentAttr::Format => {
                let text: String = expect(&value, context)?;
                let format = Format::parse(&text).ok_or_else(|| {
                    BindingError::argument_type(context, format_choices(), format!("{:?}", text))
                })?;
                self.0.borrow_mut().format = format;
            }
            DocumentAttr::Language => {
                let lang = match Lang::from_dynamic(&value) {
                    Some(lang) => lang,
                    None => {
                        let name: String = expect(&value, context).map_err(|_| {
                            BindingError::argument_type(
                                context,
                                "string or backend.lang",
                                dynamic_type_name(&value),
                            )
                        })?;
                        get_language(&name).map_err(|e| BindingError::native(context, e))?
                    }
                };
                self.0.borrow_mut().default_language = Some(lang);
            }
            DocumentAttr::ViewerPreferences => {
                let preferences = preferences_from_script(&value)?;
                self.0.borrow_mut().viewer_preferences = preferences.into_iter().collect();
            }
            DocumentAttr::Attachments => {
                let attachments = attachments_from_script(&value)?;
                self.0.borrow_mut().attachments = attachments;
            }
            DocumentAttr::ColorProfile => {
                let profile = if value.is::<()>() {
                    None
                } else {
                    Some(expect::<Rc<RefCell<ColorProfile>>>(&value, context)?)
                };
                self.0.borrow_mut().color_profile = profile;
            }
            other => return Err(BindingError::read_only(DOCUMENT, other.name())),
        }
        Ok(())
    }
}

impl Comparable for DocumentHandle {}
impl Truthy for DocumentHandle {}
impl Operable for DocumentHandle {}

/// A page of a document
#[derive(Debug, Clone)]
pub struct PageHandle(pub Rc<RefCell<Page>>);

attributes! {
    PageAttr {
        fields {
            Width => "width",
            Height => "height",
            Number => "number",
            Shipped => "shipped",
        }
        methods {
            OutputAt => "output_at",
            Shipout => "shipout",
        }
    }
}

const PAGE: &str = "backend.document.page";

impl Wrapper for PageHandle {
    type Native = Rc<RefCell<Page>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for PageHandle {
    fn type_tag(&self) -> &'static str {
        PAGE
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let page = self.0.borrow();
        format!("page {} ({} x {})", page.number, page.width, page.height)
    }
}

impl AttributeAccessible for PageHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = PageAttr::from_name(name)?;
        let page = self.0.clone();
        let value = match attr {
            PageAttr::Width => wrap(SpValue(page.borrow().width)),
            PageAttr::Height => wrap(SpValue(page.borrow().height)),
            PageAttr::Number => Dynamic::from(page.borrow().number as INT),
            PageAttr::Shipped => Dynamic::from(page.borrow().is_shipped()),
            PageAttr::OutputAt => method("page.output_at", Arity::Exact(3), move |_ctx, args| {
                let args = Args::new("page.output_at", args);
                let x: ScaledPoint = args.get(0, "x")?;
                let y: ScaledPoint = args.get(1, "y")?;
                let vlist: NodeRef = args.get(2, "vlist")?;
                page.borrow_mut()
                    .output_at(x, y, vlist)
                    .map_err(|e| BindingError::native("page.output_at", e))?;
                Ok(Dynamic::UNIT)
            }),
            PageAttr::Shipout => method("page.shipout", Arity::Exact(0), move |_ctx, _args| {
                page.borrow_mut()
                    .shipout()
                    .map_err(|e| BindingError::native("page.shipout", e))?;
                Ok(Dynamic::UNIT)
            }),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr =
            PageAttr::from_name(name).ok_or_else(|| BindingError::unknown_attribute(PAGE, name))?;
        match attr {
            PageAttr::Width => self.0.borrow_mut().width = expect(&value, "page.width")?,
            PageAttr::Height => self.0.borrow_mut().height = expect(&value, "page.height")?,
            other => return Err(BindingError::read_only(PAGE, other.name())),
        }
        Ok(())
    }
}

impl Comparable for PageHandle {}
impl Truthy for PageHandle {}
impl Operable for PageHandle {}

#[derive(Debug, Clone)]
pub struct ColorProfileHandle(pub Rc<RefCell<ColorProfile>>);

attributes! {
    ColorProfileAttr {
        fields {
            Identifier => "identifier",
            Registry => "registry",
            Info => "info",
            Condition => "condition",
            Colors => "colors",
        }
        methods {}
    }
}

const COLOR_PROFILE: &str = "backend.colorprofile";

impl Wrapper for ColorProfileHandle {
    type Native = Rc<RefCell<ColorProfile>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for ColorProfileHandle {
    fn type_tag(&self) -> &'static str {
        COLOR_PROFILE
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("colorprofile({})", self.0.borrow().identifier)
    }
}

impl AttributeAccessible for ColorProfileHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let profile = self.0.borrow();
        let value = match ColorProfileAttr::from_name(name)? {
            ColorProfileAttr::Identifier => Dynamic::from(profile.identifier.clone()),
            ColorProfileAttr::Registry => Dynamic::from(profile.registry.clone()),
            ColorProfileAttr::Info => Dynamic::from(profile.info.clone()),
            ColorProfileAttr::Condition => Dynamic::from(profile.condition.clone()),
            ColorProfileAttr::Colors => Dynamic::from(profile.colors as INT),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = ColorProfileAttr::from_name(name)
            .ok_or_else(|| BindingError::unknown_attribute(COLOR_PROFILE, name))?;
        let context = format!("colorprofile.{}", name);
        match attr {
            ColorProfileAttr::Colors => {
                self.0.borrow_mut().colors = expect::<INT>(&value, &context)?
            }
            text_field => {
                let text: String = expect(&value, &context)?;
                let mut profile = self.0.borrow_mut();
                match text_field {
                    ColorProfileAttr::Identifier => profile.identifier = text,
                    ColorProfileAttr::Registry => profile.registry = text,
                    ColorProfileAttr::Info => profile.info = text,
                    _ => profile.condition = text,
                }
            }
        }
        Ok(())
    }
}

impl Comparable for ColorProfileHandle {}
impl Truthy for ColorProfileHandle {}
impl Operable for ColorProfileHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Foreign;
    use bagscript_engine::node::{new_node, NodeType};

    fn document() -> DocumentHandle {
        DocumentHandle(Rc::new(RefCell::new(Document::in_memory())))
    }

    fn call(value: Dynamic, ctx: &Context, args: &[Dynamic]) -> Result<Dynamic> {
        match value.try_cast::<Foreign>() {
            Some(Foreign::Builtin(b)) => b.call(ctx, args),
            _ => panic!("not a builtin"),
        }
    }

    #[test]
    fn test_metadata_round_trip() {
        let ctx = Context::default();
        let doc = document();
        doc.set_attribute(&ctx, "title", Dynamic::from("Report")).unwrap();
        doc.set_attribute(&ctx, "format", Dynamic::from("PDF/UA")).unwrap();
        doc.set_attribute(&ctx, "language", Dynamic::from("german")).unwrap();
        assert_eq!(
            doc.get_attribute("title").unwrap().into_string().unwrap(),
            "Report"
        );
        assert_eq!(doc.0.borrow().format, Format::PdfUa);
        assert_eq!(doc.0.borrow().default_language.as_ref().unwrap().code, "de");
    }

    #[test]
    fn test_scaled_attribute_rejects_int() {
        let ctx = Context::default();
        let doc = document();
        let before = doc.0.borrow().bleed;
        let err = doc
            .set_attribute(&ctx, "bleed", Dynamic::from(3_i64))
            .unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
        assert_eq!(err.to_string(), "document.bleed expects backend.sp, got int");
        assert_eq!(doc.0.borrow().bleed, before);
    }

    #[test]
    fn test_invalid_format_and_level() {
        let ctx = Context::default();
        let doc = document();
        let err = doc
            .set_attribute(&ctx, "format", Dynamic::from("PDF/Z"))
            .unwrap_err();
        assert!(err.to_string().contains("PDF/A-3b"));
        assert!(doc
            .set_attribute(&ctx, "compresslevel", Dynamic::from(12_i64))
            .is_err());
        assert_eq!(doc.0.borrow().compress_level, 9);
    }

    #[test]
    fn test_read_only_attributes() {
        let ctx = Context::default();
        let doc = document();
        for name in ["filename", "pages", "finish"] {
            let err = doc.set_attribute(&ctx, name, Dynamic::from("x")).unwrap_err();
            assert!(err.to_string().contains("read-only"), "{name}");
        }
        let err = doc
            .set_attribute(&ctx, "colour", Dynamic::from("x"))
            .unwrap_err();
        assert!(err.to_string().contains("unknown attribute"));
    }

    #[test]
    fn test_new_page_is_linked() {
        let ctx = Context::default();
        let doc = document();
        let page = call(doc.get_attribute("new_page").unwrap(), &ctx, &[]).unwrap();
        assert_eq!(doc.0.borrow().pages().len(), 1);
        let Some(Foreign::Page(page)) = page.try_cast::<Foreign>() else {
            panic!("expected a page");
        };
        assert!(Rc::ptr_eq(&page.0, &doc.0.borrow().pages()[0]));
        let pages = doc.get_attribute("pages").unwrap().try_cast::<Array>().unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_page_output_and_dimensions() {
        let ctx = Context::default();
        let doc = document();
        let page = PageHandle(doc.0.borrow_mut().new_page());
        let width = wrap(SpValue(ScaledPoint::parse("100pt").unwrap()));
        page.set_attribute(&ctx, "width", width).unwrap();
        assert_eq!(page.0.borrow().width, ScaledPoint::parse("100pt").unwrap());
        assert!(page.set_attribute(&ctx, "height", Dynamic::from(5_i64)).is_err());

        let x = wrap(SpValue(ScaledPoint::ZERO));
        let vlist = wrap(NodeHandle(new_node(NodeType::VList)));
        let output_at = page.get_attribute("output_at").unwrap();
        call(output_at.clone(), &ctx, &[x.clone(), x.clone(), vlist]).unwrap();
        assert_eq!(page.0.borrow().objects().len(), 1);

        let err = call(output_at, &ctx, &[x.clone(), Dynamic::from(1_i64), x]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "page.output_at() argument 2 (y) expects backend.sp, got int"
        );
    }

    #[test]
    fn test_finish_twice_is_native_error() {
        let ctx = Context::default();
        let doc = document();
        let finish = doc.get_attribute("finish").unwrap();
        call(finish.clone(), &ctx, &[]).unwrap();
        let err = call(finish, &ctx, &[]).unwrap_err();
        assert_eq!(err.kind(), "NativeOperationError");
        assert!(err.to_string().contains("already finished"));
    }

    #[test]
    fn test_attachments_validated_before_store() {
        let ctx = Context::default();
        let doc = document();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xml");
        std::fs::write(&path, "<data/>").unwrap();

        let mut good = Map::new();
        good.insert("filename".into(), Dynamic::from(path.display().to_string()));
        good.insert("mimetype".into(), Dynamic::from("text/xml"));
        let mut missing = Map::new();
        missing.insert("filename".into(), Dynamic::from("/no/such/file.xml"));

        let value = Dynamic::from_array(vec![
            Dynamic::from_map(good.clone()),
            Dynamic::from_map(missing),
        ]);
        let err = doc.set_attribute(&ctx, "attachments", value).unwrap_err();
        assert_eq!(err.kind(), "NativeOperationError");
        assert!(doc.0.borrow().attachments.is_empty());

        let value = Dynamic::from_array(vec![Dynamic::from_map(good)]);
        doc.set_attribute(&ctx, "attachments", value).unwrap();
        let list = doc.get_attribute("attachments").unwrap().try_cast::<Array>().unwrap();
        let first = list[0].clone().try_cast::<Map>().unwrap();
        assert_eq!(first["filename"].clone().into_string().unwrap(), "data.xml");
    }

    #[test]
    fn test_viewer_preferences() {
        let ctx = Context::default();
        let doc = document();
        let mut prefs = Map::new();
        prefs.insert("DisplayDocTitle".into(), Dynamic::from(true));
        prefs.insert("Direction".into(), Dynamic::from("L2R"));
        doc.set_attribute(&ctx, "viewer_preferences", Dynamic::from_map(prefs))
            .unwrap();
        assert_eq!(
            doc.0.borrow().viewer_preferences.get("DisplayDocTitle").map(String::as_str),
            Some("true")
        );

        let mut bad = Map::new();
        bad.insert("Direction".into(), Dynamic::from(1.5_f64));
        assert!(doc
            .set_attribute(&ctx, "viewer_preferences", Dynamic::from_map(bad))
            .is_err());
        assert_eq!(doc.0.borrow().viewer_preferences.len(), 2);
    }

    #[test]
    fn test_color_profile_fields() {
        let ctx = Context::default();
        let profile = ColorProfileHandle(Rc::new(RefCell::new(ColorProfile {
            identifier: String::new(),
            registry: String::new(),
            info: String::new(),
            condition: String::new(),
            colors: 4,
            data: Vec::new(),
        })));
        profile
            .set_attribute(&ctx, "identifier", Dynamic::from("FOGRA39"))
            .unwrap();
        profile.set_attribute(&ctx, "colors", Dynamic::from(3_i64)).unwrap();
        assert!(profile
            .set_attribute(&ctx, "colors", Dynamic::from("three"))
            .is_err());
        assert_eq!(profile.display(), "colorprofile(FOGRA39)");
        assert_eq!(profile.0.borrow().colors, 3);
    }
}
