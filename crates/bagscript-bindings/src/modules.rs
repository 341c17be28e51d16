//! Script modules: the constructors and free functions scripts call as
//! `module::name(..)`.
//!
//! Every function is a [`Builtin`] registered for all arities up to six, so
//! a call with the wrong number of arguments reaches the builtin and fails
//! with `ArgumentCountError` instead of rhai's "function not found".

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use bagscript_engine::color::Color;
use bagscript_engine::document::Document;
use bagscript_engine::font::{Atom, Feature, Font};
use bagscript_engine::frontend::{
    FontStyle, FrontendDocument, Table, TableCell, TableRow, Text, FONT_WEIGHT_BOLD,
    FONT_WEIGHT_REGULAR,
};
use bagscript_engine::lang::get_language;
use bagscript_engine::node::{self, NodeRef, NodeType};
use bagscript_engine::pdf::{Face, PdfWriter};
use bagscript_engine::ScaledPoint;
use rhai::{Dynamic, Engine, Map, Module, INT};

use crate::adapters::bag::{LoggerHandle, SpValue};
use crate::adapters::color::ColorValue;
use crate::adapters::document::DocumentHandle;
use crate::adapters::font::{AtomHandle, FeatureValue, FontHandle};
use crate::adapters::frontend::{
    fontsource_from_map, CellHandle, FontSourceValue, FrontendHandle, RowHandle, TableHandle,
    TextHandle,
};
use crate::adapters::lang::LangValue;
use crate::adapters::node::NodeHandle;
use crate::adapters::pdf::{NameValue, PdfHandle};
use crate::adapters::wrap;
use crate::args::Args;
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::Builtin;
use crate::runtime::{deliver, RhaiResult};

macro_rules! native_fn_arities {
    ($module:expr, $ctx:expr, $name:expr, $builtin:expr; $(($($arg:ident),*)),+) => {
        $({
            let ctx = $ctx.clone();
            let builtin = $builtin.clone();
            $module.set_native_fn($name, move |$($arg: Dynamic),*| -> RhaiResult {
                deliver(&ctx, builtin.call(&ctx, &[$($arg),*]))
            });
        })+
    };
}

/// Collects the functions of one script module
struct ModuleBuilder {
    name: &'static str,
    module: Module,
    ctx: Rc<Context>,
}

impl ModuleBuilder {
    fn new(name: &'static str, ctx: &Rc<Context>) -> Self {
        ModuleBuilder {
            name,
            module: Module::new(),
            ctx: ctx.clone(),
        }
    }

    fn function(
        mut self,
        name: &'static str,
        arity: Arity,
        func: impl Fn(&Context, &[Dynamic]) -> Result<Dynamic> + 'static,
    ) -> Self {
        let builtin = Builtin::new(&format!("{}::{}", self.name, name), arity, func);
        native_fn_arities!(self.module, self.ctx, name, builtin;
            (), (a), (a, b), (a, b, c), (a, b, c, d), (a, b, c, d, e), (a, b, c, d, e, f));
        self
    }

    fn constant(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.module.set_var(name, value.into());
        self
    }

    fn register(self, engine: &mut Engine) {
        tracing::trace!(module = self.name, "registering script module");
        engine.register_static_module(self.name, self.module.into());
    }
}

fn native(function: &'static str) -> impl Fn(bagscript_engine::EngineError) -> BindingError {
    move |e| BindingError::native(function, e)
}

/// Optional output file; without one the output stays in memory
fn filename(args: &Args<'_>) -> Result<Option<String>> {
    args.opt::<String>(0, "filename")
}

fn bag(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("bag", ctx).function("sp", Arity::Exact(1), |_ctx, values| {
        let args = Args::new("bag::sp", values);
        let text: String = args.get(0, "dimension")?;
        let sp = ScaledPoint::parse(&text).map_err(native("bag::sp"))?;
        Ok(wrap(SpValue(sp)))
    })
}

fn document(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("document", ctx).function("create", Arity::Range(0, 1), |ctx, values| {
        let args = Args::new("document::create", values);
        let doc = match filename(&args)? {
            Some(path) => {
                let doc = Document::create(Path::new(&path))
                    .map_err(native("document::create"))?;
                ctx.info(format!("created document {}", path));
                doc
            }
            None => Document::in_memory(),
        };
        Ok(wrap(DocumentHandle(Rc::new(RefCell::new(doc)))))
    })
}

fn pdf(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("pdf", ctx)
        .function("create", Arity::Range(0, 1), |_ctx, values| {
            let args = Args::new("pdf::create", values);
            let writer = match filename(&args)? {
                Some(path) => {
                    PdfWriter::create(Path::new(&path)).map_err(native("pdf::create"))?
                }
                None => PdfWriter::in_memory(),
            };
            Ok(wrap(PdfHandle(Rc::new(RefCell::new(writer)))))
        })
        .function("name", Arity::Exact(1), |_ctx, values| {
            let text: String = Args::new("pdf::name", values).get(0, "name")?;
            Ok(wrap(NameValue::parse(&text, "pdf::name() argument 1 (name)")?))
        })
}

fn font(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("font", ctx)
        .function("create", Arity::Range(0, 2), |_ctx, values| {
            let args = Args::new("font::create", values);
            match args.len() {
                0 => Ok(wrap(FontHandle(None))),
                2 => {
                    let face: Rc<Face> = args.get(0, "face")?;
                    let size: ScaledPoint = args.get(1, "size")?;
                    Ok(wrap(FontHandle(Some(Rc::new(Font::new(face, size))))))
                }
                got => Err(BindingError::ArgumentCount {
                    function: "font::create".to_string(),
                    expected: Arity::Exact(2),
                    got,
                }),
            }
        })
        .function("new_atom", Arity::Range(0, 1), |_ctx, values| {
            let args = Args::new("font::new_atom", values);
            let components = args.opt::<String>(0, "components")?.unwrap_or_default();
            Ok(wrap(AtomHandle::new(Atom {
                components,
                ..Atom::default()
            })))
        })
        .function("new_feature", Arity::Exact(1), |_ctx, values| {
            let args = Args::new("font::new_feature", values);
            let text: String = args.get(0, "feature")?;
            let feature = Feature::parse(&text).map_err(native("font::new_feature"))?;
            Ok(wrap(FeatureValue(feature)))
        })
}

fn node_kind(args: &Args<'_>) -> Result<NodeType> {
    let kind: String = args.get(0, "kind")?;
    NodeType::from_name(&kind).ok_or_else(|| {
        let known: Vec<&str> = NodeType::ALL.iter().map(|t| t.name()).collect();
        BindingError::argument_type(
            "node::create() argument 1 (kind)",
            format!("one of {}", known.join(", ")),
            format!("\"{}\"", kind),
        )
    })
}

fn node_module(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("node", ctx)
        .function("create", Arity::Exact(1), |_ctx, values| {
            let args = Args::new("node::create", values);
            Ok(wrap(NodeHandle(node::new_node(node_kind(&args)?))))
        })
        .function("hpack", Arity::Exact(1), |_ctx, values| {
            let head: NodeRef = Args::new("node::hpack", values).get(0, "head")?;
            Ok(wrap(NodeHandle(node::hpack(&head))))
        })
        .function("vpack", Arity::Exact(1), |_ctx, values| {
            let head: NodeRef = Args::new("node::vpack", values).get(0, "head")?;
            Ok(wrap(NodeHandle(node::vpack(&head))))
        })
        .function("insert_after", Arity::Exact(3), |_ctx, values| {
            let args = Args::new("node::insert_after", values);
            let head: NodeRef = args.get(0, "head")?;
            let cur: NodeRef = args.get(1, "cur")?;
            let new: NodeRef = args.get(2, "new")?;
            let head = node::insert_after(&head, &cur, &new)
                .map_err(native("node::insert_after"))?;
            Ok(wrap(NodeHandle(head)))
        })
        .function("insert_before", Arity::Exact(3), |_ctx, values| {
            let args = Args::new("node::insert_before", values);
            let head: NodeRef = args.get(0, "head")?;
            let cur: NodeRef = args.get(1, "cur")?;
            let new: NodeRef = args.get(2, "new")?;
            let head = node::insert_before(&head, &cur, &new)
                .map_err(native("node::insert_before"))?;
            Ok(wrap(NodeHandle(head)))
        })
        .function("dump", Arity::Exact(1), |_ctx, values| {
            let head: NodeRef = Args::new("node::dump", values).get(0, "node")?;
            Ok(node::debug_dump(&head).into())
        })
}

fn color(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("color", ctx).function("parse", Arity::Exact(1), |_ctx, values| {
        let text: String = Args::new("color::parse", values).get(0, "color")?;
        let color = Color::parse(&text).map_err(native("color::parse"))?;
        Ok(wrap(ColorValue(color)))
    })
}

fn lang(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("lang", ctx).function("get", Arity::Exact(1), |_ctx, values| {
        let name: String = Args::new("lang::get", values).get(0, "name")?;
        let lang = get_language(&name).map_err(native("lang::get"))?;
        Ok(wrap(LangValue(lang)))
    })
}

fn frontend(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("frontend", ctx)
        .function("create", Arity::Range(0, 1), |ctx, values| {
            let args = Args::new("frontend::create", values);
            let frontend = match filename(&args)? {
                Some(path) => {
                    let frontend = FrontendDocument::new(Path::new(&path))
                        .map_err(native("frontend::create"))?;
                    ctx.info(format!("created document {}", path));
                    frontend
                }
                None => FrontendDocument::with_document(Document::in_memory()),
            };
            Ok(wrap(FrontendHandle(Rc::new(RefCell::new(frontend)))))
        })
        .function("get_language", Arity::Exact(1), |_ctx, values| {
            let name: String = Args::new("frontend::get_language", values).get(0, "name")?;
            let lang = get_language(&name).map_err(native("frontend::get_language"))?;
            Ok(wrap(LangValue(lang)))
        })
        .function("new_fontsource", Arity::Exact(1), |_ctx, values| {
            let map: Map = Args::new("frontend::new_fontsource", values).get(0, "source")?;
            Ok(wrap(FontSourceValue(fontsource_from_map(&map)?)))
        })
        .function("new_text", Arity::Exact(0), |_ctx, _values| {
            Ok(wrap(TextHandle(Rc::new(RefCell::new(Text::new())))))
        })
        .function("new_table", Arity::Exact(0), |_ctx, _values| {
            Ok(wrap(TableHandle(Rc::new(RefCell::new(Table::default())))))
        })
        .function("new_tr", Arity::Exact(0), |_ctx, _values| {
            Ok(wrap(RowHandle(Rc::new(RefCell::new(TableRow::default())))))
        })
        .function("new_td", Arity::Exact(0), |_ctx, _values| {
            Ok(wrap(CellHandle(Rc::new(RefCell::new(TableCell::default())))))
        })
        .constant("FONT_WEIGHT_400", FONT_WEIGHT_REGULAR as INT)
        .constant("FONT_WEIGHT_700", FONT_WEIGHT_BOLD as INT)
        .constant("FONT_STYLE_NORMAL", FontStyle::Normal.name())
        .constant("FONT_STYLE_ITALIC", FontStyle::Italic.name())
        .constant("FONT_STYLE_OBLIQUE", FontStyle::Oblique.name())
}

fn log(ctx: &Rc<Context>) -> ModuleBuilder {
    ModuleBuilder::new("log", ctx).function("logger", Arity::Exact(0), |_ctx, _values| {
        Ok(wrap(LoggerHandle))
    })
}

/// Register every script module
pub fn register(engine: &mut Engine, ctx: &Rc<Context>) {
    for module in [
        bag(ctx),
        document(ctx),
        pdf(ctx),
        font(ctx),
        node_module(ctx),
        color(ctx),
        lang(ctx),
        frontend(ctx),
        log(ctx),
    ] {
        module.register(engine);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_error_lists_kinds() {
        let values = [Dynamic::from("box")];
        let err = node_kind(&Args::new("node::create", &values)).unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
        assert!(err.to_string().contains("one of disc, glue, glyph"));
        assert!(err.to_string().ends_with("got \"box\""));
    }
}
