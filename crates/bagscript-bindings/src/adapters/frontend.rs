//! The high-level frontend: font families, texts with settings and tables

use std::cell::RefCell;
use std::rc::Rc;

use bagscript_engine::frontend::{
    FontFamily, FontSource, FontStyle, FrontendDocument, HAlign, ParagraphOptions, Table,
    TableCell, TableRow, Text, TextItem, FONT_WEIGHT_REGULAR,
};
use bagscript_engine::ScaledPoint;
use rhai::{Array, Dynamic, Map, INT};

use crate::adapters::bag::SpValue;
use crate::adapters::document::DocumentHandle;
use crate::adapters::node::NodeHandle;
use crate::adapters::wrap;
use crate::args::{expect, Args, FromDynamic};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};
use crate::settings::{self, SettingsHandle};

/// Reject keys outside `allowed` so typos do not pass silently
fn check_keys(map: &Map, context: &str, allowed: &[&str]) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(BindingError::argument_type(
            format!("{}.{}", context, key),
            format!("one of {}", allowed.join(", ")),
            "unknown key",
        )),
        None => Ok(()),
    }
}

fn optional<T: FromDynamic>(map: &Map, context: &str, key: &str) -> Result<Option<T>> {
    match map.get(key) {
        None => Ok(None),
        Some(value) if value.is::<()>() => Ok(None),
        Some(value) => expect(value, &format!("{}.{}", context, key)).map(Some),
    }
}

/// Build a font source from `#{location, name, index, features}`
pub fn fontsource_from_map(map: &Map) -> Result<FontSource> {
    let context = "frontend.new_fontsource";
    check_keys(map, context, &["location", "name", "index", "features"])?;
    let location: String = optional(map, context, "location")?.ok_or_else(|| {
        BindingError::argument_type(format!("{}.location", context), "string", "nil")
    })?;
    let index = match optional::<INT>(map, context, "index")? {
        Some(i) => u32::try_from(i).map_err(|_| {
            BindingError::argument_type(format!("{}.index", context), "non-negative int", i.to_string())
        })?,
        None => 0,
    };
    let features = match optional::<Array>(map, context, "features")? {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| expect::<String>(item, &format!("{}.features[{}]", context, i)))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(FontSource {
        name: optional(map, context, "name")?.unwrap_or_else(|| location.clone()),
        location,
        index,
        features,
    })
}

/// Strings and texts, all checked before any is used
fn text_items(args: &Args<'_>, first: usize) -> Result<Vec<TextItem>> {
    args.rest(first)
        .iter()
        .enumerate()
        .map(|(offset, value)| {
            if let Some(text) = Rc::<RefCell<Text>>::from_dynamic(value) {
                Ok(TextItem::Text(text))
            } else if let Some(s) = String::from_dynamic(value) {
                Ok(TextItem::Str(s))
            } else {
                Err(args.type_error(first + offset, "item", "string or frontend.text"))
            }
        })
        .collect()
}

fn items_to_script(items: &[TextItem]) -> Dynamic {
    Dynamic::from_array(
        items
            .iter()
            .map(|item| match item {
                TextItem::Str(s) => Dynamic::from(s.clone()),
                TextItem::Text(t) => wrap(TextHandle(t.clone())),
            })
            .collect(),
    )
}

#[derive(Debug, Clone)]
pub struct FrontendHandle(pub Rc<RefCell<FrontendDocument>>);

attributes! {
    FrontendAttr {
        fields { Doc => "doc" }
        methods {
            FindFontfamily => "find_fontfamily",
            FormatParagraph => "format_paragraph",
            NewFontfamily => "new_fontfamily",
        }
    }
}

const FRONTEND: &str = "frontend.document";

impl Wrapper for FrontendHandle {
    type Native = Rc<RefCell<FrontendDocument>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for FrontendHandle {
    fn type_tag(&self) -> &'static str {
        FRONTEND
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let fe = self.0.borrow();
        let doc = fe.doc.borrow();
        format!("frontend({})", doc.filename.display())
    }
}

impl AttributeAccessible for FrontendHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let fe = self.0.clone();
        let value = match FrontendAttr::from_name(name)? {
            FrontendAttr::Doc => wrap(DocumentHandle(fe.borrow().doc.clone())),
            FrontendAttr::NewFontfamily => {
                method("frontend.new_fontfamily", Arity::Exact(1), move |_ctx, args| {
                    let name: String = Args::new("frontend.new_fontfamily", args).get(0, "name")?;
                    let family = fe.borrow_mut().new_fontfamily(&name);
                    Ok(wrap(FontFamilyHandle(family)))
                })
            }
            FrontendAttr::FindFontfamily => {
                method("frontend.find_fontfamily", Arity::Exact(1), move |_ctx, args| {
                    let name: String = Args::new("frontend.find_fontfamily", args).get(0, "name")?;
                    Ok(match fe.borrow().find_fontfamily(&name) {
                        Some(family) => wrap(FontFamilyHandle(family)),
                        None => Dynamic::UNIT,
                    })
                })
            }
            // format_paragraph(text, #{width, leading, font_size, family})
            FrontendAttr::FormatParagraph => {
                let function = "frontend.format_paragraph";
                method(function, Arity::Range(1, 2), move |ctx, args| {
                    let args = Args::new(function, args);
                    let text = match args.raw(0) {
                        Some(value) => match Rc::<RefCell<Text>>::from_dynamic(value) {
                            Some(text) => text.borrow().clone(),
                            None => match String::from_dynamic(value) {
                                Some(s) => Text {
                                    items: vec![TextItem::Str(s)],
                                    ..Text::new()
                                },
                                None => return Err(args.type_error(0, "text", "frontend.text or string")),
                            },
                        },
                        None => return Err(args.type_error(0, "text", "frontend.text or string")),
                    };
                    let options = match args.opt::<Map>(1, "options")? {
                        Some(map) => paragraph_options(&map)?,
                        None => ParagraphOptions::default(),
                    };
                    let vlist = fe
                        .borrow_mut()
                        .format_paragraph(&text, options)
                        .map_err(|e| BindingError::native(function, e))?;
                    ctx.info(format!("formatted paragraph of {} characters", text.content().chars().count()));
                    Ok(wrap(NodeHandle(vlist)))
                })
            }
        };
        Some(value)
    }
}

fn paragraph_options(map: &Map) -> Result<ParagraphOptions> {
    let context = "frontend.format_paragraph options";
    check_keys(map, context, &["width", "leading", "font_size", "family"])?;
    Ok(ParagraphOptions {
        width: optional::<ScaledPoint>(map, context, "width")?,
        leading: optional::<ScaledPoint>(map, context, "leading")?,
        font_size: optional::<ScaledPoint>(map, context, "font_size")?,
        family: optional::<Rc<RefCell<FontFamily>>>(map, context, "family")?,
    })
}

impl Comparable for FrontendHandle {}
impl Truthy for FrontendHandle {}
impl Operable for FrontendHandle {}

#[derive(Debug, Clone)]
pub struct FontFamilyHandle(pub Rc<RefCell<FontFamily>>);

attributes! {
    FontFamilyAttr {
        fields { Id => "id", Members => "members", Name => "name" }
        methods { AddMember => "add_member" }
    }
}

const FONT_FAMILY: &str = "frontend.fontfamily";

impl Wrapper for FontFamilyHandle {
    type Native = Rc<RefCell<FontFamily>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for FontFamilyHandle {
    fn type_tag(&self) -> &'static str {
        FONT_FAMILY
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let family = self.0.borrow();
        format!("fontfamily {} ({} members)", family.name, family.members().len())
    }
}

impl AttributeAccessible for FontFamilyHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let family = self.0.clone();
        let value = match FontFamilyAttr::from_name(name)? {
            FontFamilyAttr::Id => Dynamic::from(family.borrow().id as INT),
            FontFamilyAttr::Name => Dynamic::from(family.borrow().name.clone()),
            FontFamilyAttr::Members => Dynamic::from_array(
                family
                    .borrow()
                    .members()
                    .iter()
                    .map(|m| {
                        let mut map = Map::new();
                        map.insert("source".into(), wrap(FontSourceValue(m.source.clone())));
                        map.insert("weight".into(), Dynamic::from(m.weight as INT));
                        map.insert("style".into(), Dynamic::from(m.style.name().to_string()));
                        Dynamic::from_map(map)
                    })
                    .collect(),
            ),
            // add_member(#{source, weight, style})
            FontFamilyAttr::AddMember => {
                let function = "fontfamily.add_member";
                method(function, Arity::Exact(1), move |_ctx, args| {
                    let map: Map = Args::new(function, args).get(0, "member")?;
                    check_keys(&map, function, &["source", "weight", "style"])?;
                    let source: FontSource = optional(&map, function, "source")?.ok_or_else(|| {
                        BindingError::argument_type(format!("{}.source", function), "frontend.fontsource", "nil")
                    })?;
                    let weight = match optional::<INT>(&map, function, "weight")? {
                        Some(w) => u16::try_from(w).map_err(|_| {
                            BindingError::argument_type(format!("{}.weight", function), "weight from 1 to 1000", w.to_string())
                        })?,
                        None => FONT_WEIGHT_REGULAR,
                    };
                    let style = match optional::<String>(&map, function, "style")? {
                        Some(s) => FontStyle::parse(&s).ok_or_else(|| {
                            BindingError::argument_type(
                                format!("{}.style", function),
                                "one of normal, italic, oblique",
                                format!("{:?}", s),
                            )
                        })?,
                        None => FontStyle::Normal,
                    };
                    family
                        .borrow_mut()
                        .add_member(source, weight, style)
                        .map_err(|e| BindingError::native(function, e))?;
                    Ok(Dynamic::UNIT)
                })
            }
        };
        Some(value)
    }
}

impl Comparable for FontFamilyHandle {}
impl Truthy for FontFamilyHandle {}
impl Operable for FontFamilyHandle {}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSourceValue(pub FontSource);

attributes! {
    FontSourceAttr {
        fields {
            Features => "features",
            Index => "index",
            Location => "location",
            Name => "name",
        }
        methods {}
    }
}

impl Wrapper for FontSourceValue {
    type Native = FontSource;

    fn native(&self) -> FontSource {
        self.0.clone()
    }
}

impl Identified for FontSourceValue {
    fn type_tag(&self) -> &'static str {
        "frontend.fontsource"
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl AttributeAccessible for FontSourceValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let source = &self.0;
        let value = match FontSourceAttr::from_name(name)? {
            FontSourceAttr::Features => Dynamic::from_array(
                source.features.iter().map(|f| Dynamic::from(f.clone())).collect(),
            ),
            FontSourceAttr::Index => Dynamic::from(source.index as INT),
            FontSourceAttr::Location => Dynamic::from(source.location.clone()),
            FontSourceAttr::Name => Dynamic::from(source.name.clone()),
        };
        Some(value)
    }
}

impl Comparable for FontSourceValue {}
impl Truthy for FontSourceValue {}
impl Operable for FontSourceValue {}

/// A text with its own settings
#[derive(Debug, Clone)]
pub struct TextHandle(pub Rc<RefCell<Text>>);

attributes! {
    TextAttr {
        fields { Content => "content", Items => "items", Settings => "settings" }
        methods { Append => "append" }
    }
}

const TEXT: &str = "frontend.text";

impl Wrapper for TextHandle {
    type Native = Rc<RefCell<Text>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for TextHandle {
    fn type_tag(&self) -> &'static str {
        TEXT
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("text({:?})", self.0.borrow().content())
    }
}

impl AttributeAccessible for TextHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let text = self.0.clone();
        let value = match TextAttr::from_name(name)? {
            TextAttr::Content => Dynamic::from(text.borrow().content()),
            TextAttr::Items => items_to_script(&text.borrow().items),
            TextAttr::Settings => wrap(SettingsHandle(text)),
            TextAttr::Append => method("text.append", Arity::AtLeast(1), move |_ctx, args| {
                let items = text_items(&Args::new("text.append", args), 0)?;
                if items
                    .iter()
                    .any(|item| matches!(item, TextItem::Text(t) if Rc::ptr_eq(t, &text)))
                {
                    return Err(BindingError::UnsupportedOperation {
                        type_tag: TEXT.to_string(),
                        op: "append to itself".to_string(),
                    });
                }
                text.borrow_mut().items.extend(items);
                Ok(Dynamic::UNIT)
            }),
        };
        Some(value)
    }

    fn set_attribute(&self, ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        match TextAttr::from_name(name) {
            Some(TextAttr::Settings) => settings::assign(ctx, &self.0, &value),
            Some(other) => Err(BindingError::read_only(TEXT, other.name())),
            None => Err(BindingError::unknown_attribute(TEXT, name)),
        }
    }
}

impl Comparable for TextHandle {}

impl Truthy for TextHandle {
    fn is_truthy(&self) -> bool {
        !self.0.borrow().items.is_empty()
    }
}

impl Operable for TextHandle {}

/// Table data; rows hold cells, cells hold text items
#[derive(Debug, Clone)]
pub struct TableHandle(pub Rc<RefCell<Table>>);

attributes! {
    TableAttr {
        fields { MaxWidth => "max_width", Rows => "rows", Stretch => "stretch" }
        methods { Append => "append" }
    }
}

const TABLE: &str = "frontend.table";

impl Wrapper for TableHandle {
    type Native = Rc<RefCell<Table>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for TableHandle {
    fn type_tag(&self) -> &'static str {
        TABLE
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("table ({} rows)", self.0.borrow().rows.len())
    }

    fn cost(&self) -> u64 {
        self.0.borrow().rows.len() as u64
    }
}

impl AttributeAccessible for TableHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let table = self.0.clone();
        let value = match TableAttr::from_name(name)? {
            TableAttr::MaxWidth => wrap(SpValue(table.borrow().max_width)),
            TableAttr::Stretch => Dynamic::from(table.borrow().stretch),
            TableAttr::Rows => Dynamic::from_array(
                table.borrow().rows.iter().map(|r| wrap(RowHandle(r.clone()))).collect(),
            ),
            TableAttr::Append => method("table.append", Arity::Exact(1), move |_ctx, args| {
                let row: Rc<RefCell<TableRow>> = Args::new("table.append", args).get(0, "row")?;
                table.borrow_mut().rows.push(row);
                Ok(Dynamic::UNIT)
            }),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        match TableAttr::from_name(name) {
            Some(TableAttr::MaxWidth) => {
                self.0.borrow_mut().max_width = expect(&value, "table.max_width")?
            }
            Some(TableAttr::Stretch) => self.0.borrow_mut().stretch = expect(&value, "table.stretch")?,
            Some(other) => return Err(BindingError::read_only(TABLE, other.name())),
            None => return Err(BindingError::unknown_attribute(TABLE, name)),
        }
        Ok(())
    }
}

impl Comparable for TableHandle {}
impl Truthy for TableHandle {}
impl Operable for TableHandle {}

#[derive(Debug, Clone)]
pub struct RowHandle(pub Rc<RefCell<TableRow>>);

attributes! {
    RowAttr {
        fields { Cells => "cells" }
        methods { Append => "append" }
    }
}

const ROW: &str = "frontend.tr";

impl Wrapper for RowHandle {
    type Native = Rc<RefCell<TableRow>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for RowHandle {
    fn type_tag(&self) -> &'static str {
        ROW
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("tr ({} cells)", self.0.borrow().cells.len())
    }
}

impl AttributeAccessible for RowHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let row = self.0.clone();
        let value = match RowAttr::from_name(name)? {
            RowAttr::Cells => Dynamic::from_array(
                row.borrow().cells.iter().map(|c| wrap(CellHandle(c.clone()))).collect(),
            ),
            RowAttr::Append => method("tr.append", Arity::Exact(1), move |_ctx, args| {
                let cell: Rc<RefCell<TableCell>> = Args::new("tr.append", args).get(0, "cell")?;
                row.borrow_mut().cells.push(cell);
                Ok(Dynamic::UNIT)
            }),
        };
        Some(value)
    }
}

impl Comparable for RowHandle {}
impl Truthy for RowHandle {}
impl Operable for RowHandle {}

#[derive(Debug, Clone)]
pub struct CellHandle(pub Rc<RefCell<TableCell>>);

attributes! {
    CellAttr {
        fields {
            Align => "align",
            BorderBottomWidth => "border_bottom_width",
            BorderLeftWidth => "border_left_width",
            BorderRightWidth => "border_right_width",
            BorderTopWidth => "border_top_width",
            Contents => "contents",
            PaddingBottom => "padding_bottom",
            PaddingLeft => "padding_left",
            PaddingRight => "padding_right",
            PaddingTop => "padding_top",
        }
        methods { Append => "append" }
    }
}

const CELL: &str = "frontend.td";

impl CellAttr {
    fn is_length(self) -> bool {
        !matches!(self, CellAttr::Align | CellAttr::Contents | CellAttr::Append)
    }

    fn length_mut(self, cell: &mut TableCell) -> Option<&mut ScaledPoint> {
        match self {
            CellAttr::BorderBottomWidth => Some(&mut cell.border_bottom_width),
            CellAttr::BorderLeftWidth => Some(&mut cell.border_left_width),
            CellAttr::BorderRightWidth => Some(&mut cell.border_right_width),
            CellAttr::BorderTopWidth => Some(&mut cell.border_top_width),
            CellAttr::PaddingBottom => Some(&mut cell.padding_bottom),
            CellAttr::PaddingLeft => Some(&mut cell.padding_left),
            CellAttr::PaddingRight => Some(&mut cell.padding_right),
            CellAttr::PaddingTop => Some(&mut cell.padding_top),
            _ => None,
        }
    }
}

impl Wrapper for CellHandle {
    type Native = Rc<RefCell<TableCell>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for CellHandle {
    fn type_tag(&self) -> &'static str {
        CELL
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("td ({} items)", self.0.borrow().contents.len())
    }
}

impl AttributeAccessible for CellHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = CellAttr::from_name(name)?;
        let cell = self.0.clone();
        if let Some(length) = attr.length_mut(&mut cell.borrow_mut()).copied() {
            return Some(wrap(SpValue(length)));
        }
        let value = match attr {
            CellAttr::Align => match cell.borrow().halign {
                Some(align) => Dynamic::from(align.name().to_string()),
                None => Dynamic::UNIT,
            },
            CellAttr::Contents => items_to_script(&cell.borrow().contents),
            CellAttr::Append => method("td.append", Arity::AtLeast(1), move |_ctx, args| {
                let items = text_items(&Args::new("td.append", args), 0)?;
                cell.borrow_mut().contents.extend(items);
                Ok(Dynamic::UNIT)
            }),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr = CellAttr::from_name(name).ok_or_else(|| BindingError::unknown_attribute(CELL, name))?;
        let context = format!("td.{}", name);
        if attr.is_length() {
            let length: ScaledPoint = expect(&value, &context)?;
            let mut cell = self.0.borrow_mut();
            if let Some(field) = attr.length_mut(&mut cell) {
                *field = length;
            }
            return Ok(());
        }
        match attr {
            CellAttr::Align => {
                let align = if value.is::<()>() {
                    None
                } else {
                    let text: String = expect(&value, &context)?;
                    Some(HAlign::parse(&text).ok_or_else(|| {
                        BindingError::argument_type(
                            context.as_str(),
                            "one of left, center, right, justify",
                            format!("{:?}", text),
                        )
                    })?)
                };
                self.0.borrow_mut().halign = align;
            }
            other => return Err(BindingError::read_only(CELL, other.name())),
        }
        Ok(())
    }
}

impl Comparable for CellHandle {}
impl Truthy for CellHandle {}
impl Operable for CellHandle {}
