//! Layout nodes. The type tag follows the wrapped node's kind, so a single
//! adapter covers every variant.

use std::rc::Rc;

use bagscript_engine::lang::Lang;
use bagscript_engine::node::{contains, debug_dump, set_list, Dimension, NodeKind, NodeRef, NodeType};
use bagscript_engine::pdf::ImageFile;
use bagscript_engine::ScaledPoint;
use rhai::{Dynamic, INT};

use crate::adapters::bag::SpValue;
use crate::adapters::font::FontHandle;
use crate::adapters::lang::LangValue;
use crate::adapters::pdf::ImageFileHandle;
use crate::adapters::{wrap, Foreign};
use crate::args::{dynamic_type_name, expect, FromDynamic};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

#[derive(Debug, Clone)]
pub struct NodeHandle(pub NodeRef);

attributes! {
    NodeAttr {
        fields {
            Action => "action",
            Codepoint => "codepoint",
            Components => "components",
            Depth => "depth",
            Font => "font",
            Height => "height",
            Image => "image",
            Kern => "kern",
            Kind => "kind",
            Lang => "lang",
            List => "list",
            Next => "next",
            Penalty => "penalty",
            Prev => "prev",
            Shift => "shift",
            Shrink => "shrink",
            Stretch => "stretch",
            Width => "width",
        }
        methods { Dump => "dump" }
    }
}

impl NodeAttr {
    fn dimension(self) -> Option<Dimension> {
        match self {
            NodeAttr::Width => Some(Dimension::Width),
            NodeAttr::Height => Some(Dimension::Height),
            NodeAttr::Depth => Some(Dimension::Depth),
            NodeAttr::Stretch => Some(Dimension::Stretch),
            NodeAttr::Shrink => Some(Dimension::Shrink),
            NodeAttr::Shift => Some(Dimension::Shift),
            NodeAttr::Kern => Some(Dimension::Kern),
            _ => None,
        }
    }
}

fn tag_for(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Disc => "node.disc",
        NodeType::Glue => "node.glue",
        NodeType::Glyph => "node.glyph",
        NodeType::HList => "node.hlist",
        NodeType::Image => "node.image",
        NodeType::Kern => "node.kern",
        NodeType::Lang => "node.lang",
        NodeType::Penalty => "node.penalty",
        NodeType::Rule => "node.rule",
        NodeType::StartStop => "node.startstop",
        NodeType::VList => "node.vlist",
    }
}

fn optional_node(node: Option<NodeRef>) -> Dynamic {
    node.map(|n| wrap(NodeHandle(n))).unwrap_or(Dynamic::UNIT)
}

/// `nil` or a node
fn node_or_nil(value: &Dynamic, context: &str) -> Result<Option<NodeRef>> {
    if value.is::<()>() {
        return Ok(None);
    }
    NodeRef::from_dynamic(value)
        .map(Some)
        .ok_or_else(|| BindingError::argument_type(context, "node or nil", dynamic_type_name(value)))
}

impl Wrapper for NodeHandle {
    type Native = NodeRef;

    fn native(&self) -> NodeRef {
        self.0.clone()
    }
}

impl Identified for NodeHandle {
    fn type_tag(&self) -> &'static str {
        tag_for(self.0.borrow().node_type())
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        bagscript_engine::node::describe(&self.0.borrow())
    }
}

impl AttributeAccessible for NodeHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = NodeAttr::from_name(name)?;
        if let Some(dimension) = attr.dimension() {
            let value = self.0.borrow().kind.dimension(dimension)?;
            return Some(wrap(SpValue(value)));
        }
        let node = self.0.borrow();
        let value = match (attr, &node.kind) {
            (NodeAttr::Dump, _) => {
                let handle = self.0.clone();
                method("node.dump", Arity::Exact(0), move |_ctx, _args| {
                    Ok(Dynamic::from(debug_dump(&handle)))
                })
            }
            (NodeAttr::Kind, kind) => Dynamic::from(kind.node_type().name().to_string()),
            (NodeAttr::Next, _) => optional_node(node.next()),
            (NodeAttr::Prev, _) => optional_node(node.prev()),
            (NodeAttr::Penalty, NodeKind::Disc { penalty } | NodeKind::Penalty { penalty, .. }) => {
                Dynamic::from(*penalty as INT)
            }
            (NodeAttr::Codepoint, NodeKind::Glyph { codepoint, .. }) => {
                Dynamic::from(*codepoint as INT)
            }
            (NodeAttr::Components, NodeKind::Glyph { components, .. }) => {
                Dynamic::from(components.clone())
            }
            (NodeAttr::Font, NodeKind::Glyph { font, .. }) => wrap(FontHandle(font.clone())),
            (NodeAttr::Image, NodeKind::Image { image, .. }) => match image {
                Some(image) => wrap(ImageFileHandle(image.clone())),
                None => Dynamic::UNIT,
            },
            (NodeAttr::Lang, NodeKind::Lang { lang }) => match lang {
                Some(lang) => wrap(LangValue(lang.clone())),
                None => Dynamic::UNIT,
            },
            (NodeAttr::Action, NodeKind::StartStop { action }) => Dynamic::from(action.clone()),
            (NodeAttr::List, NodeKind::HList(b) | NodeKind::VList(b)) => optional_node(b.list.clone()),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let tag = self.type_tag();
        let attr = NodeAttr::from_name(name).ok_or_else(|| BindingError::unknown_attribute(tag, name))?;
        let context = format!("{}.{}", tag, name);
        let context = context.as_str();
        let missing = || BindingError::unsupported_attribute(tag, name, format!("not defined for {}", tag));

        if let Some(dimension) = attr.dimension() {
            let length: ScaledPoint = expect(&value, context)?;
            let mut node = self.0.borrow_mut();
            let field = node.kind.dimension_mut(dimension).ok_or_else(missing)?;
            *field = length;
            return Ok(());
        }

        match attr {
            NodeAttr::Penalty => {
                let penalty: INT = expect(&value, context)?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Disc { penalty: p } | NodeKind::Penalty { penalty: p, .. } => *p = penalty,
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Codepoint => {
                let glyph: INT = expect(&value, context)?;
                let glyph = u16::try_from(glyph).map_err(|_| {
                    BindingError::argument_type(context, "glyph id from 0 to 65535", glyph.to_string())
                })?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Glyph { codepoint, .. } => *codepoint = glyph,
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Components => {
                let text: String = expect(&value, context)?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Glyph { components, .. } => *components = text,
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Font => {
                let new_font = match Foreign::from_dynamic(&value) {
                    Some(Foreign::Font(handle)) => handle.native(),
                    _ => {
                        return Err(BindingError::argument_type(
                            context,
                            "font.font",
                            dynamic_type_name(&value),
                        ))
                    }
                };
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Glyph { font, .. } => *font = new_font,
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Image => {
                let new_image: Rc<ImageFile> = expect(&value, context)?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Image { image, .. } => *image = Some(new_image),
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Lang => {
                let new_lang: Lang = expect(&value, context)?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::Lang { lang } => *lang = Some(new_lang),
                    _ => return Err(missing()),
                }
            }
            NodeAttr::Action => {
                let text: String = expect(&value, context)?;
                match &mut self.0.borrow_mut().kind {
                    NodeKind::StartStop { action } => *action = text,
                    _ => return Err(missing()),
                }
            }
            NodeAttr::List => {
                let head = node_or_nil(&value, context)?;
                if !matches!(self.0.borrow().kind, NodeKind::HList(_) | NodeKind::VList(_)) {
                    return Err(missing());
                }
                if head.as_ref().is_some_and(|h| contains(h, &self.0)) {
                    return Err(BindingError::argument_type(
                        context,
                        "a list that does not enclose this box",
                        "a list containing it",
                    ));
                }
                set_list(&self.0, head).map_err(|e| BindingError::native(context, e))?;
            }
            other => return Err(BindingError::read_only(tag, other.name())),
        }
        Ok(())
    }
}

impl Comparable for NodeHandle {}
impl Truthy for NodeHandle {}
impl Operable for NodeHandle {}
