//! XML dump of the document structure, useful for debugging layouts

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use super::Document;
use crate::error::{EngineError, Result};
use crate::node::{iter, Dimension, NodeKind, NodeRef};

fn xml_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Xml(e.to_string())
}

pub(crate) fn write_dump<W: Write>(doc: &Document, out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    let mut root = BytesStart::new("pdfdocument");
    root.push_attribute(("title", doc.title.as_str()));
    root.push_attribute(("author", doc.author.as_str()));
    root.push_attribute(("format", doc.format.name()));
    let page_count = doc.pages().len().to_string();
    root.push_attribute(("pages", page_count.as_str()));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    for page in doc.pages() {
        let page = page.borrow();
        let mut elt = BytesStart::new("page");
        let number = page.number.to_string();
        let width = page.width.to_string();
        let height = page.height.to_string();
        elt.push_attribute(("number", number.as_str()));
        elt.push_attribute(("width", width.as_str()));
        elt.push_attribute(("height", height.as_str()));
        elt.push_attribute(("shipped", if page.is_shipped() { "true" } else { "false" }));
        writer.write_event(Event::Start(elt)).map_err(xml_err)?;
        for placed in page.objects() {
            let mut at = BytesStart::new("output");
            let x = placed.x.to_string();
            let y = placed.y.to_string();
            at.push_attribute(("x", x.as_str()));
            at.push_attribute(("y", y.as_str()));
            writer.write_event(Event::Start(at)).map_err(xml_err)?;
            write_node(&mut writer, &placed.vlist)?;
            writer
                .write_event(Event::End(BytesEnd::new("output")))
                .map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("page")))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("pdfdocument")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &NodeRef) -> Result<()> {
    let node = node.borrow();
    let name = node.node_type().name();
    let mut elt = BytesStart::new(name);
    let dimensions = [
        ("width", Dimension::Width),
        ("height", Dimension::Height),
        ("depth", Dimension::Depth),
        ("stretch", Dimension::Stretch),
        ("shrink", Dimension::Shrink),
        ("kern", Dimension::Kern),
    ];
    for (label, dimension) in dimensions {
        if let Some(value) = node.kind.dimension(dimension) {
            elt.push_attribute((label, value.to_string().as_str()));
        }
    }
    match &node.kind {
        NodeKind::Glyph {
            components,
            codepoint,
            ..
        } => {
            elt.push_attribute(("components", components.as_str()));
            elt.push_attribute(("codepoint", codepoint.to_string().as_str()));
        }
        NodeKind::Penalty { penalty, .. } | NodeKind::Disc { penalty } => {
            elt.push_attribute(("penalty", penalty.to_string().as_str()));
        }
        NodeKind::Lang { lang: Some(lang) } => elt.push_attribute(("lang", lang.code)),
        NodeKind::StartStop { action } => elt.push_attribute(("action", action.as_str())),
        _ => {}
    }
    match &node.kind {
        NodeKind::HList(b) | NodeKind::VList(b) => {
            writer.write_event(Event::Start(elt)).map_err(xml_err)?;
            for child in iter(b.list.clone()) {
                write_node(writer, &child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_err)?;
        }
        _ => writer.write_event(Event::Empty(elt)).map_err(xml_err)?,
    }
    Ok(())
}
