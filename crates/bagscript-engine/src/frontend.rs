//! Frontend: font families, styled text, tables and paragraph formatting on
//! top of the node layer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::color::Color;
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::font::{Atom, Feature, Font};
use crate::node::{hpack, link_all, vpack, Dimension, Node, NodeKind, NodeRef};
use crate::pdf::Face;
use crate::units::ScaledPoint;

/// Where to load a font from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontSource {
    pub location: String,
    pub name: String,
    pub index: u32,
    /// OpenType feature strings applied when shaping with this source
    pub features: Vec<String>,
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn parse(text: &str) -> Option<FontStyle> {
        match text {
            "normal" => Some(FontStyle::Normal),
            "italic" => Some(FontStyle::Italic),
            "oblique" => Some(FontStyle::Oblique),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
            FontStyle::Oblique => "oblique",
        }
    }
}

pub const FONT_WEIGHT_REGULAR: u16 = 400;
pub const FONT_WEIGHT_BOLD: u16 = 700;
pub const MAX_FONT_WEIGHT: u16 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct FontMember {
    pub weight: u16,
    pub style: FontStyle,
    pub source: FontSource,
}

/// A named set of font sources keyed by weight and style
#[derive(Debug, Clone, PartialEq)]
pub struct FontFamily {
    pub name: String,
    pub id: usize,
    members: Vec<FontMember>,
}

impl FontFamily {
    pub fn new(name: &str, id: usize) -> Self {
        FontFamily {
            name: name.to_string(),
            id,
            members: Vec::new(),
        }
    }

    /// Add or replace the member for (`weight`, `style`)
    pub fn add_member(&mut self, source: FontSource, weight: u16, style: FontStyle) -> Result<()> {
        if source.location.is_empty() {
            return Err(EngineError::Font(format!(
                "font family {}: font source without location",
                self.name
            )));
        }
        self.members
            .retain(|m| !(m.weight == weight && m.style == style));
        self.members.push(FontMember {
            weight,
            style,
            source,
        });
        Ok(())
    }

    pub fn members(&self) -> &[FontMember] {
        &self.members
    }

    /// The member closest to the requested weight with the requested style,
    /// falling back to any style
    pub fn find_member(&self, weight: u16, style: FontStyle) -> Option<&FontMember> {
        let distance = |m: &&FontMember| (m.weight as i32 - weight as i32).abs();
        self.members
            .iter()
            .filter(|m| m.style == style)
            .min_by_key(distance)
            .or_else(|| self.members.iter().min_by_key(distance))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

impl HAlign {
    pub fn parse(text: &str) -> Option<HAlign> {
        match text {
            "left" => Some(HAlign::Left),
            "center" => Some(HAlign::Center),
            "right" => Some(HAlign::Right),
            "justify" => Some(HAlign::Justified),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
            HAlign::Justified => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    pub fn parse(text: &str) -> Option<VAlign> {
        match text {
            "top" => Some(VAlign::Top),
            "middle" => Some(VAlign::Middle),
            "bottom" => Some(VAlign::Bottom),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VAlign::Top => "top",
            VAlign::Middle => "middle",
            VAlign::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
}

impl BorderStyle {
    pub fn parse(text: &str) -> Option<BorderStyle> {
        match text {
            "none" => Some(BorderStyle::None),
            "solid" => Some(BorderStyle::Solid),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BorderStyle::None => "none",
            BorderStyle::Solid => "solid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDecorationLine {
    #[default]
    None,
    Underline,
    Overline,
    LineThrough,
}

impl TextDecorationLine {
    pub fn parse(text: &str) -> Option<TextDecorationLine> {
        match text {
            "none" => Some(TextDecorationLine::None),
            "underline" => Some(TextDecorationLine::Underline),
            "overline" => Some(TextDecorationLine::Overline),
            "line-through" => Some(TextDecorationLine::LineThrough),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextDecorationLine::None => "none",
            TextDecorationLine::Underline => "underline",
            TextDecorationLine::Overline => "overline",
            TextDecorationLine::LineThrough => "line-through",
        }
    }
}

macro_rules! setting_types {
    ($($variant:ident),+ $(,)?) => {
        /// Keys of the typesetting settings attached to a [`Text`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum SettingType {
            $($variant),+
        }

        impl SettingType {
            pub const ALL: &'static [SettingType] = &[$(SettingType::$variant),+];

            /// Display name such as `SettingHAlign`
            pub fn name(self) -> &'static str {
                match self {
                    $(SettingType::$variant => concat!("Setting", stringify!($variant))),+
                }
            }

            pub fn from_name(name: &str) -> Option<SettingType> {
                SettingType::ALL.iter().copied().find(|s| s.name() == name)
            }
        }
    };
}

setting_types!(
    BackgroundColor,
    BorderBottomColor,
    BorderBottomLeftRadius,
    BorderBottomRightRadius,
    BorderBottomStyle,
    BorderBottomWidth,
    BorderLeftColor,
    BorderLeftStyle,
    BorderLeftWidth,
    BorderRightColor,
    BorderRightStyle,
    BorderRightWidth,
    BorderTopColor,
    BorderTopLeftRadius,
    BorderTopRightRadius,
    BorderTopStyle,
    BorderTopWidth,
    Box,
    Color,
    Debug,
    FontExpansion,
    FontFamily,
    FontWeight,
    HAlign,
    HangingPunctuation,
    Height,
    Hyperlink,
    IndentLeft,
    IndentLeftRows,
    Leading,
    MarginBottom,
    MarginLeft,
    MarginRight,
    MarginTop,
    OpenTypeFeature,
    PaddingBottom,
    PaddingLeft,
    PaddingRight,
    PaddingTop,
    Prepend,
    PreserveWhitespace,
    Size,
    Style,
    TabSize,
    TabSizeSpaces,
    TextDecorationLine,
    VAlign,
    Width,
    YOffset,
);

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value stored for a [`SettingType`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Length(ScaledPoint),
    Color(Color),
    FontFamily(Rc<RefCell<FontFamily>>),
    FontStyle(FontStyle),
    HAlign(HAlign),
    VAlign(VAlign),
    BorderStyle(BorderStyle),
    TextDecorationLine(TextDecorationLine),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::Str(s) => f.write_str(s),
            SettingValue::Length(sp) => write!(f, "{}", sp),
            SettingValue::Color(c) => write!(f, "{}", c),
            SettingValue::FontFamily(ff) => f.write_str(&ff.borrow().name),
            SettingValue::FontStyle(s) => f.write_str(s.name()),
            SettingValue::HAlign(a) => f.write_str(a.name()),
            SettingValue::VAlign(a) => f.write_str(a.name()),
            SettingValue::BorderStyle(s) => f.write_str(s.name()),
            SettingValue::TextDecorationLine(d) => f.write_str(d.name()),
        }
    }
}

pub type TypesettingSettings = BTreeMap<SettingType, SettingValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum TextItem {
    Str(String),
    Text(Rc<RefCell<Text>>),
}

/// A run of text items sharing a set of settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    pub items: Vec<TextItem>,
    pub settings: TypesettingSettings,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text content with nested texts flattened
    pub fn content(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                TextItem::Str(s) => out.push_str(s),
                TextItem::Text(t) => out.push_str(&t.borrow().content()),
            }
        }
        out
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub contents: Vec<TextItem>,
    pub halign: Option<HAlign>,
    pub border_top_width: ScaledPoint,
    pub border_bottom_width: ScaledPoint,
    pub border_left_width: ScaledPoint,
    pub border_right_width: ScaledPoint,
    pub padding_top: ScaledPoint,
    pub padding_bottom: ScaledPoint,
    pub padding_left: ScaledPoint,
    pub padding_right: ScaledPoint,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<Rc<RefCell<TableCell>>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Rc<RefCell<TableRow>>>,
    pub max_width: ScaledPoint,
    pub stretch: bool,
}

/// Options for [`FrontendDocument::format_paragraph`]; unset values come
/// from the text settings
#[derive(Debug, Clone, Default)]
pub struct ParagraphOptions {
    pub width: Option<ScaledPoint>,
    pub leading: Option<ScaledPoint>,
    pub font_size: Option<ScaledPoint>,
    pub family: Option<Rc<RefCell<FontFamily>>>,
}

/// A document plus the font families used to format text for it
#[derive(Debug)]
pub struct FrontendDocument {
    pub doc: Rc<RefCell<Document>>,
    families: Vec<Rc<RefCell<FontFamily>>>,
    faces: BTreeMap<(PathBuf, u32), Rc<Face>>,
}

impl FrontendDocument {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self::with_document(Document::create(path)?))
    }

    pub fn with_document(doc: Document) -> Self {
        FrontendDocument {
            doc: Rc::new(RefCell::new(doc)),
            families: Vec::new(),
            faces: BTreeMap::new(),
        }
    }

    pub fn new_fontfamily(&mut self, name: &str) -> Rc<RefCell<FontFamily>> {
        let family = Rc::new(RefCell::new(FontFamily::new(name, self.families.len())));
        self.families.push(family.clone());
        family
    }

    pub fn find_fontfamily(&self, name: &str) -> Option<Rc<RefCell<FontFamily>>> {
        self.families
            .iter()
            .find(|ff| ff.borrow().name == name)
            .cloned()
    }

    fn face_for(&mut self, source: &FontSource) -> Result<Rc<Face>> {
        let key = (PathBuf::from(&source.location), source.index);
        if let Some(face) = self.faces.get(&key) {
            return Ok(face.clone());
        }
        let doc = self.doc.borrow();
        let face = doc.writer().borrow_mut().load_face(&key.0, source.index)?;
        self.faces.insert(key, face.clone());
        Ok(face)
    }

    /// Shape the text and break it into lines no wider than the given
    /// width. Returns a vlist of hlists.
    pub fn format_paragraph(&mut self, text: &Text, options: ParagraphOptions) -> Result<NodeRef> {
        let family = match options.family {
            Some(family) => family,
            None => match text.settings.get(&SettingType::FontFamily) {
                Some(SettingValue::FontFamily(family)) => family.clone(),
                _ => {
                    return Err(EngineError::Font(
                        "format_paragraph needs a font family".to_string(),
                    ))
                }
            },
        };
        let size = options
            .font_size
            .or_else(|| match text.settings.get(&SettingType::Size) {
                Some(SettingValue::Length(sp)) => Some(*sp),
                _ => None,
            })
            .unwrap_or_else(|| ScaledPoint::from_pt(10.0));
        let leading = options
            .leading
            .or_else(|| match text.settings.get(&SettingType::Leading) {
                Some(SettingValue::Length(sp)) => Some(*sp),
                _ => None,
            })
            .unwrap_or_else(|| ScaledPoint(size.0.saturating_mul(12) / 10));
        let weight = match text.settings.get(&SettingType::FontWeight) {
            Some(SettingValue::Int(w)) => u16::try_from(*w)
                .ok()
                .filter(|w| (1..=MAX_FONT_WEIGHT).contains(w))
                .ok_or_else(|| EngineError::Font(format!("font weight {} out of range", w)))?,
            _ => FONT_WEIGHT_REGULAR,
        };
        let style = match text.settings.get(&SettingType::Style) {
            Some(SettingValue::FontStyle(s)) => *s,
            _ => FontStyle::Normal,
        };
        let halign = match text.settings.get(&SettingType::HAlign) {
            Some(SettingValue::HAlign(a)) => *a,
            _ => HAlign::Left,
        };

        let source = {
            let family = family.borrow();
            family
                .find_member(weight, style)
                .map(|m| m.source.clone())
                .ok_or_else(|| {
                    EngineError::Font(format!("font family {} has no members", family.name))
                })?
        };
        let features = source
            .features
            .iter()
            .map(|f| Feature::parse(f))
            .collect::<Result<Vec<_>>>()?;
        let font = Rc::new(Font::new(self.face_for(&source)?, size));
        let atoms = font.shape(&text.content(), &features)?;
        let lines = break_lines(&atoms, options.width);
        log::debug!(
            "format_paragraph: {} atoms in {} lines",
            atoms.len(),
            lines.len()
        );

        let mut rows = Vec::new();
        let mut previous_depth = None;
        for line in lines {
            let mut nodes = Vec::new();
            let natural: ScaledPoint = line
                .iter()
                .fold(ScaledPoint::ZERO, |acc, a| acc + a.advance + a.kernafter);
            if let Some(width) = options.width {
                let indent = match halign {
                    HAlign::Center => ScaledPoint((width - natural).0 / 2),
                    HAlign::Right => width - natural,
                    HAlign::Left | HAlign::Justified => ScaledPoint::ZERO,
                };
                if indent > ScaledPoint::ZERO {
                    nodes.push(Node::new(NodeKind::Kern { kern: indent }));
                }
            }
            for atom in line {
                nodes.extend(atom_nodes(atom, &font));
            }
            let Some(head) = link_all(&nodes) else {
                continue;
            };
            let hlist = hpack(&head);
            let (height, depth) = {
                let b = hlist.borrow();
                (
                    b.kind.dimension(Dimension::Height).unwrap_or_default(),
                    b.kind.dimension(Dimension::Depth).unwrap_or_default(),
                )
            };
            if let Some(previous_depth) = previous_depth {
                let gap = leading - previous_depth - height;
                if gap > ScaledPoint::ZERO {
                    rows.push(Node::new(NodeKind::Glue {
                        width: gap,
                        stretch: ScaledPoint::ZERO,
                        shrink: ScaledPoint::ZERO,
                    }));
                }
            }
            previous_depth = Some(depth);
            rows.push(hlist);
        }
        let head = link_all(&rows).unwrap_or_else(|| {
            Node::new(NodeKind::Kern {
                kern: ScaledPoint::ZERO,
            })
        });
        Ok(vpack(&head))
    }
}

fn atom_nodes(atom: &Atom, font: &Rc<Font>) -> Vec<NodeRef> {
    if atom.is_space {
        return vec![Node::new(NodeKind::Glue {
            width: atom.advance,
            stretch: ScaledPoint(atom.advance.0 / 2),
            shrink: ScaledPoint(atom.advance.0 / 3),
        })];
    }
    let mut nodes = vec![Node::new(NodeKind::Glyph {
        width: atom.advance,
        height: atom.height,
        depth: atom.depth,
        codepoint: atom.codepoint,
        components: atom.components.clone(),
        font: Some(font.clone()),
    })];
    if !atom.kernafter.is_zero() {
        nodes.push(Node::new(NodeKind::Kern {
            kern: atom.kernafter,
        }));
    }
    nodes
}

/// Greedy line breaking at spaces. Spaces at line ends are dropped.
fn break_lines(atoms: &[Atom], width: Option<ScaledPoint>) -> Vec<Vec<&Atom>> {
    let mut words: Vec<Vec<&Atom>> = vec![Vec::new()];
    for atom in atoms {
        if atom.is_space {
            words.push(Vec::new());
        } else if let Some(word) = words.last_mut() {
            word.push(atom);
        }
    }
    words.retain(|w| !w.is_empty());
    let space = atoms.iter().find(|a| a.is_space);
    let space_width = space.map(|a| a.advance).unwrap_or_default();
    let measure = |word: &[&Atom]| {
        word.iter()
            .fold(ScaledPoint::ZERO, |acc, a| acc + a.advance + a.kernafter)
    };

    let mut lines: Vec<Vec<&Atom>> = Vec::new();
    let mut current: Vec<&Atom> = Vec::new();
    let mut current_width = ScaledPoint::ZERO;
    for word in words {
        let word_width = measure(&word);
        if current.is_empty() {
            current_width = word_width;
            current = word;
            continue;
        }
        let fits = match width {
            Some(max) => current_width + space_width + word_width <= max,
            None => true,
        };
        if fits {
            if let Some(space) = space {
                current.push(space);
            }
            current.extend(word);
            current_width = current_width + space_width + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current_width = word_width;
            current = word;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{iter, NodeType};

    fn font_path() -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../testdata/fonts/DejaVuSansMono-Oblique.ttf")
            .display()
            .to_string()
    }

    fn frontend_with_family() -> (FrontendDocument, Rc<RefCell<FontFamily>>) {
        let mut fd = FrontendDocument::with_document(Document::in_memory());
        let family = fd.new_fontfamily("text");
        family
            .borrow_mut()
            .add_member(
                FontSource {
                    location: font_path(),
                    ..Default::default()
                },
                FONT_WEIGHT_REGULAR,
                FontStyle::Normal,
            )
            .unwrap();
        (fd, family)
    }

    #[test]
    fn test_setting_names() {
        assert_eq!(SettingType::ALL.len(), 49);
        assert_eq!(SettingType::HAlign.name(), "SettingHAlign");
        assert_eq!(
            SettingType::from_name("SettingYOffset"),
            Some(SettingType::YOffset)
        );
        assert_eq!(SettingType::from_name("halign"), None);
    }

    #[test]
    fn test_family_member_lookup() {
        let mut family = FontFamily::new("serif", 0);
        let source = |loc: &str| FontSource {
            location: loc.to_string(),
            ..Default::default()
        };
        family
            .add_member(source("regular.ttf"), 400, FontStyle::Normal)
            .unwrap();
        family
            .add_member(source("bold.ttf"), 700, FontStyle::Normal)
            .unwrap();
        family
            .add_member(source("italic.ttf"), 400, FontStyle::Italic)
            .unwrap();
        assert_eq!(
            family.find_member(600, FontStyle::Normal).unwrap().source.location,
            "bold.ttf"
        );
        assert_eq!(
            family.find_member(400, FontStyle::Italic).unwrap().source.location,
            "italic.ttf"
        );
        assert_eq!(
            family.find_member(400, FontStyle::Oblique).unwrap().source.location,
            "regular.ttf"
        );
        assert!(family.add_member(FontSource::default(), 400, FontStyle::Normal).is_err());
    }

    #[test]
    fn test_find_fontfamily() {
        let (fd, family) = frontend_with_family();
        assert!(Rc::ptr_eq(&fd.find_fontfamily("text").unwrap(), &family));
        assert!(fd.find_fontfamily("missing").is_none());
    }

    #[test]
    fn test_text_content_flattens() {
        let inner = Rc::new(RefCell::new(Text {
            items: vec![TextItem::Str("world".into())],
            ..Default::default()
        }));
        let text = Text {
            items: vec![TextItem::Str("hello ".into()), TextItem::Text(inner)],
            ..Default::default()
        };
        assert_eq!(text.content(), "hello world");
    }

    #[test]
    fn test_format_paragraph_single_line() {
        let (mut fd, family) = frontend_with_family();
        let text = Text {
            items: vec![TextItem::Str("Hi there".into())],
            ..Default::default()
        };
        let vlist = fd
            .format_paragraph(
                &text,
                ParagraphOptions {
                    family: Some(family),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(vlist.borrow().node_type(), NodeType::VList);
        let list = match &vlist.borrow().kind {
            NodeKind::VList(b) => b.list.clone(),
            _ => None,
        };
        let rows: Vec<_> = iter(list).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].borrow().node_type(), NodeType::HList);
    }

    #[test]
    fn test_format_paragraph_rejects_out_of_range_weight() {
        let (mut fd, family) = frontend_with_family();
        for weight in [-1, 100_000] {
            let mut text = Text {
                items: vec![TextItem::Str("Hi".into())],
                ..Default::default()
            };
            text.settings.insert(SettingType::FontWeight, SettingValue::Int(weight));
            let err = fd
                .format_paragraph(
                    &text,
                    ParagraphOptions {
                        family: Some(family.clone()),
                        ..Default::default()
                    },
                )
                .unwrap_err();
            assert!(err.to_string().contains("out of range"));
        }
    }

    #[test]
    fn test_format_paragraph_breaks_lines() {
        let (mut fd, family) = frontend_with_family();
        let text = Text {
            items: vec![TextItem::Str("aaa bbb ccc ddd".into())],
            ..Default::default()
        };
        let vlist = fd
            .format_paragraph(
                &text,
                ParagraphOptions {
                    family: Some(family),
                    width: Some(ScaledPoint::from_pt(45.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        let list = match &vlist.borrow().kind {
            NodeKind::VList(b) => b.list.clone(),
            _ => None,
        };
        let hlists = iter(list)
            .filter(|n| n.borrow().node_type() == NodeType::HList)
            .count();
        // each monospace glyph is about 6pt wide at 10pt
        assert!(hlists >= 2, "expected several lines, got {}", hlists);
    }

    #[test]
    fn test_format_paragraph_without_family() {
        let mut fd = FrontendDocument::with_document(Document::in_memory());
        let text = Text::new();
        assert!(fd.format_paragraph(&text, ParagraphOptions::default()).is_err());
    }
}
