//! Layout nodes and doubly linked node lists.
//!
//! A list is a chain of [`NodeRef`]s: each node owns its successor and
//! holds a weak link to its predecessor. Insertion functions rewrite the
//! links of the existing chain in place, so every handle to a node in the
//! chain observes the change.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use crate::error::{EngineError, Result};
use crate::font::Font;
use crate::lang::Lang;
use crate::pdf::ImageFile;
use crate::units::ScaledPoint;

/// Shared handle to a node
pub type NodeRef = Rc<RefCell<Node>>;

/// The node variants known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Disc,
    Glue,
    Glyph,
    HList,
    Image,
    Kern,
    Lang,
    Penalty,
    Rule,
    StartStop,
    VList,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Disc,
        NodeType::Glue,
        NodeType::Glyph,
        NodeType::HList,
        NodeType::Image,
        NodeType::Kern,
        NodeType::Lang,
        NodeType::Penalty,
        NodeType::Rule,
        NodeType::StartStop,
        NodeType::VList,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeType::Disc => "disc",
            NodeType::Glue => "glue",
            NodeType::Glyph => "glyph",
            NodeType::HList => "hlist",
            NodeType::Image => "image",
            NodeType::Kern => "kern",
            NodeType::Lang => "lang",
            NodeType::Penalty => "penalty",
            NodeType::Rule => "rule",
            NodeType::StartStop => "startstop",
            NodeType::VList => "vlist",
        }
    }

    pub fn from_name(name: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Length fields a node may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
    Depth,
    Stretch,
    Shrink,
    Shift,
    Kern,
}

/// Box dimensions and contents shared by hlists and vlists
#[derive(Debug, Clone, Default)]
pub struct ListBox {
    pub width: ScaledPoint,
    pub height: ScaledPoint,
    pub depth: ScaledPoint,
    pub shift: ScaledPoint,
    pub list: Option<NodeRef>,
}

/// Variant data of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    Disc {
        penalty: i64,
    },
    Glue {
        width: ScaledPoint,
        stretch: ScaledPoint,
        shrink: ScaledPoint,
    },
    Glyph {
        width: ScaledPoint,
        height: ScaledPoint,
        depth: ScaledPoint,
        /// Glyph id in the font
        codepoint: u16,
        /// Characters this glyph stands for
        components: String,
        font: Option<Rc<Font>>,
    },
    HList(ListBox),
    Image {
        width: ScaledPoint,
        height: ScaledPoint,
        image: Option<Rc<ImageFile>>,
    },
    Kern {
        kern: ScaledPoint,
    },
    Lang {
        lang: Option<Lang>,
    },
    Penalty {
        penalty: i64,
        width: ScaledPoint,
    },
    Rule {
        width: ScaledPoint,
        height: ScaledPoint,
        depth: ScaledPoint,
    },
    StartStop {
        action: String,
    },
    VList(ListBox),
}

impl NodeKind {
    /// Empty node data of the given type
    pub fn empty(node_type: NodeType) -> NodeKind {
        let zero = ScaledPoint::ZERO;
        match node_type {
            NodeType::Disc => NodeKind::Disc { penalty: 0 },
            NodeType::Glue => NodeKind::Glue {
                width: zero,
                stretch: zero,
                shrink: zero,
            },
            NodeType::Glyph => NodeKind::Glyph {
                width: zero,
                height: zero,
                depth: zero,
                codepoint: 0,
                components: String::new(),
                font: None,
            },
            NodeType::HList => NodeKind::HList(ListBox::default()),
            NodeType::Image => NodeKind::Image {
                width: zero,
                height: zero,
                image: None,
            },
            NodeType::Kern => NodeKind::Kern { kern: zero },
            NodeType::Lang => NodeKind::Lang { lang: None },
            NodeType::Penalty => NodeKind::Penalty {
                penalty: 0,
                width: zero,
            },
            NodeType::Rule => NodeKind::Rule {
                width: zero,
                height: zero,
                depth: zero,
            },
            NodeType::StartStop => NodeKind::StartStop {
                action: String::new(),
            },
            NodeType::VList => NodeKind::VList(ListBox::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Disc { .. } => NodeType::Disc,
            NodeKind::Glue { .. } => NodeType::Glue,
            NodeKind::Glyph { .. } => NodeType::Glyph,
            NodeKind::HList(_) => NodeType::HList,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::Kern { .. } => NodeType::Kern,
            NodeKind::Lang { .. } => NodeType::Lang,
            NodeKind::Penalty { .. } => NodeType::Penalty,
            NodeKind::Rule { .. } => NodeType::Rule,
            NodeKind::StartStop { .. } => NodeType::StartStop,
            NodeKind::VList(_) => NodeType::VList,
        }
    }

    /// Mutable access to a length field, `None` if this kind has no such field
    pub fn dimension_mut(&mut self, dimension: Dimension) -> Option<&mut ScaledPoint> {
        use Dimension as D;
        match (self, dimension) {
            (NodeKind::Glue { width, .. }, D::Width) => Some(width),
            (NodeKind::Glue { stretch, .. }, D::Stretch) => Some(stretch),
            (NodeKind::Glue { shrink, .. }, D::Shrink) => Some(shrink),
            (NodeKind::Glyph { width, .. }, D::Width) => Some(width),
            (NodeKind::Glyph { height, .. }, D::Height) => Some(height),
            (NodeKind::Glyph { depth, .. }, D::Depth) => Some(depth),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Width) => Some(&mut b.width),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Height) => Some(&mut b.height),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Depth) => Some(&mut b.depth),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Shift) => Some(&mut b.shift),
            (NodeKind::Image { width, .. }, D::Width) => Some(width),
            (NodeKind::Image { height, .. }, D::Height) => Some(height),
            (NodeKind::Kern { kern }, D::Kern) => Some(kern),
            (NodeKind::Penalty { width, .. }, D::Width) => Some(width),
            (NodeKind::Rule { width, .. }, D::Width) => Some(width),
            (NodeKind::Rule { height, .. }, D::Height) => Some(height),
            (NodeKind::Rule { depth, .. }, D::Depth) => Some(depth),
            _ => None,
        }
    }

    /// Read a length field, `None` if this kind has no such field
    pub fn dimension(&self, dimension: Dimension) -> Option<ScaledPoint> {
        use Dimension as D;
        match (self, dimension) {
            (NodeKind::Glue { width, .. }, D::Width) => Some(*width),
            (NodeKind::Glue { stretch, .. }, D::Stretch) => Some(*stretch),
            (NodeKind::Glue { shrink, .. }, D::Shrink) => Some(*shrink),
            (NodeKind::Glyph { width, .. }, D::Width) => Some(*width),
            (NodeKind::Glyph { height, .. }, D::Height) => Some(*height),
            (NodeKind::Glyph { depth, .. }, D::Depth) => Some(*depth),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Width) => Some(b.width),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Height) => Some(b.height),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Depth) => Some(b.depth),
            (NodeKind::HList(b) | NodeKind::VList(b), D::Shift) => Some(b.shift),
            (NodeKind::Image { width, .. }, D::Width) => Some(*width),
            (NodeKind::Image { height, .. }, D::Height) => Some(*height),
            (NodeKind::Kern { kern }, D::Kern) => Some(*kern),
            (NodeKind::Penalty { width, .. }, D::Width) => Some(*width),
            (NodeKind::Rule { width, .. }, D::Width) => Some(*width),
            (NodeKind::Rule { height, .. }, D::Height) => Some(*height),
            (NodeKind::Rule { depth, .. }, D::Depth) => Some(*depth),
            _ => None,
        }
    }

    /// Horizontal extent when placed in an hlist
    fn advance(&self) -> ScaledPoint {
        match self {
            NodeKind::Kern { kern } => *kern,
            other => other.dimension(Dimension::Width).unwrap_or_default(),
        }
    }

    /// Vertical extent when placed in a vlist, as (height, depth)
    fn vertical_extent(&self) -> (ScaledPoint, ScaledPoint) {
        match self {
            NodeKind::Glue { width, .. } => (*width, ScaledPoint::ZERO),
            NodeKind::Kern { kern } => (*kern, ScaledPoint::ZERO),
            other => (
                other.dimension(Dimension::Height).unwrap_or_default(),
                other.dimension(Dimension::Depth).unwrap_or_default(),
            ),
        }
    }
}

/// A node in a list
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    next: Option<NodeRef>,
    prev: Weak<RefCell<Node>>,
}

impl Node {
    /// Create an unlinked node
    pub fn new(kind: NodeKind) -> NodeRef {
        Rc::new(RefCell::new(Node {
            kind,
            next: None,
            prev: Weak::new(),
        }))
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn next(&self) -> Option<NodeRef> {
        self.next.clone()
    }

    pub fn prev(&self) -> Option<NodeRef> {
        self.prev.upgrade()
    }
}

/// Create an empty node of the given type
pub fn new_node(node_type: NodeType) -> NodeRef {
    Node::new(NodeKind::empty(node_type))
}

fn link(first: &NodeRef, second: &NodeRef) {
    first.borrow_mut().next = Some(second.clone());
    second.borrow_mut().prev = Rc::downgrade(first);
}

/// Iterate over a list starting at `head`
pub fn iter(head: Option<NodeRef>) -> impl Iterator<Item = NodeRef> {
    std::iter::successors(head, |node| node.borrow().next())
}

/// Last node of the list starting at `head`
pub fn tail(head: &NodeRef) -> NodeRef {
    let mut current = head.clone();
    loop {
        let next = current.borrow().next();
        match next {
            Some(n) => current = n,
            None => return current,
        }
    }
}

/// Link the nodes in order and return the head
pub fn link_all(nodes: &[NodeRef]) -> Option<NodeRef> {
    for pair in nodes.windows(2) {
        link(&pair[0], &pair[1]);
    }
    if let Some(last) = nodes.last() {
        last.borrow_mut().next = None;
    }
    nodes.first().cloned()
}

/// Whether `target` is `head` or follows it in the list
fn in_chain(head: &NodeRef, target: &NodeRef) -> bool {
    iter(Some(head.clone())).any(|n| Rc::ptr_eq(&n, target))
}

/// Whether `target` appears in the list at `head` or inside any box
/// nested in it
pub fn contains(head: &NodeRef, target: &NodeRef) -> bool {
    iter(Some(head.clone())).any(|n| {
        if Rc::ptr_eq(&n, target) {
            return true;
        }
        let node = n.borrow();
        let nested = match &node.kind {
            NodeKind::HList(b) | NodeKind::VList(b) => {
                b.list.as_ref().is_some_and(|inner| contains(inner, target))
            }
            _ => false,
        };
        nested
    })
}

/// Replace the contents of a box. A box cannot contain itself.
pub fn set_list(node: &NodeRef, head: Option<NodeRef>) -> Result<()> {
    if let Some(head) = &head {
        if contains(head, node) {
            return Err(EngineError::Node(
                "a box cannot contain itself or an enclosing box".to_string(),
            ));
        }
    }
    match &mut node.borrow_mut().kind {
        NodeKind::HList(b) | NodeKind::VList(b) => {
            b.list = head;
            Ok(())
        }
        other => Err(EngineError::Node(format!(
            "{} has no list",
            other.node_type().name()
        ))),
    }
}

/// Insert `new` right after `cur` and return the (unchanged) head
pub fn insert_after(head: &NodeRef, cur: &NodeRef, new: &NodeRef) -> Result<NodeRef> {
    if Rc::ptr_eq(cur, new) {
        return Err(EngineError::Node("cannot insert a node after itself".to_string()));
    }
    if in_chain(cur, new) {
        return Err(EngineError::Node("node already follows the insert position".to_string()));
    }
    let old_next = cur.borrow().next();
    link(cur, new);
    match old_next {
        Some(next) => link(new, &next),
        None => new.borrow_mut().next = None,
    }
    Ok(head.clone())
}

/// Insert `new` right before `cur` and return the head, which is `new`
/// when `cur` was the head
pub fn insert_before(head: &NodeRef, cur: &NodeRef, new: &NodeRef) -> Result<NodeRef> {
    if Rc::ptr_eq(cur, new) {
        return Err(EngineError::Node("cannot insert a node before itself".to_string()));
    }
    if in_chain(cur, new) {
        return Err(EngineError::Node("node already follows the insert position".to_string()));
    }
    let prev = cur.borrow().prev();
    link(new, cur);
    match prev {
        Some(prev) => {
            link(&prev, new);
            Ok(head.clone())
        }
        None => {
            new.borrow_mut().prev = Weak::new();
            Ok(new.clone())
        }
    }
}

/// Pack a list horizontally into a new hlist
pub fn hpack(head: &NodeRef) -> NodeRef {
    let mut packed = ListBox {
        list: Some(head.clone()),
        ..ListBox::default()
    };
    for node in iter(Some(head.clone())) {
        let node = node.borrow();
        packed.width += node.kind.advance();
        let (height, depth) = match &node.kind {
            NodeKind::HList(b) | NodeKind::VList(b) => (b.height - b.shift, b.depth + b.shift),
            other => (
                other.dimension(Dimension::Height).unwrap_or_default(),
                other.dimension(Dimension::Depth).unwrap_or_default(),
            ),
        };
        packed.height = packed.height.max(height);
        packed.depth = packed.depth.max(depth);
    }
    log::trace!("hpack: width {}", packed.width);
    Node::new(NodeKind::HList(packed))
}

/// Pack a list vertically into a new vlist. The depth of the last item
/// becomes the depth of the vlist.
pub fn vpack(head: &NodeRef) -> NodeRef {
    let mut packed = ListBox {
        list: Some(head.clone()),
        ..ListBox::default()
    };
    let mut last_depth = ScaledPoint::ZERO;
    for node in iter(Some(head.clone())) {
        let node = node.borrow();
        let (height, depth) = node.kind.vertical_extent();
        packed.height += last_depth + height;
        last_depth = depth;
        if let Some(width) = node.kind.dimension(Dimension::Width) {
            if !matches!(node.kind, NodeKind::Glue { .. }) {
                packed.width = packed.width.max(width);
            }
        }
    }
    packed.depth = last_depth;
    log::trace!("vpack: height {}", packed.height);
    Node::new(NodeKind::VList(packed))
}

/// Short one-line description of a node
pub fn describe(node: &Node) -> String {
    match &node.kind {
        NodeKind::Disc { penalty } => format!("disc (penalty: {})", penalty),
        NodeKind::Glue {
            width,
            stretch,
            shrink,
        } => format!("glue (wd: {} plus {} minus {})", width, stretch, shrink),
        NodeKind::Glyph {
            width, components, ..
        } => format!("glyph {:?} (wd: {})", components, width),
        NodeKind::HList(b) | NodeKind::VList(b) => format!(
            "{} (wd: {}, ht: {}, dp: {})",
            node.node_type().name(),
            b.width,
            b.height,
            b.depth
        ),
        NodeKind::Image { width, height, .. } => format!("image (wd: {}, ht: {})", width, height),
        NodeKind::Kern { kern } => format!("kern ({})", kern),
        NodeKind::Lang { lang } => match lang {
            Some(l) => format!("lang ({})", l.code),
            None => "lang".to_string(),
        },
        NodeKind::Penalty { penalty, width } => format!("penalty ({}, wd: {})", penalty, width),
        NodeKind::Rule {
            width,
            height,
            depth,
        } => format!("rule (wd: {}, ht: {}, dp: {})", width, height, depth),
        NodeKind::StartStop { action } => format!("startstop ({})", action),
    }
}

/// Indented multi-line dump of a node and, for boxes, their contents
pub fn debug_dump(node: &NodeRef) -> String {
    let mut out = String::new();
    dump_into(&mut out, node, 0);
    out
}

fn dump_into(out: &mut String, node: &NodeRef, level: usize) {
    let node = node.borrow();
    let _ = writeln!(out, "{}{}", "  ".repeat(level), describe(&node));
    if let NodeKind::HList(b) | NodeKind::VList(b) = &node.kind {
        for child in iter(b.list.clone()) {
            dump_into(out, &child, level + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(width: f64, height: f64, depth: f64) -> NodeRef {
        Node::new(NodeKind::Rule {
            width: ScaledPoint::from_pt(width),
            height: ScaledPoint::from_pt(height),
            depth: ScaledPoint::from_pt(depth),
        })
    }

    fn kinds(head: &NodeRef) -> Vec<NodeType> {
        iter(Some(head.clone()))
            .map(|n| n.borrow().node_type())
            .collect()
    }

    #[test]
    fn test_type_names() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::from_name(t.name()), Some(t));
        }
        assert_eq!(NodeType::from_name("paragraph"), None);
    }

    #[test]
    fn test_insert_after_mutates_in_place() {
        let a = new_node(NodeType::Glyph);
        let c = new_node(NodeType::Rule);
        let head = link_all(&[a.clone(), c.clone()]).unwrap();
        let b = new_node(NodeType::Kern);
        let head = insert_after(&head, &a, &b).unwrap();
        assert!(Rc::ptr_eq(&head, &a));
        assert_eq!(
            kinds(&head),
            vec![NodeType::Glyph, NodeType::Kern, NodeType::Rule]
        );
        assert!(Rc::ptr_eq(&c.borrow().prev().unwrap(), &b));
    }

    #[test]
    fn test_insert_before_head() {
        let a = new_node(NodeType::Glyph);
        let b = new_node(NodeType::Glue);
        let head = insert_before(&a, &a, &b).unwrap();
        assert!(Rc::ptr_eq(&head, &b));
        assert_eq!(kinds(&head), vec![NodeType::Glue, NodeType::Glyph]);
        assert!(b.borrow().prev().is_none());
    }

    #[test]
    fn test_insert_self_is_error() {
        let a = new_node(NodeType::Glyph);
        assert!(insert_after(&a, &a, &a).is_err());
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let a = new_node(NodeType::Glyph);
        let b = new_node(NodeType::Kern);
        let c = new_node(NodeType::Rule);
        let head = link_all(&[a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(insert_after(&head, &b, &c).is_err());
        assert!(insert_before(&head, &a, &c).is_err());
        assert_eq!(kinds(&head), vec![NodeType::Glyph, NodeType::Kern, NodeType::Rule]);
    }

    #[test]
    fn test_box_cannot_contain_itself() {
        let inner = new_node(NodeType::VList);
        let outer = hpack(&inner);
        assert!(set_list(&inner, Some(inner.clone())).is_err());
        assert!(set_list(&inner, Some(outer.clone())).is_err());
        assert!(inner.borrow().kind.dimension(Dimension::Width).is_some());
        match &inner.borrow().kind {
            NodeKind::VList(b) => assert!(b.list.is_none()),
            _ => panic!("expected a vlist"),
        }

        let rule = rule(1.0, 1.0, 0.0);
        set_list(&inner, Some(rule.clone())).unwrap();
        assert!(contains(&outer, &rule));
        assert!(set_list(&rule, None).is_err());
        assert!(debug_dump(&outer).contains("rule"));
    }

    #[test]
    fn test_pack_saturates_huge_widths() {
        let huge = || {
            Node::new(NodeKind::Rule {
                width: ScaledPoint(i64::MAX),
                height: ScaledPoint(i64::MAX),
                depth: ScaledPoint::ZERO,
            })
        };
        let head = link_all(&[huge(), huge()]).unwrap();
        let wide = hpack(&head);
        assert_eq!(wide.borrow().kind.dimension(Dimension::Width), Some(ScaledPoint(i64::MAX)));
        let tall = vpack(&head);
        assert_eq!(tall.borrow().kind.dimension(Dimension::Height), Some(ScaledPoint(i64::MAX)));
    }

    #[test]
    fn test_hpack_dimensions() {
        let head = link_all(&[rule(10.0, 5.0, 1.0), rule(20.0, 7.0, 2.0)]).unwrap();
        let packed = hpack(&head);
        let kind = &packed.borrow().kind;
        assert_eq!(kind.dimension(Dimension::Width), Some(ScaledPoint::from_pt(30.0)));
        assert_eq!(kind.dimension(Dimension::Height), Some(ScaledPoint::from_pt(7.0)));
        assert_eq!(kind.dimension(Dimension::Depth), Some(ScaledPoint::from_pt(2.0)));
    }

    #[test]
    fn test_vpack_dimensions() {
        let head = link_all(&[rule(10.0, 5.0, 1.0), rule(20.0, 7.0, 2.0)]).unwrap();
        let packed = vpack(&head);
        let kind = &packed.borrow().kind;
        assert_eq!(kind.node_type(), NodeType::VList);
        assert_eq!(kind.dimension(Dimension::Width), Some(ScaledPoint::from_pt(20.0)));
        assert_eq!(kind.dimension(Dimension::Height), Some(ScaledPoint::from_pt(13.0)));
        assert_eq!(kind.dimension(Dimension::Depth), Some(ScaledPoint::from_pt(2.0)));
    }

    #[test]
    fn test_dimension_access_per_kind() {
        let mut glue = NodeKind::empty(NodeType::Glue);
        assert!(glue.dimension_mut(Dimension::Stretch).is_some());
        assert!(glue.dimension_mut(Dimension::Height).is_none());
        assert!(NodeKind::empty(NodeType::Lang)
            .dimension(Dimension::Width)
            .is_none());
    }

    #[test]
    fn test_debug_dump_nests() {
        let head = link_all(&[rule(1.0, 1.0, 0.0)]).unwrap();
        let dump = debug_dump(&hpack(&head));
        assert!(dump.starts_with("hlist"));
        assert!(dump.contains("\n  rule"));
    }
}
