//! Content stream generation for shipped pages

use std::fmt::Write as _;
use std::rc::Rc;

use crate::font::Font;
use crate::node::{iter, ListBox, NodeKind, NodeRef};
use crate::pdf::{Face, ImageFile};
use crate::units::{format_number, ScaledPoint};

/// Operators of one page plus the resources they use
#[derive(Debug, Default)]
pub(crate) struct ContentStream {
    pub ops: String,
    pub faces: Vec<Rc<Face>>,
    pub images: Vec<Rc<ImageFile>>,
}

fn bp(value: ScaledPoint) -> String {
    format_number(value.to_bp())
}

impl ContentStream {
    fn use_face(&mut self, face: &Rc<Face>) {
        if !self.faces.iter().any(|f| Rc::ptr_eq(f, face)) {
            self.faces.push(face.clone());
        }
    }

    fn use_image(&mut self, image: &Rc<ImageFile>) {
        if !self.images.iter().any(|i| Rc::ptr_eq(i, image)) {
            self.images.push(image.clone());
        }
    }

    /// Render a vlist whose top edge is at `top`
    pub fn vlist(&mut self, vlist: &NodeRef, x: ScaledPoint, top: ScaledPoint) {
        if let NodeKind::VList(b) | NodeKind::HList(b) = &vlist.borrow().kind {
            self.vlist_contents(b, x, top);
        }
    }

    fn vlist_contents(&mut self, b: &ListBox, x: ScaledPoint, top: ScaledPoint) {
        let mut y = top;
        for node in iter(b.list.clone()) {
            let node = node.borrow();
            match &node.kind {
                NodeKind::HList(inner) => {
                    let baseline = y - inner.height;
                    self.hlist_contents(inner, x + inner.shift, baseline);
                    y = baseline - inner.depth;
                }
                NodeKind::VList(inner) => {
                    self.vlist_contents(inner, x + inner.shift, y);
                    y = y - inner.height - inner.depth;
                }
                NodeKind::Glue { width, .. } => y = y - *width,
                NodeKind::Kern { kern } => y = y - *kern,
                NodeKind::Rule {
                    width,
                    height,
                    depth,
                } => {
                    y = y - *height - *depth;
                    self.rule(x, y, *width, *height + *depth);
                }
                NodeKind::Image {
                    width,
                    height,
                    image,
                } => {
                    y = y - *height;
                    if let Some(image) = image {
                        self.image(image, x, y, *width, *height);
                    }
                }
                _ => {}
            }
        }
    }

    fn hlist_contents(&mut self, b: &ListBox, x: ScaledPoint, baseline: ScaledPoint) {
        let mut cx = x;
        for node in iter(b.list.clone()) {
            let node = node.borrow();
            match &node.kind {
                NodeKind::Glyph {
                    width,
                    codepoint,
                    font,
                    ..
                } => {
                    if let Some(font) = font {
                        self.glyph(font, *codepoint, cx, baseline);
                    }
                    cx += *width;
                }
                NodeKind::HList(inner) => {
                    self.hlist_contents(inner, cx, baseline - inner.shift);
                    cx += inner.width;
                }
                NodeKind::VList(inner) => {
                    self.vlist_contents(inner, cx, baseline + inner.height - inner.shift);
                    cx += inner.width;
                }
                NodeKind::Rule {
                    width,
                    height,
                    depth,
                } => {
                    self.rule(cx, baseline - *depth, *width, *height + *depth);
                    cx += *width;
                }
                NodeKind::Image {
                    width,
                    height,
                    image,
                } => {
                    if let Some(image) = image {
                        self.image(image, cx, baseline, *width, *height);
                    }
                    cx += *width;
                }
                NodeKind::Glue { width, .. } => cx += *width,
                NodeKind::Kern { kern } => cx += *kern,
                _ => {}
            }
        }
    }

    fn glyph(&mut self, font: &Font, codepoint: u16, x: ScaledPoint, y: ScaledPoint) {
        font.face.register_codepoint(codepoint);
        self.use_face(&font.face);
        let _ = writeln!(
            self.ops,
            "BT {} {} Tf 1 0 0 1 {} {} Tm <{:04X}> Tj ET",
            font.face.internal_name(),
            bp(font.size),
            bp(x),
            bp(y),
            codepoint
        );
    }

    /// Filled rectangle with its lower left corner at (`x`, `y`)
    pub fn rule(&mut self, x: ScaledPoint, y: ScaledPoint, width: ScaledPoint, height: ScaledPoint) {
        let _ = writeln!(
            self.ops,
            "{} {} {} {} re f",
            bp(x),
            bp(y),
            bp(width),
            bp(height)
        );
    }

    /// Stroked line
    pub fn line(&mut self, from: (ScaledPoint, ScaledPoint), to: (ScaledPoint, ScaledPoint)) {
        let _ = writeln!(
            self.ops,
            "{} {} m {} {} l S",
            bp(from.0),
            bp(from.1),
            bp(to.0),
            bp(to.1)
        );
    }

    fn image(
        &mut self,
        image: &Rc<ImageFile>,
        x: ScaledPoint,
        y: ScaledPoint,
        width: ScaledPoint,
        height: ScaledPoint,
    ) {
        self.use_image(image);
        let _ = writeln!(
            self.ops,
            "q {} 0 0 {} {} {} cm {} Do Q",
            bp(width),
            bp(height),
            bp(x),
            bp(y),
            image.internal_name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{link_all, vpack, Node};

    #[test]
    fn test_rule_in_vlist() {
        let rule = Node::new(NodeKind::Rule {
            width: ScaledPoint::parse("72.27pt").unwrap(),
            height: ScaledPoint::parse("72.27pt").unwrap(),
            depth: ScaledPoint::ZERO,
        });
        let vlist = vpack(&link_all(&[rule]).unwrap());
        let mut content = ContentStream::default();
        content.vlist(&vlist, ScaledPoint::ZERO, ScaledPoint::parse("144.54pt").unwrap());
        assert_eq!(content.ops, "0 72 72 72 re f\n");
        assert!(content.faces.is_empty());
    }
}
