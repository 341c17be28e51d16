use crate::error::{EngineError, Result};
use crate::node::{NodeRef, NodeType};
use crate::units::ScaledPoint;

/// A vlist placed on a page. `y` is the top edge measured from the bottom
/// of the page.
#[derive(Debug, Clone)]
pub struct PlacedObject {
    pub x: ScaledPoint,
    pub y: ScaledPoint,
    pub vlist: NodeRef,
}

/// A page of a [`super::Document`]
#[derive(Debug)]
pub struct Page {
    pub width: ScaledPoint,
    pub height: ScaledPoint,
    /// 1-based position in the document
    pub number: usize,
    objects: Vec<PlacedObject>,
    shipped: bool,
}

impl Page {
    pub(crate) fn new(number: usize, width: ScaledPoint, height: ScaledPoint) -> Self {
        Page {
            width,
            height,
            number,
            objects: Vec::new(),
            shipped: false,
        }
    }

    /// Place a vlist with its top left corner at (`x`, `y`)
    pub fn output_at(&mut self, x: ScaledPoint, y: ScaledPoint, vlist: NodeRef) -> Result<()> {
        if self.shipped {
            return Err(EngineError::Document(format!(
                "page {} is already shipped out",
                self.number
            )));
        }
        let node_type = vlist.borrow().node_type();
        if node_type != NodeType::VList {
            return Err(EngineError::Node(format!(
                "output_at expects a vlist, got {}",
                node_type.name()
            )));
        }
        self.objects.push(PlacedObject { x, y, vlist });
        Ok(())
    }

    /// Mark the page as finished. Only shipped pages are written.
    pub fn shipout(&mut self) -> Result<()> {
        if self.shipped {
            return Err(EngineError::Document(format!(
                "page {} is already shipped out",
                self.number
            )));
        }
        log::debug!("shipout page {}", self.number);
        self.shipped = true;
        Ok(())
    }

    pub fn is_shipped(&self) -> bool {
        self.shipped
    }

    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }
}
