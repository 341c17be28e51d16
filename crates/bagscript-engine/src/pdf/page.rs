use std::rc::Rc;

use super::{serialize_dict, Dict, Face, ImageFile, Name, ObjectNumber, PdfValue};
use crate::units::format_number;

/// A page in the PDF page tree. Sizes are in PDF points.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub object_number: ObjectNumber,
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Additional entries merged into the page dictionary
    pub dict: Dict,
    pub faces: Vec<Rc<Face>>,
    pub images: Vec<Rc<ImageFile>>,
    pub contents: Option<ObjectNumber>,
}

impl PdfPage {
    pub fn new(object_number: ObjectNumber, width: f64, height: f64) -> Self {
        PdfPage {
            object_number,
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
            dict: Dict::new(),
            faces: Vec::new(),
            images: Vec::new(),
            contents: None,
        }
    }

    /// The page dictionary referring to `parent`
    pub(crate) fn serialize(&self, parent: ObjectNumber) -> String {
        let mut dict = self.dict.clone();
        dict.insert(Name::new("Type"), PdfValue::Name(Name::new("Page")));
        dict.insert(Name::new("Parent"), PdfValue::Ref(parent));
        dict.insert(
            Name::new("MediaBox"),
            PdfValue::Array(
                [
                    self.offset_x,
                    self.offset_y,
                    self.offset_x + self.width,
                    self.offset_y + self.height,
                ]
                .into_iter()
                .map(PdfValue::Float)
                .collect(),
            ),
        );
        let mut resources = Dict::new();
        if !self.faces.is_empty() {
            let fonts = self
                .faces
                .iter()
                .map(|f| (Name::new(format!("F{}", f.face_id)), PdfValue::Ref(f.object_number)))
                .collect();
            resources.insert(Name::new("Font"), PdfValue::Dict(fonts));
        }
        if !self.images.is_empty() {
            let xobjects = self
                .images
                .iter()
                .map(|i| {
                    (
                        Name::new(format!("ImgBag{}", i.image_id)),
                        PdfValue::Ref(i.object_number),
                    )
                })
                .collect();
            resources.insert(Name::new("XObject"), PdfValue::Dict(xobjects));
        }
        dict.insert(Name::new("Resources"), PdfValue::Dict(resources));
        if let Some(contents) = self.contents {
            dict.insert(Name::new("Contents"), PdfValue::Ref(contents));
        }
        serialize_dict(&dict)
    }

    /// Human readable size such as `595.28 x 841.89`
    pub fn size_label(&self) -> String {
        format!("{} x {}", format_number(self.width), format_number(self.height))
    }
}
