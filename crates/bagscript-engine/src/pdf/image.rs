use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::ObjectNumber;
use crate::error::{EngineError, Result};

/// Page boxes an image file can report
pub const PDF_BOXES: [&str; 5] = ["/MediaBox", "/CropBox", "/BleedBox", "/TrimBox", "/ArtBox"];

/// A raster image file registered with a PDF writer
#[derive(Debug)]
pub struct ImageFile {
    pub filename: PathBuf,
    pub width: u32,
    pub height: u32,
    pub image_id: usize,
    pub object_number: ObjectNumber,
    pub page_number: u32,
    closed: Cell<bool>,
}

impl ImageFile {
    /// Read the image header to learn its pixel size
    pub fn load(path: &Path, image_id: usize, object_number: ObjectNumber) -> Result<Self> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| EngineError::Image(format!("{}: {}", path.display(), e)))?;
        Ok(ImageFile {
            filename: path.to_path_buf(),
            width,
            height,
            image_id,
            object_number,
            page_number: 1,
            closed: Cell::new(false),
        })
    }

    /// Resource name used in content streams
    pub fn internal_name(&self) -> String {
        format!("/ImgBag{}", self.image_id)
    }

    /// Release the file. Dimensions stay available; box queries fail.
    pub fn close(&self) {
        self.closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Dimensions of a page box in PDF points. Raster images have a single
    /// page whose boxes all equal the pixel size at 72 dpi.
    pub fn get_pdf_box_dimensions(&self, page: u32, box_name: &str) -> Result<BTreeMap<String, f64>> {
        if self.is_closed() {
            return Err(EngineError::Image(format!(
                "{} is closed",
                self.filename.display()
            )));
        }
        if page != 1 {
            return Err(EngineError::Image(format!(
                "page {} out of range (image has 1 page)",
                page
            )));
        }
        if !PDF_BOXES.contains(&box_name) {
            return Err(EngineError::Image(format!("unknown box name {:?}", box_name)));
        }
        let (w, h) = (self.width as f64, self.height as f64);
        Ok(BTreeMap::from([
            ("llx".to_string(), 0.0),
            ("lly".to_string(), 0.0),
            ("urx".to_string(), w),
            ("ury".to_string(), h),
            ("w".to_string(), w),
            ("h".to_string(), h),
        ]))
    }

    /// Decoded RGB pixel data for embedding
    pub(crate) fn rgb_pixels(&self) -> Result<Vec<u8>> {
        let img = image::open(&self.filename)
            .map_err(|e| EngineError::Image(format!("{}: {}", self.filename.display(), e)))?;
        Ok(img.to_rgb8().into_raw())
    }
}
