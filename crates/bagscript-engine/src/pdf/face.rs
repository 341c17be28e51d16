use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rustybuzz::ttf_parser::{name_id, GlyphId};

use super::ObjectNumber;
use crate::error::{EngineError, Result};

/// A font face loaded into a PDF writer.
///
/// The raw font data is kept so the face can be embedded when the writer
/// finishes. Glyph ids used in the output must be registered so their
/// widths end up in the font's `/W` array.
#[derive(Debug)]
pub struct Face {
    data: Vec<u8>,
    index: u32,
    pub filename: PathBuf,
    pub postscript_name: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub face_id: usize,
    pub object_number: ObjectNumber,
    registered: RefCell<BTreeSet<u16>>,
}

impl Face {
    /// Load face `index` of a font file
    pub fn load(path: &Path, index: u32, face_id: usize, object_number: ObjectNumber) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mut face = Self::from_data(data, index, face_id, object_number).map_err(|e| match e {
            EngineError::Font(msg) => EngineError::Font(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        face.filename = path.to_path_buf();
        Ok(face)
    }

    /// Parse face `index` of in-memory font data
    pub fn from_data(
        data: Vec<u8>,
        index: u32,
        face_id: usize,
        object_number: ObjectNumber,
    ) -> Result<Self> {
        let (postscript_name, units_per_em, ascender, descender) = {
            let face = rustybuzz::Face::from_slice(&data, index)
                .ok_or_else(|| EngineError::Font(format!("cannot parse face index {}", index)))?;
            let postscript_name = face
                .names()
                .into_iter()
                .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
                .find_map(|name| name.to_string())
                .unwrap_or_else(|| format!("Face{}", face_id));
            (
                postscript_name,
                face.units_per_em() as u16,
                face.ascender(),
                face.descender(),
            )
        };
        log::debug!("loaded face {} ({} upem)", postscript_name, units_per_em);
        Ok(Face {
            data,
            index,
            filename: PathBuf::new(),
            postscript_name,
            units_per_em,
            ascender,
            descender,
            face_id,
            object_number,
            registered: RefCell::new(BTreeSet::new()),
        })
    }

    /// Run `f` on a parsed view of the face data
    pub fn with_face<T>(&self, f: impl FnOnce(&rustybuzz::Face<'_>) -> T) -> Result<T> {
        let face = rustybuzz::Face::from_slice(&self.data, self.index)
            .ok_or_else(|| EngineError::Font(format!("cannot parse {}", self.filename.display())))?;
        Ok(f(&face))
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resource name used in content streams
    pub fn internal_name(&self) -> String {
        format!("/F{}", self.face_id)
    }

    /// Glyph id for a character, 0 when the face has no glyph for it
    pub fn codepoint(&self, ch: char) -> u16 {
        self.with_face(|face| face.glyph_index(ch).map(|g| g.0).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn codepoints(&self, chars: &[char]) -> Vec<u16> {
        chars.iter().map(|c| self.codepoint(*c)).collect()
    }

    /// Mark a glyph id as used
    pub fn register_codepoint(&self, glyph: u16) {
        self.registered.borrow_mut().insert(glyph);
    }

    pub fn register_codepoints(&self, glyphs: &[u16]) {
        self.registered.borrow_mut().extend(glyphs.iter().copied());
    }

    /// Registered glyph ids in ascending order
    pub fn registered(&self) -> Vec<u16> {
        self.registered.borrow().iter().copied().collect()
    }

    /// Horizontal advance of a glyph in font units
    pub fn advance(&self, glyph: u16) -> u16 {
        self.with_face(|face| face.glyph_hor_advance(GlyphId(glyph)).unwrap_or(0))
            .unwrap_or(0)
    }
}
