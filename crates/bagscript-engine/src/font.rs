//! Fonts, OpenType features and text shaping.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::pdf::Face;
use crate::units::ScaledPoint;

/// An OpenType feature setting such as `+liga`, `-kern` or `ss01=1`
#[derive(Debug, Clone)]
pub struct Feature {
    source: String,
    inner: rustybuzz::Feature,
}

impl Feature {
    pub fn parse(text: &str) -> Result<Self> {
        let inner = rustybuzz::Feature::from_str(text)
            .map_err(|e| EngineError::Font(format!("invalid feature {:?}: {}", text, e)))?;
        Ok(Feature {
            source: text.to_string(),
            inner,
        })
    }

    /// Four letter feature tag
    pub fn tag(&self) -> String {
        self.inner.tag.to_string()
    }

    pub fn value(&self) -> u32 {
        self.inner.value
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One shaped glyph cluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Characters the glyph represents
    pub components: String,
    /// Glyph id
    pub codepoint: u16,
    pub advance: ScaledPoint,
    pub height: ScaledPoint,
    pub depth: ScaledPoint,
    /// Kerning between this glyph and the next
    pub kernafter: ScaledPoint,
    pub is_space: bool,
    pub hyphenate: bool,
}

/// A face at a size
#[derive(Debug)]
pub struct Font {
    pub face: Rc<Face>,
    pub size: ScaledPoint,
}

impl Font {
    pub fn new(face: Rc<Face>, size: ScaledPoint) -> Self {
        Font { face, size }
    }

    fn scale(&self, units: i64) -> ScaledPoint {
        let upem = self.face.units_per_em.max(1) as i64;
        ScaledPoint(units * self.size.0 / upem)
    }

    /// Shape `text` into atoms
    pub fn shape(&self, text: &str, features: &[Feature]) -> Result<Vec<Atom>> {
        let features: Vec<rustybuzz::Feature> = features.iter().map(|f| f.inner).collect();
        let shaped = self.face.with_face(|face| {
            let mut buffer = rustybuzz::UnicodeBuffer::new();
            buffer.push_str(text);
            buffer.guess_segment_properties();
            let output = rustybuzz::shape(face, &features, buffer);
            let mut boundaries: Vec<usize> = output
                .glyph_infos()
                .iter()
                .map(|g| g.cluster as usize)
                .collect();
            boundaries.push(text.len());
            boundaries.sort_unstable();
            boundaries.dedup();

            output
                .glyph_infos()
                .iter()
                .zip(output.glyph_positions())
                .map(|(info, pos)| {
                    let glyph = info.glyph_id as u16;
                    let start = (info.cluster as usize).min(text.len());
                    let end = boundaries
                        .iter()
                        .copied()
                        .find(|b| *b > start)
                        .unwrap_or(text.len());
                    let nominal = face
                        .glyph_hor_advance(rustybuzz::ttf_parser::GlyphId(glyph))
                        .map(i32::from)
                        .unwrap_or(pos.x_advance);
                    (
                        glyph,
                        text.get(start..end).unwrap_or_default().to_string(),
                        nominal,
                        pos.x_advance,
                    )
                })
                .collect::<Vec<_>>()
        })?;

        let height = self.scale(self.face.ascender as i64);
        let depth = self.scale(-(self.face.descender as i64));
        let atoms = shaped
            .into_iter()
            .map(|(glyph, components, nominal, advance)| {
                let is_space = !components.is_empty() && components.chars().all(char::is_whitespace);
                let hyphenate = components.chars().all(char::is_alphabetic);
                Atom {
                    codepoint: glyph,
                    advance: self.scale(nominal as i64),
                    kernafter: self.scale((advance - nominal) as i64),
                    height: if is_space { ScaledPoint::ZERO } else { height },
                    depth: if is_space { ScaledPoint::ZERO } else { depth },
                    components,
                    is_space,
                    hyphenate,
                }
            })
            .collect::<Vec<_>>();
        log::debug!("shaped {:?} into {} atoms", text, atoms.len());
        Ok(atoms)
    }
}
