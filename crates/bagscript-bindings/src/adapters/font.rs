//! Fonts, shaped atoms and OpenType features

use std::cell::RefCell;
use std::rc::Rc;

use bagscript_engine::font::{Atom, Feature, Font};
use bagscript_engine::{EngineError, ScaledPoint};
use rhai::{Dynamic, INT};

use crate::adapters::bag::SpValue;
use crate::adapters::pdf::FaceHandle;
use crate::adapters::wrap;
use crate::args::{expect, Args, FromDynamic};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::iter::AtomIterator;
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

/// A face at a size. `font::create()` without arguments yields an empty
/// font that is falsy and cannot shape.
#[derive(Debug, Clone, Default)]
pub struct FontHandle(pub Option<Rc<Font>>);

attributes! {
    FontAttr {
        fields { Face => "face", Size => "size" }
        methods { Shape => "shape" }
    }
}

const FONT: &str = "font.font";

/// Features are given as strings like `"+liga"` or as feature values
fn features_from_script(args: &Args<'_>, first: usize) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    for (offset, value) in args.rest(first).iter().enumerate() {
        if let Some(feature) = Feature::from_dynamic(value) {
            features.push(feature);
        } else if let Some(text) = String::from_dynamic(value) {
            features.push(Feature::parse(&text).map_err(|e| BindingError::native("font.shape", e))?);
        } else {
            return Err(args.type_error(first + offset, "feature", "string or font.feature"));
        }
    }
    Ok(features)
}

impl Wrapper for FontHandle {
    type Native = Option<Rc<Font>>;

    fn native(&self) -> Self::Native {
        self.0.clone()
    }
}

impl Identified for FontHandle {
    fn type_tag(&self) -> &'static str {
        FONT
    }

    fn identity(&self) -> Option<usize> {
        self.0.as_ref().map(|font| Rc::as_ptr(font) as *const () as usize)
    }

    fn display(&self) -> String {
        match &self.0 {
            Some(font) => format!("{} at {}", font.face.postscript_name, font.size),
            None => "font(empty)".to_string(),
        }
    }
}

impl AttributeAccessible for FontHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = FontAttr::from_name(name)?;
        let value = match (attr, &self.0) {
            (FontAttr::Shape, font) => {
                let font = font.clone();
                method("font.shape", Arity::AtLeast(1), move |_ctx, args| {
                    let args = Args::new("font.shape", args);
                    let text: String = args.get(0, "text")?;
                    let features = features_from_script(&args, 1)?;
                    let font = font.as_ref().ok_or_else(|| {
                        BindingError::native(
                            "font.shape",
                            EngineError::Font("font has no face".to_string()),
                        )
                    })?;
                    let atoms = font
                        .shape(&text, &features)
                        .map_err(|e| BindingError::native("font.shape", e))?;
                    Ok(wrap(AtomIterator::new(atoms)))
                })
            }
            (FontAttr::Face, Some(font)) => wrap(FaceHandle(font.face.clone())),
            (FontAttr::Size, Some(font)) => wrap(SpValue(font.size)),
            (_, None) => Dynamic::UNIT,
        };
        Some(value)
    }
}

impl Comparable for FontHandle {}

impl Truthy for FontHandle {
    fn is_truthy(&self) -> bool {
        self.0.is_some()
    }
}

impl Operable for FontHandle {}

/// One shaped glyph cluster. Every field can be changed by scripts.
#[derive(Debug, Clone)]
pub struct AtomHandle(pub Rc<RefCell<Atom>>);

attributes! {
    AtomAttr {
        fields {
            Advance => "advance",
            Codepoint => "codepoint",
            Components => "components",
            Depth => "depth",
            Height => "height",
            Hyphenate => "hyphenate",
            IsSpace => "is_space",
            Kernafter => "kernafter",
        }
        methods {}
    }
}

const ATOM: &str = "font.atom";

impl AtomHandle {
    pub fn new(atom: Atom) -> Self {
        AtomHandle(Rc::new(RefCell::new(atom)))
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Atom {
        self.0.borrow().clone()
    }
}

impl Wrapper for AtomHandle {
    type Native = Atom;

    fn native(&self) -> Atom {
        self.snapshot()
    }
}

impl Identified for AtomHandle {
    fn type_tag(&self) -> &'static str {
        ATOM
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let atom = self.0.borrow();
        format!("atom({:?}, glyph {})", atom.components, atom.codepoint)
    }
}

impl AttributeAccessible for AtomHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let atom = self.0.borrow();
        let value = match AtomAttr::from_name(name)? {
            AtomAttr::Advance => wrap(SpValue(atom.advance)),
            AtomAttr::Codepoint => Dynamic::from(atom.codepoint as INT),
            AtomAttr::Components => Dynamic::from(atom.components.clone()),
            AtomAttr::Depth => wrap(SpValue(atom.depth)),
            AtomAttr::Height => wrap(SpValue(atom.height)),
            AtomAttr::Hyphenate => Dynamic::from(atom.hyphenate),
            AtomAttr::IsSpace => Dynamic::from(atom.is_space),
            AtomAttr::Kernafter => wrap(SpValue(atom.kernafter)),
        };
        Some(value)
    }

    fn set_attribute(&self, _ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        let attr =
            AtomAttr::from_name(name).ok_or_else(|| BindingError::unknown_attribute(ATOM, name))?;
        let context = format!("atom.{}", name);
        let context = context.as_str();
        match attr {
            AtomAttr::Advance => self.0.borrow_mut().advance = expect::<ScaledPoint>(&value, context)?,
            AtomAttr::Depth => self.0.borrow_mut().depth = expect::<ScaledPoint>(&value, context)?,
            AtomAttr::Height => self.0.borrow_mut().height = expect::<ScaledPoint>(&value, context)?,
            AtomAttr::Kernafter => {
                self.0.borrow_mut().kernafter = expect::<ScaledPoint>(&value, context)?
            }
            AtomAttr::Codepoint => {
                let glyph: INT = expect(&value, context)?;
                let glyph = u16::try_from(glyph).map_err(|_| {
                    BindingError::argument_type(context, "glyph id from 0 to 65535", glyph.to_string())
                })?;
                self.0.borrow_mut().codepoint = glyph;
            }
            AtomAttr::Components => self.0.borrow_mut().components = expect(&value, context)?,
            AtomAttr::Hyphenate => self.0.borrow_mut().hyphenate = expect(&value, context)?,
            AtomAttr::IsSpace => self.0.borrow_mut().is_space = expect(&value, context)?,
        }
        Ok(())
    }
}

impl Comparable for AtomHandle {}
impl Truthy for AtomHandle {}
impl Operable for AtomHandle {}

#[derive(Debug, Clone)]
pub struct FeatureValue(pub Feature);

attributes! {
    FeatureAttr {
        fields { Tag => "tag", Value => "value" }
        methods {}
    }
}

impl Wrapper for FeatureValue {
    type Native = Feature;

    fn native(&self) -> Feature {
        self.0.clone()
    }
}

impl Identified for FeatureValue {
    fn type_tag(&self) -> &'static str {
        "font.feature"
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl AttributeAccessible for FeatureValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match FeatureAttr::from_name(name)? {
            FeatureAttr::Tag => Some(Dynamic::from(self.0.tag())),
            FeatureAttr::Value => Some(Dynamic::from(self.0.value() as INT)),
        }
    }
}

impl Comparable for FeatureValue {}
impl Truthy for FeatureValue {}
impl Operable for FeatureValue {}
