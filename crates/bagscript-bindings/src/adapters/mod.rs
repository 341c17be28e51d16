//! One adapter per native type, and the sealed [`Foreign`] enum that is the
//! only custom type rhai sees.

pub mod bag;
pub mod color;
pub mod document;
pub mod font;
pub mod frontend;
pub mod lang;
pub mod node;
pub mod pdf;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use bagscript_engine::color::Color;
use bagscript_engine::document::ColorProfile;
use bagscript_engine::font::Feature;
use bagscript_engine::frontend::{FontFamily, FontSource, TableCell, TableRow, Text};
use bagscript_engine::lang::Lang;
use bagscript_engine::node::NodeRef;
use bagscript_engine::pdf::{Face, ImageFile, Name, ObjectNumber};
use bagscript_engine::ScaledPoint;
use rhai::Dynamic;

use crate::args::FromDynamic;
use crate::iter::{AtomIterator, AtomsAttr};
use crate::protocol::{BuiltinAttr, Builtin, ForeignObject, Wrapper};
use crate::settings::{SettingsAttr, SettingsHandle};

macro_rules! foreign_types {
    ($($variant:ident($ty:ty) => $attrs:ty),+ $(,)?) => {
        /// Every native value a script can hold
        #[derive(Clone)]
        pub enum Foreign {
            $($variant($ty)),+
        }

        impl Foreign {
            /// The protocol view of the wrapped adapter
            pub fn object(&self) -> &dyn ForeignObject {
                match self {
                    $(Foreign::$variant(inner) => inner),+
                }
            }

            /// Every method name of every adapter, for registration
            pub fn method_names() -> BTreeSet<&'static str> {
                let mut names = BTreeSet::new();
                $(names.extend(<$attrs>::METHODS.iter().copied());)+
                names
            }
        }

        $(
            impl From<$ty> for Foreign {
                fn from(value: $ty) -> Self {
                    Foreign::$variant(value)
                }
            }
        )+
    };
}

foreign_types! {
    Sp(bag::SpValue) => bag::SpAttr,
    Logger(bag::LoggerHandle) => bag::LoggerAttr,
    Color(color::ColorValue) => color::ColorAttr,
    Lang(lang::LangValue) => lang::LangAttr,
    Document(document::DocumentHandle) => document::DocumentAttr,
    Page(document::PageHandle) => document::PageAttr,
    ColorProfile(document::ColorProfileHandle) => document::ColorProfileAttr,
    Font(font::FontHandle) => font::FontAttr,
    Atom(font::AtomHandle) => font::AtomAttr,
    Atoms(AtomIterator) => AtomsAttr,
    Feature(font::FeatureValue) => font::FeatureAttr,
    Node(node::NodeHandle) => node::NodeAttr,
    Pdf(pdf::PdfHandle) => pdf::PdfAttr,
    PdfObject(pdf::PdfObjectHandle) => pdf::PdfObjectAttr,
    PdfPage(pdf::PdfPageHandle) => pdf::PdfPageAttr,
    Face(pdf::FaceHandle) => pdf::FaceAttr,
    ImageFile(pdf::ImageFileHandle) => pdf::ImageFileAttr,
    ObjectNumber(pdf::ObjectNumberValue) => pdf::ObjectNumberAttr,
    Name(pdf::NameValue) => pdf::NameAttr,
    Frontend(frontend::FrontendHandle) => frontend::FrontendAttr,
    FontFamily(frontend::FontFamilyHandle) => frontend::FontFamilyAttr,
    FontSource(frontend::FontSourceValue) => frontend::FontSourceAttr,
    Text(frontend::TextHandle) => frontend::TextAttr,
    Settings(SettingsHandle) => SettingsAttr,
    Table(frontend::TableHandle) => frontend::TableAttr,
    Row(frontend::RowHandle) => frontend::RowAttr,
    Cell(frontend::CellHandle) => frontend::CellAttr,
    Builtin(Builtin) => BuiltinAttr,
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.object();
        write!(f, "{}({})", object.type_tag(), object.display())
    }
}

impl fmt::Display for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object().display())
    }
}

/// `for x in value` support. Only atom iterators yield items.
impl IntoIterator for Foreign {
    type Item = Dynamic;
    type IntoIter = std::vec::IntoIter<Dynamic>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Foreign::Atoms(atoms) => atoms.drain().into_iter(),
            other => {
                tracing::warn!(type_tag = other.object().type_tag(), "value is not iterable");
                Vec::new().into_iter()
            }
        }
    }
}

/// Wrap an adapter as a script value
pub fn wrap(value: impl Into<Foreign>) -> Dynamic {
    Dynamic::from(value.into())
}

macro_rules! native_from_foreign {
    ($($native:ty => $variant:ident, $tag:literal;)+) => {
        $(
            impl FromDynamic for $native {
                const EXPECTED: &'static str = $tag;

                fn from_dynamic(value: &Dynamic) -> Option<Self> {
                    match value.read_lock::<Foreign>()?.clone() {
                        Foreign::$variant(inner) => Some(inner.native()),
                        _ => None,
                    }
                }
            }
        )+
    };
}

native_from_foreign! {
    ScaledPoint => Sp, "backend.sp";
    Color => Color, "backend.color";
    Lang => Lang, "backend.lang";
    Rc<RefCell<ColorProfile>> => ColorProfile, "backend.colorprofile";
    Feature => Feature, "font.feature";
    NodeRef => Node, "node";
    Rc<Face> => Face, "pdf.face";
    Rc<ImageFile> => ImageFile, "pdf.imagefile";
    ObjectNumber => ObjectNumber, "pdf.objectnumber";
    Name => Name, "pdf.name";
    Rc<RefCell<FontFamily>> => FontFamily, "frontend.fontfamily";
    FontSource => FontSource, "frontend.fontsource";
    Rc<RefCell<Text>> => Text, "frontend.text";
    Rc<RefCell<TableRow>> => Row, "frontend.tr";
    Rc<RefCell<TableCell>> => Cell, "frontend.td";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_cover_adapters() {
        let names = Foreign::method_names();
        for name in ["shipout", "output_at", "shape", "save", "next", "keys", "append"] {
            assert!(names.contains(name), "{name} missing");
        }
        for reserved in ["print", "debug", "call", "type_of"] {
            assert!(!names.contains(reserved));
        }
    }

    #[test]
    fn test_from_dynamic_checks_variant() {
        let sp = wrap(bag::SpValue(ScaledPoint::from_pt(2.0)));
        assert_eq!(ScaledPoint::from_dynamic(&sp), Some(ScaledPoint::from_pt(2.0)));
        assert!(NodeRef::from_dynamic(&sp).is_none());
        assert!(ScaledPoint::from_dynamic(&Dynamic::from(2_i64)).is_none());
    }

    #[test]
    fn test_only_atoms_iterate() {
        let sp = Foreign::Sp(bag::SpValue(ScaledPoint::ZERO));
        assert_eq!(sp.into_iter().count(), 0);
    }
}
