//! Low-level PDF primitives and the PDF writer.

mod face;
mod image;
mod object;
mod page;
mod writer;

use std::collections::BTreeMap;
use std::fmt;

use crate::units::format_number;

pub use face::Face;
pub use image::{ImageFile, PDF_BOXES};
pub use object::PdfObject;
pub use page::PdfPage;
pub use writer::{OutputSink, PdfWriter};
pub(crate) use writer::{dict, name};

/// A PDF name atom, stored without the leading slash
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name(name.to_string())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for byte in self.0.bytes() {
            if byte.is_ascii_graphic() && !b"#/()<>[]{}%".contains(&byte) {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "#{:02X}", byte)?;
            }
        }
        Ok(())
    }
}

/// A PDF dictionary
pub type Dict = BTreeMap<Name, PdfValue>;

/// An indirect object number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectNumber(pub u32);

impl ObjectNumber {
    /// Reference string such as `12 0 R`
    pub fn reference(self) -> String {
        format!("{} 0 R", self.0)
    }
}

impl fmt::Display for ObjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value in the native primitive tree
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Name(Name),
    Array(Vec<PdfValue>),
    Dict(Dict),
    Ref(ObjectNumber),
}

impl fmt::Display for PdfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfValue::Null => f.write_str("null"),
            PdfValue::Bool(b) => write!(f, "{}", b),
            PdfValue::Int(i) => write!(f, "{}", i),
            PdfValue::Float(v) => f.write_str(&format_number(*v)),
            PdfValue::String(s) => f.write_str(&text_string(s)),
            PdfValue::Name(n) => write!(f, "{}", n),
            PdfValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            PdfValue::Dict(dict) => f.write_str(&serialize_dict(dict)),
            PdfValue::Ref(num) => f.write_str(&num.reference()),
        }
    }
}

/// Serialize a dictionary, one entry per line
pub fn serialize_dict(dict: &Dict) -> String {
    let mut out = String::from("<<");
    for (key, value) in dict {
        out.push_str(&format!("\n{} {}", key, value));
    }
    out.push_str("\n>>");
    out
}

/// Escape a string for use inside `( )`
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Literal string for ASCII text, UTF-16BE hex with byte order mark otherwise
pub fn text_string(s: &str) -> String {
    if s.is_ascii() {
        return format!("({})", escape_string(s));
    }
    let mut out = String::from("<FEFF");
    for unit in s.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    out
}
