//! Native document engine for bagscript
//!
//! The engine provides the types scripts manipulate through the binding
//! layer: scaled point units, colors, languages, layout nodes, fonts with
//! text shaping, low-level PDF objects and a page-oriented document that
//! renders shipped pages into a PDF file.
//!
//! # Example
//!
//! ```ignore
//! use bagscript_engine::document::Document;
//! use bagscript_engine::node::{link_all, new_node, vpack, NodeType};
//! use bagscript_engine::units::ScaledPoint;
//!
//! let mut doc = Document::create("out.pdf".as_ref())?;
//! let page = doc.new_page();
//! let vlist = vpack(&link_all(&[new_node(NodeType::Rule)]).unwrap());
//! page.borrow_mut().output_at(ScaledPoint::ZERO, ScaledPoint::from_pt(800.0), vlist)?;
//! page.borrow_mut().shipout()?;
//! doc.finish()?;
//! ```

pub mod color;
pub mod document;
pub mod error;
pub mod font;
pub mod frontend;
pub mod lang;
pub mod node;
pub mod pdf;
pub mod units;

pub use error::{EngineError, Result};
pub use units::ScaledPoint;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
