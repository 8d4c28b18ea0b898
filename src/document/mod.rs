//! # Document Module
//!
//! Parser e serializer del documento SVG, trattati come collaboratori esterni
//! del motore di trasformazione:
//! - `node`: modello ad albero tipizzato (`Node`, `Element`, `Attributes`)
//! - `parser`: testo → albero (`quick-xml`)
//! - `writer`: albero → testo (`quick-xml`)

pub mod node;
pub mod parser;
pub mod writer;

pub use node::{Attributes, Element, Node, Scalar};
pub use parser::parse_document;
pub use writer::write_document;
