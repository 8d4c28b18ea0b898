//! # Document Node Module
//!
//! Albero tipizzato del documento SVG.
//!
//! ## Varianti:
//! - `Node::Element`: elemento con nome, attributi ordinati e figli
//! - `Node::Sequence`: lista ordinata di nodi fratelli (il documento stesso
//!   è una sequenza dei suoi nodi top-level)
//! - `Node::Scalar`: contenuto foglia (testo, CDATA, commenti, dichiarazioni)
//!
//! L'albero è immutabile dopo il parsing: le trasformazioni producono nodi
//! nuovi e non modificano mai quelli esistenti.

/// A node of a parsed document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Sequence(Vec<Node>),
    Scalar(Scalar),
}

/// Leaf content of a document
///
/// Text and attribute-free content is stored exactly as it appeared in the
/// source (still escaped), so serializing it back is lossless.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    CData(String),
    Comment(String),
    /// XML declaration content, e.g. `xml version="1.0"`
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// An element with its attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Attributes,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::default(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Explicit attribute lookup, `None` when absent
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Returns a copy of this element with one attribute replaced.
    ///
    /// The attribute keeps its original position; a new attribute is appended.
    pub fn replacing_attribute(&self, name: &str, value: impl Into<String>) -> Self {
        let mut element = self.clone();
        element.attributes.set(name, value);
        element
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Attribute map that keeps source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets a value, replacing in place when the key already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
