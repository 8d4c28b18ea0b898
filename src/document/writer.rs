//! Serialization of a [`Node`] tree back to SVG text with `quick-xml`.

use super::node::{Element, Node, Scalar};
use crate::error::OptimizeError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Serializes a document tree.
///
/// Attribute values are re-escaped; scalar content is written as stored.
/// Elements without children are written self-closing.
pub fn write_document(document: &Node) -> Result<String, OptimizeError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_node(&mut writer, document)?;
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| OptimizeError::Serialize(format!("output is not UTF-8: {}", e)))
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &Node) -> Result<(), OptimizeError> {
    match node {
        Node::Element(element) => write_element(writer, element),
        Node::Sequence(nodes) => nodes.iter().try_for_each(|n| write_node(writer, n)),
        Node::Scalar(scalar) => {
            let event = match scalar {
                Scalar::Text(text) => Event::Text(BytesText::from_escaped(text.as_str())),
                Scalar::CData(data) => Event::CData(BytesCData::new(data.as_str())),
                Scalar::Comment(comment) => Event::Comment(BytesText::from_escaped(comment.as_str())),
                Scalar::Declaration(decl) => Event::Decl(BytesDecl::from_start(
                    BytesStart::from_content(decl.as_str(), 3),
                )),
                Scalar::ProcessingInstruction(pi) => Event::PI(BytesText::from_escaped(pi.as_str())),
                Scalar::DocType(doctype) => Event::DocType(BytesText::from_escaped(doctype.as_str())),
            };
            emit(writer, event)
        }
    }
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, element: &Element) -> Result<(), OptimizeError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in element.attributes.iter() {
        start.push_attribute((key, value));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), OptimizeError> {
    writer
        .write_event(event)
        .map_err(|e| OptimizeError::Serialize(e.to_string()))
}
