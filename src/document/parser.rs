//! Parsing of SVG text into a [`Node`] tree with `quick-xml`.

use super::node::{Attributes, Element, Node, Scalar};
use crate::error::OptimizeError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Parses a whole document.
///
/// The result is always a `Node::Sequence` of the top-level nodes, so that
/// declarations and comments around the root element survive the round trip.
///
/// Entities declared in the internal DTD subset (`<!ENTITY ns_svg "...">`)
/// are resolved in attribute values.
pub fn parse_document(text: &str) -> Result<Node, OptimizeError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);
    reader.expand_empty_elements(false);
    reader.check_end_names(true);

    // Open elements; the bottom frame collects the top-level nodes.
    let mut stack: Vec<Element> = Vec::new();
    let mut top_level: Vec<Node> = Vec::new();
    let mut saw_root = false;
    let mut entities: HashMap<String, String> = HashMap::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            OptimizeError::Parse(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        let node = match event {
            Event::Start(start) => {
                stack.push(element_from_start(&start, &entities)?);
                continue;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    OptimizeError::Parse(format!(
                        "unexpected closing tag at byte {}",
                        reader.buffer_position()
                    ))
                })?;
                Node::Element(element)
            }
            Event::Empty(start) => Node::Element(element_from_start(&start, &entities)?),
            Event::Text(text) => Node::Scalar(Scalar::Text(utf8(&text)?)),
            Event::CData(data) => Node::Scalar(Scalar::CData(utf8(&data)?)),
            Event::Comment(comment) => Node::Scalar(Scalar::Comment(utf8(&comment)?)),
            Event::Decl(decl) => Node::Scalar(Scalar::Declaration(utf8(&decl)?)),
            Event::PI(pi) => Node::Scalar(Scalar::ProcessingInstruction(utf8(&pi)?)),
            Event::DocType(doctype) => {
                let content = utf8(&doctype)?.trim_start().to_owned();
                entities = internal_entities(&content);
                Node::Scalar(Scalar::DocType(content))
            }
            Event::Eof => break,
        };

        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if matches!(node, Node::Element(_)) {
                    if saw_root {
                        return Err(OptimizeError::Parse(
                            "document has more than one root element".to_string(),
                        ));
                    }
                    saw_root = true;
                }
                top_level.push(node);
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(OptimizeError::Parse(format!(
            "unexpected end of document, <{}> is not closed",
            open.name
        )));
    }
    if !saw_root {
        return Err(OptimizeError::Parse("document has no root element".to_string()));
    }

    Ok(Node::Sequence(top_level))
}

fn element_from_start(
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
) -> Result<Element, OptimizeError> {
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| OptimizeError::Parse(format!("invalid element name: {}", e)))?;

    let mut attributes = Attributes::new();
    for attribute in start.attributes() {
        let attribute = attribute
            .map_err(|e| OptimizeError::Parse(format!("invalid attribute in <{}>: {}", name, e)))?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())
            .map_err(|e| OptimizeError::Parse(format!("invalid attribute name: {}", e)))?;
        let value = attribute
            .unescape_value_with(|entity| entities.get(entity).map(String::as_str))
            .map_err(|e| OptimizeError::Parse(format!("invalid value for {}: {}", key, e)))?;
        attributes.set(key, value.into_owned());
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// General entities declared with a literal value in the internal subset.
///
/// Parameter entities and external (`SYSTEM`/`PUBLIC`) entities are skipped.
/// The first declaration of a name wins.
fn internal_entities(doctype: &str) -> HashMap<String, String> {
    const DECLARATION: &str = "<!ENTITY";

    let mut entities = HashMap::new();
    let mut rest = doctype;
    while let Some(start) = rest.find(DECLARATION) {
        rest = rest[start + DECLARATION.len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (name, tail) = rest.split_at(name_end);
        let tail = tail.trim_start();
        let Some(quote) = tail.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            rest = tail;
            continue;
        };
        let Some(end) = tail[1..].find(quote) else {
            break;
        };

        entities
            .entry(name.to_string())
            .or_insert_with(|| tail[1..1 + end].to_string());
        rest = &tail[end + 2..];
    }
    entities
}

fn utf8(bytes: &[u8]) -> Result<String, OptimizeError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| OptimizeError::Parse(format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(document: &Node) -> &Element {
        match document {
            Node::Sequence(nodes) => nodes
                .iter()
                .find_map(|n| match n {
                    Node::Element(e) => Some(e),
                    _ => None,
                })
                .unwrap(),
            _ => panic!("document is not a sequence"),
        }
    }

    #[test]
    fn test_parse_nested_document() {
        let svg = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
  <g id="layer"><image width="1" height="2"/></g>
</svg>"#;
        let document = parse_document(svg).unwrap();
        let svg = root(&document);
        assert_eq!(svg.name, "svg");
        assert_eq!(svg.attribute("width"), Some("10"));

        let group = svg
            .children
            .iter()
            .find_map(|n| match n {
                Node::Element(e) if e.name == "g" => Some(e),
                _ => None,
            })
            .unwrap();
        match &group.children[0] {
            Node::Element(image) => {
                assert_eq!(image.name, "image");
                assert_eq!(image.attribute("height"), Some("2"));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_declaration_and_comments_are_kept() {
        let document = parse_document("<?xml version=\"1.0\"?><!-- hi --><svg/>").unwrap();
        match document {
            Node::Sequence(nodes) => {
                assert_eq!(nodes.len(), 3);
                assert!(matches!(nodes[0], Node::Scalar(Scalar::Declaration(_))));
                assert_eq!(nodes[1], Node::Scalar(Scalar::Comment(" hi ".to_string())));
            }
            _ => panic!("document is not a sequence"),
        }
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let document = parse_document(r#"<svg title="a &amp; b"/>"#).unwrap();
        assert_eq!(root(&document).attribute("title"), Some("a & b"));
    }

    #[test]
    fn test_internal_dtd_entities_are_resolved() {
        let svg = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" [
	<!ENTITY ns_svg "http://www.w3.org/2000/svg">
	<!ENTITY ns_xlink 'http://www.w3.org/1999/xlink'>
	<!ENTITY % local SYSTEM "local.dtd">
	<!ENTITY logo SYSTEM "logo.svg">
]>
<svg xmlns="&ns_svg;" xmlns:xlink="&ns_xlink;" width="10" height="10"><image width="1" height="1" xlink:href="data:image/png;base64,AAAA"/></svg>"#;

        let document = parse_document(svg).unwrap();
        let svg = root(&document);
        assert_eq!(svg.attribute("xmlns"), Some("http://www.w3.org/2000/svg"));
        assert_eq!(svg.attribute("xmlns:xlink"), Some("http://www.w3.org/1999/xlink"));

        let written = crate::document::write_document(&document).unwrap();
        assert!(written.contains("<!ENTITY ns_svg"));
        assert_eq!(parse_document(&written).unwrap(), document);
    }

    #[test]
    fn test_entity_declarations() {
        let entities = internal_entities(
            r#"svg [ <!ENTITY a "1"> <!ENTITY a "2"> <!ENTITY % p "x"> <!ENTITY ext SYSTEM "e.xml"> <!ENTITY b 'two words'> ]"#,
        );
        assert_eq!(entities.get("a").map(String::as_str), Some("1"));
        assert_eq!(entities.get("b").map(String::as_str), Some("two words"));
        assert!(!entities.contains_key("p"));
        assert!(!entities.contains_key("ext"));
    }

    #[test]
    fn test_undeclared_entity_is_a_parse_error() {
        assert!(matches!(
            parse_document(r#"<svg xmlns="&missing;"/>"#),
            Err(OptimizeError::Parse(_))
        ));
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(matches!(parse_document("<svg><g></svg>"), Err(OptimizeError::Parse(_))));
        assert!(matches!(parse_document("<svg><g>"), Err(OptimizeError::Parse(_))));
        assert!(matches!(parse_document("</svg>"), Err(OptimizeError::Parse(_))));
        assert!(matches!(parse_document("just text"), Err(OptimizeError::Parse(_))));
        assert!(matches!(parse_document("<a/><b/>"), Err(OptimizeError::Parse(_))));
    }
}
