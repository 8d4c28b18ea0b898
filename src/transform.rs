//! # Tree Transform Engine
//!
//! Visita ricorsiva dell'albero del documento che individua i nodi `<image>`
//! e ricostruisce un albero nuovo con i nodi sostituiti.
//!
//! ## Dispatch per forma del nodo:
//! - **Image** (`name == "image"`, a qualsiasi profondità): delegato al `NodeRewriter`
//! - **Sequence**: trasformazione di ogni elemento, stesso ordine e lunghezza
//! - **Scalar**: identità
//! - **Element**: stesso nome, stessi attributi nello stesso ordine, figli trasformati
//!
//! ## Ordine di visita:
//! Depth-first, genitore prima dei figli, fratelli da sinistra a destra.
//! L'ordine è stabile e `visit_images` lo condivide con `transform`: il
//! contatore dei nomi di output segue quindi sempre lo stesso ordine per lo
//! stesso documento.
//!
//! L'albero originale non viene mai modificato.

use crate::document::{Element, Node};
use crate::error::OptimizeError;

/// Tag name that marks an embeddable image
pub const IMAGE_TAG: &str = "image";

/// Produces the replacement for every image element met by [`transform`]
pub trait NodeRewriter {
    fn rewrite_image(&mut self, image: &Element) -> Result<Element, OptimizeError>;
}

impl<F> NodeRewriter for F
where
    F: FnMut(&Element) -> Result<Element, OptimizeError>,
{
    fn rewrite_image(&mut self, image: &Element) -> Result<Element, OptimizeError> {
        self(image)
    }
}

/// Image classification is by tag name only, independent of the parent
pub fn is_image(element: &Element) -> bool {
    element.name == IMAGE_TAG
}

/// Builds a new tree where every image element is replaced by the rewriter's output
pub fn transform<R>(node: &Node, rewriter: &mut R) -> Result<Node, OptimizeError>
where
    R: NodeRewriter + ?Sized,
{
    match node {
        Node::Element(element) if is_image(element) => {
            rewriter.rewrite_image(element).map(Node::Element)
        }
        Node::Element(element) => transform_element(element, rewriter).map(Node::Element),
        Node::Sequence(nodes) => nodes
            .iter()
            .map(|child| transform(child, rewriter))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Sequence),
        Node::Scalar(scalar) => Ok(Node::Scalar(scalar.clone())),
    }
}

fn transform_element<R>(element: &Element, rewriter: &mut R) -> Result<Element, OptimizeError>
where
    R: NodeRewriter + ?Sized,
{
    let children = element
        .children
        .iter()
        .map(|child| transform(child, rewriter))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Element {
        name: element.name.clone(),
        attributes: element.attributes.clone(),
        children,
    })
}

/// Calls `visitor` on every image element, in the same order as [`transform`]
pub fn visit_images<'a, F>(node: &'a Node, visitor: &mut F) -> Result<(), OptimizeError>
where
    F: FnMut(&'a Element) -> Result<(), OptimizeError>,
{
    match node {
        Node::Element(element) if is_image(element) => visitor(element),
        Node::Element(element) => element
            .children
            .iter()
            .try_for_each(|child| visit_images(child, visitor)),
        Node::Sequence(nodes) => nodes.iter().try_for_each(|child| visit_images(child, visitor)),
        Node::Scalar(_) => Ok(()),
    }
}
