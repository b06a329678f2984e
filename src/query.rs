use css::{Combinator, Selector, SimpleSelector};
use html::{Document, NodeId};

use crate::error::{FoldpaneError, Result};

/// Parse a selector string, requiring the whole input to be a single
/// selector.
pub fn parse_selector(text: &str) -> Result<Selector> {
    match css::selector(text.trim()) {
        Ok((rest, selector)) if rest.is_empty() => Ok(selector),
        Ok((rest, _)) => Err(FoldpaneError::selector(
            text,
            format!("trailing input `{rest}`"),
        )),
        Err(e) => Err(FoldpaneError::selector(text, e.to_string())),
    }
}

/// All elements matching the selector, in document order.
pub fn query_all(document: &Document, selector: &Selector) -> Vec<NodeId> {
    document
        .elements()
        .into_iter()
        .filter(|&id| matches(document, id, selector))
        .collect()
}

/// First matching element in document order.
pub fn query_first(document: &Document, selector: &Selector) -> Option<NodeId> {
    document
        .elements()
        .into_iter()
        .find(|&id| matches(document, id, selector))
}

/// Whether the element satisfies the selector, combinators included.
pub fn matches(document: &Document, id: NodeId, selector: &Selector) -> bool {
    if !document.is_element(id) {
        return false;
    }
    match selector {
        Selector::Simple(simple) => matches_simple(document, id, simple),
        Selector::Compound(parts) => parts.iter().all(|part| matches_simple(document, id, part)),
        Selector::Combinator(left, combinator, right) => {
            if !matches(document, id, right) {
                return false;
            }
            match combinator {
                Combinator::Descendant => {
                    ancestors(document, id).any(|a| matches(document, a, left))
                }
                Combinator::Child => document
                    .parent(id)
                    .map_or(false, |p| matches(document, p, left)),
                Combinator::NextSibling => previous_element_sibling(document, id)
                    .map_or(false, |s| matches(document, s, left)),
                Combinator::SubsequentSibling => {
                    previous_element_siblings(document, id).any(|s| matches(document, s, left))
                }
            }
        }
    }
}

fn matches_simple(document: &Document, id: NodeId, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(tag) => document.tag_name(id) == Some(tag.as_str()),
        SimpleSelector::Class(class) => document.has_class(id, class),
        SimpleSelector::ID(target) => document.attr(id, "id") == Some(target.as_str()),
        // no interactive state headlessly, :hover and friends never match
        SimpleSelector::PseudoClass(_) => false,
    }
}

fn ancestors(document: &Document, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(document.parent(id), move |&current| document.parent(current))
}

fn previous_element_siblings(
    document: &Document,
    id: NodeId,
) -> impl Iterator<Item = NodeId> + '_ {
    let siblings = document
        .parent(id)
        .map(|parent| document.children(parent))
        .unwrap_or(&[]);
    let position = siblings.iter().position(|&s| s == id).unwrap_or(0);
    siblings[..position]
        .iter()
        .rev()
        .copied()
        .filter(move |&s| document.is_element(s))
}

fn previous_element_sibling(document: &Document, id: NodeId) -> Option<NodeId> {
    previous_element_siblings(document, id).next()
}

#[cfg(test)]
fn fixture() -> Document {
    html::parse(
        r#"<div id="reader"><div class="feedback-content"><h3 class="open">A</h3><p>eins</p><p>zwei</p><h3>B</h3></div><h3>draussen</h3></div>"#,
    )
    .unwrap()
}

#[cfg(test)]
fn sel(text: &str) -> Selector {
    parse_selector(text).unwrap()
}

#[cfg(test)]
#[test]
fn test_parse_selector_strictness() {
    assert!(parse_selector(" .feedback-content h3 ").is_ok());
    assert!(parse_selector("h3, h4").is_err());
    assert!(parse_selector("").is_err());
}

#[cfg(test)]
#[test]
fn test_simple_matching() {
    let document = fixture();
    assert_eq!(query_all(&document, &sel("h3")).len(), 3);
    assert_eq!(query_all(&document, &sel("#reader")).len(), 1);
    assert_eq!(query_all(&document, &sel(".feedback-content")).len(), 1);
    assert_eq!(query_all(&document, &sel("*")).len(), 7);
    assert_eq!(query_all(&document, &sel("h5")).len(), 0);
}

#[cfg(test)]
#[test]
fn test_descendant_matching() {
    let document = fixture();
    let headings = query_all(&document, &sel(".feedback-content h3"));
    assert_eq!(headings.len(), 2);
    assert_eq!(document.text_content(headings[0]), "A");
    assert_eq!(document.text_content(headings[1]), "B");
}

#[cfg(test)]
#[test]
fn test_child_matching() {
    let document = fixture();
    let direct = query_all(&document, &sel("#reader > h3"));
    assert_eq!(direct.len(), 1);
    assert_eq!(document.text_content(direct[0]), "draussen");
}

#[cfg(test)]
#[test]
fn test_sibling_matching() {
    let document = fixture();
    let next = query_all(&document, &sel("h3 + p"));
    assert_eq!(next.len(), 1);
    assert_eq!(document.text_content(next[0]), "eins");

    let subsequent = query_all(&document, &sel("h3 ~ p"));
    assert_eq!(subsequent.len(), 2);
}

#[cfg(test)]
#[test]
fn test_compound_matching() {
    let document = fixture();
    let open = query_all(&document, &sel("h3.open"));
    assert_eq!(open.len(), 1);
    assert_eq!(document.text_content(open[0]), "A");
}

#[cfg(test)]
#[test]
fn test_query_first_in_document_order() {
    let document = fixture();
    let first = query_first(&document, &sel("p")).unwrap();
    assert_eq!(document.text_content(first), "eins");
    assert!(query_first(&document, &sel("table")).is_none());
}

#[cfg(test)]
#[test]
fn test_pseudo_class_never_matches() {
    let document = fixture();
    assert!(query_all(&document, &sel("h3:hover")).is_empty());
}
