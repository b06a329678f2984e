use css::Selector;
use html::Document;
use tracing::debug;

use crate::error::Result;
use crate::events::{Action, EventKind, Listener, ListenerStore};
use crate::query;

/// Container class the feedback renderer puts around collapsible
/// sections.
pub const FEEDBACK_CONTENT_CLASS: &str = "feedback-content";

/// Class toggled on hidden blocks. The pane stylesheet maps it to
/// `display: none`.
pub const COLLAPSED_CLASS: &str = "collapsed";

/// How section folding is wired onto a pane document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRule {
    /// Selector for the container holding headings and their blocks.
    pub container: String,
    /// Selector for the headings inside the container. Its subject is
    /// also the boundary that ends a section.
    pub heading: String,
    /// Class toggled on the blocks between headings.
    pub collapsed_class: String,
    /// Give wired headings an inline pointer cursor.
    pub pointer_cursor: bool,
}

impl Default for ToggleRule {
    fn default() -> Self {
        Self {
            container: format!(".{FEEDBACK_CONTENT_CLASS}"),
            heading: "h3".to_string(),
            collapsed_class: COLLAPSED_CLASS.to_string(),
            pointer_cursor: true,
        }
    }
}

impl ToggleRule {
    /// Container-scoped selector for the headings this rule wires.
    pub fn heading_selector(&self) -> Result<Selector> {
        query::parse_selector(&format!("{} {}", self.container, self.heading))
    }
}

/// Register a click listener on every heading the rule selects. Each
/// listener folds the blocks between its heading and the next one.
/// Returns the number of wired headings; zero matches are a no-op.
///
/// Wiring the same rule twice stacks listeners, which makes a click
/// toggle twice. Wire each rule once per document.
pub fn wire_section_toggles(
    document: &mut Document,
    store: &mut ListenerStore,
    rule: &ToggleRule,
) -> Result<usize> {
    let selector = rule.heading_selector()?;
    let boundary = selector.subject().clone();
    let headings = query::query_all(document, &selector);
    for &heading in &headings {
        if rule.pointer_cursor {
            document.set_inline_style(heading, "cursor", "pointer");
        }
        store.add(
            heading,
            Listener {
                event: EventKind::Click,
                action: Action::ToggleSectionBlocks {
                    boundary: boundary.clone(),
                    class_name: rule.collapsed_class.clone(),
                },
            },
        );
    }
    debug!(
        headings = headings.len(),
        heading = %rule.heading,
        container = %rule.container,
        "wired section toggles"
    );
    Ok(headings.len())
}

#[cfg(test)]
use crate::events::dispatch;

#[cfg(test)]
fn reader_fixture() -> Document {
    html::parse(
        r#"<section><div class="feedback-content"><h3>A</h3><p>a1</p><p>a2</p><h3>B</h3><p>b1</p></div><h3>draussen</h3></section>"#,
    )
    .unwrap()
}

#[cfg(test)]
#[test]
fn test_wire_registers_one_listener_per_heading() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();

    let wired = wire_section_toggles(&mut document, &mut store, &ToggleRule::default()).unwrap();
    assert_eq!(wired, 2);
    assert_eq!(store.len(), 2);
}

#[cfg(test)]
#[test]
fn test_wire_ignores_headings_outside_container() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    wire_section_toggles(&mut document, &mut store, &ToggleRule::default()).unwrap();

    let outside = query::query_all(&document, &query::parse_selector("section > h3").unwrap());
    assert_eq!(outside.len(), 1);
    assert!(store.actions_for(outside[0], EventKind::Click).is_empty());
    assert_eq!(document.inline_style(outside[0], "cursor"), None);
}

#[cfg(test)]
#[test]
fn test_wire_sets_pointer_cursor() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    wire_section_toggles(&mut document, &mut store, &ToggleRule::default()).unwrap();

    let headings = query::query_all(
        &document,
        &query::parse_selector(".feedback-content h3").unwrap(),
    );
    for heading in headings {
        assert_eq!(
            document.inline_style(heading, "cursor").as_deref(),
            Some("pointer")
        );
    }
}

#[cfg(test)]
#[test]
fn test_wire_without_pointer_cursor() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    let rule = ToggleRule {
        pointer_cursor: false,
        ..ToggleRule::default()
    };
    wire_section_toggles(&mut document, &mut store, &rule).unwrap();

    let headings = query::query_all(&document, &rule.heading_selector().unwrap());
    for heading in headings {
        assert_eq!(document.attr(heading, "style"), None);
    }
}

#[cfg(test)]
#[test]
fn test_wire_with_missing_container_is_noop() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    let rule = ToggleRule {
        container: ".right-pane".to_string(),
        ..ToggleRule::default()
    };
    assert_eq!(wire_section_toggles(&mut document, &mut store, &rule).unwrap(), 0);
    assert!(store.is_empty());
}

#[cfg(test)]
#[test]
fn test_wire_rejects_invalid_selectors() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    let rule = ToggleRule {
        heading: "h3, h4".to_string(),
        ..ToggleRule::default()
    };
    assert!(wire_section_toggles(&mut document, &mut store, &rule).is_err());
}

#[cfg(test)]
#[test]
fn test_sections_fold_independently() {
    let mut document = reader_fixture();
    let mut store = ListenerStore::new();
    wire_section_toggles(&mut document, &mut store, &ToggleRule::default()).unwrap();

    let headings = query::query_all(
        &document,
        &query::parse_selector(".feedback-content h3").unwrap(),
    );
    let blocks = |document: &Document| {
        query::query_all(document, &query::parse_selector(".feedback-content p").unwrap())
            .into_iter()
            .map(|id| document.has_class(id, COLLAPSED_CLASS))
            .collect::<Vec<_>>()
    };

    dispatch(&mut document, &store, headings[0], EventKind::Click);
    assert_eq!(blocks(&document), vec![true, true, false]);

    dispatch(&mut document, &store, headings[1], EventKind::Click);
    assert_eq!(blocks(&document), vec![true, true, true]);

    dispatch(&mut document, &store, headings[0], EventKind::Click);
    assert_eq!(blocks(&document), vec![false, false, true]);
}

#[cfg(test)]
#[test]
fn test_compound_heading_rule() {
    let mut document = html::parse(
        r#"<div class="cards"><h4 class="foldable">A</h4><p>a</p><h4>plain</h4><h4 class="foldable">B</h4><p>b</p></div>"#,
    )
    .unwrap();
    let mut store = ListenerStore::new();
    let rule = ToggleRule {
        container: ".cards".to_string(),
        heading: "h4.foldable".to_string(),
        collapsed_class: "hidden".to_string(),
        pointer_cursor: false,
    };
    assert_eq!(wire_section_toggles(&mut document, &mut store, &rule).unwrap(), 2);

    let headings = query::query_all(&document, &rule.heading_selector().unwrap());
    dispatch(&mut document, &store, headings[0], EventKind::Click);

    // the plain h4 does not match the boundary, it folds with the rest
    let folded = query::query_all(&document, &query::parse_selector(".cards *").unwrap())
        .into_iter()
        .filter(|&id| document.has_class(id, "hidden"))
        .count();
    assert_eq!(folded, 2);
}
