use std::collections::HashMap;

use css::Selector;
use html::{Document, NodeId};
use tracing::{debug, trace};

use crate::query;

/// Events the pane understands. Only clicks today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
}

/// What a listener does when its event arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Toggle `class_name` on every following element sibling of the
    /// target until one matches `boundary`, exclusive.
    ToggleSectionBlocks {
        boundary: Selector,
        class_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event: EventKind,
    pub action: Action,
}

/// Listeners keyed by target node, run in registration order.
#[derive(Debug, Clone, Default)]
pub struct ListenerStore {
    listeners: HashMap<NodeId, Vec<Listener>>,
}

impl ListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: NodeId, listener: Listener) {
        self.listeners.entry(target).or_default().push(listener);
    }

    pub fn actions_for(&self, target: NodeId, event: EventKind) -> Vec<Action> {
        self.listeners
            .get(&target)
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|l| l.event == event)
                    .map(|l| l.action.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Deliver an event to a target node, running every matching listener.
/// Returns the number of actions run. Targets without listeners are a
/// no-op, not an error.
pub fn dispatch(
    document: &mut Document,
    store: &ListenerStore,
    target: NodeId,
    event: EventKind,
) -> usize {
    let actions = store.actions_for(target, event);
    if actions.is_empty() {
        trace!(?target, ?event, "no listeners for event");
        return 0;
    }
    for action in &actions {
        run_action(document, target, action);
    }
    actions.len()
}

fn run_action(document: &mut Document, target: NodeId, action: &Action) {
    match action {
        Action::ToggleSectionBlocks {
            boundary,
            class_name,
        } => {
            let toggled = toggle_section_blocks(document, target, boundary, class_name);
            debug!(blocks = toggled, class = %class_name, "toggled section blocks");
        }
    }
}

/// Walk the following element siblings of `start`, toggling
/// `class_name` on each until the boundary selector matches. The
/// boundary element itself is left alone. Returns how many siblings
/// were toggled.
pub fn toggle_section_blocks(
    document: &mut Document,
    start: NodeId,
    boundary: &Selector,
    class_name: &str,
) -> usize {
    let mut toggled = 0;
    let mut next = document.next_element_sibling(start);
    while let Some(id) = next {
        if query::matches(document, id, boundary) {
            break;
        }
        document.toggle_class(id, class_name);
        toggled += 1;
        next = document.next_element_sibling(id);
    }
    toggled
}

#[cfg(test)]
fn toggle_listener() -> Listener {
    Listener {
        event: EventKind::Click,
        action: Action::ToggleSectionBlocks {
            boundary: css::selector("h3").unwrap().1,
            class_name: "collapsed".to_string(),
        },
    }
}

#[cfg(test)]
fn section_fixture() -> (Document, Vec<NodeId>) {
    let document =
        html::parse("<div><h3>A</h3><p>eins</p><p>zwei</p><h3>B</h3><p>drei</p></div>").unwrap();
    let div = document.children(document.root())[0];
    let blocks = document.children(div).to_vec();
    (document, blocks)
}

#[cfg(test)]
#[test]
fn test_dispatch_toggles_until_next_heading() {
    let (mut document, blocks) = section_fixture();
    let mut store = ListenerStore::new();
    store.add(blocks[0], toggle_listener());

    let ran = dispatch(&mut document, &store, blocks[0], EventKind::Click);
    assert_eq!(ran, 1);
    assert!(document.has_class(blocks[1], "collapsed"));
    assert!(document.has_class(blocks[2], "collapsed"));
    assert!(!document.has_class(blocks[3], "collapsed"));
    assert!(!document.has_class(blocks[4], "collapsed"));
}

#[cfg(test)]
#[test]
fn test_dispatch_twice_restores_classes() {
    let (mut document, blocks) = section_fixture();
    let mut store = ListenerStore::new();
    store.add(blocks[0], toggle_listener());
    let before = document.to_markup();

    dispatch(&mut document, &store, blocks[0], EventKind::Click);
    dispatch(&mut document, &store, blocks[0], EventKind::Click);
    assert_eq!(document.to_markup(), before);
}

#[cfg(test)]
#[test]
fn test_dispatch_without_listeners_is_noop() {
    let (mut document, blocks) = section_fixture();
    let store = ListenerStore::new();
    let before = document.to_markup();

    assert_eq!(dispatch(&mut document, &store, blocks[1], EventKind::Click), 0);
    assert_eq!(document.to_markup(), before);
}

#[cfg(test)]
#[test]
fn test_last_section_toggles_to_the_end() {
    let (mut document, blocks) = section_fixture();
    let mut store = ListenerStore::new();
    store.add(blocks[3], toggle_listener());

    dispatch(&mut document, &store, blocks[3], EventKind::Click);
    assert!(document.has_class(blocks[4], "collapsed"));
    assert!(!document.has_class(blocks[1], "collapsed"));
    assert!(!document.has_class(blocks[2], "collapsed"));
}

#[cfg(test)]
#[test]
fn test_toggle_skips_text_but_counts_elements() {
    let mut document =
        html::parse("<div><h3>A</h3>zwischen<p>eins</p>und<h4>auch</h4><h3>B</h3></div>").unwrap();
    let div = document.children(document.root())[0];
    let h3 = document.children(div)[0];
    let boundary = css::selector("h3").unwrap().1;

    let toggled = toggle_section_blocks(&mut document, h3, &boundary, "collapsed");
    // the h4 is not a boundary, it gets toggled like any other block
    assert_eq!(toggled, 2);

    let elements = document.children(div).to_vec();
    let h4 = elements
        .iter()
        .copied()
        .find(|&id| document.tag_name(id) == Some("h4"))
        .unwrap();
    assert!(document.has_class(h4, "collapsed"));
    assert_eq!(document.text_content(div), "AzwischeneinsundauchB");
}

#[cfg(test)]
#[test]
fn test_toggle_with_no_following_siblings() {
    let mut document = html::parse("<div><h3>allein</h3></div>").unwrap();
    let div = document.children(document.root())[0];
    let h3 = document.children(div)[0];
    let boundary = css::selector("h3").unwrap().1;

    assert_eq!(toggle_section_blocks(&mut document, h3, &boundary, "collapsed"), 0);
}

#[cfg(test)]
#[test]
fn test_listener_store_counts() {
    let (document, blocks) = section_fixture();
    let _ = document;
    let mut store = ListenerStore::new();
    assert!(store.is_empty());

    store.add(blocks[0], toggle_listener());
    store.add(blocks[3], toggle_listener());
    store.add(blocks[3], toggle_listener());
    assert_eq!(store.len(), 3);
    assert_eq!(store.actions_for(blocks[3], EventKind::Click).len(), 2);
    assert!(store.actions_for(blocks[1], EventKind::Click).is_empty());
}
