use css::{Selector, SimpleSelector, Stylesheet};
use html::{Document, NodeId};
use once_cell::sync::Lazy;
use tracing::{debug, span, Level};

use crate::error::Result;
use crate::events::{self, EventKind, ListenerStore};
use crate::query;
use crate::render::RenderResult;
use crate::toggle::{self, ToggleRule};

static PANE_STYLESHEET: &str = include_str!("../resources/pane.css");

/// Parsed form of the built-in pane stylesheet. Parsing it up front
/// means a broken resource fails the first render instead of shipping
/// silently.
pub static PANE_CSS: Lazy<Stylesheet> = Lazy::new(|| {
    css::stylesheet(PANE_STYLESHEET)
        .expect("built-in pane stylesheet parses")
        .1
});

/// A rendered pane held as a live element tree, with the fold wiring
/// attached. The facade the CLI and tests drive everything through:
/// parse, wire, click, serialize.
pub struct PaneView {
    document: Document,
    listeners: ListenerStore,
}

impl PaneView {
    /// Parses pane markup into a view. No listeners are wired yet.
    pub fn from_markup(markup: &str) -> Result<Self> {
        let span = span!(Level::DEBUG, "Parsing pane markup");
        let _enter = span.enter();
        let document = html::parse(markup)?;
        Ok(Self {
            document,
            listeners: ListenerStore::new(),
        })
    }

    /// Builds a view from a renderer's output, right pane included.
    pub fn from_render_result(result: &RenderResult) -> Result<Self> {
        match &result.right_markup {
            Some(right) => {
                let combined = format!("{}{right}", result.middle_markup);
                Self::from_markup(&combined)
            }
            None => Self::from_markup(&result.middle_markup),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn listeners(&self) -> &ListenerStore {
        &self.listeners
    }

    /// Wires the default fold rule. Returns the number of wired
    /// headings.
    pub fn wire_section_toggles(&mut self) -> Result<usize> {
        self.wire_with_rule(&ToggleRule::default())
    }

    pub fn wire_with_rule(&mut self, rule: &ToggleRule) -> Result<usize> {
        toggle::wire_section_toggles(&mut self.document, &mut self.listeners, rule)
    }

    /// Dispatches a click to every element the selector matches, in
    /// document order. Returns the number of listener actions run;
    /// selectors matching nothing, or only unwired elements, run zero.
    pub fn click(&mut self, selector: &str) -> Result<usize> {
        let selector = query::parse_selector(selector)?;
        let targets = query::query_all(&self.document, &selector);
        let mut ran = 0;
        for target in targets {
            ran += events::dispatch(
                &mut self.document,
                &self.listeners,
                target,
                EventKind::Click,
            );
        }
        debug!(actions = ran, "dispatched click");
        Ok(ran)
    }

    pub fn click_node(&mut self, target: NodeId) -> usize {
        events::dispatch(&mut self.document, &self.listeners, target, EventKind::Click)
    }

    pub fn collapsed(&self, id: NodeId) -> bool {
        self.document
            .has_class(id, toggle::COLLAPSED_CLASS)
    }

    /// The pane fragment as markup, current class state included.
    pub fn markup(&self) -> String {
        self.document.to_markup()
    }

    /// The pane wrapped in a standalone page shell with the built-in
    /// stylesheet inlined, which is what the CLI writes out.
    pub fn page_markup(&self, title: &str) -> String {
        // force the parse so a bad resource cannot reach the output
        let _ = &*PANE_CSS;
        format!(
            "<!DOCTYPE html>\n<html lang=\"de\"><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>{}</body></html>",
            html::escape_text(title),
            PANE_STYLESHEET,
            self.markup(),
        )
    }
}

/// The `display` value the pane stylesheet assigns to the collapsed
/// class, if any.
pub fn collapsed_display(stylesheet: &Stylesheet) -> Option<&css::Value> {
    let collapsed = SimpleSelector::Class(toggle::COLLAPSED_CLASS.to_string());
    stylesheet
        .rules
        .iter()
        .find(|rule| {
            rule.selectors
                .iter()
                .any(|selector| matches!(selector, Selector::Simple(simple) if *simple == collapsed))
        })
        .and_then(|rule| rule.declaration("display"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{Card, CardSection, FeedbackDocument};
    use crate::render::{FeedbackPaneRenderer, PaneRenderer, RenderContext};

    fn heading_ids(view: &PaneView) -> Vec<NodeId> {
        let selector = query::parse_selector(".feedback-content h3").unwrap();
        query::query_all(view.document(), &selector)
    }

    #[test]
    fn test_spec_example_shape() {
        // h3, p, p, h3, p: the first click folds exactly the two
        // blocks before the second heading
        let mut view = PaneView::from_markup(
            r#"<div class="feedback-content"><h3>A</h3><p>eins</p><p>zwei</p><h3>B</h3><p>drei</p></div>"#,
        )
        .unwrap();
        assert_eq!(view.wire_section_toggles().unwrap(), 2);

        let headings = heading_ids(&view);
        let paragraphs = query::query_all(
            view.document(),
            &query::parse_selector(".feedback-content p").unwrap(),
        );

        assert_eq!(view.click_node(headings[0]), 1);
        assert!(view.collapsed(paragraphs[0]));
        assert!(view.collapsed(paragraphs[1]));
        assert!(!view.collapsed(paragraphs[2]));

        assert_eq!(view.click_node(headings[0]), 1);
        assert!(!view.collapsed(paragraphs[0]));
        assert!(!view.collapsed(paragraphs[1]));
        assert!(!view.collapsed(paragraphs[2]));
    }

    #[test]
    fn test_click_by_selector_hits_every_match() {
        let mut view = PaneView::from_markup(
            r#"<div class="feedback-content"><h3>A</h3><p>a</p><h3>B</h3><p>b</p></div>"#,
        )
        .unwrap();
        view.wire_section_toggles().unwrap();

        assert_eq!(view.click(".feedback-content h3").unwrap(), 2);
        let markup = view.markup();
        assert_eq!(markup.matches("collapsed").count(), 2);
    }

    #[test]
    fn test_click_without_wiring_runs_nothing() {
        let mut view = PaneView::from_markup(
            r#"<div class="feedback-content"><h3>A</h3><p>a</p></div>"#,
        )
        .unwrap();
        let before = view.markup();
        assert_eq!(view.click("h3").unwrap(), 0);
        assert_eq!(view.markup(), before);
    }

    #[test]
    fn test_click_rejects_bad_selector() {
        let mut view = PaneView::from_markup("<p>x</p>").unwrap();
        assert!(view.click("h3,").is_err());
    }

    #[test]
    fn test_rendered_document_wires_one_listener_per_section() {
        let feedback = FeedbackDocument {
            document_id: "1".to_string(),
            document_title: "Titel".to_string(),
            user_hash: "abc".to_string(),
            assessment_phase: String::new(),
            assessment_name: String::new(),
            overview: Default::default(),
            engagement: Default::default(),
            top_urls: Vec::new(),
            processing_time: Default::default(),
            sections: vec![
                CardSection {
                    name: "Eins".to_string(),
                    cards: vec![Card::text("A", "", "<p>a</p>")],
                },
                CardSection {
                    name: "Zwei".to_string(),
                    cards: vec![Card::text("B", "", "<p>b</p>")],
                },
            ],
        };
        let context = RenderContext::new().with_payload(feedback);
        let result = FeedbackPaneRenderer.render(&context).unwrap();

        let mut view = PaneView::from_render_result(&result).unwrap();
        assert_eq!(view.wire_section_toggles().unwrap(), 2);
        assert_eq!(view.listeners().len(), 2);
    }

    #[test]
    fn test_page_markup_reparses() {
        let mut view = PaneView::from_markup(
            r#"<div class="feedback-content"><h3>A</h3><p>a</p></div>"#,
        )
        .unwrap();
        view.wire_section_toggles().unwrap();
        view.click(".feedback-content h3").unwrap();

        let page = view.page_markup("Bericht & Co");
        assert!(page.contains("<title>Bericht &amp; Co</title>"));
        assert!(page.contains(r#"<p class="collapsed">a</p>"#));

        // the shell itself stays parseable by the crate's own parser
        let reparsed = html::parse(&page).unwrap();
        let collapsed = query::query_all(
            &reparsed,
            &query::parse_selector(".collapsed").unwrap(),
        );
        assert_eq!(collapsed.len(), 1);
    }

    #[test]
    fn test_builtin_stylesheet_hides_collapsed_blocks() {
        let display = collapsed_display(&PANE_CSS).expect("collapsed rule present");
        assert!(display.is_keyword("none"));
    }
}
