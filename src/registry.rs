use std::collections::HashMap;

use crate::render::{DefaultPaneRenderer, FeedbackPaneRenderer, PaneRenderer};

/// Maps handler identifiers to renderer implementations, so mode
/// dispatch stays a table lookup instead of an if/else chain.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, Box<dyn PaneRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in renderers under their handler keys.
    pub fn with_builtin_renderers() -> Self {
        RendererRegistry::new()
            .register(DefaultPaneRenderer::HANDLER_KEY, DefaultPaneRenderer)
            .register(FeedbackPaneRenderer::HANDLER_KEY, FeedbackPaneRenderer)
    }

    pub fn register(mut self, handler_key: &str, renderer: impl PaneRenderer + 'static) -> Self {
        self.renderers
            .insert(handler_key.to_string(), Box::new(renderer));
        self
    }

    pub fn renderer(&self, handler_key: &str) -> Option<&dyn PaneRenderer> {
        self.renderers.get(handler_key).map(|r| r.as_ref())
    }

    pub fn renderer_or_default<'a>(
        &'a self,
        handler_key: &str,
        fallback: &'a dyn PaneRenderer,
    ) -> &'a dyn PaneRenderer {
        self.renderer(handler_key).unwrap_or(fallback)
    }
}

/// One selectable render mode, the runtime form of a config entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderMode {
    /// Machine readable key used to pick the mode, e.g. `feedback`.
    pub key: String,
    /// Human readable label.
    pub name: String,
    /// Identifier resolved through the renderer registry.
    pub handler: String,
    pub description: Option<String>,
}

impl RenderMode {
    pub fn new(key: &str, name: &str, handler: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            handler: handler.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Modes every installation ships with.
pub fn builtin_modes() -> Vec<RenderMode> {
    vec![
        RenderMode::new("default", "Dokument", DefaultPaneRenderer::HANDLER_KEY),
        RenderMode::new("feedback", "Feedback", FeedbackPaneRenderer::HANDLER_KEY)
            .with_description("Auswertung des Leseverhaltens"),
    ]
}

pub fn find_mode<'a>(modes: &'a [RenderMode], key: &str) -> Option<&'a RenderMode> {
    modes.iter().find(|mode| mode.key == key)
}

#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::feedback::FeedbackDocument;
#[cfg(test)]
use crate::render::{RenderContext, RenderResult};

#[cfg(test)]
fn minimal_document() -> FeedbackDocument {
    FeedbackDocument {
        document_id: "doc-1".to_string(),
        document_title: "Titel".to_string(),
        user_hash: "abc".to_string(),
        assessment_phase: String::new(),
        assessment_name: String::new(),
        overview: Default::default(),
        engagement: Default::default(),
        top_urls: Vec::new(),
        processing_time: Default::default(),
        sections: Vec::new(),
    }
}

#[cfg(test)]
#[test]
fn test_builtin_renderers_registered() {
    let registry = RendererRegistry::with_builtin_renderers();
    assert!(registry.renderer(FeedbackPaneRenderer::HANDLER_KEY).is_some());
    assert!(registry.renderer(DefaultPaneRenderer::HANDLER_KEY).is_some());
    assert!(registry.renderer("nope").is_none());
}

#[cfg(test)]
#[test]
fn test_every_builtin_mode_resolves() {
    let registry = RendererRegistry::with_builtin_renderers();
    for mode in builtin_modes() {
        assert!(
            registry.renderer(&mode.handler).is_some(),
            "mode `{}` points at an unregistered handler",
            mode.key
        );
    }
}

#[cfg(test)]
#[test]
fn test_find_mode() {
    let modes = builtin_modes();
    let feedback = find_mode(&modes, "feedback").expect("feedback mode exists");
    assert_eq!(feedback.handler, FeedbackPaneRenderer::HANDLER_KEY);
    assert_eq!(feedback.name, "Feedback");
    assert!(find_mode(&modes, "nope").is_none());
}

#[cfg(test)]
#[test]
fn test_renderer_or_default_falls_back() {
    let registry = RendererRegistry::with_builtin_renderers();
    let fallback = DefaultPaneRenderer;
    let renderer = registry.renderer_or_default("nope", &fallback);
    let context = RenderContext::new().with_payload(minimal_document());
    let result = renderer.render(&context).expect("fallback renders");
    assert!(result.middle_markup.starts_with("<article"));
}

#[cfg(test)]
struct FixedRenderer(&'static str);

#[cfg(test)]
impl PaneRenderer for FixedRenderer {
    fn render(&self, _context: &RenderContext) -> Result<RenderResult> {
        Ok(RenderResult::middle_only(self.0))
    }
}

#[cfg(test)]
#[test]
fn test_custom_renderer_registration() {
    let registry =
        RendererRegistry::with_builtin_renderers().register("fixed", FixedRenderer("<p>x</p>"));
    let renderer = registry.renderer("fixed").expect("registered");
    let result = renderer.render(&RenderContext::new()).expect("renders");
    assert_eq!(result.middle_markup, "<p>x</p>");
}
