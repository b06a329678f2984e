use std::any::{Any, TypeId};
use std::collections::HashMap;

use html::{escape_attr, escape_text};
use tracing::debug;

use crate::error::{FoldpaneError, Result};
use crate::feedback::{format_de, Card, ChartSpec, FeedbackDocument, Metric};

/// A strategy that knows how to fill the middle (and optionally right)
/// pane for one render mode.
pub trait PaneRenderer {
    fn render(&self, context: &RenderContext) -> Result<RenderResult>;
}

/// Everything a renderer might need. Callers attach payloads keyed by
/// their type, so new data never bloats the signature.
#[derive(Default)]
pub struct RenderContext {
    payloads: HashMap<TypeId, Box<dyn Any>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload<T: Any>(mut self, payload: T) -> Self {
        self.payloads.insert(TypeId::of::<T>(), Box::new(payload));
        self
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payloads
            .get(&TypeId::of::<T>())
            .and_then(|payload| payload.downcast_ref())
    }

    pub fn require_payload<T: Any>(&self) -> Result<&T> {
        self.payload()
            .ok_or(FoldpaneError::MissingPayload(std::any::type_name::<T>()))
    }
}

/// Markup produced by a renderer, one fragment per pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub middle_markup: String,
    pub right_markup: Option<String>,
}

impl RenderResult {
    pub fn middle_only(markup: impl Into<String>) -> Self {
        RenderResult {
            middle_markup: markup.into(),
            right_markup: None,
        }
    }

    pub fn with_right_pane(mut self, markup: impl Into<String>) -> Self {
        self.right_markup = Some(markup.into());
        self
    }

    pub fn has_right_pane(&self) -> bool {
        self.right_markup.is_some()
    }
}

/// Writes well-formed fragments. Everything is escaped on the way in
/// except `raw`, which is reserved for fragments the mapper produced.
#[derive(Default)]
struct MarkupWriter {
    out: String,
}

impl MarkupWriter {
    fn open(&mut self, tag: &str) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn open_with(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attributes {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn text(&mut self, text: &str) {
        self.out.push_str(&escape_text(text));
    }

    fn raw(&mut self, markup: &str) {
        self.out.push_str(markup);
    }

    fn element(&mut self, tag: &str, text: &str) {
        self.open(tag);
        self.text(text);
        self.close(tag);
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Renders the dedicated feedback view of a reader document.
pub struct FeedbackPaneRenderer;

impl FeedbackPaneRenderer {
    pub const HANDLER_KEY: &'static str = "document_reader_feedback_view";
}

impl PaneRenderer for FeedbackPaneRenderer {
    fn render(&self, context: &RenderContext) -> Result<RenderResult> {
        let feedback = context.require_payload::<FeedbackDocument>()?;
        let mut w = MarkupWriter::default();

        w.open_with("section", &[("class", "feedback-pane")]);
        write_header(&mut w, feedback);
        write_overview(&mut w, feedback);
        write_content(&mut w, feedback);
        w.close("section");

        debug!(
            id = %feedback.document_id,
            sections = feedback.sections.len(),
            "rendered feedback pane"
        );
        Ok(RenderResult::middle_only(w.finish()))
    }
}

fn write_header(w: &mut MarkupWriter, feedback: &FeedbackDocument) {
    w.open_with("header", &[("class", "pane-header")]);
    w.element("h1", &feedback.document_title);
    if !feedback.assessment_phase.is_empty() || !feedback.assessment_name.is_empty() {
        w.open_with("p", &[("class", "subtitle")]);
        w.text(&format!(
            "{} • {}",
            feedback.assessment_phase, feedback.assessment_name
        ));
        w.close("p");
    }
    w.open_with("ul", &[("class", "meta-badges")]);
    write_badge(
        w,
        "Teilnehmer",
        &feedback.overview.participant_count.to_string(),
    );
    write_badge(w, "Dokument", &feedback.document_id);
    write_badge(w, "User-Hash", &feedback.user_hash);
    w.close("ul");
    w.close("header");
}

fn write_badge(w: &mut MarkupWriter, label: &str, value: &str) {
    w.open_with("li", &[("class", "badge")]);
    w.open_with("span", &[("class", "label")]);
    w.text(label);
    w.close("span");
    w.open_with("span", &[("class", "value")]);
    w.text(value);
    w.close("span");
    w.close("li");
}

fn write_overview(w: &mut MarkupWriter, feedback: &FeedbackDocument) {
    w.open_with("section", &[("class", "pane-overview")]);
    write_metric_card(w, "Seiten gesamt", &feedback.engagement.pages_total);
    write_metric_card(w, "Seiten einzigartig", &feedback.engagement.pages_unique);
    write_metric_card(w, "Bearbeitungszeit", &feedback.processing_time.duration);
    if !feedback.engagement.highlights.is_empty() {
        w.open_with("ul", &[("class", "highlights")]);
        for highlight in &feedback.engagement.highlights {
            w.element("li", highlight);
        }
        w.close("ul");
    }
    if !feedback.top_urls.is_empty() {
        w.open_with("ol", &[("class", "top-urls")]);
        for usage in &feedback.top_urls {
            w.open("li");
            w.open_with("a", &[("href", &usage.url)]);
            w.text(&usage.url);
            w.close("a");
            w.close("li");
        }
        w.close("ol");
    }
    w.close("section");
}

fn write_metric_card(w: &mut MarkupWriter, title: &str, metric: &Metric) {
    w.open_with("div", &[("class", "card metric-card")]);
    w.element("h4", title);
    w.open("dl");
    write_metric_row(w, "Ihr Wert", format_de(metric.user_value, 0));
    write_metric_row(w, "Min", format_de(metric.min, 1));
    write_metric_row(w, "Max", format_de(metric.max, 1));
    write_metric_row(w, "Mittelwert", format_de(metric.mean, 2));
    write_metric_row(w, "Standardabweichung", format_de(metric.std_dev, 2));
    write_metric_row(w, "Δ", format!("{}%", format_de(metric.diff_percent, 2)));
    w.close("dl");
    w.close("div");
}

fn write_metric_row(w: &mut MarkupWriter, label: &str, value: String) {
    w.element("dt", label);
    w.element("dd", &value);
}

/// The collapsible content area. Section headings and their cards are
/// siblings within one flat container, which is what the click wiring
/// walks over.
fn write_content(w: &mut MarkupWriter, feedback: &FeedbackDocument) {
    w.open_with("div", &[("class", "feedback-content")]);
    for section in &feedback.sections {
        w.element("h3", &section.name);
        for card in &section.cards {
            write_card(w, card);
        }
    }
    w.close("div");
}

fn write_card(w: &mut MarkupWriter, card: &Card) {
    match card {
        Card::Text {
            title,
            subtitle,
            body,
        } => {
            w.open_with("div", &[("class", "card text-card")]);
            write_card_heading(w, title, subtitle);
            w.raw(body);
            w.close("div");
        }
        Card::Chart {
            title,
            subtitle,
            spec,
        } => write_chart_card(w, title, subtitle, spec),
        Card::Table {
            title,
            subtitle,
            rows,
        } => {
            w.open_with("div", &[("class", "card table-card")]);
            write_card_heading(w, title, subtitle);
            w.open("table");
            for row in rows {
                w.open("tr");
                for cell in &row.cells {
                    w.element("td", cell);
                }
                w.close("tr");
            }
            w.close("table");
            w.close("div");
        }
    }
}

fn write_card_heading(w: &mut MarkupWriter, title: &str, subtitle: &str) {
    w.element("h4", title);
    if !subtitle.is_empty() {
        w.open_with("p", &[("class", "subtitle")]);
        w.text(subtitle);
        w.close("p");
    }
}

fn write_chart_card(w: &mut MarkupWriter, title: &str, subtitle: &str, spec: &ChartSpec) {
    w.open_with("div", &[("class", "card chart-card")]);
    write_card_heading(w, title, subtitle);
    if spec.kind == "image" {
        for label in &spec.labels {
            w.open_with("img", &[("src", label), ("alt", title)]);
        }
    } else {
        let series = spec
            .series
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        w.open_with(
            "figure",
            &[
                ("class", "chart"),
                ("data-chart-type", &spec.kind),
                ("data-series", &series),
                ("data-labels", &spec.labels.join(",")),
            ],
        );
        w.open("ul");
        for (label, value) in spec.labels.iter().zip(&spec.series) {
            w.open("li");
            w.text(&format!("{label}: {}", format_de(*value, 2)));
            w.close("li");
        }
        w.close("ul");
        w.close("figure");
    }
    w.close("div");
}

/// Plain reading view for the legacy document mode. No collapsible
/// container, so toggle wiring finds nothing to attach to.
pub struct DefaultPaneRenderer;

impl DefaultPaneRenderer {
    pub const HANDLER_KEY: &'static str = "document_reader_pdf_view";
}

impl PaneRenderer for DefaultPaneRenderer {
    fn render(&self, context: &RenderContext) -> Result<RenderResult> {
        let feedback = context.require_payload::<FeedbackDocument>()?;
        let mut w = MarkupWriter::default();

        w.open_with("article", &[("class", "document-pane")]);
        w.element("h1", &feedback.document_title);
        w.open_with("p", &[("class", "meta")]);
        w.text(&format!(
            "Dokument {} • User {}",
            feedback.document_id, feedback.user_hash
        ));
        w.close("p");
        for section in &feedback.sections {
            w.element("h3", &section.name);
            for card in &section.cards {
                w.element("h4", card.title());
                if let Card::Text { body, .. } = card {
                    w.raw(body);
                }
            }
        }
        w.close("article");

        Ok(RenderResult::middle_only(w.finish()))
    }
}

#[cfg(test)]
use crate::feedback::{CardSection, Engagement, Overview, ProcessingTime, TableRow, UrlUsage};
#[cfg(test)]
use crate::query;

#[cfg(test)]
fn sample_document() -> FeedbackDocument {
    FeedbackDocument {
        document_id: "doc-7".to_string(),
        document_title: "Lesebericht: Q&A".to_string(),
        user_hash: "ab12cd".to_string(),
        assessment_phase: "Phase 2".to_string(),
        assessment_name: "Lesestudie".to_string(),
        overview: Overview {
            participant_count: 31,
            pages: Metric {
                user_value: 12.0,
                diff_percent: -17.2,
                ..Metric::default()
            },
            unique_pages: Metric::default(),
        },
        engagement: Engagement {
            pages_total: Metric {
                user_value: 12.0,
                diff_percent: -17.2,
                ..Metric::default()
            },
            pages_unique: Metric::default(),
            highlights: vec!["Gesamtseiten: 12 (Δ -17,20%)".to_string()],
        },
        top_urls: vec![UrlUsage {
            url: "https://reader.example.org/kapitel/1".to_string(),
            hits: 1,
        }],
        processing_time: ProcessingTime::default(),
        sections: vec![
            CardSection {
                name: "Zusammenfassung".to_string(),
                cards: vec![Card::text(
                    "Seitenaufrufe",
                    "",
                    "<p>Sie haben <strong>12</strong> Seiten besucht.</p>",
                )],
            },
            CardSection {
                name: "Details".to_string(),
                cards: vec![
                    Card::chart(
                        "Verlauf",
                        "pro Tag",
                        ChartSpec {
                            kind: "bar".to_string(),
                            series: vec![3.0, 9.0],
                            labels: vec!["Mo".to_string(), "Di".to_string()],
                        },
                    ),
                    Card::table(
                        "Rohdaten",
                        "",
                        vec![TableRow {
                            cells: vec!["Seite 1".to_string(), "4".to_string()],
                        }],
                    ),
                ],
            },
        ],
    }
}

#[cfg(test)]
fn render_feedback() -> html::Document {
    let context = RenderContext::new().with_payload(sample_document());
    let result = FeedbackPaneRenderer
        .render(&context)
        .expect("renders sample document");
    assert!(!result.has_right_pane());
    html::parse(&result.middle_markup).expect("renderer output parses")
}

#[cfg(test)]
fn count(document: &html::Document, selector: &str) -> usize {
    let selector = query::parse_selector(selector).expect("valid selector");
    query::query_all(document, &selector).len()
}

#[cfg(test)]
#[test]
fn test_feedback_pane_structure() {
    let document = render_feedback();
    assert_eq!(count(&document, ".feedback-pane"), 1);
    assert_eq!(count(&document, ".pane-header .badge"), 3);
    assert_eq!(count(&document, ".pane-overview .metric-card"), 3);
    assert_eq!(count(&document, ".feedback-content"), 1);
    assert_eq!(count(&document, ".feedback-content h3"), 2);
    assert_eq!(count(&document, ".feedback-content .card"), 3);
}

#[cfg(test)]
#[test]
fn test_headings_and_cards_are_siblings() {
    let document = render_feedback();
    let heading = query::parse_selector(".feedback-content h3").expect("valid selector");
    let first = query::query_first(&document, &heading).expect("heading rendered");
    let card = document
        .next_element_sibling(first)
        .expect("card follows heading");
    assert_eq!(document.attr(card, "class"), Some("card text-card"));
}

#[cfg(test)]
#[test]
fn test_titles_are_escaped_and_bodies_verbatim() {
    let document = render_feedback();
    let markup = document.to_markup();
    assert!(markup.contains("<h1>Lesebericht: Q&amp;A</h1>"));
    assert!(markup.contains("<p>Sie haben <strong>12</strong> Seiten besucht.</p>"));
}

#[cfg(test)]
#[test]
fn test_chart_and_table_cards() {
    let document = render_feedback();
    let figure = query::parse_selector("figure.chart").expect("valid selector");
    let figure = query::query_first(&document, &figure).expect("figure rendered");
    assert_eq!(document.attr(figure, "data-chart-type"), Some("bar"));
    assert_eq!(document.attr(figure, "data-series"), Some("3,9"));
    assert_eq!(document.attr(figure, "data-labels"), Some("Mo,Di"));
    assert_eq!(count(&document, ".table-card td"), 2);
}

#[cfg(test)]
#[test]
fn test_image_chart_becomes_img() {
    let mut feedback = sample_document();
    feedback.sections[1].cards = vec![Card::chart(
        "Visualisierung 1",
        "",
        ChartSpec {
            kind: "image".to_string(),
            series: Vec::new(),
            labels: vec!["data:image/png;base64,aGFsbG8=".to_string()],
        },
    )];
    let context = RenderContext::new().with_payload(feedback);
    let result = FeedbackPaneRenderer.render(&context).expect("renders");
    let document = html::parse(&result.middle_markup).expect("parses");

    let img = query::parse_selector(".chart-card img").expect("valid selector");
    let img = query::query_first(&document, &img).expect("img rendered");
    assert_eq!(
        document.attr(img, "src"),
        Some("data:image/png;base64,aGFsbG8=")
    );
    assert_eq!(document.attr(img, "alt"), Some("Visualisierung 1"));
}

#[cfg(test)]
#[test]
fn test_output_reparses_unchanged() {
    let context = RenderContext::new().with_payload(sample_document());
    let result = FeedbackPaneRenderer.render(&context).expect("renders");
    let document = html::parse(&result.middle_markup).expect("parses");
    assert_eq!(document.to_markup(), result.middle_markup);
}

#[cfg(test)]
#[test]
fn test_missing_payload() {
    let err = FeedbackPaneRenderer
        .render(&RenderContext::new())
        .expect_err("payload is required");
    assert!(matches!(err, FoldpaneError::MissingPayload(_)));
}

#[cfg(test)]
#[test]
fn test_payload_lookup_is_typed() {
    let context = RenderContext::new().with_payload(sample_document());
    assert!(context.payload::<FeedbackDocument>().is_some());
    assert!(context.payload::<String>().is_none());
}

#[cfg(test)]
#[test]
fn test_default_renderer_has_no_collapsible_container() {
    let context = RenderContext::new().with_payload(sample_document());
    let result = DefaultPaneRenderer.render(&context).expect("renders");
    let document = html::parse(&result.middle_markup).expect("parses");
    assert_eq!(count(&document, ".document-pane"), 1);
    assert_eq!(count(&document, ".feedback-content"), 0);
    assert_eq!(count(&document, "h3"), 2);
}
