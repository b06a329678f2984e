use serde::{Deserialize, Serialize};

/// Presentation-friendly view of one assessment feedback document.
/// Renderers consume this shape and never touch the raw reader export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackDocument {
    pub document_id: String,
    pub document_title: String,
    pub user_hash: String,
    #[serde(default)]
    pub assessment_phase: String,
    #[serde(default)]
    pub assessment_name: String,
    #[serde(default)]
    pub overview: Overview,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub top_urls: Vec<UrlUsage>,
    #[serde(default)]
    pub processing_time: ProcessingTime,
    #[serde(default)]
    pub sections: Vec<CardSection>,
}

/// One statistic about the reader, compared against the cohort.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub user_value: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub diff_percent: f64,
}

/// Number formatting as the German reports print it, with a comma as
/// the decimal separator.
pub(crate) fn format_de(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}").replace('.', ",")
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Overview {
    pub participant_count: u32,
    pub pages: Metric,
    pub unique_pages: Metric,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Engagement {
    pub pages_total: Metric,
    pub pages_unique: Metric,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlUsage {
    pub url: String,
    pub hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingTime {
    pub duration: Metric,
    pub diff_percent: f64,
}

/// A named group of cards rendered under one collapsible heading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSection {
    pub name: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Card {
    Text {
        title: String,
        #[serde(default)]
        subtitle: String,
        /// Markup fragment, inserted verbatim by the renderer.
        body: String,
    },
    Chart {
        title: String,
        #[serde(default)]
        subtitle: String,
        spec: ChartSpec,
    },
    Table {
        title: String,
        #[serde(default)]
        subtitle: String,
        rows: Vec<TableRow>,
    },
}

impl Default for Card {
    fn default() -> Self {
        Card::Text {
            title: String::new(),
            subtitle: String::new(),
            body: String::new(),
        }
    }
}

impl Card {
    pub fn text(title: impl Into<String>, subtitle: impl Into<String>, body: impl Into<String>) -> Self {
        Card::Text {
            title: title.into(),
            subtitle: subtitle.into(),
            body: body.into(),
        }
    }

    pub fn chart(title: impl Into<String>, subtitle: impl Into<String>, spec: ChartSpec) -> Self {
        Card::Chart {
            title: title.into(),
            subtitle: subtitle.into(),
            spec,
        }
    }

    pub fn table(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        rows: Vec<TableRow>,
    ) -> Self {
        Card::Table {
            title: title.into(),
            subtitle: subtitle.into(),
            rows,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Card::Text { title, .. } | Card::Chart { title, .. } | Card::Table { title, .. } => {
                title
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub series: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRow {
    pub cells: Vec<String>,
}

#[cfg(test)]
#[test]
fn test_minimal_document_deserializes_with_defaults() {
    let raw = r#"{
        "document_id": "42",
        "document_title": "Studie 7",
        "user_hash": "ab12cd"
    }"#;
    let document: FeedbackDocument = serde_json::from_str(raw).unwrap();
    assert_eq!(document.document_id, "42");
    assert_eq!(document.assessment_phase, "");
    assert_eq!(document.overview.participant_count, 0);
    assert!(document.sections.is_empty());
}

#[cfg(test)]
#[test]
fn test_identity_fields_are_required() {
    let raw = r#"{ "document_id": "42", "document_title": "Studie 7" }"#;
    assert!(serde_json::from_str::<FeedbackDocument>(raw).is_err());
}

#[cfg(test)]
#[test]
fn test_card_tags() {
    let raw = r#"[
        { "type": "text", "title": "T", "body": "<p>x</p>" },
        { "type": "chart", "title": "C", "spec": { "type": "bar", "series": [1.0, 2.5], "labels": ["a", "b"] } },
        { "type": "table", "title": "R", "rows": [ { "cells": ["1", "2"] } ] }
    ]"#;
    let cards: Vec<Card> = serde_json::from_str(raw).unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0], Card::text("T", "", "<p>x</p>"));
    match &cards[1] {
        Card::Chart { spec, .. } => {
            assert_eq!(spec.kind, "bar");
            assert_eq!(spec.series, vec![1.0, 2.5]);
        }
        other => panic!("expected chart card, got {other:?}"),
    }
    assert_eq!(cards[2].title(), "R");
}

#[cfg(test)]
#[test]
fn test_document_round_trip() {
    let document = FeedbackDocument {
        document_id: "7".to_string(),
        document_title: "Bericht".to_string(),
        user_hash: "ffee".to_string(),
        assessment_phase: "Phase 2".to_string(),
        assessment_name: "Lesestudie".to_string(),
        overview: Overview {
            participant_count: 31,
            pages: Metric {
                user_value: 12.0,
                min: 3.0,
                max: 40.0,
                mean: 14.5,
                std_dev: 4.2,
                diff_percent: -17.2,
            },
            unique_pages: Metric::default(),
        },
        engagement: Engagement {
            pages_total: Metric::default(),
            pages_unique: Metric::default(),
            highlights: vec!["Gesamtseiten: 12".to_string()],
        },
        top_urls: vec![UrlUsage {
            url: "https://example.org/a".to_string(),
            hits: 1,
        }],
        processing_time: ProcessingTime::default(),
        sections: vec![CardSection {
            name: "Zusammenfassung".to_string(),
            cards: vec![Card::text("Seiten", "", "<p>12 Seiten</p>")],
        }],
    };
    let raw = serde_json::to_string(&document).unwrap();
    let parsed: FeedbackDocument = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, document);
}
