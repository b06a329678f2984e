use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::feedback::{
    format_de, Card, CardSection, ChartSpec, Engagement, FeedbackDocument, Metric, Overview,
    ProcessingTime, UrlUsage,
};

/// Raw reader export as it leaves the assessment pipeline. The mapper
/// only relies on metadata already shipped with the export, the full
/// text is scanned but never parsed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedbackSource {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub document_title: String,
    pub metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub images: Vec<SourceImage>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceImage {
    /// Base64 payload without the data-uri prefix.
    pub src: String,
    pub mime_type: String,
}

impl SourceImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.src)
    }
}

static TOP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*(\d+):\s*(https?://\S+)").expect("top url pattern compiles"));

static PARTICIPANT_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Anzahl\s+teilnehmender\s+Probanden:\s*(\d+)")
        .expect("participant pattern compiles")
});

/// Derive the presentation document from a raw reader export.
pub fn map_source(source: &FeedbackSource) -> FeedbackDocument {
    let pages = metric_from_metadata(
        source,
        [
            "pages_count",
            "pages_all_min",
            "pages_all_max",
            "pages_all_mean",
            "pages_all_std",
            "pages_percentage_diff",
        ],
    );
    let unique_pages = metric_from_metadata(
        source,
        [
            "pages_count_unique",
            "pages_all_min_unique",
            "pages_all_max_unique",
            "pages_all_mean_unique",
            "pages_all_std_unique",
            "pages_percentage_diff_unique",
        ],
    );
    let processing = metric_from_metadata(
        source,
        [
            "time_count",
            "time_all_min",
            "time_all_max",
            "time_all_mean",
            "time_all_std",
            "time_percentage_diff",
        ],
    );

    let document_id = if source.document_id.trim().is_empty() {
        source.id.to_string()
    } else {
        source.document_id.clone()
    };
    let document = FeedbackDocument {
        document_id,
        document_title: source.document_title.clone(),
        user_hash: metadata_value(source, "user_hash")
            .unwrap_or("unknown")
            .to_string(),
        assessment_phase: metadata_value(source, "assessment_phase_name")
            .unwrap_or_default()
            .to_string(),
        assessment_name: metadata_value(source, "assessment_name")
            .unwrap_or_default()
            .to_string(),
        overview: Overview {
            participant_count: extract_participant_count(source),
            pages,
            unique_pages,
        },
        engagement: Engagement {
            pages_total: pages,
            pages_unique: unique_pages,
            highlights: build_highlights(&pages, &unique_pages),
        },
        top_urls: extract_top_urls(source),
        processing_time: ProcessingTime {
            duration: processing,
            diff_percent: processing.diff_percent,
        },
        sections: build_sections(source),
    };
    debug!(
        id = %document.document_id,
        sections = document.sections.len(),
        urls = document.top_urls.len(),
        "mapped reader export"
    );
    document
}

/// First metadata value whose key matches, case-insensitively.
pub fn metadata_value<'a>(source: &'a FeedbackSource, key: &str) -> Option<&'a str> {
    source
        .metadata
        .iter()
        .find(|entry| entry.key.eq_ignore_ascii_case(key))
        .map(|entry| entry.value.as_str())
}

/// Metadata value parsed as a number. The exports write decimal commas,
/// both separators are accepted. A present but unparseable value reads
/// as zero.
fn metadata_number(source: &FeedbackSource, key: &str) -> Option<f64> {
    metadata_value(source, key).map(|value| value.replace(',', ".").parse().unwrap_or(0.0))
}

fn metric_from_metadata(source: &FeedbackSource, keys: [&str; 6]) -> Metric {
    let [value, min, max, mean, std, diff] = keys;
    Metric {
        user_value: metadata_number(source, value).unwrap_or(0.0),
        min: metadata_number(source, min).unwrap_or(0.0),
        max: metadata_number(source, max).unwrap_or(0.0),
        mean: metadata_number(source, mean).unwrap_or(0.0),
        std_dev: metadata_number(source, std).unwrap_or(0.0),
        diff_percent: metadata_number(source, diff).unwrap_or(0.0),
    }
}

/// Ranked url list from the full text, falling back to `url_*`
/// metadata entries when the text carries none.
fn extract_top_urls(source: &FeedbackSource) -> Vec<UrlUsage> {
    let from_text: Vec<UrlUsage> = TOP_URL
        .captures_iter(&source.full_text)
        .filter_map(|caps| {
            let hits = caps.get(1)?.as_str().parse().ok()?;
            let url = caps.get(2)?.as_str().to_string();
            Some(UrlUsage { url, hits })
        })
        .collect();
    if !from_text.is_empty() {
        return from_text;
    }
    source
        .metadata
        .iter()
        .filter(|entry| entry.key.starts_with("url_"))
        .map(|entry| UrlUsage {
            url: entry.value.clone(),
            hits: 1,
        })
        .collect()
}

fn extract_participant_count(source: &FeedbackSource) -> u32 {
    PARTICIPANT_COUNT
        .captures(&source.full_text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn build_highlights(pages: &Metric, unique_pages: &Metric) -> Vec<String> {
    vec![
        format!(
            "Gesamtseiten: {} (Δ {}%)",
            format_de(pages.user_value, 0),
            format_de(pages.diff_percent, 2)
        ),
        format!(
            "Einzigartige Seiten: {} (Δ {}%)",
            format_de(unique_pages.user_value, 0),
            format_de(unique_pages.diff_percent, 2)
        ),
    ]
}

fn build_sections(source: &FeedbackSource) -> Vec<CardSection> {
    let mut sections = vec![CardSection {
        name: "Zusammenfassung".to_string(),
        cards: build_summary_cards(source),
    }];
    let image_cards = build_image_cards(source);
    if !image_cards.is_empty() {
        sections.push(CardSection {
            name: "Visualisierungen".to_string(),
            cards: image_cards,
        });
    }
    sections
}

fn build_summary_cards(source: &FeedbackSource) -> Vec<Card> {
    let pages_summary = format!(
        "<p>Sie haben insgesamt {} Seiten besucht (Min {} / Max {} / Mittelwert {}).</p>",
        format_de(metadata_number(source, "pages_count").unwrap_or(0.0), 0),
        format_de(metadata_number(source, "pages_all_min").unwrap_or(0.0), 1),
        format_de(metadata_number(source, "pages_all_max").unwrap_or(0.0), 1),
        format_de(metadata_number(source, "pages_all_mean").unwrap_or(0.0), 2),
    );
    let time_summary = format!(
        "<p>Bearbeitungszeit: {} Minuten (Min {} / Max {} / Mittelwert {}).</p>",
        format_de(metadata_number(source, "time_count").unwrap_or(0.0), 0),
        format_de(metadata_number(source, "time_all_min").unwrap_or(0.0), 1),
        format_de(metadata_number(source, "time_all_max").unwrap_or(0.0), 1),
        format_de(metadata_number(source, "time_all_mean").unwrap_or(0.0), 2),
    );
    vec![
        Card::text("Seitenaufrufe", "", pages_summary),
        Card::text("Bearbeitungszeit", "", time_summary),
    ]
}

fn build_image_cards(source: &FeedbackSource) -> Vec<Card> {
    source
        .images
        .iter()
        .filter(|image| !image.src.is_empty() && !image.mime_type.is_empty())
        .enumerate()
        .map(|(index, image)| {
            let spec = ChartSpec {
                kind: "image".to_string(),
                series: Vec::new(),
                labels: vec![image.data_uri()],
            };
            Card::chart(format!("Visualisierung {}", index + 1), "", spec)
        })
        .collect()
}

#[cfg(test)]
fn entry(key: &str, value: &str) -> MetadataEntry {
    MetadataEntry {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
fn sample_source() -> FeedbackSource {
    FeedbackSource {
        id: 99,
        document_id: "doc-7".to_string(),
        document_title: "Lesebericht".to_string(),
        metadata: vec![
            entry("USER_HASH", "ab12cd"),
            entry("assessment_phase_name", "Phase 2"),
            entry("assessment_name", "Lesestudie"),
            entry("pages_count", "12"),
            entry("pages_all_min", "3"),
            entry("pages_all_max", "40"),
            entry("pages_all_mean", "14,5"),
            entry("pages_all_std", "4,2"),
            entry("pages_percentage_diff", "-17,2"),
            entry("pages_count_unique", "9"),
            entry("time_count", "25"),
            entry("time_all_mean", "31,75"),
        ],
        full_text: "Anzahl teilnehmender Probanden: 31\n\
                    Meistbesuchte Seiten:\n\
                    - 1: https://reader.example.org/kapitel/1\n\
                    - 2: https://reader.example.org/kapitel/4\n"
            .to_string(),
        images: vec![SourceImage {
            src: "aGFsbG8=".to_string(),
            mime_type: "image/png".to_string(),
        }],
    }
}

#[cfg(test)]
#[test]
fn test_metric_mapping_accepts_comma_decimals() {
    let document = map_source(&sample_source());
    let pages = document.overview.pages;
    assert_eq!(pages.user_value, 12.0);
    assert_eq!(pages.min, 3.0);
    assert_eq!(pages.max, 40.0);
    assert_eq!(pages.mean, 14.5);
    assert_eq!(pages.std_dev, 4.2);
    assert_eq!(pages.diff_percent, -17.2);
    // unique metrics fall back to zero where keys are absent
    assert_eq!(document.overview.unique_pages.user_value, 9.0);
    assert_eq!(document.overview.unique_pages.mean, 0.0);
}

#[cfg(test)]
#[test]
fn test_unparseable_metadata_reads_as_zero() {
    let mut source = sample_source();
    source.metadata.push(entry("time_all_min", "n/a"));
    let document = map_source(&source);
    assert_eq!(document.processing_time.duration.min, 0.0);
}

#[cfg(test)]
#[test]
fn test_identity_mapping() {
    let document = map_source(&sample_source());
    assert_eq!(document.document_id, "doc-7");
    assert_eq!(document.document_title, "Lesebericht");
    // metadata keys match case-insensitively
    assert_eq!(document.user_hash, "ab12cd");
    assert_eq!(document.assessment_phase, "Phase 2");
    assert_eq!(document.assessment_name, "Lesestudie");
}

#[cfg(test)]
#[test]
fn test_document_id_falls_back_to_numeric_id() {
    let mut source = sample_source();
    source.document_id = "  ".to_string();
    assert_eq!(map_source(&source).document_id, "99");
}

#[cfg(test)]
#[test]
fn test_user_hash_fallback() {
    let mut source = sample_source();
    source.metadata.retain(|entry| entry.key != "USER_HASH");
    assert_eq!(map_source(&source).user_hash, "unknown");
}

#[cfg(test)]
#[test]
fn test_participant_count_from_text() {
    let document = map_source(&sample_source());
    assert_eq!(document.overview.participant_count, 31);

    let mut source = sample_source();
    source.full_text = "kein Treffer".to_string();
    assert_eq!(map_source(&source).overview.participant_count, 0);
}

#[cfg(test)]
#[test]
fn test_top_urls_ranked_from_text() {
    let document = map_source(&sample_source());
    assert_eq!(
        document.top_urls,
        vec![
            UrlUsage {
                url: "https://reader.example.org/kapitel/1".to_string(),
                hits: 1,
            },
            UrlUsage {
                url: "https://reader.example.org/kapitel/4".to_string(),
                hits: 2,
            },
        ]
    );
}

#[cfg(test)]
#[test]
fn test_top_urls_fall_back_to_metadata() {
    let mut source = sample_source();
    source.full_text = String::new();
    source.metadata.push(entry("url_0", "https://example.org/x"));
    source.metadata.push(entry("url_1", "https://example.org/y"));

    let urls = map_source(&source).top_urls;
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].url, "https://example.org/x");
    assert_eq!(urls[0].hits, 1);
}

#[cfg(test)]
#[test]
fn test_highlights_use_german_formatting() {
    let document = map_source(&sample_source());
    assert_eq!(
        document.engagement.highlights,
        vec![
            "Gesamtseiten: 12 (Δ -17,20%)".to_string(),
            "Einzigartige Seiten: 9 (Δ 0,00%)".to_string(),
        ]
    );
}

#[cfg(test)]
#[test]
fn test_sections() {
    let document = map_source(&sample_source());
    assert_eq!(document.sections.len(), 2);

    let summary = &document.sections[0];
    assert_eq!(summary.name, "Zusammenfassung");
    assert_eq!(
        summary.cards[0],
        Card::text(
            "Seitenaufrufe",
            "",
            "<p>Sie haben insgesamt 12 Seiten besucht (Min 3,0 / Max 40,0 / Mittelwert 14,50).</p>",
        )
    );
    assert_eq!(
        summary.cards[1],
        Card::text(
            "Bearbeitungszeit",
            "",
            "<p>Bearbeitungszeit: 25 Minuten (Min 0,0 / Max 0,0 / Mittelwert 31,75).</p>",
        )
    );

    let visuals = &document.sections[1];
    assert_eq!(visuals.name, "Visualisierungen");
    match &visuals.cards[0] {
        Card::Chart { title, spec, .. } => {
            assert_eq!(title, "Visualisierung 1");
            assert_eq!(spec.kind, "image");
            assert_eq!(spec.labels, vec!["data:image/png;base64,aGFsbG8=".to_string()]);
        }
        other => panic!("expected chart card, got {other:?}"),
    }
}

#[cfg(test)]
#[test]
fn test_images_without_payload_are_skipped() {
    let mut source = sample_source();
    source.images.push(SourceImage {
        src: String::new(),
        mime_type: "image/png".to_string(),
    });
    let document = map_source(&source);
    assert_eq!(document.sections[1].cards.len(), 1);
}
