//! Date ranges written inside titles ("Beta Phase Jul 24 - Aug 18").

use crate::config::TimelineConfig;
use crate::dates::{to_iso, YearHeader};
use crate::geometry::{TextBox, YearSource};
use crate::patterns::DATE_RANGE_REGEX;
use crate::types::SpanRow;

/// One span per title that contains a two-sided date range.
///
/// Both ends take the year of the first year header (or the fallback year),
/// so a range that crosses New Year gets the wrong year on one end.
pub fn detect_spans(
    titles: &[&TextBox],
    headers: &[YearHeader],
    fallback_year: i32,
    source: &str,
    slide_number: usize,
    config: &TimelineConfig,
) -> Vec<SpanRow> {
    let year_source = match headers.first() {
        Some(header) => YearSource::Header(header.year),
        None => YearSource::Fallback(fallback_year),
    };

    titles
        .iter()
        .filter_map(|t| {
            let caps = DATE_RANGE_REGEX.captures(&t.text)?;
            let left = caps.name("left")?.as_str();
            let right = caps.name("right")?.as_str();
            Some(SpanRow {
                slide: slide_number,
                title: t.text.trim().to_string(),
                start_iso: to_iso(left, year_source.year()),
                end_iso: to_iso(right, year_source.year()),
                start_raw: Some(left.to_string()),
                end_raw: Some(right.to_string()),
                raw_range: caps.get(0).map(|m| m.as_str().to_string()),
                year_source: Some(year_source),
                title_bbox: t.bbox,
                confidence: config.span_confidence,
                source: source.to_string(),
            })
        })
        .collect()
}
