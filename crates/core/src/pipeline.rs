//! Per-slide orchestration of the detectors.

use crate::axis::{axis_from_dates, detect_axis};
use crate::config::TimelineConfig;
use crate::dates::{detect_dates, detect_inline_dates, extract_year_headers, fallback_year};
use crate::deck::{Deck, Slide};
use crate::extract::{extract_slide, SlideContent};
use crate::normalize::truncate_chars;
use crate::pairing::pair_dates_with_titles;
use crate::spans::detect_spans;
use crate::titles::detect_titles;
use crate::types::{DeckTimeline, Milestone, SlideTimeline};

/// Turns slide geometry into captions, milestones and spans.
#[derive(Debug, Clone, Default)]
pub struct TimelineExtractor {
    config: TimelineConfig,
}

impl TimelineExtractor {
    /// Create an extractor with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given thresholds.
    pub fn with_config(mut self, config: TimelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Process every slide of `deck`. Slides are independent of each other.
    pub fn extract_deck(&self, deck: &Deck) -> DeckTimeline {
        let slides = deck
            .slides
            .iter()
            .enumerate()
            .map(|(idx, slide)| {
                self.extract_slide(
                    idx + 1,
                    slide,
                    deck.slide_width,
                    deck.slide_height,
                    &deck.source,
                )
            })
            .collect();

        DeckTimeline {
            source: deck.source.clone(),
            slides,
        }
    }

    /// Process one slide (`slide_number` is 1-based).
    ///
    /// Without an axis the slide only gets a raw-text caption. With one,
    /// dates and titles are paired into milestones, titles are scanned for
    /// ranges, and the caption lists the milestones when there are any.
    pub fn extract_slide(
        &self,
        slide_number: usize,
        slide: &Slide,
        slide_width: f64,
        slide_height: f64,
        source: &str,
    ) -> SlideTimeline {
        let config = &self.config;
        let content = extract_slide(slide_number, slide, config);
        let inline = detect_inline_dates(&content.texts);

        let axis = detect_axis(&content.shapes, config)
            .or_else(|| axis_from_dates(&inline, slide_height, config));

        let Some(axis) = axis else {
            log::debug!("slide {}: no axis, caption only", slide_number);
            return SlideTimeline {
                slide: slide_number,
                axis: None,
                caption: self.raw_caption(slide_number, &content),
                milestones: Vec::new(),
                spans: Vec::new(),
            };
        };

        let headers = extract_year_headers(&content.texts, config);
        let dates = detect_dates(inline, &content.texts, &axis, &headers, slide_height, config);
        let titles = detect_titles(&content.texts, &axis, slide_height, config);

        let mut milestones =
            pair_dates_with_titles(&dates, &titles, slide_width, slide_height, config);
        for m in &mut milestones {
            m.source = source.to_string();
        }

        let spans = detect_spans(
            &titles,
            &headers,
            fallback_year(config),
            source,
            slide_number,
            config,
        );

        log::debug!(
            "slide {}: {:?} axis, {} year headers, {} dates, {} titles -> {} milestones, {} spans",
            slide_number,
            axis.source,
            headers.len(),
            dates.len(),
            titles.len(),
            milestones.len(),
            spans.len()
        );

        let caption = milestone_caption(slide_number, &milestones)
            .unwrap_or_else(|| self.raw_caption(slide_number, &content));

        SlideTimeline {
            slide: slide_number,
            axis: Some(axis),
            caption,
            milestones,
            spans,
        }
    }

    fn raw_caption(&self, slide_number: usize, content: &SlideContent) -> String {
        let raw = content.raw_text();
        format!(
            "Slide {}: {}",
            slide_number,
            truncate_chars(&raw, self.config.caption_limit)
        )
    }
}

/// "Slide <n>: Title (Jan 15); Other (Feb 2)", or `None` without milestones.
fn milestone_caption(slide_number: usize, milestones: &[Milestone]) -> Option<String> {
    let bits: Vec<String> = milestones
        .iter()
        .filter(|m| !m.title.is_empty())
        .filter_map(|m| {
            let raw = m.date_raw.as_deref()?;
            Some(format!("{} ({})", m.title, raw))
        })
        .collect();

    if bits.is_empty() {
        None
    } else {
        Some(format!("Slide {}: {}", slide_number, bits.join("; ")))
    }
}
