//! Extracted timeline facts, per slide and per deck.

use crate::geometry::{Axis, BBox, YearSource};
use serde::{Deserialize, Serialize};

/// A point-in-time fact: a title paired with a date label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub slide: usize,
    pub title: String,
    pub date_iso: Option<String>,
    pub date_raw: Option<String>,
    pub year_source: Option<YearSource>,
    pub title_bbox: BBox,
    pub date_bbox: Option<BBox>,
    /// Alignment quality in [0, 1].
    pub confidence: f64,
    pub source: String,
}

/// A date-range fact found inside a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRow {
    pub slide: usize,
    pub title: String,
    pub start_iso: Option<String>,
    pub end_iso: Option<String>,
    pub start_raw: Option<String>,
    pub end_raw: Option<String>,
    /// The whole matched range, e.g. "Jul 24 - Aug 18".
    pub raw_range: Option<String>,
    /// Year given to both ends of the range.
    pub year_source: Option<YearSource>,
    pub title_bbox: BBox,
    pub confidence: f64,
    pub source: String,
}

/// Everything recovered from one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideTimeline {
    /// 1-based slide number.
    pub slide: usize,
    /// The recovered axis; `None` means caption-only output.
    pub axis: Option<Axis>,
    /// "Slide <n>: ..." summary for the search index.
    pub caption: String,
    pub milestones: Vec<Milestone>,
    pub spans: Vec<SpanRow>,
}

/// Everything recovered from one deck, slide by slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckTimeline {
    pub source: String,
    pub slides: Vec<SlideTimeline>,
}

impl DeckTimeline {
    /// Captions in slide order.
    pub fn captions(&self) -> Vec<String> {
        self.slides.iter().map(|s| s.caption.clone()).collect()
    }

    /// Milestone rows for the fact store; untitled milestones are dropped.
    pub fn milestone_records(&self) -> Vec<MilestoneRecord> {
        self.slides
            .iter()
            .flat_map(|s| s.milestones.iter())
            .filter(|m| !m.title.is_empty())
            .map(MilestoneRecord::from)
            .collect()
    }

    /// Span rows for the fact store; untitled spans are dropped.
    pub fn span_records(&self) -> Vec<SpanRecord> {
        self.slides
            .iter()
            .flat_map(|s| s.spans.iter())
            .filter(|s| !s.title.is_empty())
            .map(SpanRecord::from)
            .collect()
    }

    /// Captions plus structured rows, ready to hand to the collaborators.
    pub fn facts(&self) -> TimelineFacts {
        TimelineFacts {
            captions: self.captions(),
            milestones: self.milestone_records(),
            spans: self.span_records(),
        }
    }
}

/// Milestone row as stored and searched downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub slide: usize,
    pub title: String,
    /// ISO 8601 `YYYY-MM-DD`.
    pub date: Option<String>,
    pub raw_date: Option<String>,
    /// Rounded to 3 decimals.
    pub confidence: f64,
    pub source: String,
    pub year_source: Option<YearSource>,
}

impl From<&Milestone> for MilestoneRecord {
    fn from(m: &Milestone) -> Self {
        Self {
            slide: m.slide,
            title: m.title.clone(),
            date: m.date_iso.clone(),
            raw_date: m.date_raw.clone(),
            confidence: round3(m.confidence),
            source: m.source.clone(),
            year_source: m.year_source,
        }
    }
}

/// Span row as stored and searched downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub slide: usize,
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub raw_left: Option<String>,
    pub raw_right: Option<String>,
    pub raw_range: Option<String>,
    /// Rounded to 3 decimals.
    pub confidence: f64,
    pub source: String,
    pub year_source: Option<YearSource>,
}

impl From<&SpanRow> for SpanRecord {
    fn from(s: &SpanRow) -> Self {
        Self {
            slide: s.slide,
            title: s.title.clone(),
            start_date: s.start_iso.clone(),
            end_date: s.end_iso.clone(),
            raw_left: s.start_raw.clone(),
            raw_right: s.end_raw.clone(),
            raw_range: s.raw_range.clone(),
            confidence: round3(s.confidence),
            source: s.source.clone(),
            year_source: s.year_source,
        }
    }
}

/// Deck-level output: captions for the search index, rows for the fact store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineFacts {
    pub captions: Vec<String>,
    pub milestones: Vec<MilestoneRecord>,
    pub spans: Vec<SpanRecord>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
