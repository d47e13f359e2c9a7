//! Matching date labels to milestone titles.

use crate::config::{Tolerance, TimelineConfig};
use crate::geometry::{DateTok, TextBox};
use crate::patterns::looks_like_date;
use crate::types::Milestone;

/// Weight of horizontal alignment in the selection score.
const SCORE_X_WEIGHT: f64 = 0.6;
/// Weight of vertical closeness in the selection score.
const SCORE_Y_WEIGHT: f64 = 0.3;
/// Weight of font size in the selection score.
const SCORE_FONT_WEIGHT: f64 = 0.1;
/// Font size that earns the full font bonus.
const SCORE_FONT_REFERENCE: f64 = 24.0;

/// Weight of horizontal alignment in the reported confidence.
const CONFIDENCE_X_WEIGHT: f64 = 0.7;
/// Weight of vertical alignment in the reported confidence.
const CONFIDENCE_Y_WEIGHT: f64 = 0.3;

/// Search window in slide units.
#[derive(Debug, Clone, Copy)]
struct Window {
    x: f64,
    y: f64,
}

impl Window {
    fn scaled(tolerance: Tolerance, slide_width: f64, slide_height: f64) -> Self {
        Self {
            x: tolerance.x * slide_width,
            y: tolerance.y * slide_height,
        }
    }
}

/// `distance / tolerance`, treating a zero tolerance as "only exact hits".
fn ratio(distance: f64, tolerance: f64) -> f64 {
    if tolerance > 0.0 {
        distance / tolerance
    } else if distance > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Pair every date token with the best nearby title that is not itself a date.
///
/// A tight window is tried first, then a wider one. Dates with no title in
/// either window produce nothing.
pub fn pair_dates_with_titles(
    dates: &[DateTok],
    titles: &[&TextBox],
    slide_width: f64,
    slide_height: f64,
    config: &TimelineConfig,
) -> Vec<Milestone> {
    if dates.is_empty() || titles.is_empty() {
        return Vec::new();
    }

    let candidates: Vec<&TextBox> = titles
        .iter()
        .copied()
        .filter(|t| !looks_like_date(&t.text))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let primary = Window::scaled(config.primary_tolerance, slide_width, slide_height);
    let secondary = Window::scaled(config.secondary_tolerance, slide_width, slide_height);

    let mut milestones = Vec::new();
    for date in dates {
        let Some(title) = best_title(date, &candidates, primary)
            .or_else(|| best_title(date, &candidates, secondary))
        else {
            log::trace!("no title near {:?} on slide {}", date.raw, date.slide);
            continue;
        };

        let conf_x = 1.0 - ratio((title.bbox.cx() - date.bbox.cx()).abs(), secondary.x).min(1.0);
        let conf_y = 1.0 - ratio((title.bbox.cy() - date.bbox.cy()).abs(), secondary.y).min(1.0);
        let confidence = (CONFIDENCE_X_WEIGHT * conf_x + CONFIDENCE_Y_WEIGHT * conf_y).clamp(0.0, 1.0);

        milestones.push(Milestone {
            slide: date.slide,
            title: title.text.trim().to_string(),
            date_iso: date.iso.clone(),
            date_raw: Some(date.raw.clone()),
            year_source: date.year_source,
            title_bbox: title.bbox,
            date_bbox: Some(date.bbox),
            confidence,
            source: String::new(),
        });
    }
    milestones
}

/// Highest scoring title inside `window` around `date`; earlier titles win ties.
fn best_title<'a>(date: &DateTok, candidates: &[&'a TextBox], window: Window) -> Option<&'a TextBox> {
    let mut best: Option<(f64, &'a TextBox)> = None;
    for &title in candidates {
        let dx = (title.bbox.cx() - date.bbox.cx()).abs();
        let dy = (title.bbox.cy() - date.bbox.cy()).abs();
        if dx > window.x || dy > window.y {
            continue;
        }

        let score = SCORE_X_WEIGHT * (1.0 - ratio(dx, window.x))
            + SCORE_Y_WEIGHT * (1.0 - ratio(dy, window.y))
            + SCORE_FONT_WEIGHT * (title.font_size / SCORE_FONT_REFERENCE);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, title));
        }
    }
    best.map(|(_, title)| title)
}
