//! Candidate milestone titles around the axis.

use crate::config::TimelineConfig;
use crate::geometry::{Axis, TextBox};
use crate::patterns::{HAS_LETTER_REGEX, NON_TITLE_REGEX};

/// Labels within the title window of the axis that could name a milestone.
///
/// Bare month names, "Today" markers and labels without letters (years,
/// day numbers) are left out. Date-shaped labels stay in: they can still
/// carry a span.
pub fn detect_titles<'a>(
    texts: &'a [TextBox],
    axis: &Axis,
    slide_height: f64,
    config: &TimelineConfig,
) -> Vec<&'a TextBox> {
    let mid_y = axis.mid_y();
    let window = config.title_window_ratio * slide_height;

    texts
        .iter()
        .filter(|t| (t.bbox.cy() - mid_y).abs() <= window)
        .filter(|t| {
            let s = t.text.trim();
            !NON_TITLE_REGEX.is_match(s) && HAS_LETTER_REGEX.is_match(s)
        })
        .collect()
}
