//! Date label detection and year attribution.
//!
//! Dates come from two places: labels that carry a whole "Mon DD" / "DD Mon"
//! date, and decks that put the month and the day in separate boxes. Years
//! are never part of the label; they come from the nearest year header.

use crate::config::TimelineConfig;
use crate::geometry::{percentile, Axis, BBox, DateTok, TextBox, YearSource};
use crate::patterns::{
    month_number, DAY_MONTH_REGEX, DAY_ONLY_REGEX, MONTH_DAY_REGEX, MONTH_ONLY_REGEX, YEAR_REGEX,
};
use chrono::{Datelike, NaiveDate};

/// Side length of the synthetic box placed between a month and its day label.
const SPLIT_TOKEN_SIZE: f64 = 2.0;

/// A year header and its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct YearHeader {
    pub year: i32,
    pub bbox: BBox,
}

/// Year used when a slide has no year header.
pub fn fallback_year(config: &TimelineConfig) -> i32 {
    config
        .fallback_year
        .unwrap_or_else(|| chrono::Local::now().year())
}

/// Month and day from the first "Mon DD" or "DD Mon" in `raw`.
pub fn parse_month_day(raw: &str) -> Option<(u32, u32)> {
    let caps = MONTH_DAY_REGEX
        .captures(raw)
        .or_else(|| DAY_MONTH_REGEX.captures(raw))?;
    let month = month_number(&caps["month"])?;
    let day = caps["day"].parse().ok()?;
    Some((month, day))
}

/// ISO `YYYY-MM-DD` for `raw` in `year`, if it names a real calendar day.
pub fn to_iso(raw: &str, year: i32) -> Option<String> {
    let (month, day) = parse_month_day(raw)?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Pick likely year headers: bare 4-digit labels set in the larger fonts.
pub fn extract_year_headers(texts: &[TextBox], config: &TimelineConfig) -> Vec<YearHeader> {
    let candidates: Vec<&TextBox> = texts
        .iter()
        .filter(|t| YEAR_REGEX.is_match(t.text.trim()))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let sizes: Vec<f64> = candidates.iter().map(|t| t.font_size).collect();
    let cutoff = percentile(&sizes, config.year_header_percentile);

    candidates
        .into_iter()
        .filter(|t| t.font_size >= cutoff)
        .filter_map(|t| {
            Some(YearHeader {
                year: t.text.trim().parse().ok()?,
                bbox: t.bbox,
            })
        })
        .collect()
}

/// Give each token the year of the horizontally nearest header and resolve
/// its ISO date. Without headers the fallback year is used and flagged.
pub fn assign_years(tokens: &mut [DateTok], headers: &[YearHeader], fallback: i32) {
    let mut sorted: Vec<&YearHeader> = headers.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .cx()
            .partial_cmp(&b.bbox.cx())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for tok in tokens.iter_mut() {
        let mut nearest: Option<(f64, i32)> = None;
        for header in &sorted {
            let dx = (tok.bbox.cx() - header.bbox.cx()).abs();
            if nearest.map_or(true, |(best, _)| dx < best) {
                nearest = Some((dx, header.year));
            }
        }

        let source = match nearest {
            Some((_, year)) => YearSource::Header(year),
            None => YearSource::Fallback(fallback),
        };
        tok.iso = to_iso(&tok.raw, source.year());
        tok.year_source = Some(source);
    }
}

/// Every date written inside a single label, year unresolved.
///
/// "Mon DD" keeps the label's wording; "DD Mon" is reported as "Mon DD".
pub fn detect_inline_dates(texts: &[TextBox]) -> Vec<DateTok> {
    let mut tokens = Vec::new();
    for t in texts {
        for m in MONTH_DAY_REGEX.find_iter(&t.text) {
            tokens.push(DateTok::new(t.slide, m.as_str(), t.bbox));
        }
        for caps in DAY_MONTH_REGEX.captures_iter(&t.text) {
            let raw = format!("{} {}", &caps["month"], &caps["day"]);
            tokens.push(DateTok::new(t.slide, raw, t.bbox));
        }
    }
    tokens
}

/// Dates split over a month-only label and a day-only label.
///
/// Each month label, in order, takes the nearest unused day label
/// (Manhattan distance between centers). The token sits in a small box
/// halfway between the two and must fall in the padded axis band.
pub fn detect_split_dates(
    texts: &[TextBox],
    axis: &Axis,
    headers: &[YearHeader],
    slide_height: f64,
    config: &TimelineConfig,
) -> Vec<DateTok> {
    let mut months = Vec::new();
    let mut days = Vec::new();
    for t in texts {
        let s = t.text.trim();
        if MONTH_ONLY_REGEX.is_match(s) {
            months.push(t);
        } else if DAY_ONLY_REGEX.is_match(s) {
            if let Ok(day) = s.parse::<u32>() {
                if (1..=31).contains(&day) {
                    days.push(t);
                }
            }
        }
    }

    if months.is_empty() || days.is_empty() {
        return Vec::new();
    }

    let mut used = vec![false; days.len()];
    let mut tokens = Vec::new();
    for month in &months {
        let mut best: Option<(f64, usize)> = None;
        for (idx, day) in days.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let dist = (month.bbox.cx() - day.bbox.cx()).abs()
                + (month.bbox.cy() - day.bbox.cy()).abs();
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, idx));
            }
        }

        let Some((_, idx)) = best else {
            continue;
        };
        used[idx] = true;
        let day = days[idx];

        let raw = format!("{} {}", month.text.trim(), day.text.trim());
        let cx = (month.bbox.cx() + day.bbox.cx()) / 2.0;
        let cy = (month.bbox.cy() + day.bbox.cy()) / 2.0;
        tokens.push(DateTok::new(
            month.slide,
            raw,
            BBox::centered(cx, cy, SPLIT_TOKEN_SIZE, SPLIT_TOKEN_SIZE),
        ));
    }

    assign_years(&mut tokens, headers, fallback_year(config));
    let pad = config.date_band_pad_ratio * slide_height;
    tokens.retain(|d| axis.in_band(d.bbox.cy(), pad));
    tokens
}

/// Date tokens for a slide with a known axis.
///
/// Inline dates near the axis are used as they are when there are at least
/// two. Otherwise split month/day labels are added, and the union is sorted
/// left to right with near-duplicates (within 1% of the axis width) dropped.
pub fn detect_dates(
    inline: Vec<DateTok>,
    texts: &[TextBox],
    axis: &Axis,
    headers: &[YearHeader],
    slide_height: f64,
    config: &TimelineConfig,
) -> Vec<DateTok> {
    let mut inline = inline;
    assign_years(&mut inline, headers, fallback_year(config));

    let pad = config.date_band_pad_ratio * slide_height;
    let mut near: Vec<DateTok> = inline
        .into_iter()
        .filter(|d| axis.in_band(d.bbox.cy(), pad))
        .collect();
    if near.len() >= 2 {
        return near;
    }

    near.extend(detect_split_dates(texts, axis, headers, slide_height, config));
    near.sort_by(|a, b| {
        a.bbox
            .cx()
            .partial_cmp(&b.bbox.cx())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let width = if axis.width() > 0.0 { axis.width() } else { 1.0 };
    let x_eps = config.date_dedupe_ratio * width;
    let mut deduped: Vec<DateTok> = Vec::with_capacity(near.len());
    for tok in near {
        let is_duplicate = deduped
            .last()
            .is_some_and(|prev| (tok.bbox.cx() - prev.bbox.cx()).abs() <= x_eps);
        if !is_duplicate {
            deduped.push(tok);
        }
    }
    log::trace!("{} date tokens after split-label merge", deduped.len());
    deduped
}
