//! Tunable thresholds for timeline extraction.
//!
//! Ratios are fractions of the slide width or height; absolute values are in
//! the deck's own linear unit.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A horizontal/vertical search window as fractions of the slide size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub x: f64,
    pub y: f64,
}

/// Extraction settings. Every field has a default, so partial JSON works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Font size used when no run declares one.
    pub default_font_size: f64,

    /// Width/height ratio above which a shape counts as a line.
    pub line_aspect_ratio: f64,

    /// Minimum slack allowed between width and height of a circle.
    pub circle_min_slack: f64,

    /// Slack between width and height of a circle, relative to its height.
    pub circle_slack_ratio: f64,

    /// Half height of the band around a line axis.
    pub line_band_half_height: f64,

    /// Minimum number of circles for a circle-row axis.
    pub min_axis_circles: usize,

    /// Padding around the p25..p75 circle centers that still joins the row.
    pub circle_row_padding: f64,

    /// Padding of the axis band around the p25..p75 circle centers.
    pub circle_band_padding: f64,

    /// Half height of a date-derived axis band, relative to slide height.
    pub date_axis_band_ratio: f64,

    /// Vertical padding around the axis in which date labels count.
    pub date_band_pad_ratio: f64,

    /// Date tokens closer than this (relative to axis width) are duplicates.
    pub date_dedupe_ratio: f64,

    /// Titles must lie within this distance of the axis midpoint.
    pub title_window_ratio: f64,

    /// Year headers must reach this percentile of year-header font sizes.
    pub year_header_percentile: f64,

    /// First pairing window.
    pub primary_tolerance: Tolerance,

    /// Second pairing window, also the scale of milestone confidence.
    pub secondary_tolerance: Tolerance,

    /// Confidence given to spans found by the range pattern.
    pub span_confidence: f64,

    /// Maximum characters of raw slide text in a fallback caption.
    pub caption_limit: usize,

    /// Year for dates without a year header; `None` means the current year.
    pub fallback_year: Option<i32>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_font_size: 12.0,
            line_aspect_ratio: 10.0,
            circle_min_slack: 12.0,
            circle_slack_ratio: 0.25,
            line_band_half_height: 8.0,
            min_axis_circles: 3,
            circle_row_padding: 12.0,
            circle_band_padding: 8.0,
            date_axis_band_ratio: 0.02,
            date_band_pad_ratio: 0.30,
            date_dedupe_ratio: 0.01,
            title_window_ratio: 0.50,
            year_header_percentile: 0.7,
            primary_tolerance: Tolerance { x: 0.22, y: 0.18 },
            secondary_tolerance: Tolerance { x: 0.30, y: 0.30 },
            span_confidence: 0.9,
            caption_limit: 1200,
            fallback_year: None,
        }
    }
}

impl TimelineConfig {
    /// Create a configuration with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the year used for dates without a year header.
    pub fn with_fallback_year(mut self, year: i32) -> Self {
        self.fallback_year = Some(year);
        self
    }

    /// Set the fallback caption length (at least 1 character).
    pub fn with_caption_limit(mut self, limit: usize) -> Self {
        self.caption_limit = limit.max(1);
        self
    }

    /// Set both pairing windows.
    pub fn with_tolerances(mut self, primary: Tolerance, secondary: Tolerance) -> Self {
        self.primary_tolerance = primary;
        self.secondary_tolerance = secondary;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the detectors cannot work with.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("line_aspect_ratio", self.line_aspect_ratio),
            ("circle_min_slack", self.circle_min_slack),
            ("circle_slack_ratio", self.circle_slack_ratio),
            ("line_band_half_height", self.line_band_half_height),
            ("circle_row_padding", self.circle_row_padding),
            ("circle_band_padding", self.circle_band_padding),
            ("date_axis_band_ratio", self.date_axis_band_ratio),
            ("date_band_pad_ratio", self.date_band_pad_ratio),
            ("date_dedupe_ratio", self.date_dedupe_ratio),
            ("title_window_ratio", self.title_window_ratio),
            ("primary_tolerance.x", self.primary_tolerance.x),
            ("primary_tolerance.y", self.primary_tolerance.y),
            ("secondary_tolerance.x", self.secondary_tolerance.x),
            ("secondary_tolerance.y", self.secondary_tolerance.y),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.year_header_percentile) {
            return Err(Error::ConfigError(format!(
                "year_header_percentile must be within [0, 1], got {}",
                self.year_header_percentile
            )));
        }

        if !(0.0..=1.0).contains(&self.span_confidence) {
            return Err(Error::ConfigError(format!(
                "span_confidence must be within [0, 1], got {}",
                self.span_confidence
            )));
        }

        if !self.default_font_size.is_finite() || self.default_font_size <= 0.0 {
            return Err(Error::ConfigError(format!(
                "default_font_size must be a positive number, got {}",
                self.default_font_size
            )));
        }

        if self.min_axis_circles == 0 {
            return Err(Error::ConfigError(
                "min_axis_circles must be at least 1".to_string(),
            ));
        }

        if self.caption_limit == 0 {
            return Err(Error::ConfigError(
                "caption_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
