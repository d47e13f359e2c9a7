//! Geometry model shared by the detectors.
//!
//! All coordinates are in the presentation's own linear unit (EMU for PPTX);
//! nothing here converts units.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    /// Create a box, clamping negative extents to zero.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    /// A `w` x `h` box centered on (`cx`, `cy`).
    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    /// Horizontal center.
    pub fn cx(&self) -> f64 {
        self.x + self.w / 2.0
    }

    /// Vertical center.
    pub fn cy(&self) -> f64 {
        self.y + self.h / 2.0
    }

    /// Width over height, or `None` for zero-height boxes.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.h > 0.0 {
            Some(self.w / self.h)
        } else {
            None
        }
    }
}

/// A text-bearing shape after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    /// 1-based slide number.
    pub slide: usize,
    /// Normalized text: trimmed, no line breaks or non-breaking spaces.
    pub text: String,
    pub bbox: BBox,
    /// Font size in points (12.0 when the source declares none).
    pub font_size: f64,
    pub bold: bool,
}

/// Visual classification of a non-group shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Line,
    Circle,
    Rect,
    Other,
}

/// A classified shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBox {
    pub slide: usize,
    pub kind: ShapeKind,
    pub bbox: BBox,
}

/// How an axis was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSource {
    /// The widest line shape.
    Line,
    /// A row of circular markers.
    CircleRow,
    /// The spread of inline date labels.
    DateTokens,
}

/// A horizontal timeline band `[y0, y1]` spanning `[x0, x1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub slide: usize,
    pub y0: f64,
    pub y1: f64,
    pub x0: f64,
    pub x1: f64,
    pub source: AxisSource,
}

impl Axis {
    /// Vertical midpoint of the band.
    pub fn mid_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Horizontal extent of the axis.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Whether `y` lies inside the band widened by `pad` on both sides.
    pub fn in_band(&self, y: f64, pad: f64) -> bool {
        (self.y0 - pad) <= y && y <= (self.y1 + pad)
    }
}

/// Where a date token's year came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "year", rename_all = "snake_case")]
pub enum YearSource {
    /// Taken from the nearest year header on the slide.
    Header(i32),
    /// No header was found; the configured default year was used.
    Fallback(i32),
}

impl YearSource {
    pub fn year(&self) -> i32 {
        match *self {
            YearSource::Header(y) | YearSource::Fallback(y) => y,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, YearSource::Fallback(_))
    }
}

/// A detected date label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTok {
    pub slide: usize,
    /// Label text as it appeared, e.g. "Jan 15".
    pub raw: String,
    /// ISO date, set once a year is assigned and the day exists.
    pub iso: Option<String>,
    /// Year provenance, set together with `iso`.
    pub year_source: Option<YearSource>,
    pub bbox: BBox,
}

impl DateTok {
    pub fn new(slide: usize, raw: impl Into<String>, bbox: BBox) -> Self {
        Self {
            slide,
            raw: raw.into(),
            iso: None,
            year_source: None,
            bbox,
        }
    }
}

/// Value at fraction `p` of the sorted values.
///
/// The index is `p * (n - 1)` rounded half-to-even, clamped to the slice.
/// Returns 0.0 for an empty input.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = sorted.len() - 1;
    let idx = (p * last as f64).round_ties_even().max(0.0) as usize;
    sorted[idx.min(last)]
}
