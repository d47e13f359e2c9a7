//! Flattening of a slide's shape tree into text boxes and classified shapes.

use crate::config::TimelineConfig;
use crate::deck::{Shape, ShapeType, Slide, TextFrame};
use crate::geometry::{BBox, ShapeBox, ShapeKind, TextBox};
use crate::normalize::normalize_text;

/// Flat view of one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideContent {
    /// Non-empty text-bearing shapes, in document order.
    pub texts: Vec<TextBox>,
    /// Every non-group shape, in document order.
    pub shapes: Vec<ShapeBox>,
}

impl SlideContent {
    /// All label texts joined by single spaces.
    pub fn raw_text(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Walk `slide` depth-first (groups included) and collect its text boxes and shapes.
pub fn extract_slide(slide_number: usize, slide: &Slide, config: &TimelineConfig) -> SlideContent {
    let mut content = SlideContent::default();

    // Explicit stack keeps deeply nested groups off the call stack.
    let mut stack: Vec<&Shape> = slide.shapes.iter().rev().collect();
    while let Some(shape) = stack.pop() {
        if shape.is_group() {
            stack.extend(shape.children.iter().rev());
            continue;
        }

        if let Some(frame) = &shape.text_frame {
            let text = normalize_text(&frame.text());
            if !text.is_empty() {
                let (font_size, bold) = leading_font(frame, config.default_font_size);
                content.texts.push(TextBox {
                    slide: slide_number,
                    text,
                    bbox: shape.bbox,
                    font_size,
                    bold,
                });
            }
        }

        content.shapes.push(ShapeBox {
            slide: slide_number,
            kind: classify_shape(shape.shape_type, &shape.bbox, config),
            bbox: shape.bbox,
        });
    }

    log::trace!(
        "slide {}: {} text boxes, {} shapes",
        slide_number,
        content.texts.len(),
        content.shapes.len()
    );

    content
}

/// Font size and weight from the leading run of each paragraph.
///
/// Paragraphs are visited in order until one's first run declares a size;
/// any visited first run that is bold marks the box bold.
fn leading_font(frame: &TextFrame, default_size: f64) -> (f64, bool) {
    let mut bold = false;
    for paragraph in &frame.paragraphs {
        let Some(run) = paragraph.runs.first() else {
            continue;
        };
        if run.bold.unwrap_or(false) {
            bold = true;
        }
        if let Some(size) = run.font_size.filter(|s| *s > 0.0) {
            return (size, bold);
        }
    }
    (default_size, bold)
}

/// Classify a shape by declared type and aspect ratio.
///
/// Checked in order: line (declared, or wider than the line ratio), circle
/// (near-square auto shape), rect (any other auto shape), other.
pub fn classify_shape(shape_type: ShapeType, bbox: &BBox, config: &TimelineConfig) -> ShapeKind {
    let is_wide = bbox
        .aspect_ratio()
        .is_some_and(|ratio| ratio > config.line_aspect_ratio);
    if shape_type == ShapeType::Line || is_wide {
        return ShapeKind::Line;
    }

    if shape_type == ShapeType::AutoShape {
        let slack = config.circle_min_slack.max(config.circle_slack_ratio * bbox.h);
        if bbox.h > 0.0 && (bbox.w - bbox.h).abs() <= slack {
            return ShapeKind::Circle;
        }
        return ShapeKind::Rect;
    }

    ShapeKind::Other
}
