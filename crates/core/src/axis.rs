//! Timeline axis inference.

use crate::config::TimelineConfig;
use crate::geometry::{percentile, Axis, AxisSource, DateTok, ShapeBox, ShapeKind};

/// Infer the axis from shapes: the widest line, else a row of circles.
pub fn detect_axis(shapes: &[ShapeBox], config: &TimelineConfig) -> Option<Axis> {
    axis_from_line(shapes, config).or_else(|| axis_from_circles(shapes, config))
}

fn axis_from_line(shapes: &[ShapeBox], config: &TimelineConfig) -> Option<Axis> {
    let mut widest: Option<&ShapeBox> = None;
    for shape in shapes.iter().filter(|s| s.kind == ShapeKind::Line) {
        if widest.map_or(true, |w| shape.bbox.w > w.bbox.w) {
            widest = Some(shape);
        }
    }

    let line = widest?;
    let y = line.bbox.cy();
    Some(Axis {
        slide: line.slide,
        y0: y - config.line_band_half_height,
        y1: y + config.line_band_half_height,
        x0: line.bbox.x,
        x1: line.bbox.x + line.bbox.w,
        source: AxisSource::Line,
    })
}

fn axis_from_circles(shapes: &[ShapeBox], config: &TimelineConfig) -> Option<Axis> {
    let circles: Vec<&ShapeBox> = shapes
        .iter()
        .filter(|s| s.kind == ShapeKind::Circle)
        .collect();
    if circles.len() < config.min_axis_circles.max(1) {
        return None;
    }

    let ys: Vec<f64> = circles.iter().map(|c| c.bbox.cy()).collect();
    let y_low = percentile(&ys, 0.25);
    let y_high = percentile(&ys, 0.75);

    let pad = config.circle_row_padding;
    let row: Vec<&ShapeBox> = circles
        .into_iter()
        .filter(|c| (y_low - pad) <= c.bbox.cy() && c.bbox.cy() <= (y_high + pad))
        .collect();
    let first = row.first()?;
    let (x0, x1) = x_extent(row.iter().map(|c| c.bbox.cx()));

    Some(Axis {
        slide: first.slide,
        y0: y_low - config.circle_band_padding,
        y1: y_high + config.circle_band_padding,
        x0,
        x1,
        source: AxisSource::CircleRow,
    })
}

/// Infer the axis from where inline dates sit: a thin band around their
/// median height, spanning their horizontal extent. Needs two tokens.
pub fn axis_from_dates(tokens: &[DateTok], slide_height: f64, config: &TimelineConfig) -> Option<Axis> {
    if tokens.len() < 2 {
        return None;
    }

    let ys: Vec<f64> = tokens.iter().map(|d| d.bbox.cy()).collect();
    let y_mid = percentile(&ys, 0.5);
    let half = config.date_axis_band_ratio * slide_height;
    let (x0, x1) = x_extent(tokens.iter().map(|d| d.bbox.cx()));

    Some(Axis {
        slide: tokens[0].slide,
        y0: y_mid - half,
        y1: y_mid + half,
        x0,
        x1,
        source: AxisSource::DateTokens,
    })
}

fn x_extent(xs: impl Iterator<Item = f64>) -> (f64, f64) {
    xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn shape(kind: ShapeKind, x: f64, y: f64, w: f64, h: f64) -> ShapeBox {
        ShapeBox {
            slide: 1,
            kind,
            bbox: BBox::new(x, y, w, h),
        }
    }

    #[test]
    fn test_widest_line_wins() {
        let config = TimelineConfig::default();
        let shapes = vec![
            shape(ShapeKind::Line, 0.0, 100.0, 300.0, 4.0),
            shape(ShapeKind::Line, 50.0, 498.0, 900.0, 4.0),
            shape(ShapeKind::Circle, 0.0, 0.0, 10.0, 10.0),
        ];
        let axis = detect_axis(&shapes, &config).unwrap();
        assert_eq!(axis.source, AxisSource::Line);
        assert_eq!((axis.y0, axis.y1), (492.0, 508.0));
        assert_eq!((axis.x0, axis.x1), (50.0, 950.0));
    }

    #[test]
    fn test_first_line_wins_ties() {
        let config = TimelineConfig::default();
        let shapes = vec![
            shape(ShapeKind::Line, 0.0, 100.0, 500.0, 0.0),
            shape(ShapeKind::Line, 0.0, 300.0, 500.0, 0.0),
        ];
        let axis = detect_axis(&shapes, &config).unwrap();
        assert_eq!(axis.mid_y(), 100.0);
    }

    #[test]
    fn test_circle_row() {
        let config = TimelineConfig::default();
        let shapes = vec![
            shape(ShapeKind::Circle, 100.0, 395.0, 10.0, 10.0),
            shape(ShapeKind::Circle, 300.0, 397.0, 10.0, 10.0),
            shape(ShapeKind::Circle, 500.0, 393.0, 10.0, 10.0),
            shape(ShapeKind::Circle, 700.0, 396.0, 10.0, 10.0),
            // a stray marker far below stays out of the row
            shape(ShapeKind::Circle, 900.0, 700.0, 10.0, 10.0),
            shape(ShapeKind::Rect, 0.0, 0.0, 200.0, 100.0),
        ];
        let axis = detect_axis(&shapes, &config).unwrap();
        assert_eq!(axis.source, AxisSource::CircleRow);
        // centers 400, 402, 398, 401, 705 -> p25 = 400, p75 = 402
        assert_eq!((axis.y0, axis.y1), (392.0, 410.0));
        assert_eq!((axis.x0, axis.x1), (105.0, 705.0));
    }

    #[test]
    fn test_two_circles_are_not_an_axis() {
        let config = TimelineConfig::default();
        let shapes = vec![
            shape(ShapeKind::Circle, 100.0, 400.0, 10.0, 10.0),
            shape(ShapeKind::Circle, 300.0, 400.0, 10.0, 10.0),
        ];
        assert!(detect_axis(&shapes, &config).is_none());
    }

    #[test]
    fn test_axis_from_dates() {
        let config = TimelineConfig::default();
        let tokens = vec![
            DateTok::new(2, "Jan 5", BBox::new(100.0, 290.0, 40.0, 20.0)),
            DateTok::new(2, "Feb 9", BBox::new(400.0, 300.0, 40.0, 20.0)),
            DateTok::new(2, "Mar 1", BBox::new(700.0, 310.0, 40.0, 20.0)),
        ];
        let axis = axis_from_dates(&tokens, 1000.0, &config).unwrap();
        assert_eq!(axis.slide, 2);
        assert_eq!(axis.source, AxisSource::DateTokens);
        assert_eq!((axis.y0, axis.y1), (290.0, 330.0));
        assert_eq!((axis.x0, axis.x1), (120.0, 720.0));

        assert!(axis_from_dates(&tokens[..1], 1000.0, &config).is_none());
    }
}
