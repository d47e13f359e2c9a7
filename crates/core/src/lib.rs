//! Timeline extraction from slide layouts.
//!
//! Infers a timeline axis from shape geometry, finds date and title labels
//! around it, and pairs them into milestone and span facts plus a short
//! caption per slide.

pub mod axis;
pub mod config;
pub mod dates;
pub mod deck;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod normalize;
pub mod pairing;
pub mod patterns;
pub mod pipeline;
pub mod spans;
pub mod titles;
pub mod types;

pub use config::{Tolerance, TimelineConfig};
pub use deck::{Deck, DeckFormat, Paragraph, Shape, ShapeType, Slide, TextFrame, TextRun};
pub use error::{Error, Result};
pub use geometry::{Axis, AxisSource, BBox, DateTok, ShapeBox, ShapeKind, TextBox, YearSource};
pub use pipeline::TimelineExtractor;
pub use types::{
    DeckTimeline, Milestone, MilestoneRecord, SlideTimeline, SpanRecord, SpanRow, TimelineFacts,
};
