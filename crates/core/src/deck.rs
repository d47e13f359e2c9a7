//! Input shape tree handed over by deck loaders.
//!
//! A loader (PPTX reader, JSON dump, tests) builds a [`Deck`]; the extractor
//! only ever reads it.

use crate::geometry::BBox;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A whole presentation as positioned shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Identifier carried into every extracted record (usually the file path).
    pub source: String,

    /// Slide width in the deck's linear unit.
    pub slide_width: f64,

    /// Slide height in the deck's linear unit.
    pub slide_height: f64,

    /// Slides in presentation order.
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Create an empty deck with the given slide size.
    pub fn new(source: impl Into<String>, slide_width: f64, slide_height: f64) -> Self {
        Self {
            source: source.into(),
            slide_width,
            slide_height,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the deck.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Load a deck from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Source formats a deck can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// A [`Deck`] serialized as JSON.
    Json,
}

impl DeckFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from the first bytes of a file.
    ///
    /// Legacy OLE/CFB `.ppt` files are rejected: they carry no usable shape
    /// geometry for this reader.
    pub fn from_magic(bytes: &[u8]) -> Result<Option<Self>> {
        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Ok(Some(Self::Pptx));
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            return Err(Error::UnsupportedFormat(
                "legacy .ppt files are not supported, save the deck as .pptx".to_string(),
            ));
        }

        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            return Ok(Some(Self::Json));
        }

        Ok(None)
    }
}

/// One slide's top-level shapes, in document (z) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }
}

/// Declared type of a shape in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeType {
    #[default]
    AutoShape,
    TextBox,
    Placeholder,
    Line,
    Freeform,
    Picture,
    Group,
    GraphicFrame,
    Other,
}

/// A positioned shape, possibly a group of further shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub bbox: BBox,
    #[serde(default)]
    pub text_frame: Option<TextFrame>,
    /// Member shapes; only meaningful for groups.
    #[serde(default)]
    pub children: Vec<Shape>,
}

impl Shape {
    /// Create a shape without text or children.
    pub fn new(shape_type: ShapeType, bbox: BBox) -> Self {
        Self {
            shape_type,
            bbox,
            text_frame: None,
            children: Vec::new(),
        }
    }

    /// A text box holding a single run with the given formatting.
    pub fn text_box(bbox: BBox, text: impl Into<String>, font_size: Option<f64>) -> Self {
        Self::new(ShapeType::TextBox, bbox).with_text(TextFrame::from_run(TextRun {
            text: text.into(),
            font_size,
            bold: None,
        }))
    }

    /// A group holding `children`.
    pub fn group(bbox: BBox, children: Vec<Shape>) -> Self {
        Self {
            shape_type: ShapeType::Group,
            bbox,
            text_frame: None,
            children,
        }
    }

    pub fn with_text(mut self, frame: TextFrame) -> Self {
        self.text_frame = Some(frame);
        self
    }

    pub fn is_group(&self) -> bool {
        self.shape_type == ShapeType::Group
    }
}

impl Drop for Shape {
    // Children are unlinked onto a work list; nesting depth must not grow the call stack.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut shape) = pending.pop() {
            pending.append(&mut shape.children);
        }
    }
}

/// Text content of a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    /// A frame with one paragraph holding one run.
    pub fn from_run(run: TextRun) -> Self {
        Self {
            paragraphs: vec![Paragraph { runs: vec![run] }],
        }
    }

    /// Raw text with paragraphs separated by line feeds.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A paragraph of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A run of uniformly formatted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// Font size in points, if the run declares one.
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub bold: Option<bool>,
}
