//! PPTX (Office Open XML) reader for timeline extraction.
//!
//! Reads .pptx files, which are ZIP archives of XML parts, into the positioned
//! shape trees that `timeline-core` works on.

pub mod parser;

pub use parser::PptxParser;
