//! Error types for deck loading and timeline extraction.
//!
//! Detection itself never fails: missing axes, dates or titles degrade to
//! caption-only output. These errors cover the fallible edges around it.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a deck or its configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to interpret the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// A required part is missing from the package.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Invalid extractor configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// JSON (de)serialization failure for decks, configs or facts.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
