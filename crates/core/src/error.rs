//! Error types for slide deck extraction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a deck or extracting records from it.
#[derive(Error, Debug)]
pub enum Error {
    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Requested page bounds fall outside the deck.
    #[error("Invalid page range {start}-{end}: valid range is 1 to {total}")]
    InvalidRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// A table shape's cell data could not be read.
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// A slide carries no text-bearing shapes at all.
    #[error("Slide {0} has no text content")]
    EmptySlide(usize),

    /// Group shapes are nested deeper than the configured bound.
    #[error("Group shapes nested deeper than {depth} levels")]
    GroupDepthExceeded { depth: usize },
}
