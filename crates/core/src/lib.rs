//! Structural key-value extraction for bulleted slide decks.
//!
//! Walks each slide's shape tree, reconstructs ordered `key: value` records
//! from `■`-bulleted text, attached tables and free text, and groups them
//! under the slide title.

pub mod classify;
pub mod error;
pub mod extract;
pub mod keyvalue;
pub mod options;
pub mod reconstruct;
pub mod table;
pub mod types;

pub use classify::ContentUnit;
pub use error::{Error, Result};
pub use extract::{extract, Extractor, SlideRecords};
pub use keyvalue::SecondarySplitter;
pub use options::ExtractOptions;
pub use types::{
    Document, Extraction, Record, RecordValue, Shape, ShapeKind, Slide, TableCells, TableGrid,
    ValuePart,
};
