//! PPTX (Office Open XML) loader for the deck extraction engine.
//!
//! Reads .pptx files, which are ZIP archives containing XML documents, into
//! the shape-level [`deck_core::Document`] model: text boxes, tables and
//! nested groups with their positions.

pub mod parser;

pub use parser::{parse_shape_tree, PptxParser};
