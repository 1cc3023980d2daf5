//! Shape classification and group flattening.
//!
//! Turns a slide's shapes into a stream of [`ContentUnit`]s ordered by
//! vertical position, ready for reconstruction.

use crate::error::{Error, Result};
use crate::keyvalue::{segment_text, BULLET_MARKER};
use crate::table::extract_table_lossy;
use crate::types::{Shape, ShapeKind, TableGrid};

/// Height assumed for text shapes that report no usable extent.
const FALLBACK_SHAPE_HEIGHT: f64 = 100.0;

/// A piece of slide content positioned for reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentUnit {
    /// A bulleted field, already split into key and owned value text.
    KeyLine { key: String, value: String, top: f64 },
    /// Free text not owned by any bullet.
    TextBlock { text: String, top: f64 },
    Table { grid: TableGrid, top: f64 },
}

impl ContentUnit {
    /// Vertical position used for ordering.
    pub fn top(&self) -> f64 {
        match self {
            ContentUnit::KeyLine { top, .. }
            | ContentUnit::TextBlock { top, .. }
            | ContentUnit::Table { top, .. } => *top,
        }
    }
}

/// Flatten groups into their leaf shapes, depth-first, in traversal order.
///
/// Uses an explicit stack; nesting deeper than `max_depth` is an error.
pub fn flatten_shapes(shapes: &[Shape], max_depth: usize) -> Result<Vec<&Shape>> {
    let mut leaves = Vec::new();
    let mut stack = vec![(shapes.iter(), 0usize)];

    while let Some((iter, depth)) = stack.last_mut() {
        let depth = *depth;
        let Some(shape) = iter.next() else {
            stack.pop();
            continue;
        };
        match &shape.kind {
            ShapeKind::Group(children) => {
                if depth >= max_depth {
                    return Err(Error::GroupDepthExceeded { depth: max_depth });
                }
                stack.push((children.iter(), depth + 1));
            }
            _ => leaves.push(shape),
        }
    }

    Ok(leaves)
}

/// Whether a shape's text carries at least one bullet marker.
pub fn has_bullet(shape: &Shape) -> bool {
    shape
        .text_content()
        .is_some_and(|text| text.contains(BULLET_MARKER))
}

/// Classify one leaf shape into content units.
///
/// Bullets inside a tall text box get a position interpolated over the
/// box's height by line index, so they interleave correctly with shapes
/// beside them. Lines above the first bullet become a text block.
pub fn classify_shape(shape: &Shape) -> Vec<ContentUnit> {
    let top = shape.top as f64;

    match &shape.kind {
        // A malformed table still takes its place, as an empty grid.
        ShapeKind::Table(_) => vec![ContentUnit::Table {
            grid: extract_table_lossy(shape),
            top,
        }],
        ShapeKind::Text(text) if text.contains(BULLET_MARKER) => {
            let segmented = segment_text(text);
            let height = if shape.height > 1 {
                shape.height as f64
            } else {
                FALLBACK_SHAPE_HEIGHT
            };
            let line_count = segmented.line_count.max(1) as f64;

            let mut units = Vec::with_capacity(segmented.bullets.len() + 1);
            if !segmented.leading.is_empty() {
                units.push(ContentUnit::TextBlock {
                    text: segmented.leading.join("\n"),
                    top,
                });
            }
            units.extend(segmented.bullets.into_iter().map(|bullet| {
                ContentUnit::KeyLine {
                    top: top + (bullet.line_index as f64 / line_count) * height,
                    key: bullet.key,
                    value: bullet.value,
                }
            }));
            units
        }
        ShapeKind::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            vec![ContentUnit::TextBlock {
                text: text.to_string(),
                top,
            }]
        }
        // Groups are flattened before classification.
        ShapeKind::Group(_) => Vec::new(),
    }
}

/// Classify leaf shapes and sort the units by vertical position.
///
/// The sort is stable, so ties keep traversal order.
pub fn content_units(leaves: &[&Shape]) -> Vec<ContentUnit> {
    let mut units: Vec<ContentUnit> = leaves
        .iter()
        .flat_map(|shape| classify_shape(shape))
        .collect();
    units.sort_by(|a, b| a.top().total_cmp(&b.top()));
    units
}
