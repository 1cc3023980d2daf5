//! Table extraction.

use crate::error::{Error, Result};
use crate::types::{Shape, TableCells, TableGrid};

/// Convert a table shape into a grid of trimmed cell strings.
///
/// Empty cells are kept as empty strings so columns stay aligned; ragged rows
/// are left ragged. Returns [`Error::MalformedTable`] when the shape is not a
/// readable table.
pub fn extract_table(shape: &Shape) -> Result<TableGrid> {
    match shape.table_cells() {
        Some(TableCells::Rows(rows)) => Ok(rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.trim().to_string()).collect())
            .collect()),
        Some(TableCells::Malformed(reason)) => Err(Error::MalformedTable(reason.clone())),
        None => Err(Error::MalformedTable("shape is not a table".to_string())),
    }
}

/// Like [`extract_table`], but logs a malformed table and yields an empty grid.
pub fn extract_table_lossy(shape: &Shape) -> TableGrid {
    extract_table(shape).unwrap_or_else(|e| {
        log::warn!("{} (shape at top={}), using an empty grid", e, shape.top);
        Vec::new()
    })
}
