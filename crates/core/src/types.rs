//! Domain types for slide decks and the records extracted from them.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A table as a row-major grid of trimmed cell strings. Rows may be ragged.
pub type TableGrid = Vec<Vec<String>>;

/// A loaded slide deck, ready for extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,

    /// Slide height in EMU, if the container declares one.
    pub slide_height: Option<i64>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slide height used for footer detection.
    pub fn with_slide_height(mut self, height: i64) -> Self {
        self.slide_height = Some(height);
        self
    }

    /// Add a slide to the document.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Number of slides in the document.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

/// A single slide: an unordered set of shapes in source traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Top-level shapes in traversal order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Builder-style variant of [`Slide::add_shape`].
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }
}

/// One positioned element on a slide.
///
/// Offsets and extents are in EMU, the unit used by the source container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub kind: ShapeKind,
    pub top: i64,
    pub left: i64,
    pub height: i64,
}

/// What a shape holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Raw multi-line text. Paragraphs are separated by `\n`, soft line
    /// breaks by a vertical tab.
    Text(String),
    /// Table cell data as read from the source.
    Table(TableCells),
    /// Child shapes in traversal order.
    Group(Vec<Shape>),
}

/// Cell data of a table shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableCells {
    /// Raw (untrimmed) cell text per row.
    Rows(Vec<Vec<String>>),
    /// The loader could not make sense of the table; carries the reason.
    Malformed(String),
}

impl Shape {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            top: 0,
            left: 0,
            height: 0,
        }
    }

    /// A text shape at the origin.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ShapeKind::Text(text.into()))
    }

    /// A table shape at the origin.
    pub fn table(rows: Vec<Vec<String>>) -> Self {
        Self::new(ShapeKind::Table(TableCells::Rows(rows)))
    }

    /// A table shape whose cells could not be read.
    pub fn malformed_table(reason: impl Into<String>) -> Self {
        Self::new(ShapeKind::Table(TableCells::Malformed(reason.into())))
    }

    /// A group shape at the origin.
    pub fn group(children: Vec<Shape>) -> Self {
        Self::new(ShapeKind::Group(children))
    }

    /// Set the vertical and horizontal offsets.
    pub fn at(mut self, top: i64, left: i64) -> Self {
        self.top = top;
        self.left = left;
        self
    }

    /// Set the vertical extent.
    pub fn with_height(mut self, height: i64) -> Self {
        self.height = height;
        self
    }

    /// Raw text, if this is a text shape.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            ShapeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Table cells, if this is a table shape.
    pub fn table_cells(&self) -> Option<&TableCells> {
        match &self.kind {
            ShapeKind::Table(cells) => Some(cells),
            _ => None,
        }
    }

    /// Child shapes, if this is a group.
    pub fn children(&self) -> Option<&[Shape]> {
        match &self.kind {
            ShapeKind::Group(children) => Some(children),
            _ => None,
        }
    }

    /// Whether this is a text shape with non-blank text.
    pub fn has_text(&self) -> bool {
        self.text_content().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One piece of a multi-part record value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValuePart {
    Text(String),
    Table(TableGrid),
}

/// The value of a record: plain text, or an ordered mix of text and tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Text(String),
    Parts(Vec<ValuePart>),
}

/// Key used for free text found outside any bulleted record.
pub const TEXT_BLOCK_KEY: &str = "text_block";

/// Key used for tables found outside any bulleted record.
pub const TABLE_KEY: &str = "table";

/// One extracted fact: a single key mapped to its value.
///
/// Serializes as a one-entry JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: RecordValue,
}

impl Record {
    /// A record with a plain text value.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: RecordValue::Text(value.into()),
        }
    }

    /// A record with a multi-part value.
    pub fn parts(key: impl Into<String>, parts: Vec<ValuePart>) -> Self {
        Self {
            key: key.into(),
            value: RecordValue::Parts(parts),
        }
    }

    /// A standalone text block with no owning bullet.
    pub fn text_block(text: impl Into<String>) -> Self {
        Self::text(TEXT_BLOCK_KEY, text)
    }

    /// A standalone table with no owning bullet.
    pub fn table(grid: TableGrid) -> Self {
        Self::parts(TABLE_KEY, vec![ValuePart::Table(grid)])
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

/// Records gathered under one slide title.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    title: String,
    records: Vec<Record>,
}

/// The result of an extraction: titles in first-seen order, each with its
/// accumulated records.
///
/// Serializes as a JSON object keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    sections: Vec<Section>,
}

impl Extraction {
    /// Create an empty extraction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records under a title, merging with an existing section of the
    /// same title.
    pub fn append(&mut self, title: impl Into<String>, records: Vec<Record>) {
        let title = title.into();
        match self.sections.iter_mut().find(|s| s.title == title) {
            Some(section) => section.records.extend(records),
            None => self.sections.push(Section { title, records }),
        }
    }

    /// Records stored under a title.
    pub fn get(&self, title: &str) -> Option<&[Record]> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.records.as_slice())
    }

    /// Titles in first-seen order.
    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Number of distinct titles.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of records across all titles.
    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|s| s.records.len()).sum()
    }
}

impl Serialize for Extraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(&section.title, &section.records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_as_single_key_object() {
        let record = Record::text("交货期", "30天");
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"交货期": "30天"}));
    }

    #[test]
    fn test_mixed_value_serialization() {
        let record = Record::parts(
            "清单",
            vec![
                ValuePart::Text("见下表".to_string()),
                ValuePart::Table(vec![vec!["a".to_string(), "".to_string()]]),
            ],
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"清单": ["见下表", [["a", ""]]]})
        );
    }

    #[test]
    fn test_extraction_merges_titles_in_order() {
        let mut extraction = Extraction::new();
        extraction.append("B", vec![Record::text("k1", "v1")]);
        extraction.append("A", vec![Record::text("k2", "v2")]);
        extraction.append("B", vec![Record::text("k3", "v3")]);

        assert_eq!(extraction.titles(), vec!["B", "A"]);
        assert_eq!(extraction.record_count(), 3);
        assert_eq!(
            serde_json::to_string(&extraction).unwrap(),
            r#"{"B":[{"k1":"v1"},{"k3":"v3"}],"A":[{"k2":"v2"}]}"#
        );
    }

    #[test]
    fn test_shape_accessors() {
        let text = Shape::text("  hello ").at(10, 20).with_height(5);
        assert_eq!(text.text_content(), Some("  hello "));
        assert!(text.has_text());
        assert!(text.table_cells().is_none());
        assert_eq!((text.top, text.left, text.height), (10, 20, 5));

        let blank = Shape::text(" \n ");
        assert!(!blank.has_text());

        let group = Shape::group(vec![text.clone()]);
        assert_eq!(group.children().map(|c| c.len()), Some(1));
        assert!(!group.has_text());
    }
}
