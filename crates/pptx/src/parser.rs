//! PPTX file parser implementation.

use deck_core::{Document, Error, Result, Shape, Slide};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Consecutive XML errors tolerated in one slide before giving up on it.
const MAX_XML_ERRORS: usize = 32;

/// Soft line break inside a paragraph, as rendered in shape text.
const LINE_BREAK: char = '\u{000B}';

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader into a shape-level document.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Document> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let presentation_xml = self.read_file_from_archive(&mut archive, PRESENTATION_PATH).ok();
        let mut document = Document::new();
        if let Some(height) = presentation_xml.as_deref().and_then(slide_height) {
            document = document.with_slide_height(height);
        }

        let slide_order = self.get_slide_order(&mut archive, presentation_xml.as_deref())?;
        log::debug!("Found {} slides", slide_order.len());

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let content = self.read_file_from_archive(&mut archive, slide_path)?;
            let mut slide = Slide::new(idx + 1);
            for shape in parse_shape_tree(&content)? {
                slide.add_shape(shape);
            }
            document.add_slide(slide);
        }

        Ok(document)
    }

    /// Get the ordered list of slide paths.
    ///
    /// The slide id list in `presentation.xml` is authoritative; without one,
    /// slide relationships are sorted by their trailing number.
    fn get_slide_order<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        presentation_xml: Option<&str>,
    ) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let relationships = slide_relationships(&rels_content)?;

        if let Some(ids) = presentation_xml.map(slide_id_list).transpose()? {
            let targets: HashMap<&str, &str> = relationships
                .iter()
                .map(|(id, path)| (id.as_str(), path.as_str()))
                .collect();
            let ordered: Vec<String> = ids
                .iter()
                .filter_map(|id| match targets.get(id.as_str()) {
                    Some(path) => Some(path.to_string()),
                    None => {
                        log::warn!("Slide id list references unknown relationship '{}'", id);
                        None
                    }
                })
                .collect();
            if !ordered.is_empty() {
                return Ok(ordered);
            }
        }

        let mut slides: Vec<(String, Option<usize>)> = relationships
            .into_iter()
            .map(|(id, path)| {
                let order_num = extract_slide_number(&path).or_else(|| extract_slide_number(&id));
                (path, order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Slide relationships as `(relationship id, archive path)`.
fn slide_relationships(rels_content: &str) -> Result<Vec<(String, String)>> {
    let mut slides = Vec::new();
    let mut reader = Reader::from_str(rels_content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let rel_type = attr_value(e, b"Type").unwrap_or_default();
                let target = attr_value(e, b"Target").unwrap_or_default();
                let id = attr_value(e, b"Id").unwrap_or_default();

                // Only slides, not layouts or masters
                if rel_type.ends_with("/slide") {
                    let full_path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    slides.push((id, full_path));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Relationship ids from `p:sldIdLst`, in presentation order.
fn slide_id_list(presentation_xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The relationship id lives in the `r:` namespace.
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|attr| {
                        let key = attr.key.as_ref();
                        key != b"id" && local_name(key) == b"id"
                    })
                    .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Slide height in EMU from `p:sldSz`.
fn slide_height(presentation_xml: &str) -> Option<i64> {
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldSz" =>
            {
                return attr_value(e, b"cy").and_then(|v| v.parse().ok());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Kinds of shape element found in a slide's shape tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Shape,
    GraphicFrame,
    Group,
}

impl ElementKind {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" | b"pic" | b"cxnSp" => Some(Self::Shape),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"grpSp" => Some(Self::Group),
            _ => None,
        }
    }
}

/// A shape element whose end tag has not been seen yet.
#[derive(Debug)]
struct PendingShape {
    kind: ElementKind,
    top: i64,
    left: i64,
    height: i64,
    has_offset: bool,
    has_extent: bool,
    paragraphs: Vec<String>,
    children: Vec<Shape>,
    table: Option<PendingTable>,
}

impl PendingShape {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            top: 0,
            left: 0,
            height: 0,
            has_offset: false,
            has_extent: false,
            paragraphs: Vec::new(),
            children: Vec::new(),
            table: None,
        }
    }

    /// Record the shape's own offset; later (child) offsets are ignored.
    ///
    /// Offsets are taken as written. Inside a group they are in the group's
    /// `chOff`/`chExt` child space, not slide-absolute.
    fn set_offset(&mut self, e: &BytesStart) {
        if self.has_offset {
            return;
        }
        if let Some(top) = attr_value(e, b"y").and_then(|v| v.parse().ok()) {
            self.has_offset = true;
            self.top = top;
            self.left = attr_value(e, b"x").and_then(|v| v.parse().ok()).unwrap_or(0);
        }
    }

    /// Record the shape's own extent. `a:ext` also names extension-list
    /// entries, which carry no `cy` and are skipped.
    fn set_extent(&mut self, e: &BytesStart) {
        if self.has_extent {
            return;
        }
        if let Some(height) = attr_value(e, b"cy").and_then(|v| v.parse().ok()) {
            self.has_extent = true;
            self.height = height;
        }
    }

    /// Convert into a shape, or `None` for elements that carry nothing.
    fn finish(self) -> Option<Shape> {
        let shape = match self.kind {
            ElementKind::Group => {
                if self.children.is_empty() {
                    return None;
                }
                Shape::group(self.children)
            }
            ElementKind::GraphicFrame => match self.table {
                Some(table) => table.finish(),
                None => return None,
            },
            ElementKind::Shape => {
                let text = self.paragraphs.join("\n");
                if text.trim().is_empty() {
                    return None;
                }
                Shape::text(text)
            }
        };
        Some(shape.at(self.top, self.left).with_height(self.height))
    }
}

/// A table being read from `a:tbl`.
#[derive(Debug, Default)]
struct PendingTable {
    rows: Vec<Vec<String>>,
    /// Paragraphs of the cell currently open.
    cell: Option<Vec<String>>,
    malformed: Option<String>,
}

impl PendingTable {
    fn start_row(&mut self) {
        self.rows.push(Vec::new());
    }

    fn start_cell(&mut self) {
        if self.rows.is_empty() {
            self.mark_malformed("cell outside of a table row");
        }
        self.cell = Some(Vec::new());
    }

    fn end_cell(&mut self) {
        let text = self.cell.take().map(|p| p.join("\n")).unwrap_or_default();
        match self.rows.last_mut() {
            Some(row) => row.push(text),
            None => self.mark_malformed("cell outside of a table row"),
        }
    }

    fn mark_malformed(&mut self, reason: &str) {
        if self.malformed.is_none() {
            self.malformed = Some(reason.to_string());
        }
    }

    fn finish(self) -> Shape {
        match self.malformed {
            Some(reason) => Shape::malformed_table(reason),
            None => Shape::table(self.rows),
        }
    }
}

/// Parse a slide's XML into its top-level shapes, with groups nested.
pub fn parse_shape_tree(xml_content: &str) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    let mut stack: Vec<PendingShape> = Vec::new();
    let mut reader = Reader::from_str(xml_content);

    let mut paragraph: Option<String> = None;
    let mut in_text_run = false;
    let mut xml_errors = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                xml_errors = 0;
                let name = e.name();
                let local = local_name(name.as_ref());

                if let Some(kind) = ElementKind::from_local_name(local) {
                    stack.push(PendingShape::new(kind));
                    continue;
                }
                let Some(current) = stack.last_mut() else {
                    continue;
                };
                match local {
                    b"off" => current.set_offset(e),
                    b"ext" => current.set_extent(e),
                    b"tbl" if current.kind == ElementKind::GraphicFrame => {
                        current.table = Some(PendingTable::default());
                    }
                    b"tr" => {
                        if let Some(table) = current.table.as_mut() {
                            table.start_row();
                        }
                    }
                    b"tc" => {
                        if let Some(table) = current.table.as_mut() {
                            table.start_cell();
                        }
                    }
                    b"p" => paragraph = Some(String::new()),
                    b"t" => in_text_run = paragraph.is_some(),
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                let Some(current) = stack.last_mut() else {
                    continue;
                };
                match local {
                    b"off" => current.set_offset(e),
                    b"ext" => current.set_extent(e),
                    b"br" => {
                        if let Some(text) = paragraph.as_mut() {
                            text.push(LINE_BREAK);
                        }
                    }
                    // An empty paragraph still counts as a line.
                    b"p" => push_paragraph(current, String::new()),
                    b"tc" => {
                        if let Some(table) = current.table.as_mut() {
                            table.start_cell();
                            table.end_cell();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_text_run {
                    if let Some(text) = paragraph.as_mut() {
                        let unescaped = e.unescape().unwrap_or_default();
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if ElementKind::from_local_name(local).is_some() {
                    let Some(pending) = stack.pop() else {
                        continue;
                    };
                    if let Some(shape) = pending.finish() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(shape),
                            None => shapes.push(shape),
                        }
                    }
                    continue;
                }
                match local {
                    b"t" => in_text_run = false,
                    b"p" => {
                        if let (Some(text), Some(current)) = (paragraph.take(), stack.last_mut()) {
                            push_paragraph(current, text);
                        }
                    }
                    b"tc" => {
                        if let Some(table) = stack.last_mut().and_then(|s| s.table.as_mut()) {
                            table.end_cell();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                xml_errors += 1;
                if xml_errors > MAX_XML_ERRORS {
                    return Err(Error::XmlError(format!("Slide XML is unreadable: {}", e)));
                }
                log::warn!("XML parsing error (continuing): {}", e);
                if let Some(table) = stack.last_mut().and_then(|s| s.table.as_mut()) {
                    table.mark_malformed(&format!("XML error inside table: {}", e));
                }
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Route a finished paragraph to the open table cell, or to the shape text.
fn push_paragraph(shape: &mut PendingShape, text: String) {
    match shape.table.as_mut().and_then(|t| t.cell.as_mut()) {
        Some(cell) => cell.push(text),
        None => shape.paragraphs.push(text),
    }
}

/// Read an attribute as a string.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
