//! Slide reconstruction.
//!
//! Replays a slide's ordered content units through a small state machine:
//! each bullet opens a record, and text blocks or tables below it attach to
//! the most recently opened record until the next bullet.

use crate::classify::ContentUnit;
use crate::keyvalue::SecondarySplitter;
use crate::types::{Record, ValuePart};

/// A record that is still collecting value parts.
#[derive(Debug)]
struct OpenRecord {
    key: String,
    parts: Vec<ValuePart>,
    /// Labelled sub-fields split out of the bullet's own text, emitted as
    /// siblings right after this record.
    secondary: Vec<(String, String)>,
}

#[derive(Debug)]
enum State {
    NoOpenRecord,
    RecordOpen(OpenRecord),
}

/// Reassembles ordered content units into records.
#[derive(Debug)]
pub struct Reconstructor<'a> {
    splitter: Option<&'a SecondarySplitter>,
    state: State,
    output: Vec<Record>,
}

impl<'a> Reconstructor<'a> {
    /// Create a reconstructor; pass a splitter to split labelled sub-fields
    /// out of bullet values.
    pub fn new(splitter: Option<&'a SecondarySplitter>) -> Self {
        Self {
            splitter,
            state: State::NoOpenRecord,
            output: Vec::new(),
        }
    }

    /// Feed the next unit, in ascending vertical order.
    pub fn feed(&mut self, unit: ContentUnit) {
        match unit {
            ContentUnit::KeyLine { key, value, .. } => {
                self.close();
                let (primary, secondary) = match self.splitter {
                    Some(splitter) => {
                        let split = splitter.split(&value);
                        (split.primary, split.secondary)
                    }
                    None => (value, Vec::new()),
                };
                let mut parts = Vec::new();
                if !primary.is_empty() {
                    parts.push(ValuePart::Text(primary));
                }
                self.state = State::RecordOpen(OpenRecord {
                    key,
                    parts,
                    secondary,
                });
            }
            ContentUnit::TextBlock { text, .. } => match &mut self.state {
                State::RecordOpen(open) => open.parts.push(ValuePart::Text(text)),
                State::NoOpenRecord => self.output.push(Record::text_block(text)),
            },
            ContentUnit::Table { grid, .. } => match &mut self.state {
                State::RecordOpen(open) => open.parts.push(ValuePart::Table(grid)),
                State::NoOpenRecord => self.output.push(Record::table(grid)),
            },
        }
    }

    /// Close any open record and return everything emitted.
    pub fn finish(mut self) -> Vec<Record> {
        self.close();
        self.output
    }

    fn close(&mut self) {
        let State::RecordOpen(open) = std::mem::replace(&mut self.state, State::NoOpenRecord)
        else {
            return;
        };

        let parts = merge_text_parts(open.parts);
        if open.key.is_empty() {
            // A bullet without a label: keep its content as standalone units.
            self.output.extend(parts.into_iter().map(|part| match part {
                ValuePart::Text(text) => Record::text_block(text),
                ValuePart::Table(grid) => Record::table(grid),
            }));
        } else if let Some(record) = format_record(open.key, parts) {
            self.output.push(record);
        }

        self.output.extend(
            open.secondary
                .into_iter()
                .map(|(key, value)| Record::text(key, value)),
        );
    }
}

/// Run ordered units through a fresh [`Reconstructor`].
pub fn reconstruct(
    units: impl IntoIterator<Item = ContentUnit>,
    splitter: Option<&SecondarySplitter>,
) -> Vec<Record> {
    let mut reconstructor = Reconstructor::new(splitter);
    for unit in units {
        reconstructor.feed(unit);
    }
    reconstructor.finish()
}

/// Join runs of consecutive text parts with a single space. Tables stay
/// distinct entries; empty text is dropped.
fn merge_text_parts(parts: Vec<ValuePart>) -> Vec<ValuePart> {
    let mut merged = Vec::with_capacity(parts.len());
    let mut pending = String::new();

    for part in parts {
        match part {
            ValuePart::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if !pending.is_empty() {
                    pending.push(' ');
                }
                pending.push_str(text);
            }
            table @ ValuePart::Table(_) => {
                if !pending.is_empty() {
                    merged.push(ValuePart::Text(std::mem::take(&mut pending)));
                }
                merged.push(table);
            }
        }
    }
    if !pending.is_empty() {
        merged.push(ValuePart::Text(pending));
    }

    merged
}

/// Shape the final value: a lone text part becomes a plain string, anything
/// richer stays a list. A key with nothing attached yields no record.
fn format_record(key: String, mut parts: Vec<ValuePart>) -> Option<Record> {
    match parts.len() {
        0 => {
            log::debug!("Dropping empty field '{}'", key);
            None
        }
        1 if matches!(parts[0], ValuePart::Text(_)) => match parts.pop() {
            Some(ValuePart::Text(text)) => Some(Record::text(key, text)),
            _ => None,
        },
        _ => Some(Record::parts(key, parts)),
    }
}

/// Whole-page record for slides without any bullet: the title mapped to every
/// content shape's text or table, in traversal order.
pub fn page_record(title: &str, units: impl IntoIterator<Item = ContentUnit>) -> Option<Record> {
    let parts: Vec<ValuePart> = units
        .into_iter()
        .filter_map(|unit| match unit {
            ContentUnit::TextBlock { text, .. } => Some(ValuePart::Text(text)),
            ContentUnit::Table { grid, .. } => Some(ValuePart::Table(grid)),
            ContentUnit::KeyLine { .. } => None,
        })
        .collect();

    (!parts.is_empty()).then(|| Record::parts(title, parts))
}
