//! Extraction settings.

use std::ops::RangeInclusive;

use crate::keyvalue::SecondarySplitter;

/// Default bound on nested group shapes.
pub const DEFAULT_MAX_GROUP_DEPTH: usize = 32;

/// Footer zone, as a fraction of slide height, where page numbers live.
pub const FOOTER_ZONE: f64 = 0.9;

/// Settings for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Split labelled sub-fields out of bullet values.
    secondary_split: bool,

    /// Accepted sub-field label length, in characters.
    secondary_key_len: RangeInclusive<usize>,

    /// Drop footer page-number shapes.
    skip_page_numbers: bool,

    /// Maximum group nesting before a slide is rejected.
    max_group_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            secondary_split: true,
            secondary_key_len: 2..=8,
            skip_page_numbers: true,
            max_group_depth: DEFAULT_MAX_GROUP_DEPTH,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the secondary split.
    pub fn with_secondary_split(mut self, enabled: bool) -> Self {
        self.secondary_split = enabled;
        self
    }

    /// Set the accepted sub-field label length (at least 1 character).
    pub fn with_secondary_key_len(mut self, key_len: RangeInclusive<usize>) -> Self {
        let (min, max) = key_len.into_inner();
        self.secondary_key_len = min.max(1)..=max;
        self
    }

    /// Enable or disable footer page-number filtering.
    pub fn with_skip_page_numbers(mut self, skip: bool) -> Self {
        self.skip_page_numbers = skip;
        self
    }

    /// Set the maximum group nesting depth.
    pub fn with_max_group_depth(mut self, depth: usize) -> Self {
        self.max_group_depth = depth;
        self
    }

    /// The configured splitter, or `None` when splitting is off.
    pub fn splitter(&self) -> Option<SecondarySplitter> {
        self.secondary_split
            .then(|| SecondarySplitter::new().with_key_len(self.secondary_key_len.clone()))
    }

    pub fn skip_page_numbers(&self) -> bool {
        self.skip_page_numbers
    }

    pub fn max_group_depth(&self) -> usize {
        self.max_group_depth
    }
}
