//! Bullet-delimited key-value parsing.
//!
//! Text shapes in the source decks mark each labelled field with a `■`
//! bullet, e.g. `■ 交货期：30天`. A field's value runs until the next bullet
//! or the end of the shape, so it may span several physical lines.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

/// Marker that opens a new labelled field.
pub const BULLET_MARKER: char = '■';

/// Full-width colon, normalized to ASCII before splitting.
const FULLWIDTH_COLON: char = '：';

/// Splits text into physical lines on any vertical whitespace control.
static LINE_BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\n\x0B\x0C\r]+").unwrap());

/// An embedded `label: text` fragment: a separator, then a label run that is
/// immediately followed by a colon. Label length is checked by the caller.
static SECONDARY_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[。、，,\s]\s*([^\s：:。、，,]+)[：:]").unwrap());

/// Split raw shape text into trimmed, non-empty physical lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    LINE_BREAK_REGEX
        .split(text)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whether a trimmed line opens a new field.
pub fn is_bullet_line(line: &str) -> bool {
    line.starts_with(BULLET_MARKER)
}

/// Split a bullet line into `(key, first value fragment)`.
///
/// The marker is stripped and the first full-width colon normalized to ASCII
/// before splitting on the first colon. Without a colon the whole remainder
/// is the key and the fragment is empty.
pub fn parse_bullet_line(line: &str) -> (String, String) {
    let body = line.trim().trim_start_matches(BULLET_MARKER).trim();
    let normalized = body.replacen(FULLWIDTH_COLON, ":", 1);
    match normalized.split_once(':') {
        Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
        None => (normalized.trim().to_string(), String::new()),
    }
}

/// One bulleted field within a text shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletSegment {
    /// Index of the bullet line among the shape's physical lines.
    pub line_index: usize,
    pub key: String,
    /// The fragment after the colon plus any continuation lines, joined with
    /// single spaces.
    pub value: String,
}

/// A text shape split into bulleted fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeText {
    /// Lines that precede the first bullet and belong to no field.
    pub leading: Vec<String>,
    pub bullets: Vec<BulletSegment>,
    /// Total number of non-empty physical lines.
    pub line_count: usize,
}

/// Group a shape's lines into bulleted fields.
pub fn segment_text(text: &str) -> ShapeText {
    let lines = split_lines(text);
    let mut shape_text = ShapeText {
        line_count: lines.len(),
        ..Default::default()
    };
    let mut open: Option<OpenSegment> = None;

    for (idx, line) in lines.into_iter().enumerate() {
        if is_bullet_line(line) {
            if let Some(segment) = open.take() {
                shape_text.bullets.push(segment.close());
            }
            let (key, fragment) = parse_bullet_line(line);
            let mut segment = OpenSegment {
                line_index: idx,
                key,
                value_lines: Vec::new(),
            };
            if !fragment.is_empty() {
                segment.value_lines.push(fragment);
            }
            open = Some(segment);
        } else if let Some(segment) = open.as_mut() {
            segment.value_lines.push(line.to_string());
        } else {
            shape_text.leading.push(line.to_string());
        }
    }

    if let Some(segment) = open {
        shape_text.bullets.push(segment.close());
    }

    shape_text
}

struct OpenSegment {
    line_index: usize,
    key: String,
    value_lines: Vec<String>,
}

impl OpenSegment {
    fn close(self) -> BulletSegment {
        BulletSegment {
            line_index: self.line_index,
            key: self.key,
            value: self.value_lines.join(" ").trim().to_string(),
        }
    }
}

/// A value string split into its primary text and embedded labelled fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitValue {
    pub primary: String,
    pub secondary: Vec<(String, String)>,
}

/// Detects secondary `label: text` pairs packed into one field's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondarySplitter {
    key_len: RangeInclusive<usize>,
}

impl Default for SecondarySplitter {
    fn default() -> Self {
        Self { key_len: 2..=8 }
    }
}

impl SecondarySplitter {
    /// Create a splitter with the default 2–8 character label bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted label length, in characters.
    pub fn with_key_len(mut self, key_len: RangeInclusive<usize>) -> Self {
        self.key_len = key_len;
        self
    }

    pub fn key_len(&self) -> &RangeInclusive<usize> {
        &self.key_len
    }

    /// Split a value into primary text and secondary pairs.
    ///
    /// Everything before the first embedded label is the primary value. Each
    /// label takes the text up to the next label (or the end). Pairs with an
    /// empty value are dropped.
    pub fn split(&self, value: &str) -> SplitValue {
        let labels: Vec<(usize, usize, &str)> = SECONDARY_KEY_REGEX
            .captures_iter(value)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let key = caps.get(1)?.as_str();
                self.key_len
                    .contains(&key.chars().count())
                    .then_some((whole.start(), whole.end(), key))
            })
            .collect();

        let Some(&(first_start, _, _)) = labels.first() else {
            return SplitValue {
                primary: value.trim().to_string(),
                secondary: Vec::new(),
            };
        };

        let secondary = labels
            .iter()
            .enumerate()
            .filter_map(|(i, &(_, end, key))| {
                let next = labels.get(i + 1).map_or(value.len(), |l| l.0);
                let text = value[end..next].trim();
                (!text.is_empty()).then(|| (key.to_string(), text.to_string()))
            })
            .collect();

        SplitValue {
            primary: value[..first_start].trim().to_string(),
            secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_on_all_vertical_whitespace() {
        let lines = split_lines("a\nb\x0Bc\x0Cd\r\ne\n\n  \n f ");
        assert_eq!(lines, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_parse_bullet_line() {
        assert_eq!(
            parse_bullet_line("■ 交货期：30天"),
            ("交货期".to_string(), "30天".to_string())
        );
        assert_eq!(
            parse_bullet_line("■交货地点: 西安"),
            ("交货地点".to_string(), "西安".to_string())
        );
        assert_eq!(
            parse_bullet_line("■ 备注"),
            ("备注".to_string(), String::new())
        );
        // Only the first colon splits.
        assert_eq!(
            parse_bullet_line("■ 时间：上午9:00"),
            ("时间".to_string(), "上午9:00".to_string())
        );
    }

    fn fields(text: &str) -> Vec<(String, String)> {
        segment_text(text)
            .bullets
            .into_iter()
            .map(|b| (b.key, b.value))
            .collect()
    }

    fn field(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_bullets_in_order() {
        assert_eq!(
            fields("■ 交货期: 30天\n■ 交货地点: 西安"),
            vec![field("交货期", "30天"), field("交货地点", "西安")]
        );
    }

    #[test]
    fn test_multi_line_value() {
        assert_eq!(fields("■ 备注: 第一行\n第二行"), vec![field("备注", "第一行 第二行")]);
    }

    #[test]
    fn test_value_on_following_line() {
        assert_eq!(
            fields("■ 采购内容：\n食材\x0B调料"),
            vec![field("采购内容", "食材 调料")]
        );
    }

    #[test]
    fn test_bullet_without_value_keeps_empty_field() {
        // Dropping empty fields happens when records are reconstructed.
        assert_eq!(
            fields("■ 备注\n■ 交货期：30天\n■ 联系人："),
            vec![field("备注", ""), field("交货期", "30天"), field("联系人", "")]
        );
    }

    #[test]
    fn test_lines_before_first_bullet_are_leading() {
        let segmented = segment_text("说明文字\n■ 交货期：30天");
        assert_eq!(segmented.leading, vec!["说明文字"]);
        assert_eq!(segmented.line_count, 2);
        assert_eq!(segmented.bullets.len(), 1);
        assert_eq!(segmented.bullets[0].line_index, 1);
        assert_eq!(segmented.bullets[0].key, "交货期");
    }

    #[test]
    fn test_secondary_split() {
        let split = SecondarySplitter::new().split("主内容，子项一：值一，子项二：值二");
        assert_eq!(split.primary, "主内容");
        assert_eq!(
            split.secondary,
            vec![
                ("子项一".to_string(), "值一".to_string()),
                ("子项二".to_string(), "值二".to_string())
            ]
        );
    }

    #[test]
    fn test_secondary_split_respects_key_length() {
        let splitter = SecondarySplitter::new();
        // One-character and overlong labels are not labels.
        let split = splitter.split("内容，甲：乙，一二三四五六七八九：十");
        assert_eq!(split.primary, "内容，甲：乙，一二三四五六七八九：十");
        assert!(split.secondary.is_empty());

        let wide = SecondarySplitter::new().with_key_len(1..=8);
        let split = wide.split("内容，甲：乙");
        assert_eq!(split.primary, "内容");
        assert_eq!(split.secondary, vec![("甲".to_string(), "乙".to_string())]);
    }

    #[test]
    fn test_secondary_split_needs_separator() {
        let split = SecondarySplitter::new().split("地点：西安");
        assert_eq!(split.primary, "地点：西安");
        assert!(split.secondary.is_empty());
    }

    #[test]
    fn test_secondary_split_whitespace_separator() {
        let split = SecondarySplitter::new().split("合同签订后30天 交货地点: 西安");
        assert_eq!(split.primary, "合同签订后30天");
        assert_eq!(split.secondary, vec![("交货地点".to_string(), "西安".to_string())]);
    }

    #[test]
    fn test_secondary_split_drops_empty_values() {
        let split = SecondarySplitter::new().split("主内容，子项一：，子项二：值二");
        assert_eq!(split.primary, "主内容");
        assert_eq!(split.secondary, vec![("子项二".to_string(), "值二".to_string())]);
    }
}
