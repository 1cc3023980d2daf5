//! Document-level extraction.
//!
//! Walks the slides in a page range, reconstructs each slide's records and
//! gathers them under the slide title. Slides that share a title accumulate
//! into one entry.

use crate::classify::{classify_shape, content_units, flatten_shapes, has_bullet};
use crate::error::{Error, Result};
use crate::options::{ExtractOptions, FOOTER_ZONE};
use crate::reconstruct::{page_record, reconstruct};
use crate::types::{Document, Extraction, Record, Shape, Slide};

/// Records reconstructed from one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRecords {
    pub title: String,
    pub records: Vec<Record>,
}

/// Placeholder title for slides without any text shape.
pub fn placeholder_title(number: usize) -> String {
    format!("no-title-found page {}", number)
}

/// Runs extraction over a document.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    /// Create an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with the given options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract records from slides `start..=end` (1-based, inclusive).
    ///
    /// Missing bounds default to the whole deck. Per-slide failures are
    /// logged and skipped; only an invalid range is reported as an error.
    pub fn try_extract(
        &self,
        document: &Document,
        start_page: Option<usize>,
        end_page: Option<usize>,
    ) -> Result<Extraction> {
        let total = document.slide_count();
        let start = start_page.unwrap_or(1);
        let end = end_page.unwrap_or(total);

        if start < 1 || end > total || start > end {
            return Err(Error::InvalidRange { start, end, total });
        }

        let mut extraction = Extraction::new();
        for slide in &document.slides[start - 1..end] {
            match self.extract_slide(document, slide) {
                Ok(None) => {
                    log::debug!("Slide {} has only a title, skipping", slide.number);
                }
                Ok(Some(slide_records)) => {
                    log::debug!(
                        "Slide {}: '{}' with {} records",
                        slide.number,
                        slide_records.title,
                        slide_records.records.len()
                    );
                    extraction.append(slide_records.title, slide_records.records);
                }
                Err(Error::EmptySlide(number)) => {
                    log::warn!("Slide {} has no text content, skipping", number);
                }
                Err(e) => {
                    log::error!("Failed to extract slide {}: {}", slide.number, e);
                }
            }
        }

        Ok(extraction)
    }

    /// Like [`Extractor::try_extract`], but an invalid range is logged and
    /// yields an empty extraction.
    pub fn extract(
        &self,
        document: &Document,
        start_page: Option<usize>,
        end_page: Option<usize>,
    ) -> Extraction {
        self.try_extract(document, start_page, end_page)
            .unwrap_or_else(|e| {
                log::warn!("{}", e);
                Extraction::new()
            })
    }

    /// Reconstruct a single slide's title and records.
    ///
    /// Returns `None` for slides with nothing besides the title, such as
    /// cover and section-divider slides.
    pub fn extract_slide(
        &self,
        document: &Document,
        slide: &Slide,
    ) -> Result<Option<SlideRecords>> {
        let leaves = flatten_shapes(&slide.shapes, self.options.max_group_depth())?;
        if !leaves
            .iter()
            .any(|shape| shape.has_text() || shape.table_cells().is_some())
        {
            return Err(Error::EmptySlide(slide.number));
        }

        let title_shape = find_title_shape(slide);
        let title = title_shape
            .and_then(|shape| shape.text_content())
            .and_then(first_paragraph)
            .unwrap_or_else(|| placeholder_title(slide.number));

        let content: Vec<&Shape> = leaves
            .into_iter()
            .filter(|shape| !title_shape.is_some_and(|title| std::ptr::eq(*shape, title)))
            .filter(|shape| !(self.options.skip_page_numbers() && is_page_number(shape, document)))
            .collect();
        if content.is_empty() {
            return Ok(None);
        }

        let records = if content.iter().any(|shape| has_bullet(shape)) {
            let splitter = self.options.splitter();
            reconstruct(content_units(&content), splitter.as_ref())
        } else {
            let units = content.iter().flat_map(|shape| classify_shape(shape));
            page_record(&title, units).into_iter().collect()
        };

        Ok(Some(SlideRecords { title, records }))
    }
}

/// Extract with default options.
pub fn extract(document: &Document, start_page: Option<usize>, end_page: Option<usize>) -> Extraction {
    Extractor::new().extract(document, start_page, end_page)
}

/// The topmost top-level text shape with non-blank text. Ties go to the
/// earlier shape.
pub fn find_title_shape(slide: &Slide) -> Option<&Shape> {
    slide
        .shapes
        .iter()
        .filter(|shape| shape.has_text())
        .min_by_key(|shape| shape.top)
}

/// First non-empty paragraph of a title shape. Soft line breaks stay inside
/// the paragraph.
fn first_paragraph(text: &str) -> Option<String> {
    text.split('\n')
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// A short run of digits sitting in the footer zone of the slide.
fn is_page_number(shape: &Shape, document: &Document) -> bool {
    let Some(slide_height) = document.slide_height.filter(|h| *h > 0) else {
        return false;
    };
    let Some(text) = shape.text_content().map(str::trim) else {
        return false;
    };
    !text.is_empty()
        && text.len() <= 3
        && text.chars().all(|c| c.is_ascii_digit())
        && shape.top as f64 / slide_height as f64 > FOOTER_ZONE
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn title(text: &str) -> Shape {
        Shape::text(text).at(0, 0).with_height(50)
    }

    fn deck(slides: Vec<Vec<Shape>>) -> Document {
        let mut document = Document::new().with_slide_height(1000);
        for (idx, shapes) in slides.into_iter().enumerate() {
            let mut slide = Slide::new(idx + 1);
            for shape in shapes {
                slide.add_shape(shape);
            }
            document.add_slide(slide);
        }
        document
    }

    fn to_json(extraction: &Extraction) -> serde_json::Value {
        serde_json::to_value(extraction).unwrap()
    }

    #[test]
    fn test_bullets_round_trip() {
        let document = deck(vec![vec![
            title("合同主要条款"),
            Shape::text("■ 交货期: 30天\n■ 交货地点: 西安").at(100, 0).with_height(200),
        ]]);
        let extraction = extract(&document, None, None);
        assert_eq!(
            to_json(&extraction),
            json!({"合同主要条款": [{"交货期": "30天"}, {"交货地点": "西安"}]})
        );
    }

    #[test]
    fn test_multi_line_value() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 备注: 第一行\n第二行").at(100, 0).with_height(200),
        ]]);
        assert_eq!(
            extract(&document, None, None).get("T"),
            Some(&[Record::text("备注", "第一行 第二行")][..])
        );
    }

    #[test]
    fn test_secondary_split() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 主条目：主内容，子项一：值一，子项二：值二").at(100, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"T": [{"主条目": "主内容"}, {"子项一": "值一"}, {"子项二": "值二"}]})
        );

        let unsplit = Extractor::with_options(ExtractOptions::new().with_secondary_split(false))
            .extract(&document, None, None);
        assert_eq!(
            to_json(&unsplit),
            json!({"T": [{"主条目": "主内容，子项一：值一，子项二：值二"}]})
        );
    }

    #[test]
    fn test_table_attachment() {
        let document = deck(vec![vec![
            title("采购清单"),
            Shape::text("■ 货物: 食材").at(100, 0).with_height(50),
            Shape::table(grid(&[&["品名", "数量"], &["大米", "10"]])).at(200, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"采购清单": [{"货物": ["食材", [["品名", "数量"], ["大米", "10"]]]}]})
        );
    }

    #[test]
    fn test_bullets_across_text_boxes_ordered_by_position() {
        // Traversal order differs from visual order.
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 丙: 3").at(600, 0),
            Shape::text("补充说明").at(350, 0),
            Shape::text("■ 甲: 1\n■ 乙: 2").at(100, 0).with_height(400),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"T": [{"甲": "1"}, {"乙": "2 补充说明"}, {"丙": "3"}]})
        );
    }

    #[test]
    fn test_no_bullet_fallback() {
        let document = deck(vec![vec![
            title("项目概况"),
            Shape::table(grid(&[&["a", "b"]])).at(100, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"项目概况": [{"项目概况": [[["a", "b"]]]}]})
        );
    }

    #[test]
    fn test_fallback_keeps_traversal_order() {
        let document = deck(vec![vec![
            title("概述"),
            Shape::text("下方文字").at(500, 0),
            Shape::group(vec![Shape::table(grid(&[&["x"]])).at(100, 0)]),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"概述": [{"概述": ["下方文字", [["x"]]]}]})
        );
    }

    #[test]
    fn test_group_children_are_flattened() {
        let document = deck(vec![vec![
            title("T"),
            Shape::group(vec![
                Shape::text("■ 甲: 1").at(100, 0),
                Shape::group(vec![Shape::table(grid(&[&["t"]])).at(150, 0)]),
            ]),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"T": [{"甲": ["1", [["t"]]]}]})
        );
    }

    #[test]
    fn test_title_aggregation() {
        let document = deck(vec![
            vec![title("标段"), Shape::text("■ 甲: 1").at(100, 0)],
            vec![title("其他"), Shape::text("■ 乙: 2").at(100, 0)],
            vec![title("标段"), Shape::text("■ 丙: 3").at(100, 0)],
        ]);
        let extraction = extract(&document, None, None);
        assert_eq!(extraction.titles(), vec!["标段", "其他"]);
        assert_eq!(
            to_json(&extraction),
            json!({"标段": [{"甲": "1"}, {"丙": "3"}], "其他": [{"乙": "2"}]})
        );
    }

    #[test]
    fn test_empty_value_bullet_dropped() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 备注\n■ 甲: 1").at(100, 0),
        ]]);
        assert_eq!(to_json(&extract(&document, None, None)), json!({"T": [{"甲": "1"}]}));
    }

    #[test]
    fn test_invalid_ranges() {
        let document = deck(vec![
            vec![title("A"), Shape::text("■ 甲: 1").at(100, 0)],
            vec![title("B"), Shape::text("■ 乙: 2").at(100, 0)],
            vec![title("C"), Shape::text("■ 丙: 3").at(100, 0)],
        ]);
        let extractor = Extractor::new();
        assert_eq!(extractor.extract(&document, None, None).len(), 3);
        for (start, end) in [(Some(2), Some(1)), (Some(0), Some(3)), (Some(1), Some(4))] {
            assert!(matches!(
                extractor.try_extract(&document, start, end),
                Err(Error::InvalidRange { total: 3, .. })
            ));
            assert!(extractor.extract(&document, start, end).is_empty());
        }
    }

    #[test]
    fn test_page_range_selects_slides() {
        let document = deck(vec![
            vec![title("A"), Shape::text("正文A").at(100, 0)],
            vec![title("B"), Shape::text("正文B").at(100, 0)],
            vec![title("C"), Shape::text("正文C").at(100, 0)],
        ]);
        let extraction = extract(&document, Some(2), None);
        assert_eq!(extraction.titles(), vec!["B", "C"]);
        let extraction = extract(&document, None, Some(1));
        assert_eq!(extraction.titles(), vec!["A"]);
    }

    #[test]
    fn test_idempotent() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 甲: 1，子项：值").at(100, 0),
            Shape::table(grid(&[&["t"]])).at(300, 0),
        ]]);
        let extractor = Extractor::new();
        assert_eq!(
            extractor.extract(&document, Some(1), Some(1)),
            extractor.extract(&document, Some(1), Some(1))
        );
    }

    #[test]
    fn test_title_is_topmost_text_first_line() {
        let slide = Slide::new(1)
            .with_shape(Shape::text("正文").at(300, 0))
            .with_shape(Shape::table(grid(&[&["t"]])).at(0, 0))
            .with_shape(Shape::text("\n主标题\n副标题").at(10, 0));
        let records = Extractor::new()
            .extract_slide(&Document::new(), &slide)
            .unwrap()
            .unwrap();
        assert_eq!(records.title, "主标题");
    }

    #[test]
    fn test_title_keeps_soft_line_breaks() {
        let document = deck(vec![vec![
            Shape::text("合同\x0B主要条款\n副标题").at(0, 0),
            Shape::text("■ 甲: 1").at(100, 0),
        ]]);
        assert_eq!(
            extract(&document, None, None).titles(),
            vec!["合同\x0B主要条款"]
        );
    }

    #[test]
    fn test_placeholder_title_without_text() {
        let document = deck(vec![vec![Shape::table(grid(&[&["a"]])).at(100, 0)]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"no-title-found page 1": [{"no-title-found page 1": [[["a"]]]}]})
        );
    }

    #[test]
    fn test_empty_slide_is_skipped() {
        let document = deck(vec![
            vec![Shape::text("  ").at(0, 0)],
            vec![title("B"), Shape::text("■ 甲: 1").at(100, 0)],
        ]);
        let extractor = Extractor::new();
        assert!(matches!(
            extractor.extract_slide(&document, &document.slides[0]),
            Err(Error::EmptySlide(1))
        ));
        assert_eq!(extractor.extract(&document, None, None).titles(), vec!["B"]);
    }

    #[test]
    fn test_slide_failure_is_isolated() {
        let mut nested = Shape::text("■ 甲: 1").at(100, 0);
        for _ in 0..3 {
            nested = Shape::group(vec![nested]);
        }
        let document = deck(vec![
            vec![title("A"), nested],
            vec![title("B"), Shape::text("■ 乙: 2").at(100, 0)],
        ]);
        let extractor = Extractor::with_options(ExtractOptions::new().with_max_group_depth(2));
        let extraction = extractor.extract(&document, None, None);
        assert_eq!(to_json(&extraction), json!({"B": [{"乙": "2"}]}));
    }

    #[test]
    fn test_footer_page_numbers_skipped() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 甲: 1").at(100, 0),
            Shape::text("12").at(950, 0),
        ]]);
        assert_eq!(to_json(&extract(&document, None, None)), json!({"T": [{"甲": "1"}]}));

        let keep = Extractor::with_options(ExtractOptions::new().with_skip_page_numbers(false));
        assert_eq!(
            to_json(&keep.extract(&document, None, None)),
            json!({"T": [{"甲": "1 12"}]})
        );
    }

    #[test]
    fn test_malformed_table_does_not_abort_slide() {
        let document = deck(vec![vec![
            title("T"),
            Shape::text("■ 甲: 1").at(100, 0),
            Shape::malformed_table("broken").at(200, 0),
            Shape::text("■ 乙: 2").at(300, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"T": [{"甲": ["1", []]}, {"乙": "2"}]})
        );
    }

    #[test]
    fn test_title_only_slide_is_skipped() {
        let document = deck(vec![
            vec![title("项目概况"), Shape::text("正文").at(100, 0)],
            vec![title("第二部分")],
        ]);
        let extractor = Extractor::new();
        assert!(extractor
            .extract_slide(&document, &document.slides[1])
            .unwrap()
            .is_none());
        assert_eq!(
            to_json(&extractor.extract(&document, None, None)),
            json!({"项目概况": [{"项目概况": ["正文"]}]})
        );
    }

    #[test]
    fn test_free_text_is_trimmed() {
        let document = deck(vec![vec![
            title("项目概况"),
            Shape::text("正文\n").at(100, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"项目概况": [{"项目概况": ["正文"]}]})
        );

        let document = deck(vec![vec![
            title("T"),
            Shape::text("  前言\n").at(100, 0),
            Shape::text("■ 甲: 1").at(200, 0),
        ]]);
        assert_eq!(
            to_json(&extract(&document, None, None)),
            json!({"T": [{"text_block": "前言"}, {"甲": "1"}]})
        );
    }
}
