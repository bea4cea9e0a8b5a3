//! Text measuring for labels that ask for their size

use std::collections::BTreeMap;

use remote_ui_protocol::{
    ArrayMap, ElementMeasurings, ElementMinSize, FontHeightMeasuring, FontProperties, ImageMetadata,
    LabelMeasuringRequest, Size, SolidLabelDesc,
};

pub trait TextMeasurer {
    /// Height of one line in `font`
    fn font_height(&self, font: &FontProperties) -> i64;

    /// Width of `line` laid out on a single line
    fn line_width(&self, line: &str, font: &FontProperties) -> i64;
}

/// Every glyph advances by the same fraction of the font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPitchMeasurer {
    pub advance: f64,
    pub line_height: f64,
}

impl Default for FixedPitchMeasurer {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
impl TextMeasurer for FixedPitchMeasurer {
    fn font_height(&self, font: &FontProperties) -> i64 {
        (font.size as f64 * self.line_height).ceil() as i64
    }

    fn line_width(&self, line: &str, font: &FontProperties) -> i64 {
        (line.chars().count() as f64 * font.size as f64 * self.advance).ceil() as i64
    }
}

/// Minimum size a label needs to show its whole text
pub fn label_min_size(
    measurer: &dyn TextMeasurer,
    label: &SolidLabelDesc,
    font: &FontProperties,
) -> Size {
    let text = label.text.as_deref().unwrap_or_default();
    let line_height = measurer.font_height(font);
    if label.wrap_line {
        // Wrapped labels fit any width; they need at least one line.
        return Size::new(0, line_height);
    }
    if label.multiline {
        let mut lines = 0;
        let mut width = 0;
        for line in text.split('\n') {
            lines += 1;
            width = width.max(measurer.line_width(line, font));
        }
        Size::new(width, line_height * lines)
    } else {
        let single = text.replace(['\r', '\n'], " ");
        Size::new(measurer.line_width(&single, font), line_height)
    }
}

/// Answer the pending measuring requests and report newly created images
pub fn collect_measurings(
    measurer: &dyn TextMeasurer,
    requests: &[(SolidLabelDesc, LabelMeasuringRequest)],
    default_font: &FontProperties,
    created_images: Vec<ImageMetadata>,
) -> ElementMeasurings {
    let mut heights: BTreeMap<(String, i64), i64> = BTreeMap::new();
    let mut min_sizes = ArrayMap::new();

    for (label, request) in requests {
        let font = label.font.as_ref().unwrap_or(default_font);
        match request {
            LabelMeasuringRequest::FontHeight => {
                heights
                    .entry((font.font_family.clone(), font.size))
                    .or_insert_with(|| measurer.font_height(font));
            }
            LabelMeasuringRequest::TotalSize => {
                min_sizes.insert(ElementMinSize {
                    id: label.id,
                    min_size: label_min_size(measurer, label, font),
                });
            }
        }
    }

    let font_heights: Vec<FontHeightMeasuring> = heights
        .into_iter()
        .map(|((font_family, font_size), height)| FontHeightMeasuring {
            font_family,
            font_size,
            height,
        })
        .collect();

    let created_images = if created_images.is_empty() {
        None
    } else {
        let mut map = ArrayMap::new();
        for image in created_images {
            map.insert(image);
        }
        Some(map)
    };

    ElementMeasurings {
        font_heights: (!font_heights.is_empty()).then_some(font_heights),
        min_sizes: (!min_sizes.is_empty()).then_some(min_sizes),
        created_images,
    }
}

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasMeasurer;

#[cfg(target_arch = "wasm32")]
mod canvas {
    use wasm_bindgen::JsCast;
    use web_sys::{window, CanvasRenderingContext2d, HtmlCanvasElement};

    use super::{FixedPitchMeasurer, TextMeasurer};
    use crate::style::font_css;
    use remote_ui_protocol::FontProperties;

    /// Measures with an offscreen 2D canvas, falling back to fixed pitch
    pub struct CanvasMeasurer {
        context: Option<CanvasRenderingContext2d>,
        fallback: FixedPitchMeasurer,
    }

    impl CanvasMeasurer {
        pub fn new() -> Self {
            let context = window()
                .and_then(|w| w.document())
                .and_then(|d| d.create_element("canvas").ok())
                .and_then(|e| e.dyn_into::<HtmlCanvasElement>().ok())
                .and_then(|c| c.get_context("2d").ok().flatten())
                .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
            Self {
                context,
                fallback: FixedPitchMeasurer::default(),
            }
        }
    }

    impl Default for CanvasMeasurer {
        fn default() -> Self {
            Self::new()
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    impl TextMeasurer for CanvasMeasurer {
        fn font_height(&self, font: &FontProperties) -> i64 {
            let Some(ctx) = &self.context else {
                return self.fallback.font_height(font);
            };
            ctx.set_font(&font_css(font));
            match ctx.measure_text("Mg") {
                Ok(metrics) => {
                    (metrics.font_bounding_box_ascent() + metrics.font_bounding_box_descent()).ceil()
                        as i64
                }
                Err(_) => self.fallback.font_height(font),
            }
        }

        fn line_width(&self, line: &str, font: &FontProperties) -> i64 {
            let Some(ctx) = &self.context else {
                return self.fallback.line_width(line, font);
            };
            ctx.set_font(&font_css(font));
            ctx.measure_text(line)
                .map_or_else(|_| self.fallback.line_width(line, font), |m| m.width().ceil() as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_ui_protocol::MapKey;

    fn font(size: i64) -> FontProperties {
        FontProperties {
            font_family: "Mono".to_string(),
            size,
            ..FontProperties::default()
        }
    }

    fn label(id: i64, text: &str, multiline: bool) -> SolidLabelDesc {
        SolidLabelDesc {
            id,
            text: Some(text.to_string()),
            font: Some(font(10)),
            multiline,
            ..SolidLabelDesc::default()
        }
    }

    #[test]
    fn fixed_pitch_sizes() {
        let measurer = FixedPitchMeasurer::default();
        assert_eq!(measurer.font_height(&font(10)), 12);
        assert_eq!(measurer.line_width("abcde", &font(10)), 30);
    }

    #[test]
    fn multiline_label_uses_widest_line() {
        let measurer = FixedPitchMeasurer::default();
        let size = label_min_size(&measurer, &label(1, "ab\nabcd", true), &font(10));
        assert_eq!(size, Size::new(24, 24));

        let single = label_min_size(&measurer, &label(1, "ab\nabcd", false), &font(10));
        assert_eq!(single, Size::new(42, 12));
    }

    #[test]
    fn measurings_group_font_heights() {
        let measurer = FixedPitchMeasurer::default();
        let requests = vec![
            (label(1, "a", false), LabelMeasuringRequest::FontHeight),
            (label(2, "b", false), LabelMeasuringRequest::FontHeight),
            (label(3, "abc", false), LabelMeasuringRequest::TotalSize),
        ];
        let measurings = collect_measurings(&measurer, &requests, &font(12), Vec::new());

        assert_eq!(measurings.font_heights.as_ref().map(Vec::len), Some(1));
        let sizes = measurings.min_sizes.unwrap();
        assert_eq!(
            sizes.get(&MapKey::Integer(3)).unwrap().min_size,
            Size::new(18, 12)
        );
        assert!(measurings.created_images.is_none());
    }

    #[test]
    fn nothing_to_report_is_empty() {
        let measurings =
            collect_measurings(&FixedPitchMeasurer::default(), &[], &font(12), Vec::new());
        assert!(measurings.is_empty());
    }
}
