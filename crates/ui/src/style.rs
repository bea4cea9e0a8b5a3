//! CSS for projected primitives
//!
//! Everything here is pure so it can be tested off-browser; the DOM surface
//! only copies the returned properties onto elements.

use std::fmt::Write as _;

use base64::Engine as _;
use remote_ui_protocol::{
    Color, ElementShape, FontProperties, GradientDirection, HorizontalAlignment, ImageFormat, Point,
    ShapeType, Size, SplitterDirection, VerticalAlignment,
};

use crate::surface::{Geometry, Paint};

/// Properties owned by paint; an empty value removes the property
pub const PAINT_PROPERTIES: [&str; 18] = [
    "background",
    "background-color",
    "background-image",
    "background-size",
    "background-position",
    "background-repeat",
    "border-style",
    "border-width",
    "border-color",
    "border-radius",
    "box-shadow",
    "color",
    "font",
    "text-decoration",
    "display",
    "align-items",
    "justify-content",
    "white-space",
];

pub type Declarations = Vec<(&'static str, String)>;

/// CSS `font` shorthand
pub fn font_css(font: &FontProperties) -> String {
    let mut css = String::new();
    if font.italic {
        css.push_str("italic ");
    }
    if font.bold {
        css.push_str("bold ");
    }
    let _ = write!(css, "{}px \"{}\"", font.size.max(1), font.font_family.replace('"', ""));
    css
}

fn text_decoration(font: &FontProperties) -> &'static str {
    match (font.underline, font.strikeline) {
        (true, true) => "underline line-through",
        (true, false) => "underline",
        (false, true) => "line-through",
        (false, false) => "none",
    }
}

fn radius(shape: &ElementShape) -> String {
    match shape.shape_type {
        ShapeType::Rectangle => String::new(),
        ShapeType::Ellipse => "50%".to_string(),
        ShapeType::RoundRect => format!("{}px / {}px", shape.radius_x, shape.radius_y),
    }
}

const fn justify(horizontal: HorizontalAlignment) -> &'static str {
    match horizontal {
        HorizontalAlignment::Left => "flex-start",
        HorizontalAlignment::Center => "center",
        HorizontalAlignment::Right => "flex-end",
    }
}

const fn align(vertical: VerticalAlignment) -> &'static str {
    match vertical {
        VerticalAlignment::Top => "flex-start",
        VerticalAlignment::Center => "center",
        VerticalAlignment::Bottom => "flex-end",
    }
}

/// Position, size and clip of a primitive
pub fn geometry_css(geometry: &Geometry) -> Declarations {
    let Geometry { position, clip } = geometry;
    let mut css = vec![
        ("left", format!("{}px", position.x1)),
        ("top", format!("{}px", position.y1)),
        ("width", format!("{}px", position.width().max(0))),
        ("height", format!("{}px", position.height().max(0))),
    ];
    let full = clip.x1 <= 0
        && clip.y1 <= 0
        && clip.x2 >= position.width()
        && clip.y2 >= position.height();
    let clip_path = if full {
        String::new()
    } else if clip.is_empty() {
        "inset(50%)".to_string()
    } else {
        format!(
            "inset({}px {}px {}px {}px)",
            clip.y1.max(0),
            (position.width() - clip.x2).max(0),
            (position.height() - clip.y2).max(0),
            clip.x1.max(0),
        )
    };
    css.push(("clip-path", clip_path));
    css
}

/// Paint declarations, covering every name in [`PAINT_PROPERTIES`]
///
/// `image_url` maps a loaded image id to a URL usable in `url(...)`.
pub fn paint_css(paint: &Paint, image_url: &dyn Fn(i64) -> Option<String>) -> Declarations {
    let mut set: Vec<(&'static str, String)> = Vec::new();
    match paint {
        Paint::None => {}
        Paint::Border { color, shape } => {
            set.push(("border-style", "solid".to_string()));
            set.push(("border-width", "1px".to_string()));
            set.push(("border-color", color.to_css()));
            set.push(("border-radius", radius(shape)));
        }
        Paint::SinkBorder {
            left_top,
            right_bottom,
        } => {
            set.push(("border-style", "solid".to_string()));
            set.push(("border-width", "1px".to_string()));
            set.push(("border-color", sink_colors(*left_top, *right_bottom)));
        }
        Paint::Splitter {
            left_top,
            right_bottom,
            direction,
        } => {
            let width = match direction {
                SplitterDirection::Horizontal => "1px 0",
                SplitterDirection::Vertical => "0 1px",
            };
            set.push(("border-style", "solid".to_string()));
            set.push(("border-width", width.to_string()));
            set.push(("border-color", sink_colors(*left_top, *right_bottom)));
        }
        Paint::Background { color, shape } => {
            set.push(("background-color", color.to_css()));
            set.push(("border-radius", radius(shape)));
        }
        Paint::Gradient {
            from,
            to,
            direction,
            shape,
        } => {
            let toward = match direction {
                GradientDirection::Horizontal => "to right",
                GradientDirection::Vertical => "to bottom",
                GradientDirection::Slash => "to bottom left",
                GradientDirection::Backslash => "to bottom right",
            };
            set.push((
                "background",
                format!("linear-gradient({toward}, {}, {})", from.to_css(), to.to_css()),
            ));
            set.push(("border-radius", radius(shape)));
        }
        Paint::InnerShadow { color, thickness } => {
            set.push((
                "box-shadow",
                format!("inset 0 0 {}px {}", (*thickness).max(0), color.to_css()),
            ));
        }
        Paint::Polygon {
            size,
            points,
            border,
            background,
        } => {
            let svg = polygon_svg(*size, points, *border, *background);
            set.push(("background-image", format!("url(\"{}\")", svg_data_url(&svg))));
            set.push(("background-repeat", "no-repeat".to_string()));
            set.push(("background-position", "center".to_string()));
        }
        Paint::Label {
            color,
            font,
            horizontal,
            vertical,
            wrap,
            ellipsis,
            multiline,
            ..
        } => {
            set.push(("color", color.to_css()));
            set.push(("font", font_css(font)));
            set.push(("text-decoration", text_decoration(font).to_string()));
            set.push(("display", "flex".to_string()));
            set.push(("align-items", align(*vertical).to_string()));
            set.push(("justify-content", justify(*horizontal).to_string()));
            let white_space = match (*wrap, *multiline) {
                (true, _) => "pre-wrap",
                (false, true) => "pre",
                (false, false) if *ellipsis => "nowrap",
                (false, false) => "pre",
            };
            set.push(("white-space", white_space.to_string()));
        }
        Paint::Image {
            image,
            horizontal,
            vertical,
            stretch,
            ..
        } => {
            if let Some(url) = image.and_then(image_url) {
                set.push(("background-image", format!("url(\"{url}\")")));
                set.push(("background-repeat", "no-repeat".to_string()));
                set.push((
                    "background-size",
                    if *stretch { "100% 100%" } else { "auto" }.to_string(),
                ));
                let x = match horizontal {
                    HorizontalAlignment::Left => "left",
                    HorizontalAlignment::Center => "center",
                    HorizontalAlignment::Right => "right",
                };
                let y = match vertical {
                    VerticalAlignment::Top => "top",
                    VerticalAlignment::Center => "center",
                    VerticalAlignment::Bottom => "bottom",
                };
                set.push(("background-position", format!("{x} {y}")));
            }
        }
    }

    PAINT_PROPERTIES
        .iter()
        .map(|&name| {
            let value = set
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Opacity for paints that dim when disabled
pub const fn opacity(paint: &Paint) -> &'static str {
    match paint {
        Paint::Image { enabled: false, .. } => "0.5",
        _ => "",
    }
}

/// Text shown inside a label primitive
pub fn label_text(paint: &Paint) -> Option<&str> {
    match paint {
        Paint::Label { text, .. } => Some(text),
        _ => None,
    }
}

fn sink_colors(left_top: Color, right_bottom: Color) -> String {
    let (lt, rb) = (left_top.to_css(), right_bottom.to_css());
    format!("{lt} {rb} {rb} {lt}")
}

/// Standalone SVG drawing of a polygon element
pub fn polygon_svg(size: Size, points: &[Point], border: Color, background: Color) -> String {
    let mut path = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            path.push(' ');
        }
        let _ = write!(path, "{},{}", p.x, p.y);
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
         <polygon points=\"{path}\" fill=\"{fill}\" stroke=\"{stroke}\"/></svg>",
        w = size.x.max(0),
        h = size.y.max(0),
        fill = background.to_css(),
        stroke = border.to_css(),
    )
}

fn svg_data_url(svg: &str) -> String {
    let mut url = String::from("data:image/svg+xml,");
    for c in svg.chars() {
        match c {
            '%' => url.push_str("%25"),
            '#' => url.push_str("%23"),
            '<' => url.push_str("%3C"),
            '>' => url.push_str("%3E"),
            '"' => url.push('\''),
            c => url.push(c),
        }
    }
    url
}

/// `data:` URL for raw image bytes
pub fn image_data_url(format: ImageFormat, bytes: &[u8]) -> String {
    let mime = format.mime().unwrap_or("application/octet-stream");
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_ui_protocol::Rect;

    fn value<'a>(css: &'a Declarations, name: &str) -> &'a str {
        css.iter()
            .find(|(n, _)| *n == name)
            .map_or("", |(_, v)| v.as_str())
    }

    fn no_images(_: i64) -> Option<String> {
        None
    }

    #[test]
    fn font_shorthand() {
        let font = FontProperties {
            font_family: "Segoe UI".to_string(),
            size: 14,
            bold: true,
            italic: true,
            ..FontProperties::default()
        };
        assert_eq!(font_css(&font), "italic bold 14px \"Segoe UI\"");
    }

    #[test]
    fn full_clip_has_no_clip_path() {
        let css = geometry_css(&Geometry {
            position: Rect::new(5, 6, 25, 16),
            clip: Rect::new(0, 0, 20, 10),
        });
        assert_eq!(value(&css, "left"), "5px");
        assert_eq!(value(&css, "width"), "20px");
        assert_eq!(value(&css, "clip-path"), "");
    }

    #[test]
    fn partial_clip_is_an_inset() {
        let css = geometry_css(&Geometry {
            position: Rect::new(0, 0, 100, 50),
            clip: Rect::new(10, 0, 60, 40),
        });
        assert_eq!(value(&css, "clip-path"), "inset(0px 40px 10px 10px)");
    }

    #[test]
    fn none_paint_clears_every_property() {
        let css = paint_css(&Paint::None, &no_images);
        assert_eq!(css.len(), PAINT_PROPERTIES.len());
        assert!(css.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn gradient_direction_and_shape() {
        let css = paint_css(
            &Paint::Gradient {
                from: Color::rgb(255, 0, 0),
                to: Color::rgb(0, 0, 255),
                direction: GradientDirection::Slash,
                shape: ElementShape {
                    shape_type: ShapeType::RoundRect,
                    radius_x: 4,
                    radius_y: 2,
                },
            },
            &no_images,
        );
        assert_eq!(
            value(&css, "background"),
            "linear-gradient(to bottom left, #ff0000, #0000ff)"
        );
        assert_eq!(value(&css, "border-radius"), "4px / 2px");
    }

    #[test]
    fn polygon_svg_is_escaped_for_urls() {
        let svg = polygon_svg(
            Size::new(10, 10),
            &[Point::new(0, 0), Point::new(10, 0), Point::new(5, 10)],
            Color::rgb(0, 0, 0),
            Color::rgb(255, 255, 255),
        );
        assert!(svg.contains("points=\"0,0 10,0 5,10\""));
        let url = svg_data_url(&svg);
        assert!(!url.contains('#'));
        assert!(!url.contains('<'));
    }

    #[test]
    fn unloaded_image_draws_nothing() {
        let paint = Paint::Image {
            image: Some(3),
            frame: 0,
            horizontal: HorizontalAlignment::Center,
            vertical: VerticalAlignment::Center,
            stretch: true,
            enabled: false,
        };
        let css = paint_css(&paint, &no_images);
        assert_eq!(value(&css, "background-image"), "");
        assert_eq!(opacity(&paint), "0.5");

        let loaded = paint_css(&paint, &|id| Some(format!("img-{id}")));
        assert_eq!(value(&loaded, "background-image"), "url(\"img-3\")");
        assert_eq!(value(&loaded, "background-size"), "100% 100%");
    }

    #[test]
    fn data_url_uses_mime() {
        assert_eq!(image_data_url(ImageFormat::Png, b"hi"), "data:image/png;base64,aGk=");
    }
}
