//! Renderer element descriptors
//!
//! Each element kind has its own descriptor struct. [`RendererDescriptor`]
//! is the tagged union carried by `RendererUpdateElement`; the case tag is the
//! descriptor's wire name.

use crate::dom::ImageCreation;
use crate::types::{FontProperties, Point, Size};
use crate::value::Color;
use crate::{wire_enum, wire_struct, wire_variant};

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum RendererType = "RendererType" {
        SolidBorder = "SolidBorder",
        SinkBorder = "SinkBorder",
        SinkSplitter = "SinkSplitter",
        SolidBackground = "SolidBackground",
        GradientBackground = "GradientBackground",
        InnerShadow = "InnerShadow",
        Polygon = "Polygon",
        SolidLabel = "SolidLabel",
        ImageFrame = "ImageFrame",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum ShapeType = "ElementShapeType" {
        #[default]
        Rectangle = "Rectangle",
        Ellipse = "Ellipse",
        RoundRect = "RoundRect",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum GradientDirection = "ElementGradientDirection" {
        #[default]
        Horizontal = "Horizontal",
        Vertical = "Vertical",
        Slash = "Slash",
        Backslash = "Backslash",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum SplitterDirection = "ElementSplitterDirection" {
        #[default]
        Horizontal = "Horizontal",
        Vertical = "Vertical",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum HorizontalAlignment = "ElementHorizontalAlignment" {
        #[default]
        Left = "Left",
        Center = "Center",
        Right = "Right",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum VerticalAlignment = "ElementVerticalAlignment" {
        #[default]
        Top = "Top",
        Center = "Center",
        Bottom = "Bottom",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum LabelMeasuringRequest = "ElementSolidLabelMeasuringRequest" {
        FontHeight = "FontHeight",
        TotalSize = "TotalSize",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ElementShape = "ElementShape" {
        pub shape_type: ShapeType = "shapeType",
        pub radius_x: i64 = "radiusX",
        pub radius_y: i64 = "radiusY",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SolidBorderDesc = "ElementDesc_SolidBorder" {
        pub id: i64 = "id",
        pub border_color: Color = "borderColor",
        pub shape: ElementShape = "shape",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SinkBorderDesc = "ElementDesc_SinkBorder" {
        pub id: i64 = "id",
        pub left_top_color: Color = "leftTopColor",
        pub right_bottom_color: Color = "rightBottomColor",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SinkSplitterDesc = "ElementDesc_SinkSplitter" {
        pub id: i64 = "id",
        pub left_top_color: Color = "leftTopColor",
        pub right_bottom_color: Color = "rightBottomColor",
        pub direction: SplitterDirection = "direction",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SolidBackgroundDesc = "ElementDesc_SolidBackground" {
        pub id: i64 = "id",
        pub background_color: Color = "backgroundColor",
        pub shape: ElementShape = "shape",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct GradientBackgroundDesc = "ElementDesc_GradientBackground" {
        pub id: i64 = "id",
        pub left_top_color: Color = "leftTopColor",
        pub right_bottom_color: Color = "rightBottomColor",
        pub direction: GradientDirection = "direction",
        pub shape: ElementShape = "shape",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct InnerShadowDesc = "ElementDesc_InnerShadow" {
        pub id: i64 = "id",
        pub shadow_color: Color = "shadowColor",
        pub thickness: i64 = "thickness",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct PolygonDesc = "ElementDesc_Polygon" {
        pub id: i64 = "id",
        pub size: Size = "size",
        pub points: Vec<Point> = "points",
        pub border_color: Color = "borderColor",
        pub background_color: Color = "backgroundColor",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SolidLabelDesc = "ElementDesc_SolidLabel" {
        pub id: i64 = "id",
        pub text_color: Color = "textColor",
        pub horizontal_alignment: HorizontalAlignment = "horizontalAlignment",
        pub vertical_alignment: VerticalAlignment = "verticalAlignment",
        pub wrap_line: bool = "wrapLine",
        pub wrap_line_height_calculation: bool = "wrapLineHeightCalculation",
        pub ellipse: bool = "ellipse",
        pub multiline: bool = "multiline",
        /// `None` keeps the font from the previous update
        pub font: Option<FontProperties> = "font",
        /// `None` keeps the text from the previous update
        pub text: Option<String> = "text",
        pub measuring_request: Option<LabelMeasuringRequest> = "measuringRequest",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ImageFrameDesc = "ElementDesc_ImageFrame" {
        pub id: i64 = "id",
        pub image_id: Option<i64> = "imageId",
        pub image_frame: i64 = "imageFrame",
        pub horizontal_alignment: HorizontalAlignment = "horizontalAlignment",
        pub vertical_alignment: VerticalAlignment = "verticalAlignment",
        pub stretch: bool = "stretch",
        pub enabled: bool = "enabled",
        /// Image payload sent alongside the first frame that shows it
        pub image_creation: Option<ImageCreation> = "imageCreation",
    }
}

wire_variant! {
    /// Paint parameters for one renderer element
    #[derive(Debug, Clone, PartialEq)]
    pub enum RendererDescriptor {
        SolidBorder(SolidBorderDesc),
        SinkBorder(SinkBorderDesc),
        SinkSplitter(SinkSplitterDesc),
        SolidBackground(SolidBackgroundDesc),
        GradientBackground(GradientBackgroundDesc),
        InnerShadow(InnerShadowDesc),
        Polygon(PolygonDesc),
        SolidLabel(SolidLabelDesc),
        ImageFrame(ImageFrameDesc),
    }
}

impl RendererDescriptor {
    pub const fn id(&self) -> i64 {
        match self {
            Self::SolidBorder(d) => d.id,
            Self::SinkBorder(d) => d.id,
            Self::SinkSplitter(d) => d.id,
            Self::SolidBackground(d) => d.id,
            Self::GradientBackground(d) => d.id,
            Self::InnerShadow(d) => d.id,
            Self::Polygon(d) => d.id,
            Self::SolidLabel(d) => d.id,
            Self::ImageFrame(d) => d.id,
        }
    }

    pub const fn renderer_type(&self) -> RendererType {
        match self {
            Self::SolidBorder(_) => RendererType::SolidBorder,
            Self::SinkBorder(_) => RendererType::SinkBorder,
            Self::SinkSplitter(_) => RendererType::SinkSplitter,
            Self::SolidBackground(_) => RendererType::SolidBackground,
            Self::GradientBackground(_) => RendererType::GradientBackground,
            Self::InnerShadow(_) => RendererType::InnerShadow,
            Self::Polygon(_) => RendererType::Polygon,
            Self::SolidLabel(_) => RendererType::SolidLabel,
            Self::ImageFrame(_) => RendererType::ImageFrame,
        }
    }

    /// Descriptor with default paint parameters for a freshly created element
    pub fn default_for(kind: RendererType, id: i64) -> Self {
        match kind {
            RendererType::SolidBorder => Self::SolidBorder(SolidBorderDesc { id, ..Default::default() }),
            RendererType::SinkBorder => Self::SinkBorder(SinkBorderDesc { id, ..Default::default() }),
            RendererType::SinkSplitter => {
                Self::SinkSplitter(SinkSplitterDesc { id, ..Default::default() })
            }
            RendererType::SolidBackground => {
                Self::SolidBackground(SolidBackgroundDesc { id, ..Default::default() })
            }
            RendererType::GradientBackground => {
                Self::GradientBackground(GradientBackgroundDesc { id, ..Default::default() })
            }
            RendererType::InnerShadow => Self::InnerShadow(InnerShadowDesc { id, ..Default::default() }),
            RendererType::Polygon => Self::Polygon(PolygonDesc { id, ..Default::default() }),
            RendererType::SolidLabel => Self::SolidLabel(SolidLabelDesc { id, ..Default::default() }),
            RendererType::ImageFrame => Self::ImageFrame(ImageFrameDesc { id, ..Default::default() }),
        }
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RendererCreation = "RendererCreation" {
        pub id: i64 = "id",
        pub kind: RendererType = "type",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::schema::SchemaRegistry;
    use crate::wire::WireType;
    use serde_json::json;

    #[test]
    fn descriptor_tag_is_struct_name() {
        let mut registry = SchemaRegistry::new();
        RendererDescriptor::register(&mut registry);
        let codec = JsonCodec::new(&registry);

        let desc = RendererDescriptor::InnerShadow(InnerShadowDesc {
            id: 4,
            shadow_color: Color::rgba(0, 0, 0, 64),
            thickness: 3,
        });
        let json = codec.encode_typed(&desc).unwrap();
        assert_eq!(
            json,
            json!(["ElementDesc_InnerShadow", {"id": 4, "shadowColor": "#00000040", "thickness": 3}])
        );
        assert_eq!(codec.decode_typed::<RendererDescriptor>(&json).unwrap(), desc);
    }

    #[test]
    fn default_descriptor_matches_kind() {
        for kind in [RendererType::Polygon, RendererType::SolidLabel, RendererType::ImageFrame] {
            let desc = RendererDescriptor::default_for(kind, 11);
            assert_eq!(desc.renderer_type(), kind);
            assert_eq!(desc.id(), 11);
        }
    }
}
