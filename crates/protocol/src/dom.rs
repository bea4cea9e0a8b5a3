//! Rendering tree, frame diffs, images and measurings

use crate::types::{Rect, Size, WindowHitTestResult, WindowSystemCursorType};
use crate::value::{ArrayMap, Keyed, MapKey};
use crate::wire::{Binary, WireKeyed};
use crate::{wire_enum, wire_struct};

wire_struct! {
    /// Payload of one rendered node
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RenderingDomContent = "RenderingDomContent" {
        pub hit_test_result: Option<WindowHitTestResult> = "hitTestResult",
        pub cursor: Option<WindowSystemCursorType> = "cursor",
        /// Renderer element painted by this node
        pub element: Option<i64> = "element",
        pub bounds: Rect = "bounds",
        /// Part of `bounds` that is allowed to paint
        pub valid_area: Rect = "validArea",
    }
}

wire_struct! {
    /// Full rendering tree, children written inline
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RenderingDom = "RenderingDom" {
        pub id: i64 = "id",
        pub content: Option<RenderingDomContent> = "content",
        pub children: Option<Vec<Box<RenderingDom>>> = "children",
    }
}

impl RenderingDom {
    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Self> {
        self.children.iter().flatten().map(AsRef::as_ref)
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum RenderingDomDiffType = "RenderingDom_DiffType" {
        Deleted = "Deleted",
        Created = "Created",
        Modified = "Modified",
    }
}

wire_struct! {
    /// One Created/Modified/Deleted operation; `children` holds child ids
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RenderingDomDiff = "RenderingDom_Diff" {
        pub id: i64 = "id",
        pub diff_type: RenderingDomDiffType = "diffType",
        pub content: Option<RenderingDomContent> = "content",
        pub children: Option<Vec<i64>> = "children",
    }
}

impl RenderingDomDiff {
    pub const fn created(id: i64, content: Option<RenderingDomContent>, children: Vec<i64>) -> Self {
        Self {
            id,
            diff_type: RenderingDomDiffType::Created,
            content,
            children: Some(children),
        }
    }

    pub const fn modified(
        id: i64,
        content: Option<RenderingDomContent>,
        children: Option<Vec<i64>>,
    ) -> Self {
        Self {
            id,
            diff_type: RenderingDomDiffType::Modified,
            content,
            children,
        }
    }

    pub const fn deleted(id: i64) -> Self {
        Self {
            id,
            diff_type: RenderingDomDiffType::Deleted,
            content: None,
            children: None,
        }
    }
}

wire_struct! {
    /// A frame's diffs in application order
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RenderingDomDiffs = "RenderingDom_DiffsInOrder" {
        pub diffs_in_order: Option<Vec<RenderingDomDiff>> = "diffsInOrder",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ElementBeginRendering = "ElementBeginRendering" {
        pub frame_id: i64 = "frameId",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum ImageFormat = "ImageFormatType" {
        Bmp = "Bmp",
        Gif = "Gif",
        Icon = "Icon",
        Jpeg = "Jpeg",
        Png = "Png",
        Tiff = "Tiff",
        Wmp = "Wmp",
        #[default]
        Unknown = "Unknown",
    }
}

impl ImageFormat {
    /// MIME type for `data:` URLs; `None` when the format is not known
    pub const fn mime(&self) -> Option<&'static str> {
        match self {
            Self::Bmp => Some("image/bmp"),
            Self::Gif => Some("image/gif"),
            Self::Icon => Some("image/x-icon"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Png => Some("image/png"),
            Self::Tiff => Some("image/tiff"),
            Self::Wmp => Some("image/vnd.ms-photo"),
            Self::Unknown => None,
        }
    }
}

wire_struct! {
    /// Image bytes are sent once; later creations set `image_data_omitted`
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ImageCreation = "ImageCreation" {
        pub id: i64 = "id",
        pub image_data: Option<Binary> = "imageData",
        pub image_data_omitted: bool = "imageDataOmitted",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ImageFrameMetadata = "ImageFrameMetadata" {
        pub size: Size = "size",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ImageMetadata = "ImageMetadata" {
        pub id: i64 = "id",
        pub format: ImageFormat = "format",
        pub frames: Option<Vec<ImageFrameMetadata>> = "frames",
    }
}

impl Keyed for ImageMetadata {
    fn key(&self) -> MapKey {
        MapKey::Integer(self.id)
    }
}

impl WireKeyed for ImageMetadata {
    const KEY_FIELD: &'static str = "id";
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FontHeightMeasuring = "ElementMeasuring_FontHeight" {
        pub font_family: String = "fontFamily",
        pub font_size: i64 = "fontSize",
        pub height: i64 = "height",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElementMinSize = "ElementMeasuring_ElementMinSize" {
        pub id: i64 = "id",
        pub min_size: Size = "minSize",
    }
}

impl Keyed for ElementMinSize {
    fn key(&self) -> MapKey {
        MapKey::Integer(self.id)
    }
}

impl WireKeyed for ElementMinSize {
    const KEY_FIELD: &'static str = "id";
}

wire_struct! {
    /// Answer to `RendererEndRendering`
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ElementMeasurings = "ElementMeasurings" {
        pub font_heights: Option<Vec<FontHeightMeasuring>> = "fontHeights",
        pub min_sizes: Option<ArrayMap<ElementMinSize>> = "minSizes",
        pub created_images: Option<ArrayMap<ImageMetadata>> = "createdImages",
    }
}

impl ElementMeasurings {
    pub const fn is_empty(&self) -> bool {
        self.font_heights.is_none() && self.min_sizes.is_none() && self.created_images.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::schema::SchemaRegistry;
    use crate::wire::WireType;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        RenderingDom::register(&mut registry);
        RenderingDomDiffs::register(&mut registry);
        ElementMeasurings::register(&mut registry);
        registry
    }

    #[test]
    fn two_node_tree_decodes_inline() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let json = json!({
            "id": -1,
            "content": null,
            "children": [
                {"id": 0, "content": {"bounds": {"x1": 0, "y1": 0, "x2": 10, "y2": 10},
                                      "validArea": {"x1": 0, "y1": 0, "x2": 10, "y2": 10},
                                      "element": 3}},
                {"id": 1}
            ]
        });

        let dom = codec.decode_typed::<RenderingDom>(&json).unwrap();
        let ids: Vec<i64> = dom.children().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1]);
        let first = dom.children().next().unwrap();
        assert_eq!(first.content.as_ref().unwrap().element, Some(3));
        assert!(first.content.as_ref().unwrap().cursor.is_none());
    }

    #[test]
    fn diff_batch_keeps_repeated_ids() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let diffs = RenderingDomDiffs {
            diffs_in_order: Some(vec![
                RenderingDomDiff::created(2, None, vec![]),
                RenderingDomDiff::modified(2, None, Some(vec![3])),
            ]),
        };
        let json = codec.encode_typed(&diffs).unwrap();
        assert_eq!(json["diffsInOrder"][1]["diffType"], "Modified");
        assert_eq!(codec.decode_typed::<RenderingDomDiffs>(&json).unwrap(), diffs);
    }

    #[test]
    fn measurings_index_images_by_id() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let json = json!({
            "fontHeights": null,
            "minSizes": null,
            "createdImages": [
                {"id": 8, "format": "Png", "frames": [{"size": {"x": 16, "y": 16}}]}
            ]
        });
        let measurings = codec.decode_typed::<ElementMeasurings>(&json).unwrap();
        let images = measurings.created_images.unwrap();
        assert_eq!(images.get(&MapKey::Integer(8)).unwrap().format, ImageFormat::Png);
    }
}
