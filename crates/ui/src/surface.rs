//! The browser-facing side of projection
//!
//! A [`Surface`] owns visual primitives (one per shadow node) and receives
//! only the changes the projector decides are needed.

use std::collections::HashMap;

use remote_ui_protocol::{
    Color, ElementShape, FontProperties, GradientDirection, HorizontalAlignment, ImageFormat,
    Point, Rect, RendererDescriptor, Size, SplitterDirection, VerticalAlignment,
    WindowSystemCursorType,
};

/// Placement of one primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Bounds relative to the parent primitive's top-left corner
    pub position: Rect,
    /// Paintable area relative to this primitive's top-left corner
    pub clip: Rect,
}

/// What a primitive draws, derived from its element descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Paint {
    #[default]
    None,
    Border {
        color: Color,
        shape: ElementShape,
    },
    SinkBorder {
        left_top: Color,
        right_bottom: Color,
    },
    Splitter {
        left_top: Color,
        right_bottom: Color,
        direction: SplitterDirection,
    },
    Background {
        color: Color,
        shape: ElementShape,
    },
    Gradient {
        from: Color,
        to: Color,
        direction: GradientDirection,
        shape: ElementShape,
    },
    InnerShadow {
        color: Color,
        thickness: i64,
    },
    Polygon {
        size: Size,
        points: Vec<Point>,
        border: Color,
        background: Color,
    },
    Label {
        text: String,
        color: Color,
        font: FontProperties,
        horizontal: HorizontalAlignment,
        vertical: VerticalAlignment,
        wrap: bool,
        ellipsis: bool,
        multiline: bool,
    },
    Image {
        /// `None` when no image is set or the image is not loaded
        image: Option<i64>,
        frame: i64,
        horizontal: HorizontalAlignment,
        vertical: VerticalAlignment,
        stretch: bool,
        enabled: bool,
    },
}

impl Paint {
    /// `image_loaded` tells whether an image id resolves in the image store
    pub fn from_descriptor(
        descriptor: &RendererDescriptor,
        default_font: &FontProperties,
        image_loaded: impl Fn(i64) -> bool,
    ) -> Self {
        match descriptor {
            RendererDescriptor::SolidBorder(d) => Self::Border {
                color: d.border_color,
                shape: d.shape,
            },
            RendererDescriptor::SinkBorder(d) => Self::SinkBorder {
                left_top: d.left_top_color,
                right_bottom: d.right_bottom_color,
            },
            RendererDescriptor::SinkSplitter(d) => Self::Splitter {
                left_top: d.left_top_color,
                right_bottom: d.right_bottom_color,
                direction: d.direction,
            },
            RendererDescriptor::SolidBackground(d) => Self::Background {
                color: d.background_color,
                shape: d.shape,
            },
            RendererDescriptor::GradientBackground(d) => Self::Gradient {
                from: d.left_top_color,
                to: d.right_bottom_color,
                direction: d.direction,
                shape: d.shape,
            },
            RendererDescriptor::InnerShadow(d) => Self::InnerShadow {
                color: d.shadow_color,
                thickness: d.thickness,
            },
            RendererDescriptor::Polygon(d) => Self::Polygon {
                size: d.size,
                points: d.points.clone(),
                border: d.border_color,
                background: d.background_color,
            },
            RendererDescriptor::SolidLabel(d) => Self::Label {
                text: d.text.clone().unwrap_or_default(),
                color: d.text_color,
                font: d.font.clone().unwrap_or_else(|| default_font.clone()),
                horizontal: d.horizontal_alignment,
                vertical: d.vertical_alignment,
                wrap: d.wrap_line,
                ellipsis: d.ellipse,
                multiline: d.multiline,
            },
            RendererDescriptor::ImageFrame(d) => Self::Image {
                image: d.image_id.filter(|&id| image_loaded(id)),
                frame: d.image_frame,
                horizontal: d.horizontal_alignment,
                vertical: d.vertical_alignment,
                stretch: d.stretch,
                enabled: d.enabled,
            },
        }
    }
}

pub trait Surface {
    type Handle: Clone;

    /// New detached primitive for `node`, or `None` if the surface cannot
    /// make one right now
    fn create(&mut self, node: i64) -> Option<Self::Handle>;

    /// Move `handle` under `parent` (`None`: the surface root) at `index`
    fn place(&mut self, handle: &Self::Handle, parent: Option<&Self::Handle>, index: usize);

    fn set_geometry(&mut self, handle: &Self::Handle, geometry: &Geometry);

    fn set_paint(&mut self, handle: &Self::Handle, paint: &Paint);

    fn set_cursor(&mut self, handle: &Self::Handle, cursor: Option<WindowSystemCursorType>);

    fn remove(&mut self, handle: &Self::Handle);

    fn define_image(&mut self, id: i64, format: ImageFormat, bytes: &[u8]);

    fn drop_image(&mut self, id: i64);
}

/// One call made against a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Create(i64),
    Place {
        node: i64,
        parent: Option<i64>,
        index: usize,
    },
    Geometry(i64, Geometry),
    Paint(i64, Paint),
    Cursor(i64, Option<WindowSystemCursorType>),
    Remove(i64),
    DefineImage(i64),
    DropImage(i64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    pub parent: Option<i64>,
    pub geometry: Geometry,
    pub paint: Paint,
    pub cursor: Option<WindowSystemCursorType>,
}

/// In-memory surface that keeps the resulting state and, when asked to, a
/// log of calls
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    primitives: HashMap<i64, Primitive>,
    children: HashMap<Option<i64>, Vec<i64>>,
    images: HashMap<i64, (ImageFormat, usize)>,
    ops: Option<Vec<SurfaceOp>>,
}

impl RecordingSurface {
    /// State only; calls are not logged
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every call until [`Self::take_ops`] drains it
    pub fn with_log() -> Self {
        Self {
            ops: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        self.ops.as_deref().unwrap_or_default()
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        self.ops.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn log(&mut self, op: SurfaceOp) {
        if let Some(ops) = &mut self.ops {
            ops.push(op);
        }
    }

    pub fn primitive(&self, node: i64) -> Option<&Primitive> {
        self.primitives.get(&node)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Children of `parent` in paint order
    pub fn children(&self, parent: Option<i64>) -> &[i64] {
        self.children.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// Format and byte length of a defined image
    pub fn image(&self, id: i64) -> Option<(ImageFormat, usize)> {
        self.images.get(&id).copied()
    }

    fn detach(&mut self, node: i64) {
        if let Some(parent) = self.primitives.get(&node).map(|p| p.parent) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&c| c != node);
            }
        }
    }
}

impl Surface for RecordingSurface {
    type Handle = i64;

    fn create(&mut self, node: i64) -> Option<i64> {
        self.primitives.insert(node, Primitive::default());
        self.log(SurfaceOp::Create(node));
        Some(node)
    }

    fn place(&mut self, handle: &i64, parent: Option<&i64>, index: usize) {
        let parent = parent.copied();
        self.detach(*handle);
        let siblings = self.children.entry(parent).or_default();
        siblings.insert(index.min(siblings.len()), *handle);
        if let Some(primitive) = self.primitives.get_mut(handle) {
            primitive.parent = parent;
        }
        self.log(SurfaceOp::Place {
            node: *handle,
            parent,
            index,
        });
    }

    fn set_geometry(&mut self, handle: &i64, geometry: &Geometry) {
        if let Some(primitive) = self.primitives.get_mut(handle) {
            primitive.geometry = *geometry;
        }
        self.log(SurfaceOp::Geometry(*handle, *geometry));
    }

    fn set_paint(&mut self, handle: &i64, paint: &Paint) {
        if let Some(primitive) = self.primitives.get_mut(handle) {
            primitive.paint = paint.clone();
        }
        self.log(SurfaceOp::Paint(*handle, paint.clone()));
    }

    fn set_cursor(&mut self, handle: &i64, cursor: Option<WindowSystemCursorType>) {
        if let Some(primitive) = self.primitives.get_mut(handle) {
            primitive.cursor = cursor;
        }
        self.log(SurfaceOp::Cursor(*handle, cursor));
    }

    fn remove(&mut self, handle: &i64) {
        self.detach(*handle);
        self.primitives.remove(handle);
        self.children.remove(&Some(*handle));
        self.log(SurfaceOp::Remove(*handle));
    }

    fn define_image(&mut self, id: i64, format: ImageFormat, bytes: &[u8]) {
        self.images.insert(id, (format, bytes.len()));
        self.log(SurfaceOp::DefineImage(id));
    }

    fn drop_image(&mut self, id: i64) {
        self.images.remove(&id);
        self.log(SurfaceOp::DropImage(id));
    }
}
