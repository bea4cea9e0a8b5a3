//! Incremental projection of the shadow tree onto a [`Surface`]
//!
//! Every shadow node keeps the primitive it was first projected to. On each
//! pass only differences in placement, geometry, paint or cursor reach the
//! surface; nodes that left the tree lose their primitive.

use std::collections::{HashMap, HashSet};

use remote_ui_protocol::{FontProperties, Rect, RendererDescriptor, WindowSystemCursorType};

use crate::images::ImageStore;
use crate::registry::ElementRegistry;
use crate::shadow::ShadowTree;
use crate::surface::{Geometry, Paint, Surface};

/// Element id, element revision, image revision
type PaintSource = (i64, u64, Option<u64>);

struct Projected<H> {
    handle: H,
    parent: Option<i64>,
    geometry: Geometry,
    source: Option<PaintSource>,
    paint: Paint,
    cursor: Option<WindowSystemCursorType>,
}

/// Surface calls issued by one projection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub created: usize,
    pub moved: usize,
    pub resized: usize,
    pub repainted: usize,
    pub cursors: usize,
    pub removed: usize,
    /// Nodes left out because the surface could not create a primitive;
    /// their subtrees wait for the next pass
    pub skipped: usize,
}

impl ProjectionStats {
    pub const fn changes(&self) -> usize {
        self.created + self.moved + self.resized + self.repainted + self.cursors + self.removed
    }
}

pub struct Projector<S: Surface> {
    surface: S,
    projected: HashMap<i64, Projected<S::Handle>>,
    /// Child order as last sent to the surface, keyed by parent node
    order: HashMap<Option<i64>, Vec<i64>>,
    images: HashMap<i64, u64>,
    default_font: FontProperties,
}

impl<S: Surface> Projector<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            projected: HashMap::new(),
            order: HashMap::new(),
            images: HashMap::new(),
            default_font: FontProperties::default(),
        }
    }

    /// Labels without a font of their own are repainted on the next pass
    pub fn set_default_font(&mut self, font: FontProperties) {
        if self.default_font == font {
            return;
        }
        self.default_font = font;
        for entry in self.projected.values_mut() {
            entry.source = None;
        }
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn len(&self) -> usize {
        self.projected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projected.is_empty()
    }

    /// Remove every primitive and image
    pub fn clear(&mut self) {
        let mut ids: Vec<i64> = self.projected.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(p) = self.projected.remove(&id) {
                self.surface.remove(&p.handle);
            }
        }
        self.order.clear();
        let mut images: Vec<i64> = self.images.drain().map(|(id, _)| id).collect();
        images.sort_unstable();
        for id in images {
            self.surface.drop_image(id);
        }
    }

    pub fn project(
        &mut self,
        tree: &ShadowTree,
        elements: &ElementRegistry,
        images: &ImageStore,
    ) -> ProjectionStats {
        let mut stats = ProjectionStats::default();
        self.sync_images(images);
        self.remove_vanished(tree, &mut stats);

        // Absolute bounds and clip of every visited node; `None` clip is unbounded.
        let mut frames: HashMap<i64, (Rect, Option<Rect>)> = HashMap::with_capacity(tree.len());
        let mut skipped: HashSet<i64> = HashSet::new();

        for (id, parent, index) in tree.preorder() {
            if parent.is_some_and(|p| skipped.contains(&p)) {
                skipped.insert(id);
                continue;
            }
            let Some(node) = tree.get(id) else { continue };
            let (parent_bounds, parent_clip) = parent
                .and_then(|p| frames.get(&p).copied())
                .unwrap_or((Rect::default(), None));

            let (bounds, clip) = node.content.as_ref().map_or((parent_bounds, parent_clip), |c| {
                let own = parent_clip.map_or(c.valid_area, |pc| pc.intersect(&c.valid_area));
                (c.bounds, Some(own))
            });
            frames.insert(id, (bounds, clip));

            let geometry = Geometry {
                position: bounds.translate(-parent_bounds.x1, -parent_bounds.y1),
                clip: clip.map_or_else(
                    || Rect::new(0, 0, bounds.width(), bounds.height()),
                    |c| c.translate(-bounds.x1, -bounds.y1),
                ),
            };
            let element = node.content.as_ref().and_then(|c| c.element);
            let source = element.and_then(|e| {
                elements.entry(e).map(|entry| {
                    let image = match &entry.descriptor {
                        RendererDescriptor::ImageFrame(d) => {
                            d.image_id.and_then(|i| images.get(i)).map(|a| a.revision)
                        }
                        _ => None,
                    };
                    (e, entry.revision, image)
                })
            });
            let cursor = node.content.as_ref().and_then(|c| c.cursor);

            if !self.project_node(id, parent, index, geometry, source, cursor, elements, images, &mut stats) {
                skipped.insert(id);
            }
        }

        if stats.changes() > 0 {
            tracing::debug!(?stats, nodes = tree.len(), "projected");
        }
        stats
    }

    /// `false` when the node has no primitive after this call
    #[allow(clippy::too_many_arguments)]
    fn project_node(
        &mut self,
        id: i64,
        parent: Option<i64>,
        index: usize,
        geometry: Geometry,
        source: Option<PaintSource>,
        cursor: Option<WindowSystemCursorType>,
        elements: &ElementRegistry,
        images: &ImageStore,
        stats: &mut ProjectionStats,
    ) -> bool {
        let paint_for = |source: Option<PaintSource>, font: &FontProperties| {
            source
                .and_then(|(element, _, _)| elements.resolve(element))
                .map_or(Paint::None, |d| Paint::from_descriptor(d, font, |i| images.contains(i)))
        };

        let Some(existing) = self.projected.get(&id) else {
            let Some(handle) = self.surface.create(id) else {
                tracing::warn!(node = id, "surface refused a primitive, retrying next pass");
                stats.skipped += 1;
                return false;
            };
            let paint = paint_for(source, &self.default_font);
            self.projected.insert(
                id,
                Projected {
                    handle: handle.clone(),
                    parent,
                    geometry,
                    source,
                    paint: paint.clone(),
                    cursor,
                },
            );
            self.place(id, parent, index);
            self.surface.set_geometry(&handle, &geometry);
            if paint != Paint::None {
                self.surface.set_paint(&handle, &paint);
            }
            if cursor.is_some() {
                self.surface.set_cursor(&handle, cursor);
            }
            stats.created += 1;
            return true;
        };

        let in_place = existing.parent == parent
            && self
                .order
                .get(&parent)
                .and_then(|siblings| siblings.get(index))
                == Some(&id);
        let handle = existing.handle.clone();
        let geometry_changed = existing.geometry != geometry;
        let source_changed = existing.source != source;
        let cursor_changed = existing.cursor != cursor;

        if !in_place {
            self.place(id, parent, index);
            stats.moved += 1;
        }
        if geometry_changed {
            self.surface.set_geometry(&handle, &geometry);
            stats.resized += 1;
        }
        if source_changed {
            let paint = paint_for(source, &self.default_font);
            let Some(entry) = self.projected.get_mut(&id) else { return true };
            entry.source = source;
            if entry.paint != paint {
                self.surface.set_paint(&handle, &paint);
                entry.paint = paint;
                stats.repainted += 1;
            }
        }
        if cursor_changed {
            self.surface.set_cursor(&handle, cursor);
            stats.cursors += 1;
        }
        if let Some(entry) = self.projected.get_mut(&id) {
            entry.parent = parent;
            entry.geometry = geometry;
            entry.cursor = cursor;
        }
        true
    }

    fn place(&mut self, id: i64, parent: Option<i64>, index: usize) {
        if let Some(old_parent) = self.projected.get(&id).map(|p| p.parent) {
            if let Some(siblings) = self.order.get_mut(&old_parent) {
                siblings.retain(|&c| c != id);
            }
        }
        let siblings = self.order.entry(parent).or_default();
        siblings.insert(index.min(siblings.len()), id);

        let parent_handle = parent.and_then(|p| self.projected.get(&p)).map(|p| p.handle.clone());
        if let Some(entry) = self.projected.get_mut(&id) {
            entry.parent = parent;
            self.surface.place(&entry.handle, parent_handle.as_ref(), index);
        }
    }

    fn remove_vanished(&mut self, tree: &ShadowTree, stats: &mut ProjectionStats) {
        let mut gone: Vec<i64> = self
            .projected
            .keys()
            .filter(|id| !tree.contains(**id))
            .copied()
            .collect();
        gone.sort_unstable();
        for id in gone {
            let Some(p) = self.projected.remove(&id) else { continue };
            if let Some(siblings) = self.order.get_mut(&p.parent) {
                siblings.retain(|&c| c != id);
            }
            self.order.remove(&Some(id));
            self.surface.remove(&p.handle);
            stats.removed += 1;
        }
    }

    fn sync_images(&mut self, images: &ImageStore) {
        let live: HashSet<i64> = images.iter().map(|(id, _)| id).collect();
        let mut dropped: Vec<i64> = self.images.keys().filter(|id| !live.contains(id)).copied().collect();
        dropped.sort_unstable();
        for id in dropped {
            self.images.remove(&id);
            self.surface.drop_image(id);
        }
        for (id, asset) in images.iter() {
            if self.images.get(&id) != Some(&asset.revision) {
                self.surface.define_image(id, asset.metadata.format, &asset.bytes);
                self.images.insert(id, asset.revision);
            }
        }
    }
}
