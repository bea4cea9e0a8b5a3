//! Dispatch of host requests onto the client state
//!
//! [`RemoteSession`] owns the shadow tree, element registry, image store and
//! projector. Rendering traffic mutates them synchronously; the projector runs
//! when a frame ends, or right away for tree messages sent outside a frame.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use remote_ui_protocol::{
    DecodeError, FontConfig, GlobalShortcutKey, HostRequest, Rect, RendererCreation, ScreenConfig,
    Size, WindowShowing, WindowSizingConfig, WireType, WireValue,
};

use crate::error::{Classify, ErrorKind};
use crate::images::{ImageError, ImageInspector, ImageStore};
use crate::measure::{collect_measurings, FixedPitchMeasurer, TextMeasurer};
use crate::projector::{ProjectionStats, Projector};
use crate::registry::{ElementRegistry, RegistryError};
use crate::shadow::{ShadowTree, TreeError};
use crate::surface::Surface;
use crate::transport::{RequestHandler, StopHandle};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl Classify for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(e) => e.kind(),
            Self::Tree(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Image(e) => e.kind(),
        }
    }
}

/// Reported when a frame's tree or registry update is refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRejected {
    /// Frame opened by `RendererBeginRendering`, if any
    pub frame: Option<i64>,
    pub request: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

/// Window notifications from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowChange {
    Title(String),
    Enabled(bool),
    TopMost(bool),
    Sizing(WindowSizingConfig),
    Activate,
    Show(WindowShowing),
    Capture(bool),
    Shortcuts(Vec<GlobalShortcutKey>),
}

pub trait WindowSink {
    fn window_changed(&mut self, change: &WindowChange);
}

impl<F: FnMut(&WindowChange)> WindowSink for F {
    fn window_changed(&mut self, change: &WindowChange) {
        self(change);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    pub title: String,
    pub enabled: bool,
    pub top_most: bool,
    pub activated: bool,
    pub visible: bool,
    pub capture: bool,
    pub sizing: WindowSizingConfig,
    pub shortcuts: Vec<GlobalShortcutKey>,
}

#[derive(Debug, Default)]
struct KeySets {
    pressed: HashSet<i64>,
    toggled: HashSet<i64>,
}

/// Keys currently held and lock keys currently on, by host key code
///
/// Clones share state, so input listeners can update what the session
/// reports to the host.
#[derive(Debug, Clone, Default)]
pub struct KeyState(Rc<RefCell<KeySets>>);

impl KeyState {
    pub fn set_pressed(&self, code: i64, pressed: bool) {
        let mut keys = self.0.borrow_mut();
        if pressed {
            keys.pressed.insert(code);
        } else {
            keys.pressed.remove(&code);
        }
    }

    pub fn set_toggled(&self, code: i64, toggled: bool) {
        let mut keys = self.0.borrow_mut();
        if toggled {
            keys.toggled.insert(code);
        } else {
            keys.toggled.remove(&code);
        }
    }

    pub fn is_pressed(&self, code: i64) -> bool {
        self.0.borrow().pressed.contains(&code)
    }

    pub fn is_toggled(&self, code: i64) -> bool {
        self.0.borrow().toggled.contains(&code)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: u64,
    pub frames: u64,
    pub rejected_frames: u64,
    pub projections: u64,
    pub last_projection: ProjectionStats,
}

pub struct RemoteSession<S: Surface> {
    tree: ShadowTree,
    elements: ElementRegistry,
    images: ImageStore,
    projector: Projector<S>,
    measurer: Box<dyn TextMeasurer>,
    font_config: FontConfig,
    screen_config: ScreenConfig,
    window: WindowState,
    keys: KeyState,
    sink: Option<Box<dyn WindowSink>>,
    on_rejected: Option<Box<dyn FnMut(&FrameRejected)>>,
    stop: Option<StopHandle>,
    frame: Option<i64>,
    dirty: bool,
    stats: SessionStats,
}

impl<S: Surface> fmt::Debug for RemoteSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("nodes", &self.tree.len())
            .field("elements", &self.elements.len())
            .field("images", &self.images.len())
            .field("frame", &self.frame)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> RemoteSession<S> {
    pub fn new(surface: S) -> Self {
        Self {
            tree: ShadowTree::new(),
            elements: ElementRegistry::new(),
            images: ImageStore::default(),
            projector: Projector::new(surface),
            measurer: Box::new(FixedPitchMeasurer::default()),
            font_config: FontConfig::default(),
            screen_config: ScreenConfig::default(),
            window: WindowState {
                enabled: true,
                ..WindowState::default()
            },
            keys: KeyState::default(),
            sink: None,
            on_rejected: None,
            stop: None,
            frame: None,
            dirty: false,
            stats: SessionStats::default(),
        }
    }

    #[must_use]
    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    #[must_use]
    pub fn with_image_inspector(mut self, inspector: Box<dyn ImageInspector>) -> Self {
        self.images = ImageStore::new(inspector);
        self
    }

    #[must_use]
    pub fn with_font_config(mut self, config: FontConfig) -> Self {
        self.projector.set_default_font(config.default_font.clone());
        self.font_config = config;
        self
    }

    /// Screen reported to the host; the window starts out filling its client area
    #[must_use]
    pub fn with_screen_config(mut self, config: ScreenConfig) -> Self {
        self.window.sizing.bounds = config.client_bounds;
        self.window.sizing.client_bounds = config.client_bounds;
        self.screen_config = config;
        self
    }

    #[must_use]
    pub fn with_window_sink(mut self, sink: Box<dyn WindowSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn on_frame_rejected(mut self, callback: Box<dyn FnMut(&FrameRejected)>) -> Self {
        self.on_rejected = Some(callback);
        self
    }

    /// Stopped when the host reports the connection is over
    #[must_use]
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = Some(stop);
        self
    }

    pub const fn tree(&self) -> &ShadowTree {
        &self.tree
    }

    pub const fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    pub const fn images(&self) -> &ImageStore {
        &self.images
    }

    pub const fn projector(&self) -> &Projector<S> {
        &self.projector
    }

    pub const fn surface(&self) -> &S {
        self.projector.surface()
    }

    pub const fn window(&self) -> &WindowState {
        &self.window
    }

    pub const fn keys(&self) -> &KeyState {
        &self.keys
    }

    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    pub const fn screen_config(&self) -> &ScreenConfig {
        &self.screen_config
    }

    /// Handle one typed request, returning the response value if it has one
    pub fn handle(&mut self, request: HostRequest) -> Result<Option<WireValue>, SessionError> {
        self.stats.requests += 1;
        let name = request.name();
        let rendering = request.is_rendering();
        let result = self.dispatch(request);
        if rendering {
            if let Err(e) = &result {
                self.reject(name, e);
            }
        }
        result
    }

    fn dispatch(&mut self, request: HostRequest) -> Result<Option<WireValue>, SessionError> {
        match request {
            HostRequest::ControllerGetFontConfig => return Ok(Some(self.font_config.to_wire())),
            HostRequest::ControllerGetScreenConfig => {
                return Ok(Some(self.screen_config.to_wire()))
            }
            HostRequest::ControllerConnectionEstablished => {
                tracing::info!("host connection established");
                self.reset();
            }
            HostRequest::ControllerConnectionStopped => {
                tracing::info!("host connection stopped");
                if let Some(stop) = &self.stop {
                    stop.stop();
                }
            }
            HostRequest::WindowGetBounds => return Ok(Some(self.window.sizing.to_wire())),
            HostRequest::WindowNotifySetTitle(title) => {
                self.window.title.clone_from(&title);
                self.notify(WindowChange::Title(title));
            }
            HostRequest::WindowNotifySetEnabled(enabled) => {
                self.window.enabled = enabled;
                self.notify(WindowChange::Enabled(enabled));
            }
            HostRequest::WindowNotifySetTopMost(top_most) => {
                self.window.top_most = top_most;
                self.notify(WindowChange::TopMost(top_most));
            }
            HostRequest::WindowNotifySetBounds(bounds) => {
                self.window.sizing.bounds = bounds;
                self.window.sizing.client_bounds = bounds;
                self.notify(WindowChange::Sizing(self.window.sizing.clone()));
            }
            HostRequest::WindowNotifySetClientSize(size) => {
                let Size { x, y } = size;
                let origin = self.window.sizing.client_bounds.origin();
                let client = Rect::new(origin.x, origin.y, origin.x + x, origin.y + y);
                self.window.sizing.bounds = client;
                self.window.sizing.client_bounds = client;
                self.notify(WindowChange::Sizing(self.window.sizing.clone()));
            }
            HostRequest::WindowNotifyActivate => {
                self.window.activated = true;
                self.notify(WindowChange::Activate);
            }
            HostRequest::WindowNotifyShow(showing) => {
                self.window.visible = true;
                self.window.sizing.size_state = showing.size_state;
                self.window.activated |= showing.activate;
                self.notify(WindowChange::Show(showing));
            }
            HostRequest::IOUpdateGlobalShortcutKey(keys) => {
                self.window.shortcuts.clone_from(&keys);
                self.notify(WindowChange::Shortcuts(keys));
            }
            HostRequest::IORequireCapture => {
                self.window.capture = true;
                self.notify(WindowChange::Capture(true));
            }
            HostRequest::IOReleaseCapture => {
                self.window.capture = false;
                self.notify(WindowChange::Capture(false));
            }
            HostRequest::IOIsKeyPressing(code) => {
                return Ok(Some(WireValue::Boolean(self.keys.is_pressed(code))))
            }
            HostRequest::IOIsKeyToggled(code) => {
                return Ok(Some(WireValue::Boolean(self.keys.is_toggled(code))))
            }
            HostRequest::RendererCreated(creations) => self.create_renderers(&creations)?,
            HostRequest::RendererDestroyed(ids) => {
                for id in ids {
                    self.elements.dispose(id);
                }
                self.dirty = true;
            }
            HostRequest::RendererUpdateElement(descriptor) => {
                self.elements.update(descriptor)?;
                self.dirty = true;
            }
            HostRequest::ImageCreated(creation) => {
                let metadata = self.images.create(&creation)?;
                self.dirty = true;
                return Ok(Some(metadata.to_wire()));
            }
            HostRequest::ImageDestroyed(id) => {
                self.images.destroy(id);
                self.dirty = true;
            }
            HostRequest::RendererBeginRendering(begin) => {
                self.frame = Some(begin.frame_id);
            }
            HostRequest::RendererEndRendering => {
                self.stats.frames += 1;
                self.frame = None;
                self.project();
                let requests = self.elements.take_measuring_requests();
                let measurings = collect_measurings(
                    self.measurer.as_ref(),
                    &requests,
                    &self.font_config.default_font,
                    self.images.take_created(),
                );
                return Ok(Some(measurings.to_wire()));
            }
            HostRequest::RendererRenderDom(dom) => {
                let summary = self.tree.replace(dom.as_deref())?;
                tracing::debug!(nodes = self.tree.len(), removed = summary.removed.len(), "full render");
                self.tree_changed();
            }
            HostRequest::RendererRenderDomDiff(diffs) => {
                let ops = diffs.diffs_in_order.unwrap_or_default();
                let summary = self.tree.apply_batch(&ops)?;
                tracing::debug!(
                    created = summary.created.len(),
                    modified = summary.modified.len(),
                    removed = summary.removed.len(),
                    "diff applied"
                );
                self.tree_changed();
            }
        }
        Ok(None)
    }

    /// All-or-nothing: a duplicate anywhere leaves the registry untouched
    fn create_renderers(&mut self, creations: &[RendererCreation]) -> Result<(), SessionError> {
        let mut seen = HashSet::new();
        for creation in creations {
            if self.elements.contains(creation.id) || !seen.insert(creation.id) {
                return Err(RegistryError::DuplicateId(creation.id).into());
            }
        }
        for creation in creations {
            self.elements.create(creation.id, creation.kind, None)?;
        }
        self.dirty = true;
        Ok(())
    }

    fn tree_changed(&mut self) {
        self.dirty = true;
        if self.frame.is_none() {
            self.project();
        }
    }

    fn project(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.stats.projections += 1;
        self.stats.last_projection = self.projector.project(&self.tree, &self.elements, &self.images);
    }

    fn reset(&mut self) {
        self.tree.clear();
        self.elements.clear();
        self.images.clear();
        self.projector.clear();
        self.frame = None;
        self.dirty = false;
    }

    fn notify(&mut self, change: WindowChange) {
        if let Some(sink) = &mut self.sink {
            sink.window_changed(&change);
        }
    }

    fn reject(&mut self, request: &'static str, error: &SessionError) {
        self.stats.rejected_frames += 1;
        let rejected = FrameRejected {
            frame: self.frame,
            request,
            kind: error.kind(),
            message: error.to_string(),
        };
        tracing::error!(
            frame = ?rejected.frame,
            request,
            kind = %rejected.kind,
            error = %rejected.message,
            "frame rejected"
        );
        if let Some(callback) = &mut self.on_rejected {
            callback(&rejected);
        }
    }
}

impl<S: Surface> RequestHandler for RemoteSession<S> {
    type Error = SessionError;

    fn handle_request(
        &mut self,
        name: &str,
        arguments: &WireValue,
    ) -> Result<Option<WireValue>, SessionError> {
        let request = HostRequest::from_wire(name, arguments)?;
        self.handle(request)
    }
}
