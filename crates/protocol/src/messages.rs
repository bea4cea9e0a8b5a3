//! Message catalog and the typed host-request / browser-event sets
//!
//! Every message is identified by name. The catalog maps a name to the schema
//! of its arguments and, for requests expecting an answer, of its response.

use std::collections::HashMap;

use crate::dom::{
    ElementBeginRendering, ElementMeasurings, ImageCreation, ImageMetadata, RenderingDom,
    RenderingDomDiffs,
};
use crate::elements::{RendererCreation, RendererDescriptor};
use crate::envelope::Envelope;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::schema::{Schema, SchemaRegistry};
use crate::types::{
    FontConfig, GlobalShortcutKey, IOCharInfo, IOKeyInfo, IOMouseInfo, IOMouseInfoWithButton,
    Rect, ScreenConfig, Size, WindowShowing, WindowSizingConfig,
};
use crate::value::WireValue;
use crate::wire::WireType;

/// Argument and response shapes of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDef {
    pub name: &'static str,
    /// `None` when the message carries no arguments
    pub arguments: Option<Schema>,
    /// `None` for fire-and-forget requests and for events
    pub response: Option<Schema>,
}

impl MessageDef {
    pub const fn new(name: &'static str, arguments: Option<Schema>, response: Option<Schema>) -> Self {
        Self {
            name,
            arguments,
            response,
        }
    }

    pub const fn expects_response(&self) -> bool {
        self.response.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Event,
}

/// Name-indexed message definitions, constructed explicitly and passed in
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    requests: HashMap<&'static str, MessageDef>,
    events: HashMap<&'static str, MessageDef>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every host request and browser event this crate knows about
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for def in HostRequest::definitions() {
            catalog.insert(MessageKind::Request, def);
        }
        for def in BrowserEvent::definitions() {
            catalog.insert(MessageKind::Event, def);
        }
        catalog
    }

    pub fn insert(&mut self, kind: MessageKind, def: MessageDef) {
        let table = match kind {
            MessageKind::Request => &mut self.requests,
            MessageKind::Event => &mut self.events,
        };
        table.insert(def.name, def);
    }

    pub fn request(&self, name: &str) -> Option<&MessageDef> {
        self.requests.get(name)
    }

    pub fn event(&self, name: &str) -> Option<&MessageDef> {
        self.events.get(name)
    }

    pub fn len(&self) -> usize {
        self.requests.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.events.is_empty()
    }
}

/// Declares a closed set of messages: `Name(ArgType) -> ResponseType`,
/// both parts optional.
macro_rules! message_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident $( ( $arg:ty ) )? $( -> $resp:ty )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant $( ($arg) )?,
            )*
        }

        impl $name {
            pub const fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant { .. } => stringify!($variant), )*
                }
            }

            pub fn definitions() -> Vec<MessageDef> {
                vec![
                    $(
                        MessageDef::new(
                            stringify!($variant),
                            message_set!(@schema $($arg)?),
                            message_set!(@schema $($resp)?),
                        ),
                    )*
                ]
            }

            pub fn register(registry: &mut SchemaRegistry) {
                $(
                    $( <$arg as WireType>::register(registry); )?
                    $( <$resp as WireType>::register(registry); )?
                )*
            }

            /// Build the typed message from its name and decoded arguments
            pub fn from_wire(name: &str, arguments: &WireValue) -> Result<Self, DecodeError> {
                match name {
                    $(
                        stringify!($variant) => Ok(message_set!(@decode $variant, arguments $(, $arg)?)),
                    )*
                    other => Err(DecodeError::new(DecodeErrorKind::UnknownMessage(
                        other.to_string(),
                    ))),
                }
            }

            pub fn arguments(&self) -> WireValue {
                match self {
                    $(
                        message_set!(@pattern $variant, arg $(, $arg)?) => {
                            message_set!(@encode arg $(, $arg)?)
                        }
                    )*
                }
            }
        }
    };
    (@schema) => { None };
    (@schema $ty:ty) => { Some(<$ty as WireType>::schema()) };
    (@decode $variant:ident, $args:ident) => { Self::$variant };
    (@decode $variant:ident, $args:ident, $ty:ty) => {
        Self::$variant(<$ty as WireType>::from_wire($args).map_err(|e| e.in_field("arguments"))?)
    };
    (@pattern $variant:ident, $bind:ident) => { Self::$variant };
    (@pattern $variant:ident, $bind:ident, $ty:ty) => { Self::$variant($bind) };
    (@encode $bind:ident) => { WireValue::Null };
    (@encode $bind:ident, $ty:ty) => { WireType::to_wire($bind) };
}

message_set! {
    /// Requests sent by the host toolkit to the browser
    #[derive(Debug, Clone, PartialEq)]
    pub enum HostRequest {
        ControllerGetFontConfig -> FontConfig,
        ControllerGetScreenConfig -> ScreenConfig,
        ControllerConnectionEstablished,
        ControllerConnectionStopped,
        WindowGetBounds -> WindowSizingConfig,
        WindowNotifySetTitle(String),
        WindowNotifySetEnabled(bool),
        WindowNotifySetTopMost(bool),
        WindowNotifySetBounds(Rect),
        WindowNotifySetClientSize(Size),
        WindowNotifyActivate,
        WindowNotifyShow(WindowShowing),
        IOUpdateGlobalShortcutKey(Vec<GlobalShortcutKey>),
        IORequireCapture,
        IOReleaseCapture,
        IOIsKeyPressing(i64) -> bool,
        IOIsKeyToggled(i64) -> bool,
        RendererCreated(Vec<RendererCreation>),
        RendererDestroyed(Vec<i64>),
        RendererUpdateElement(RendererDescriptor),
        ImageCreated(ImageCreation) -> ImageMetadata,
        ImageDestroyed(i64),
        RendererBeginRendering(ElementBeginRendering),
        RendererEndRendering -> ElementMeasurings,
        RendererRenderDom(Option<Box<RenderingDom>>),
        RendererRenderDomDiff(RenderingDomDiffs),
    }
}

message_set! {
    /// Events sent by the browser to the host toolkit
    #[derive(Debug, Clone, PartialEq)]
    pub enum BrowserEvent {
        ControllerConnect,
        ControllerDisconnect,
        ControllerRequestExit,
        ControllerForceExit,
        ControllerScreenUpdated(ScreenConfig),
        WindowBoundsUpdated(WindowSizingConfig),
        WindowActivatedUpdated(bool),
        IOGlobalShortcutKey(i64),
        IOButtonDown(IOMouseInfoWithButton),
        IOButtonUp(IOMouseInfoWithButton),
        IOButtonDoubleClick(IOMouseInfoWithButton),
        IOHWheel(IOMouseInfo),
        IOVWheel(IOMouseInfo),
        IOMouseMoving(IOMouseInfo),
        IOMouseEntered,
        IOMouseLeaved,
        IOKeyDown(IOKeyInfo),
        IOKeyUp(IOKeyInfo),
        IOChar(IOCharInfo),
    }
}

impl HostRequest {
    /// Wrap as a request envelope; `id` is present only when a response is expected
    pub fn to_envelope(&self, id: Option<i64>) -> Envelope {
        Envelope::Request {
            id,
            name: self.name().to_string(),
            arguments: self.arguments(),
        }
    }

    /// Part of a frame: tree, element or image traffic
    pub const fn is_rendering(&self) -> bool {
        matches!(
            self,
            Self::RendererCreated(_)
                | Self::RendererDestroyed(_)
                | Self::RendererUpdateElement(_)
                | Self::ImageCreated(_)
                | Self::ImageDestroyed(_)
                | Self::RendererBeginRendering(_)
                | Self::RendererEndRendering
                | Self::RendererRenderDom(_)
                | Self::RendererRenderDomDiff(_)
        )
    }
}

impl BrowserEvent {
    pub fn to_envelope(&self) -> Envelope {
        Envelope::Event {
            name: self.name().to_string(),
            arguments: self.arguments(),
        }
    }
}
