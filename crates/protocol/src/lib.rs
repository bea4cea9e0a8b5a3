//! Wire protocol shared by the remote UI host and the browser client
//!
//! Shapes are described by [`schema::Schema`] and carried as
//! [`value::WireValue`]s; [`codec::JsonCodec`] moves them to and from JSON.
//! Typed protocol structs implement [`wire::WireType`].

pub mod codec;
pub mod dom;
pub mod elements;
pub mod envelope;
pub mod error;
pub mod messages;
pub mod schema;
pub mod types;
pub mod value;
pub mod wire;

pub use codec::JsonCodec;
pub use dom::*;
pub use elements::*;
pub use envelope::{Envelope, Protocol, SessionEndpoints};
pub use error::{DecodeError, DecodeErrorKind, EncodeError, FieldPath, PathSegment};
pub use messages::{BrowserEvent, HostRequest, MessageCatalog, MessageDef, MessageKind};
pub use schema::{Schema, SchemaRegistry};
pub use types::*;
pub use value::{ArrayMap, Color, Keyed, MapKey, WireValue};
pub use wire::{Binary, WireType};
