//! Wire envelopes and the [`Protocol`] bundle
//!
//! An envelope is written as a variant pair:
//!
//! ```text
//! ["Request",  {"id": 3, "name": "WindowGetBounds", "arguments": null}]
//! ["Response", {"id": 3, "name": "WindowGetBounds", "arguments": {...}}]
//! ["Event",    {"name": "IOKeyDown", "arguments": {...}}]
//! ```
//!
//! Decoding happens in two steps: the shell first, then the arguments using the
//! schema the [`MessageCatalog`] lists for the message name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::codec::JsonCodec;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError, PathSegment};
use crate::messages::{BrowserEvent, HostRequest, MessageCatalog, MessageDef};
use crate::schema::{Schema, SchemaRegistry};
use crate::value::WireValue;

const REQUEST: &str = "Request";
const RESPONSE: &str = "Response";
const EVENT: &str = "Event";

/// One wire-level message with dynamically typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request {
        id: Option<i64>,
        name: String,
        arguments: WireValue,
    },
    Response {
        id: i64,
        name: String,
        result: WireValue,
    },
    Event {
        name: String,
        arguments: WireValue,
    },
}

impl Envelope {
    pub fn name(&self) -> &str {
        match self {
            Self::Request { name, .. } | Self::Response { name, .. } | Self::Event { name, .. } => {
                name
            }
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => REQUEST,
            Self::Response { .. } => RESPONSE,
            Self::Event { .. } => EVENT,
        }
    }
}

/// Poll and send endpoints returned by the connect handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
    /// Polled for inbound envelopes
    pub request: String,
    /// Receives outbound envelopes
    pub response: String,
}

/// Schema registry plus message catalog: everything needed to speak the protocol
#[derive(Debug, Clone)]
pub struct Protocol {
    registry: SchemaRegistry,
    catalog: MessageCatalog,
}

impl Protocol {
    pub const fn new(registry: SchemaRegistry, catalog: MessageCatalog) -> Self {
        Self { registry, catalog }
    }

    pub fn standard() -> Self {
        let mut registry = SchemaRegistry::new();
        HostRequest::register(&mut registry);
        BrowserEvent::register(&mut registry);
        Self::new(registry, MessageCatalog::standard())
    }

    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    pub const fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut MessageCatalog {
        &mut self.catalog
    }

    pub const fn codec(&self) -> JsonCodec<'_> {
        JsonCodec::new(&self.registry)
    }

    fn definition(&self, kind: &str, name: &str) -> Option<&MessageDef> {
        if kind == EVENT {
            self.catalog.event(name)
        } else {
            self.catalog.request(name)
        }
    }

    /// Schema of the payload: arguments for requests/events, result for responses
    fn payload_schema<'a>(def: &'a MessageDef, kind: &str) -> Option<&'a Schema> {
        if kind == RESPONSE {
            def.response.as_ref()
        } else {
            def.arguments.as_ref()
        }
    }

    pub fn decode_envelope(&self, json: &Json) -> Result<Envelope, DecodeError> {
        let (kind, body) = split_pair(json)?;
        let inside = |e: DecodeError| e.at_index(1);

        let name = match body.get("name") {
            Some(Json::String(name)) => name.clone(),
            Some(other) => {
                return Err(inside(
                    DecodeError::mismatch("string", kind_of(other)).in_field("name"),
                ))
            }
            None => {
                return Err(inside(
                    DecodeError::new(DecodeErrorKind::MissingField).in_field("name"),
                ))
            }
        };
        let id = match body.get("id") {
            None | Some(Json::Null) => None,
            Some(Json::Number(n)) => Some(n.as_i64().ok_or_else(|| {
                inside(DecodeError::new(DecodeErrorKind::IntegerOutOfRange).in_field("id"))
            })?),
            Some(other) => {
                return Err(inside(
                    DecodeError::mismatch("number", kind_of(other)).in_field("id"),
                ))
            }
        };

        let def = self.definition(kind, &name).ok_or_else(|| {
            inside(DecodeError::new(DecodeErrorKind::UnknownMessage(name.clone())).in_field("name"))
        })?;
        let payload = match Self::payload_schema(def, kind) {
            Some(schema) => self
                .codec()
                .decode(schema, body.get("arguments").unwrap_or(&Json::Null))
                .map_err(|e| inside(e.in_field("arguments")))?,
            None => WireValue::Null,
        };

        match kind {
            REQUEST => Ok(Envelope::Request {
                id,
                name,
                arguments: payload,
            }),
            RESPONSE => {
                let id = id.ok_or_else(|| {
                    inside(DecodeError::new(DecodeErrorKind::MissingField).in_field("id"))
                })?;
                Ok(Envelope::Response {
                    id,
                    name,
                    result: payload,
                })
            }
            _ => Ok(Envelope::Event {
                name,
                arguments: payload,
            }),
        }
    }

    pub fn encode_envelope(&self, envelope: &Envelope) -> Result<Json, EncodeError> {
        let kind = envelope.kind();
        let name = envelope.name();
        let def = self
            .definition(kind, name)
            .ok_or_else(|| EncodeError::new(format!("registered message `{name}`"), "unknown name"))?;

        let (id, payload) = match envelope {
            Envelope::Request { id, arguments, .. } => (*id, arguments),
            Envelope::Response { id, result, .. } => (Some(*id), result),
            Envelope::Event { arguments, .. } => (None, arguments),
        };
        let arguments = match Self::payload_schema(def, kind) {
            Some(schema) => self.codec().encode(schema, payload).map_err(|e| {
                e.within(PathSegment::Field("arguments".to_string()))
                    .within(PathSegment::Index(1))
            })?,
            None => Json::Null,
        };

        let mut body = Map::new();
        if let Some(id) = id {
            body.insert("id".to_string(), Json::from(id));
        }
        body.insert("name".to_string(), Json::String(name.to_string()));
        body.insert("arguments".to_string(), arguments);
        Ok(Json::Array(vec![Json::String(kind.to_string()), Json::Object(body)]))
    }

    /// Decode a JSON array of envelopes; each entry succeeds or fails on its own
    pub fn decode_batch(&self, json: &Json) -> Result<Vec<Result<Envelope, DecodeError>>, DecodeError> {
        match json {
            Json::Array(items) => Ok(items.iter().map(|item| self.decode_envelope(item)).collect()),
            other => Err(DecodeError::mismatch("array", kind_of(other))),
        }
    }

    pub fn encode_batch(&self, envelopes: &[Envelope]) -> Result<Json, EncodeError> {
        envelopes
            .iter()
            .enumerate()
            .map(|(i, envelope)| {
                self.encode_envelope(envelope)
                    .map_err(|e| e.within(PathSegment::Index(i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array)
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::standard()
    }
}

const fn kind_of(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn split_pair(json: &Json) -> Result<(&'static str, &Map<String, Json>), DecodeError> {
    let Json::Array(pair) = json else {
        return Err(DecodeError::mismatch("array", kind_of(json)));
    };
    let [tag, body] = pair.as_slice() else {
        return Err(DecodeError::new(DecodeErrorKind::MalformedVariant));
    };
    let kind = match tag {
        Json::String(tag) if tag == REQUEST => REQUEST,
        Json::String(tag) if tag == RESPONSE => RESPONSE,
        Json::String(tag) if tag == EVENT => EVENT,
        Json::String(tag) => {
            return Err(DecodeError::new(DecodeErrorKind::UnknownCase(tag.clone())).at_index(0))
        }
        other => return Err(DecodeError::mismatch("string", kind_of(other)).at_index(0)),
    };
    match body {
        Json::Object(body) => Ok((kind, body)),
        other => Err(DecodeError::mismatch("object", kind_of(other)).at_index(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{RenderingDomDiff, RenderingDomDiffs};
    use crate::types::IOKeyInfo;
    use crate::wire::WireType;
    use serde_json::json;

    #[test]
    fn request_round_trip() {
        let protocol = Protocol::standard();
        let request = HostRequest::RendererRenderDomDiff(RenderingDomDiffs {
            diffs_in_order: Some(vec![RenderingDomDiff::deleted(0)]),
        });
        let envelope = request.to_envelope(None);

        let json = protocol.encode_envelope(&envelope).unwrap();
        assert_eq!(json[0], "Request");
        assert_eq!(json[1]["name"], "RendererRenderDomDiff");
        assert!(json[1].get("id").is_none());

        let decoded = protocol.decode_envelope(&json).unwrap();
        assert_eq!(decoded, envelope);
        let Envelope::Request { name, arguments, .. } = decoded else {
            panic!("expected request");
        };
        assert_eq!(HostRequest::from_wire(&name, &arguments).unwrap(), request);
    }

    #[test]
    fn response_uses_response_schema() {
        let protocol = Protocol::standard();
        let json = json!(["Response", {"id": 4, "name": "IOIsKeyPressing", "arguments": true}]);
        assert_eq!(
            protocol.decode_envelope(&json).unwrap(),
            Envelope::Response {
                id: 4,
                name: "IOIsKeyPressing".to_string(),
                result: WireValue::Boolean(true),
            }
        );
    }

    #[test]
    fn event_envelope() {
        let protocol = Protocol::standard();
        let event = BrowserEvent::IOKeyDown(IOKeyInfo {
            code: 65,
            ..IOKeyInfo::default()
        });
        let json = protocol.encode_envelope(&event.to_envelope()).unwrap();
        assert_eq!(json[1]["arguments"]["code"], 65);
        assert_eq!(protocol.decode_envelope(&json).unwrap(), event.to_envelope());
    }

    #[test]
    fn argument_errors_carry_envelope_path() {
        let protocol = Protocol::standard();
        let json = json!(["Request", {
            "name": "RendererRenderDomDiff",
            "arguments": {"diffsInOrder": [
                {"id": 1, "diffType": "Created", "children": []},
                {"id": 2, "diffType": "Created",
                 "content": {"bounds": {"x1": 0, "y1": 0, "x2": "wide", "y2": 1},
                             "validArea": {"x1": 0, "y1": 0, "x2": 1, "y2": 1}}}
            ]}
        }]);
        let err = protocol.decode_envelope(&json).unwrap_err();
        assert_eq!(
            err.path.to_string(),
            "$[1].arguments.diffsInOrder[1].content.bounds.x2"
        );
    }

    #[test]
    fn unknown_message_and_tag() {
        let protocol = Protocol::standard();
        let err = protocol
            .decode_envelope(&json!(["Request", {"name": "Bogus"}]))
            .unwrap_err();
        assert_eq!(err.path.to_string(), "$[1].name");

        let err = protocol
            .decode_envelope(&json!(["Notify", {"name": "IOKeyDown"}]))
            .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownCase("Notify".to_string()));
    }

    #[test]
    fn batch_isolates_failures() {
        let protocol = Protocol::standard();
        let json = json!([
            ["Request", {"name": "RendererEndRendering", "id": 1}],
            ["Request", {"name": "WindowNotifySetTitle", "arguments": 5}],
            ["Request", {"name": "WindowNotifySetTitle", "arguments": "main"}]
        ]);
        let results = protocol.decode_batch(&json).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(
            results[2].as_ref().unwrap().name(),
            "WindowNotifySetTitle"
        );
        assert!(protocol.decode_batch(&json!({})).is_err());
    }

    #[test]
    fn handshake_endpoints_parse() {
        let endpoints: SessionEndpoints =
            serde_json::from_value(json!({"request": "/poll/7", "response": "/send/7"})).unwrap();
        assert_eq!(endpoints.request, "/poll/7");
    }

    #[test]
    fn standard_registry_includes_shapes() {
        let protocol = Protocol::standard();
        assert!(protocol.registry().get_struct("RenderingDom").is_some());
        assert_eq!(
            RenderingDomDiffs::schema(),
            Schema::Struct("RenderingDom_DiffsInOrder")
        );
    }
}
