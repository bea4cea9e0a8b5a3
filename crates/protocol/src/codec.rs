//! JSON codec driven by [`Schema`]
//!
//! Converts between [`WireValue`]s and plain JSON trees. Recursive pointers
//! are written inline, variants as `[case, value]` pairs. Decoding validates
//! the whole shape and reports the path of the first offending value.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

use crate::error::{DecodeError, DecodeErrorKind, EncodeError, PathSegment};
use crate::schema::{Schema, SchemaRegistry, StructDef};
use crate::value::{ArrayMapError, MapKey, WireValue};
use crate::wire::WireType;

/// Stateless schema-driven converter; cheap to copy and reentrant
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec<'r> {
    registry: &'r SchemaRegistry,
}

const fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl<'r> JsonCodec<'r> {
    pub const fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    pub fn encode_typed<T: WireType>(&self, value: &T) -> Result<Json, EncodeError> {
        self.encode(&T::schema(), &value.to_wire())
    }

    pub fn decode_typed<T: WireType>(&self, json: &Json) -> Result<T, DecodeError> {
        let value = self.decode(&T::schema(), json)?;
        T::from_wire(&value)
    }

    pub fn encode(&self, schema: &Schema, value: &WireValue) -> Result<Json, EncodeError> {
        let mismatch = || EncodeError::new(schema.to_string(), value.kind_name());

        match (schema, value) {
            (Schema::Nullable(_) | Schema::Ptr(_), WireValue::Null) => Ok(Json::Null),
            (Schema::Nullable(inner), value) => self.encode(inner, value),
            (Schema::Boolean, WireValue::Boolean(b)) => Ok(Json::Bool(*b)),
            (Schema::Integer, WireValue::Integer(i)) => Ok(Json::from(*i)),
            (Schema::Float, WireValue::Float(f)) => Number::from_f64(f64::from(*f))
                .map(Json::Number)
                .ok_or_else(mismatch),
            (Schema::Double, WireValue::Double(d)) => {
                Number::from_f64(*d).map(Json::Number).ok_or_else(mismatch)
            }
            (Schema::String, WireValue::String(s)) => Ok(Json::String(s.clone())),
            (Schema::Char, WireValue::Char(c)) => Ok(Json::String(c.to_string())),
            (Schema::Color, WireValue::Color(c)) => Ok(Json::String(c.to_string())),
            (Schema::Binary, WireValue::Binary(bytes)) => Ok(Json::String(BASE64.encode(bytes))),
            (Schema::List(inner), WireValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.encode(inner, item)
                        .map_err(|e| e.within(PathSegment::Index(i)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (Schema::ArrayMap { item, .. }, WireValue::ArrayMap(map)) => map
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    self.encode(item, entry)
                        .map_err(|e| e.within(PathSegment::Index(i)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (Schema::Dictionary(key_schema, value_schema), WireValue::Dictionary(entries)) => {
                let mut object = Map::new();
                for (key, entry) in entries {
                    let key_text = match (key_schema.as_ref(), key) {
                        (Schema::Integer, MapKey::Integer(i)) => i.to_string(),
                        (Schema::String, MapKey::String(s)) => s.clone(),
                        _ => {
                            return Err(EncodeError::new(key_schema.to_string(), "dictionary key")
                                .within(PathSegment::Key(key.to_string())))
                        }
                    };
                    let encoded = self
                        .encode(value_schema, entry)
                        .map_err(|e| e.within(PathSegment::Key(key_text.clone())))?;
                    object.insert(key_text, encoded);
                }
                Ok(Json::Object(object))
            }
            (Schema::Variant(cases), WireValue::Variant(case, inner)) => {
                let (name, case_schema) = cases
                    .iter()
                    .find(|(name, _)| name == case)
                    .ok_or_else(mismatch)?;
                let encoded = self
                    .encode(case_schema, inner)
                    .map_err(|e| e.within(PathSegment::Index(1)))?;
                Ok(Json::Array(vec![Json::String((*name).to_string()), encoded]))
            }
            (Schema::Enum(name), WireValue::Enum(case)) => {
                let def = self
                    .registry
                    .get_enum(name)
                    .ok_or_else(|| EncodeError::new(format!("registered enum {name}"), "enum"))?;
                if def.contains(case) {
                    Ok(Json::String(case.clone()))
                } else {
                    Err(mismatch())
                }
            }
            (Schema::Struct(name) | Schema::Ptr(name), WireValue::Struct(_)) => {
                let def = self.struct_def_for_encode(name)?;
                let mut object = Map::new();
                for field in &def.fields {
                    let field_value = value.field(field.name);
                    let encoded = self
                        .encode(&field.schema, field_value)
                        .map_err(|e| e.within(PathSegment::Field(field.name.to_string())))?;
                    object.insert(field.name.to_string(), encoded);
                }
                Ok(Json::Object(object))
            }
            _ => Err(mismatch()),
        }
    }

    fn struct_def_for_encode(&self, name: &str) -> Result<&'r StructDef, EncodeError> {
        self.registry
            .get_struct(name)
            .ok_or_else(|| EncodeError::new(format!("registered struct {name}"), "struct"))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(&self, schema: &Schema, json: &Json) -> Result<WireValue, DecodeError> {
        let mismatch = || DecodeError::mismatch(expected_kind(schema), json_kind(json));

        match schema {
            Schema::Nullable(inner) => {
                if json.is_null() {
                    Ok(WireValue::Null)
                } else {
                    self.decode(inner, json)
                }
            }
            Schema::Boolean => json.as_bool().map(WireValue::Boolean).ok_or_else(mismatch),
            Schema::Integer => match json {
                Json::Number(n) => n
                    .as_i64()
                    .map(WireValue::Integer)
                    .ok_or_else(|| DecodeError::new(DecodeErrorKind::IntegerOutOfRange)),
                _ => Err(mismatch()),
            },
            Schema::Float => json
                .as_f64()
                .map(|f| WireValue::Float(f as f32))
                .ok_or_else(mismatch),
            Schema::Double => json.as_f64().map(WireValue::Double).ok_or_else(mismatch),
            Schema::String => json
                .as_str()
                .map(|s| WireValue::String(s.to_string()))
                .ok_or_else(mismatch),
            Schema::Char => {
                let text = json.as_str().ok_or_else(mismatch)?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(WireValue::Char(c)),
                    _ => Err(DecodeError::new(DecodeErrorKind::InvalidChar(
                        text.chars().count(),
                    ))),
                }
            }
            Schema::Color => {
                let text = json.as_str().ok_or_else(mismatch)?;
                text.parse()
                    .map(WireValue::Color)
                    .map_err(|()| DecodeError::new(DecodeErrorKind::InvalidColor(text.to_string())))
            }
            Schema::Binary => {
                let text = json.as_str().ok_or_else(mismatch)?;
                BASE64
                    .decode(text)
                    .map(WireValue::Binary)
                    .map_err(|e| DecodeError::new(DecodeErrorKind::InvalidBinary(e.to_string())))
            }
            Schema::List(inner) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                self.decode_items(inner, items).map(WireValue::List)
            }
            Schema::ArrayMap { item, key } => {
                let items = json.as_array().ok_or_else(mismatch)?;
                let decoded = self.decode_items(item, items)?;
                WireValue::array_map(decoded, key)
                    .map(WireValue::ArrayMap)
                    .map_err(|e| match e {
                        ArrayMapError::DuplicateKey(k) => {
                            DecodeError::new(DecodeErrorKind::DuplicateKey(k.to_string()))
                        }
                        ArrayMapError::MissingKey(i) => {
                            DecodeError::new(DecodeErrorKind::MissingField)
                                .in_field(key)
                                .at_index(i)
                        }
                    })
            }
            Schema::Dictionary(key_schema, value_schema) => {
                let object = json.as_object().ok_or_else(mismatch)?;
                let mut entries = BTreeMap::new();
                for (key_text, entry) in object {
                    let key = match key_schema.as_ref() {
                        Schema::Integer => key_text.parse().map(MapKey::Integer).ok(),
                        Schema::String => Some(MapKey::String(key_text.clone())),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        DecodeError::new(DecodeErrorKind::InvalidKey(key_text.clone()))
                    })?;
                    let value = self
                        .decode(value_schema, entry)
                        .map_err(|e| e.within(PathSegment::Key(key_text.clone())))?;
                    entries.insert(key, value);
                }
                Ok(WireValue::Dictionary(entries))
            }
            Schema::Variant(cases) => {
                let pair = match json.as_array() {
                    Some(pair) if pair.len() == 2 => pair,
                    _ => return Err(DecodeError::new(DecodeErrorKind::MalformedVariant)),
                };
                let tag = pair[0].as_str().ok_or_else(|| {
                    DecodeError::mismatch("string", json_kind(&pair[0])).at_index(0)
                })?;
                let (name, case_schema) = cases
                    .iter()
                    .find(|(name, _)| *name == tag)
                    .ok_or_else(|| {
                        DecodeError::new(DecodeErrorKind::UnknownCase(tag.to_string())).at_index(0)
                    })?;
                let inner = self
                    .decode(case_schema, &pair[1])
                    .map_err(|e| e.at_index(1))?;
                Ok(WireValue::Variant((*name).to_string(), Box::new(inner)))
            }
            Schema::Enum(name) => {
                let case = json.as_str().ok_or_else(mismatch)?;
                let def = self.registry.get_enum(name).ok_or_else(|| {
                    DecodeError::new(DecodeErrorKind::UnregisteredSchema((*name).to_string()))
                })?;
                if def.contains(case) {
                    Ok(WireValue::Enum(case.to_string()))
                } else {
                    Err(DecodeError::new(DecodeErrorKind::UnknownEnumCase(
                        case.to_string(),
                    )))
                }
            }
            Schema::Ptr(_) if json.is_null() => Ok(WireValue::Null),
            Schema::Struct(name) | Schema::Ptr(name) => {
                let object = json.as_object().ok_or_else(mismatch)?;
                let def = self.registry.get_struct(name).ok_or_else(|| {
                    DecodeError::new(DecodeErrorKind::UnregisteredSchema((*name).to_string()))
                })?;
                let mut fields = Vec::with_capacity(def.fields.len());
                for field in &def.fields {
                    let value = match object.get(field.name) {
                        None | Some(Json::Null) if field.schema.is_nullable() => WireValue::Null,
                        None => {
                            return Err(
                                DecodeError::new(DecodeErrorKind::MissingField).in_field(field.name)
                            )
                        }
                        Some(entry) => self
                            .decode(&field.schema, entry)
                            .map_err(|e| e.in_field(field.name))?,
                    };
                    fields.push((field.name.to_string(), value));
                }
                Ok(WireValue::Struct(fields))
            }
        }
    }

    fn decode_items(&self, schema: &Schema, items: &[Json]) -> Result<Vec<WireValue>, DecodeError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode(schema, item).map_err(|e| e.at_index(i)))
            .collect()
    }
}

const fn expected_kind(schema: &Schema) -> &'static str {
    match schema {
        Schema::Boolean => "boolean",
        Schema::Integer | Schema::Float | Schema::Double => "number",
        Schema::String | Schema::Char | Schema::Color | Schema::Binary | Schema::Enum(_) => {
            "string"
        }
        Schema::Nullable(_) => "nullable value",
        Schema::List(_) | Schema::ArrayMap { .. } | Schema::Variant(_) => "array",
        Schema::Dictionary(..) | Schema::Struct(_) | Schema::Ptr(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, FieldDef};
    use crate::value::Color;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.insert_enum(EnumDef {
            name: "Direction",
            cases: vec!["Horizontal", "Vertical"],
        });
        registry.insert_struct(StructDef {
            name: "Node",
            fields: vec![
                FieldDef::new("id", Schema::Integer),
                FieldDef::new("label", Schema::nullable(Schema::String)),
                FieldDef::new(
                    "children",
                    Schema::nullable(Schema::list(Schema::Ptr("Node"))),
                ),
            ],
        });
        registry
    }

    #[test]
    fn recursive_pointers_encode_inline() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let leaf = WireValue::Struct(vec![
            ("id".into(), WireValue::Integer(1)),
            ("label".into(), WireValue::Null),
            ("children".into(), WireValue::Null),
        ]);
        let root = WireValue::Struct(vec![
            ("id".into(), WireValue::Integer(-1)),
            ("label".into(), WireValue::String("root".into())),
            ("children".into(), WireValue::List(vec![leaf])),
        ]);

        let encoded = codec.encode(&Schema::Ptr("Node"), &root).unwrap();
        assert_eq!(
            encoded,
            json!({
                "id": -1,
                "label": "root",
                "children": [{"id": 1, "label": null, "children": null}]
            })
        );
        assert_eq!(codec.decode(&Schema::Ptr("Node"), &encoded).unwrap(), root);
    }

    #[test]
    fn null_pointer_is_json_null() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        assert_eq!(
            codec.encode(&Schema::Ptr("Node"), &WireValue::Null).unwrap(),
            Json::Null
        );
        assert_eq!(
            codec.decode(&Schema::Ptr("Node"), &Json::Null).unwrap(),
            WireValue::Null
        );
    }

    #[test]
    fn variant_is_tagged_pair() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let schema = Schema::Variant(vec![("Int", Schema::Integer), ("Dir", Schema::Enum("Direction"))]);

        let value = WireValue::Variant("Dir".into(), Box::new(WireValue::Enum("Vertical".into())));
        let encoded = codec.encode(&schema, &value).unwrap();
        assert_eq!(encoded, json!(["Dir", "Vertical"]));
        assert_eq!(codec.decode(&schema, &encoded).unwrap(), value);

        let err = codec.decode(&schema, &json!(["Float", 1.0])).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownCase("Float".into()));
        assert_eq!(err.path.to_string(), "$[0]");

        let err = codec.decode(&schema, &json!({"Int": 1})).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MalformedVariant);
    }

    #[test]
    fn decode_error_names_field_path() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let doc = json!({
            "id": 0,
            "children": [
                {"id": 1},
                {"id": 2, "children": [{"id": "three"}]}
            ]
        });

        let err = codec.decode(&Schema::Ptr("Node"), &doc).unwrap_err();
        assert_eq!(err.path.to_string(), "$.children[1].children[0].id");
        assert_eq!(
            err.kind,
            DecodeErrorKind::TypeMismatch {
                expected: "number",
                found: "string"
            }
        );
    }

    #[test]
    fn object_where_array_expected_is_rejected() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let err = codec
            .decode(&Schema::list(Schema::Integer), &json!({"0": 1}))
            .unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::TypeMismatch {
                expected: "array",
                found: "object"
            }
        );
    }

    #[test]
    fn missing_required_field() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let err = codec
            .decode(&Schema::Struct("Node"), &json!({"label": "x"}))
            .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingField);
        assert_eq!(err.path.to_string(), "$.id");
    }

    #[test]
    fn dictionary_with_integer_keys() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let schema = Schema::dictionary(Schema::Integer, Schema::Color);
        let doc = json!({"2": "#FF000080", "10": "#00FF00"});

        let decoded = codec.decode(&schema, &doc).unwrap();
        let WireValue::Dictionary(entries) = &decoded else {
            panic!("expected dictionary, got {decoded:?}");
        };
        assert_eq!(
            entries.get(&MapKey::Integer(2)),
            Some(&WireValue::Color(Color::rgba(255, 0, 0, 128)))
        );
        assert_eq!(codec.encode(&schema, &decoded).unwrap(), doc);

        let err = codec.decode(&schema, &json!({"x": "#000000"})).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidKey("x".into()));
    }

    #[test]
    fn array_map_duplicate_key_is_rejected() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let schema = Schema::array_map(Schema::Struct("Node"), "id");
        let err = codec
            .decode(&schema, &json!([{"id": 4}, {"id": 4}]))
            .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DuplicateKey("4".into()));
    }

    #[test]
    fn primitive_edge_cases() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);

        assert_eq!(
            codec.decode(&Schema::Char, &json!("é")).unwrap(),
            WireValue::Char('é')
        );
        assert_eq!(
            codec.decode(&Schema::Char, &json!("ab")).unwrap_err().kind,
            DecodeErrorKind::InvalidChar(2)
        );
        assert_eq!(
            codec.decode(&Schema::Integer, &json!(1.5)).unwrap_err().kind,
            DecodeErrorKind::IntegerOutOfRange
        );
        assert_eq!(
            codec.encode(&Schema::Binary, &WireValue::Binary(vec![1, 2, 3])).unwrap(),
            json!("AQID")
        );
        assert_eq!(
            codec.decode(&Schema::Enum("Direction"), &json!("Diagonal")).unwrap_err().kind,
            DecodeErrorKind::UnknownEnumCase("Diagonal".into())
        );
    }

    #[test]
    fn encode_rejects_shape_mismatch() {
        let registry = registry();
        let codec = JsonCodec::new(&registry);
        let err = codec
            .encode(&Schema::list(Schema::Integer), &WireValue::List(vec![WireValue::Boolean(true)]))
            .unwrap_err();
        assert_eq!(err.path.to_string(), "$[0]");
        assert_eq!(err.found, "boolean");
    }
}
