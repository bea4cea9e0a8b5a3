//! Typed bridge between Rust values and [`WireValue`]
//!
//! [`WireType`] ties a Rust type to its [`Schema`]. Protocol shapes are
//! declared with [`wire_struct!`], [`wire_enum!`] and [`wire_variant!`], which
//! generate the type together with its schema registration.

use std::collections::BTreeMap;

use crate::error::{DecodeError, DecodeErrorKind};
use crate::schema::{Schema, SchemaRegistry};
use crate::value::{ArrayMap, ArrayMapError, Color, Keyed, MapKey, WireValue};

/// A Rust type with a fixed wire shape
pub trait WireType: Sized {
    fn schema() -> Schema;

    /// Add every named struct/enum this type depends on to `registry`
    fn register(_registry: &mut SchemaRegistry) {}

    fn to_wire(&self) -> WireValue;

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError>;
}

/// A registered struct or enum, addressable by name (variant cases, `Ptr`)
pub trait Named: WireType {
    const WIRE_NAME: &'static str;
}

/// Struct items of an `ArrayMap`, indexed by `KEY_FIELD`
pub trait WireKeyed: Named + Keyed {
    const KEY_FIELD: &'static str;
}

/// Raw bytes, encoded as base64 on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

pub fn mismatch(expected: &'static str, found: &WireValue) -> DecodeError {
    DecodeError::mismatch(expected, found.kind_name())
}

/// Fail unless `value` is a struct
pub fn expect_struct(value: &WireValue) -> Result<(), DecodeError> {
    match value {
        WireValue::Struct(_) => Ok(()),
        other => Err(mismatch("struct", other)),
    }
}

/// Read one struct field, attaching the field name to any error
pub fn field<T: WireType>(value: &WireValue, name: &str) -> Result<T, DecodeError> {
    let raw = value.field(name);
    if raw.is_null() && !T::schema().is_nullable() {
        return Err(DecodeError::new(DecodeErrorKind::MissingField).in_field(name));
    }
    T::from_wire(raw).map_err(|e| e.in_field(name))
}

macro_rules! primitive_wire_type {
    ($ty:ty, $schema:ident, $variant:ident, $expected:literal) => {
        impl WireType for $ty {
            fn schema() -> Schema {
                Schema::$schema
            }

            fn to_wire(&self) -> WireValue {
                WireValue::$variant(self.clone())
            }

            fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
                match value {
                    WireValue::$variant(v) => Ok(v.clone()),
                    other => Err(mismatch($expected, other)),
                }
            }
        }

        impl Named for $ty {
            const WIRE_NAME: &'static str = stringify!($schema);
        }
    };
}

primitive_wire_type!(bool, Boolean, Boolean, "boolean");
primitive_wire_type!(i64, Integer, Integer, "integer");
primitive_wire_type!(f32, Float, Float, "float");
primitive_wire_type!(f64, Double, Double, "double");
primitive_wire_type!(String, String, String, "string");
primitive_wire_type!(char, Char, Char, "char");
primitive_wire_type!(Color, Color, Color, "color");

impl WireType for Binary {
    fn schema() -> Schema {
        Schema::Binary
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Binary(self.0.clone())
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        match value {
            WireValue::Binary(bytes) => Ok(Self(bytes.clone())),
            other => Err(mismatch("binary", other)),
        }
    }
}

impl<T: WireType> WireType for Option<T> {
    fn schema() -> Schema {
        Schema::nullable(T::schema())
    }

    fn register(registry: &mut SchemaRegistry) {
        T::register(registry);
    }

    fn to_wire(&self) -> WireValue {
        self.as_ref().map_or(WireValue::Null, WireType::to_wire)
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_wire(value).map(Some)
        }
    }
}

impl<T: WireType> WireType for Vec<T> {
    fn schema() -> Schema {
        Schema::list(T::schema())
    }

    fn register(registry: &mut SchemaRegistry) {
        T::register(registry);
    }

    fn to_wire(&self) -> WireValue {
        WireValue::List(self.iter().map(WireType::to_wire).collect())
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        match value {
            WireValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_wire(item).map_err(|e| e.at_index(i)))
                .collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

/// Types usable as dictionary keys
pub trait WireKey: Ord + Sized {
    fn key_schema() -> Schema;
    fn to_key(&self) -> MapKey;
    fn from_key(key: &MapKey) -> Option<Self>;
}

impl WireKey for i64 {
    fn key_schema() -> Schema {
        Schema::Integer
    }

    fn to_key(&self) -> MapKey {
        MapKey::Integer(*self)
    }

    fn from_key(key: &MapKey) -> Option<Self> {
        match key {
            MapKey::Integer(i) => Some(*i),
            MapKey::String(_) => None,
        }
    }
}

impl WireKey for String {
    fn key_schema() -> Schema {
        Schema::String
    }

    fn to_key(&self) -> MapKey {
        MapKey::String(self.clone())
    }

    fn from_key(key: &MapKey) -> Option<Self> {
        match key {
            MapKey::String(s) => Some(s.clone()),
            MapKey::Integer(_) => None,
        }
    }
}

impl<K: WireKey, V: WireType> WireType for BTreeMap<K, V> {
    fn schema() -> Schema {
        Schema::dictionary(K::key_schema(), V::schema())
    }

    fn register(registry: &mut SchemaRegistry) {
        V::register(registry);
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Dictionary(self.iter().map(|(k, v)| (k.to_key(), v.to_wire())).collect())
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        let WireValue::Dictionary(entries) = value else {
            return Err(mismatch("dictionary", value));
        };
        entries
            .iter()
            .map(|(key, entry)| {
                let k = K::from_key(key).ok_or_else(|| {
                    DecodeError::new(DecodeErrorKind::InvalidKey(key.to_string()))
                })?;
                let v = V::from_wire(entry).map_err(|e| {
                    e.within(crate::error::PathSegment::Key(key.to_string()))
                })?;
                Ok((k, v))
            })
            .collect()
    }
}

impl<T: WireKeyed> WireType for ArrayMap<T> {
    fn schema() -> Schema {
        Schema::array_map(T::schema(), T::KEY_FIELD)
    }

    fn register(registry: &mut SchemaRegistry) {
        T::register(registry);
    }

    fn to_wire(&self) -> WireValue {
        let items = self.iter().map(WireType::to_wire).collect();
        // Keys are unique in `self`, so the rebuilt index cannot collide.
        WireValue::array_map(items, T::KEY_FIELD)
            .map_or(WireValue::Null, WireValue::ArrayMap)
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        let WireValue::ArrayMap(map) = value else {
            return Err(mismatch("array map", value));
        };
        let items = map
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_wire(item).map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_keyed(items).map_err(|e| match e {
            ArrayMapError::DuplicateKey(key) => {
                DecodeError::new(DecodeErrorKind::DuplicateKey(key.to_string()))
            }
            ArrayMapError::MissingKey(i) => {
                DecodeError::new(DecodeErrorKind::MissingField).in_field(T::KEY_FIELD).at_index(i)
            }
        })
    }
}

impl<T: Named> WireType for Box<T> {
    fn schema() -> Schema {
        Schema::Ptr(T::WIRE_NAME)
    }

    fn register(registry: &mut SchemaRegistry) {
        T::register(registry);
    }

    fn to_wire(&self) -> WireValue {
        self.as_ref().to_wire()
    }

    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        T::from_wire(value).map(Self::new)
    }
}

/// Declare a wire struct: field names map to their wire spelling
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident = $wire:literal {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty = $fwire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::wire::WireType for $name {
            fn schema() -> $crate::schema::Schema {
                $crate::schema::Schema::Struct($wire)
            }

            fn register(registry: &mut $crate::schema::SchemaRegistry) {
                if registry.contains($wire) {
                    return;
                }
                // Placeholder first so self-referential fields terminate.
                registry.insert_struct($crate::schema::StructDef {
                    name: $wire,
                    fields: Vec::new(),
                });
                $( <$ty as $crate::wire::WireType>::register(registry); )*
                registry.insert_struct($crate::schema::StructDef {
                    name: $wire,
                    fields: vec![
                        $(
                            $crate::schema::FieldDef::new(
                                $fwire,
                                <$ty as $crate::wire::WireType>::schema(),
                            ),
                        )*
                    ],
                });
            }

            fn to_wire(&self) -> $crate::value::WireValue {
                $crate::value::WireValue::Struct(vec![
                    $( ($fwire.to_string(), $crate::wire::WireType::to_wire(&self.$field)), )*
                ])
            }

            fn from_wire(
                value: &$crate::value::WireValue,
            ) -> Result<Self, $crate::error::DecodeError> {
                $crate::wire::expect_struct(value)?;
                Ok(Self {
                    $( $field: $crate::wire::field(value, $fwire)?, )*
                })
            }
        }

        impl $crate::wire::Named for $name {
            const WIRE_NAME: &'static str = $wire;
        }
    };
}

/// Declare a wire enum, encoded as the case name
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident = $wire:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $vwire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
        }

        impl $name {
            pub const fn wire_name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $vwire, )*
                }
            }

            pub fn from_wire_name(name: &str) -> Option<Self> {
                match name {
                    $( $vwire => Some(Self::$variant), )*
                    _ => None,
                }
            }
        }

        impl $crate::wire::WireType for $name {
            fn schema() -> $crate::schema::Schema {
                $crate::schema::Schema::Enum($wire)
            }

            fn register(registry: &mut $crate::schema::SchemaRegistry) {
                if !registry.contains($wire) {
                    registry.insert_enum($crate::schema::EnumDef {
                        name: $wire,
                        cases: vec![$($vwire),*],
                    });
                }
            }

            fn to_wire(&self) -> $crate::value::WireValue {
                $crate::value::WireValue::Enum(self.wire_name().to_string())
            }

            fn from_wire(
                value: &$crate::value::WireValue,
            ) -> Result<Self, $crate::error::DecodeError> {
                match value {
                    $crate::value::WireValue::Enum(case) => Self::from_wire_name(case).ok_or_else(|| {
                        $crate::error::DecodeError::new(
                            $crate::error::DecodeErrorKind::UnknownEnumCase(case.clone()),
                        )
                    }),
                    other => Err($crate::wire::mismatch("enum", other)),
                }
            }
        }

        impl $crate::wire::Named for $name {
            const WIRE_NAME: &'static str = $wire;
        }
    };
}

/// Declare a tagged union whose cases are named wire types
#[macro_export]
macro_rules! wire_variant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident($ty:ty)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant($ty),
            )*
        }

        impl $crate::wire::WireType for $name {
            fn schema() -> $crate::schema::Schema {
                $crate::schema::Schema::Variant(vec![
                    $(
                        (
                            <$ty as $crate::wire::Named>::WIRE_NAME,
                            <$ty as $crate::wire::WireType>::schema(),
                        ),
                    )*
                ])
            }

            fn register(registry: &mut $crate::schema::SchemaRegistry) {
                $( <$ty as $crate::wire::WireType>::register(registry); )*
            }

            fn to_wire(&self) -> $crate::value::WireValue {
                match self {
                    $(
                        Self::$variant(inner) => $crate::value::WireValue::Variant(
                            <$ty as $crate::wire::Named>::WIRE_NAME.to_string(),
                            Box::new($crate::wire::WireType::to_wire(inner)),
                        ),
                    )*
                }
            }

            fn from_wire(
                value: &$crate::value::WireValue,
            ) -> Result<Self, $crate::error::DecodeError> {
                let $crate::value::WireValue::Variant(case, inner) = value else {
                    return Err($crate::wire::mismatch("variant", value));
                };
                $(
                    if case == <$ty as $crate::wire::Named>::WIRE_NAME {
                        return <$ty as $crate::wire::WireType>::from_wire(inner)
                            .map(Self::$variant)
                            .map_err(|e| e.at_index(1));
                    }
                )*
                Err($crate::error::DecodeError::new(
                    $crate::error::DecodeErrorKind::UnknownCase(case.clone()),
                )
                .at_index(0))
            }
        }
    };
}
