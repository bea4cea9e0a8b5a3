//! Wire schema descriptors
//!
//! A [`Schema`] describes the shape of one value on the wire. Named structs
//! and enums live in a [`SchemaRegistry`]; `Struct`, `Enum` and `Ptr` refer to
//! them by name, which is how self-referential shapes such as the rendering
//! tree are expressed.

use std::collections::HashMap;
use std::fmt;

/// Shape of a value crossing the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Boolean,
    Integer,
    Float,
    Double,
    String,
    Char,
    Color,
    Binary,
    /// Absent (`null`) or a present value
    Nullable(Box<Schema>),
    /// Ordered, duplicates allowed
    List(Box<Schema>),
    /// Unique keys; keys must be `Integer` or `String`
    Dictionary(Box<Schema>, Box<Schema>),
    /// Ordered list of structs, additionally indexed by a unique field
    ArrayMap { item: Box<Schema>, key: &'static str },
    /// Exactly one active case, tagged by case name
    Variant(Vec<(&'static str, Schema)>),
    /// A registered enum, encoded as its case name
    Enum(&'static str),
    /// A registered struct
    Struct(&'static str),
    /// A (possibly recursive) reference to a registered struct, owned by the
    /// value that contains it
    Ptr(&'static str),
}

impl Schema {
    pub fn nullable(inner: Self) -> Self {
        Self::Nullable(Box::new(inner))
    }

    pub fn list(inner: Self) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn dictionary(key: Self, value: Self) -> Self {
        Self::Dictionary(Box::new(key), Box::new(value))
    }

    pub fn array_map(item: Self, key: &'static str) -> Self {
        Self::ArrayMap {
            item: Box::new(item),
            key,
        }
    }

    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::Double => write!(f, "Double"),
            Self::String => write!(f, "String"),
            Self::Char => write!(f, "Char"),
            Self::Color => write!(f, "Color"),
            Self::Binary => write!(f, "Binary"),
            Self::Nullable(inner) => write!(f, "Nullable<{inner}>"),
            Self::List(inner) => write!(f, "List<{inner}>"),
            Self::Dictionary(key, value) => write!(f, "Dictionary<{key}, {value}>"),
            Self::ArrayMap { item, key } => write!(f, "ArrayMap<{item}, {key}>"),
            Self::Variant(cases) => {
                write!(f, "Variant<[")?;
                for (i, (name, _)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}")?;
                }
                write!(f, "]>")
            }
            Self::Enum(name) | Self::Struct(name) => write!(f, "{name}"),
            Self::Ptr(name) => write!(f, "Ptr<{name}>"),
        }
    }
}

/// One named field of a struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub schema: Schema,
}

impl FieldDef {
    pub const fn new(name: &'static str, schema: Schema) -> Self {
        Self { name, schema }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: &'static str,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: &'static str,
    pub cases: Vec<&'static str>,
}

impl EnumDef {
    pub fn contains(&self, case: &str) -> bool {
        self.cases.iter().any(|c| *c == case)
    }
}

/// Named struct and enum definitions
///
/// Built explicitly (see [`crate::wire::WireType::register`]) and passed to
/// the codec; there is no process-wide table.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    structs: HashMap<&'static str, StructDef>,
    enums: HashMap<&'static str, EnumDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a struct or enum with this name is already present
    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name) || self.enums.contains_key(name)
    }

    /// Insert a struct definition, replacing any placeholder of the same name
    pub fn insert_struct(&mut self, def: StructDef) {
        self.structs.insert(def.name, def);
    }

    pub fn insert_enum(&mut self, def: EnumDef) {
        self.enums.insert(def.name, def);
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nests() {
        let schema = Schema::nullable(Schema::list(Schema::Variant(vec![
            ("A", Schema::Integer),
            ("B", Schema::Ptr("Node")),
        ])));
        assert_eq!(schema.to_string(), "Nullable<List<Variant<[A, B]>>>");
    }

    #[test]
    fn registry_lookup() {
        let mut registry = SchemaRegistry::new();
        registry.insert_enum(EnumDef {
            name: "Direction",
            cases: vec!["Horizontal", "Vertical"],
        });
        registry.insert_struct(StructDef {
            name: "Point",
            fields: vec![
                FieldDef::new("x", Schema::Integer),
                FieldDef::new("y", Schema::Integer),
            ],
        });

        assert!(registry.contains("Direction"));
        assert!(registry.get_enum("Direction").unwrap().contains("Vertical"));
        assert!(registry.get_struct("Point").unwrap().field("y").is_some());
        assert!(!registry.contains("Rect"));
    }
}
