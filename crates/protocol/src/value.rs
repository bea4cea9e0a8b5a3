//! Dynamic wire values and the collections they are built from

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// RGBA color, written on the wire as `#RRGGBB` or `#RRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// CSS `rgba(...)` notation
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                f64::from(self.a) / 255.0
            )
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').ok_or(())?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

/// Key of a dictionary entry or of an [`ArrayMap`] item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Integer(i64),
    String(String),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayMapError {
    #[error("duplicate key `{0}`")]
    DuplicateKey(MapKey),
    #[error("item {0} has no usable key")]
    MissingKey(usize),
}

/// Items that carry their own unique key
pub trait Keyed {
    fn key(&self) -> MapKey;
}

/// Ordered list that can also be looked up by a unique key
#[derive(Debug, Clone)]
pub struct ArrayMap<T> {
    items: Vec<T>,
    index: HashMap<MapKey, usize>,
}

impl<T> ArrayMap<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build from items using `key_of` to extract each item's key
    pub fn from_items_by<F>(items: Vec<T>, key_of: F) -> Result<Self, ArrayMapError>
    where
        F: Fn(&T) -> Option<MapKey>,
    {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let key = key_of(item).ok_or(ArrayMapError::MissingKey(i))?;
            if index.insert(key.clone(), i).is_some() {
                return Err(ArrayMapError::DuplicateKey(key));
            }
        }
        Ok(Self { items, index })
    }

    pub fn get(&self, key: &MapKey) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Keyed> ArrayMap<T> {
    pub fn from_keyed(items: Vec<T>) -> Result<Self, ArrayMapError> {
        Self::from_items_by(items, |item| Some(item.key()))
    }

    /// Append `item`, or replace in place the item with the same key
    pub fn insert(&mut self, item: T) -> Option<T> {
        let key = item.key();
        if let Some(&i) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.items[i], item));
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        None
    }
}

impl<T> Default for ArrayMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for ArrayMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for ArrayMap<T> {}

impl<'a, T> IntoIterator for &'a ArrayMap<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

static NULL_VALUE: WireValue = WireValue::Null;

/// A decoded value, shaped by the schema it was decoded with
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f32),
    Double(f64),
    String(String),
    Char(char),
    Color(Color),
    Binary(Vec<u8>),
    List(Vec<WireValue>),
    Dictionary(BTreeMap<MapKey, WireValue>),
    ArrayMap(ArrayMap<WireValue>),
    Variant(String, Box<WireValue>),
    Enum(String),
    Struct(Vec<(String, WireValue)>),
}

impl WireValue {
    /// Short name of the value's kind, used in error messages
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Char(_) => "char",
            Self::Color(_) => "color",
            Self::Binary(_) => "binary",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
            Self::ArrayMap(_) => "array map",
            Self::Variant(..) => "variant",
            Self::Enum(_) => "enum",
            Self::Struct(_) => "struct",
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Field of a struct value; absent fields read as `Null`
    pub fn field(&self, name: &str) -> &Self {
        match self {
            Self::Struct(fields) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map_or(&NULL_VALUE, |(_, v)| v),
            _ => &NULL_VALUE,
        }
    }

    /// Interpret this value as an [`ArrayMap`] key
    pub fn as_map_key(&self) -> Option<MapKey> {
        match self {
            Self::Integer(i) => Some(MapKey::Integer(*i)),
            Self::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    /// Build an [`ArrayMap`] of struct values keyed by `field`
    pub fn array_map(items: Vec<Self>, field: &str) -> Result<ArrayMap<Self>, ArrayMapError> {
        ArrayMap::from_items_by(items, |item| item.field(field).as_map_key())
    }
}
