//! Codec errors with field-path context

use std::fmt;

/// One step into a wire value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a value inside a decoded or encoded document, rooted at `$`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn prepend(&mut self, segment: PathSegment) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong at the failing location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required field")]
    MissingField,
    #[error("unknown variant case `{0}`")]
    UnknownCase(String),
    #[error("unknown enum case `{0}`")]
    UnknownEnumCase(String),
    #[error("variant must be a [case, value] pair")]
    MalformedVariant,
    #[error("invalid color `{0}`")]
    InvalidColor(String),
    #[error("invalid base64 payload: {0}")]
    InvalidBinary(String),
    #[error("integer out of range")]
    IntegerOutOfRange,
    #[error("expected a single character, found {0} characters")]
    InvalidChar(usize),
    #[error("invalid dictionary key `{0}`")]
    InvalidKey(String),
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("schema `{0}` is not registered")]
    UnregisteredSchema(String),
    #[error("unknown message `{0}`")]
    UnknownMessage(String),
}

/// A decode-time shape violation, with the path of the offending value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct DecodeError {
    pub path: FieldPath,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub const fn new(kind: DecodeErrorKind) -> Self {
        Self {
            path: FieldPath::root(),
            kind,
        }
    }

    pub const fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::new(DecodeErrorKind::TypeMismatch { expected, found })
    }

    /// Record that this error happened inside `segment`
    #[must_use]
    pub fn within(mut self, segment: PathSegment) -> Self {
        self.path.prepend(segment);
        self
    }

    #[must_use]
    pub fn in_field(self, name: &str) -> Self {
        self.within(PathSegment::Field(name.to_string()))
    }

    #[must_use]
    pub fn at_index(self, index: usize) -> Self {
        self.within(PathSegment::Index(index))
    }
}

/// A value that does not fit the schema it is being encoded with
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: cannot encode {found} as {expected}")]
pub struct EncodeError {
    pub path: FieldPath,
    pub expected: String,
    pub found: &'static str,
}

impl EncodeError {
    pub fn new(expected: impl Into<String>, found: &'static str) -> Self {
        Self {
            path: FieldPath::root(),
            expected: expected.into(),
            found,
        }
    }

    #[must_use]
    pub fn within(mut self, segment: PathSegment) -> Self {
        self.path.prepend(segment);
        self
    }
}
