//! Error classification shared by the client components

use std::fmt;

use remote_ui_protocol::DecodeError;

/// How a failure is handled by the client loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Shape violation in one envelope: logged, envelope dropped, loop continues
    SchemaMismatch,
    /// An id that must be fresh already exists: batch rolled back, frame rejected
    DuplicateId,
    /// An id that must exist does not: batch rolled back, frame rejected
    UnknownId,
    /// Tree or registry structure is inconsistent (second parent, cycle,
    /// ambiguous root, element kind change): handled like `UnknownId`
    InvalidStructure,
    /// Network or parse noise while polling: retried silently
    TransportTransient,
    /// The connect step failed: surfaced to the caller
    HandshakeFailure,
}

impl ErrorKind {
    /// True for the kinds that reject a whole frame
    pub const fn rejects_frame(self) -> bool {
        matches!(
            self,
            Self::DuplicateId | Self::UnknownId | Self::InvalidStructure
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SchemaMismatch => "schema mismatch",
            Self::DuplicateId => "duplicate id",
            Self::UnknownId => "unknown id",
            Self::InvalidStructure => "invalid structure",
            Self::TransportTransient => "transient transport failure",
            Self::HandshakeFailure => "handshake failure",
        };
        write!(f, "{s}")
    }
}

/// Anything that can report its [`ErrorKind`]
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

impl Classify for DecodeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::SchemaMismatch
    }
}
