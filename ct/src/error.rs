//! Error types for cargo exchange

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::key::TypeKey;

/// Boxed error raised by a codec behind the gateway
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the serialization gateway
#[derive(Debug, Error)]
pub enum GrappleError {
    #[error("Failed to encode {type_key}: {source}")]
    Encode {
        type_key: TypeKey,
        #[source]
        source: CodecError,
    },

    #[error("Failed to decode {type_key}: {source}")]
    Decode {
        type_key: TypeKey,
        #[source]
        source: CodecError,
    },

    #[error("Type {0} cannot be resolved in this process")]
    UnresolvedType(TypeKey),
}

/// Errors raised by the channel transport
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChannelError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by a [`Truck`](crate::Truck)
#[derive(Debug, Error)]
pub enum TruckError {
    #[error("Transport fault: {0}")]
    Transport(#[from] ChannelError),

    #[error("Serialization fault: {0}")]
    Serialization(#[from] GrappleError),
}

impl TruckError {
    /// File-system or mapping failure while publishing or polling
    pub fn is_transport(&self) -> bool {
        matches!(self, TruckError::Transport(_))
    }

    /// Payload bytes did not decode, or their type is unknown here
    pub fn is_deserialization(&self) -> bool {
        matches!(
            self,
            TruckError::Serialization(GrappleError::Decode { .. } | GrappleError::UnresolvedType(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transport() {
        let err: TruckError = ChannelError::io("/tmp/x", io::Error::other("disk full")).into();
        assert!(err.is_transport());
        assert!(!err.is_deserialization());
    }

    #[test]
    fn test_is_deserialization() {
        let err: TruckError = GrappleError::UnresolvedType(TypeKey::named("a::B")).into();
        assert!(err.is_deserialization());
        assert!(!err.is_transport());

        let err: TruckError = GrappleError::Encode {
            type_key: TypeKey::named("a::B"),
            source: "boom".into(),
        }
        .into();
        assert!(!err.is_deserialization());
    }

    #[test]
    fn test_io_error_keeps_cause() {
        let err = ChannelError::io("/tmp/channel/addr", io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let source = std::error::Error::source(&err).expect("source attached");
        assert!(source.to_string().contains("denied"));
        assert!(err.to_string().contains("/tmp/channel/addr"));
    }
}
