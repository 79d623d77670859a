//! Error types for the Tote engine.

use crate::{CollectionKind, ProductId};
use thiserror::Error;

/// All possible errors from the Tote engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Mutation errors
    #[error("operation '{operation}' is not supported for {kind} collections")]
    UnsupportedForKind {
        operation: &'static str,
        kind: CollectionKind,
    },

    #[error("duplicate entity: {0}")]
    DuplicateEntity(ProductId),

    #[error("unknown collection kind: {0}")]
    UnknownKind(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid phase transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnsupportedForKind {
            operation: "setQuantity",
            kind: CollectionKind::Liked,
        };
        assert_eq!(
            err.to_string(),
            "operation 'setQuantity' is not supported for liked collections"
        );

        let err = Error::DuplicateEntity("p1".into());
        assert_eq!(err.to_string(), "duplicate entity: p1");

        let err = Error::InvalidTransition {
            from: "ready".into(),
            event: "localLoaded".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid phase transition from ready on localLoaded"
        );
    }
}
