//! Error types shared by the identity, loader and pagination layers

use std::sync::Arc;

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Errors surfaced by entity resolution and pagination.
///
/// `Clone` is required because a single batch failure is fanned out to every
/// caller waiting on that batch.
#[derive(Error, Debug, Clone)]
pub enum ExplorerError {
    /// Duplicate, invalid or missing registration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tag or entity type with no registry entry
    #[error("Unknown entity type \"{entity_type}\"")]
    UnknownEntity { entity_type: String },

    /// Client supplied an identifier that cannot be split into tag and key
    #[error("Malformed identifier: {reason}")]
    MalformedIdentifier { reason: String },

    /// Key absent from the underlying store
    #[error("{entity_type} not found: {key}")]
    NotFound { entity_type: String, key: String },

    /// The underlying batch fetch failed for every key in the dispatch
    #[error("Failed to load {entity_type}: {cause}")]
    BatchFetch {
        entity_type: String,
        cause: Arc<anyhow::Error>,
    },

    /// Pagination or lookup argument out of range
    #[error("Invalid argument {argument}: {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },
}

impl ExplorerError {
    #[must_use]
    pub fn unknown_entity(entity_type: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity_type: entity_type.into(),
        }
    }

    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn batch_fetch(entity_type: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::BatchFetch {
            entity_type: entity_type.into(),
            cause: Arc::new(cause),
        }
    }

    #[must_use]
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// Stable machine-readable code, exposed as the `code` GraphQL error extension
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::UnknownEntity { .. } => "UNKNOWN_ENTITY",
            Self::MalformedIdentifier { .. } => "MALFORMED_IDENTIFIER",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::BatchFetch { .. } => "BATCH_FETCH_FAILED",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
    }
}

impl ErrorExtensions for ExplorerError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

pub type Result<T, E = ExplorerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ExplorerError::Configuration("dup".into()),
            ExplorerError::unknown_entity("Foo"),
            ExplorerError::malformed("bad"),
            ExplorerError::not_found("block", "abc"),
            ExplorerError::batch_fetch("block", anyhow::anyhow!("db down")),
            ExplorerError::invalid_argument("first", "must be positive"),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_batch_fetch_message_includes_cause() {
        let err = ExplorerError::batch_fetch("proposal", anyhow::anyhow!("connection reset"));
        assert_eq!(err.to_string(), "Failed to load proposal: connection reset");
    }

    #[test]
    fn test_graphql_extension_carries_code() {
        let err = ExplorerError::malformed("missing separator").extend();
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(async_graphql::Value::from("MALFORMED_IDENTIFIER")));
    }
}
