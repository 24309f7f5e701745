//! Error handling for the ownership-graph engine
//!
//! Three outcome classes cross the operation boundary: validation failures
//! (bad input, caught before any storage access), not-found (an endpoint id
//! that does not resolve), and storage failures (the one hard-failure class,
//! propagated untouched because no query can continue without the store).
//!
//! An exhausted search is not an error: the path finder reports
//! `found: false` with its exploration count as a successful result.

use thiserror::Error;

/// Main error type for graph operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("invalid request: {message}")]
    Validation { message: String },

    #[error("{resource} not found: {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl GraphError {
    pub fn validation(message: impl Into<String>) -> Self {
        GraphError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, identifier: impl ToString) -> Self {
        GraphError::NotFound {
            resource: resource.into(),
            identifier: identifier.to_string(),
        }
    }

    /// True for outcomes a caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GraphError::Validation { .. } | GraphError::NotFound { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_structured_context() {
        let err = GraphError::not_found("company", 91);
        match err {
            GraphError::NotFound {
                ref resource,
                ref identifier,
            } => {
                assert_eq!(resource, "company");
                assert_eq!(identifier, "91");
            }
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn client_errors_are_distinguished_from_storage() {
        assert!(GraphError::validation("id must be positive").is_client_error());
        assert!(GraphError::not_found("property", "12-3456").is_client_error());
        assert!(!GraphError::Storage(sqlx::Error::PoolClosed).is_client_error());
    }

    #[test]
    fn display_names_the_failing_identifier() {
        let err = GraphError::not_found("principal", 204);
        assert_eq!(err.to_string(), "principal not found: 204");
    }
}
