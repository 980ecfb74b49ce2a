//! Error types for the graph store.

use crate::config::VectorIndexConfig;
use thiserror::Error;

/// Result type alias using the graph store error type.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Every failure a store operation can surface to its caller.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Configuration rejected at startup
    #[error("Configuration error in `{field}`: {reason}")]
    Config { field: String, reason: String },

    /// Backend unreachable or timed out. Never retried internally.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Bad caller arguments
    #[error("Invalid `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// An index already exists with different parameters
    #[error("Vector index conflict: existing {existing}, requested {requested}")]
    IndexConflict {
        existing: VectorIndexConfig,
        requested: VectorIndexConfig,
    },

    /// The extraction port failed
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The embedding port failed or returned a malformed vector
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Referenced entity or relation is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected a query or returned data we could not read
    #[error("Backend error: {0}")]
    Backend(String),
}

impl GraphError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field named by a config or validation error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } | Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Get HTTP status code for this error, for front-ends that expose the store.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound(_) => 404,
            Self::IndexConflict { .. } => 409,
            Self::Extraction(_) | Self::Embedding(_) => 502,
            Self::Connection(_) => 503,
            Self::Config { .. } | Self::Backend(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for GraphError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::CannotOpen)
            | Some(rusqlite::ErrorCode::DatabaseBusy)
            | Some(rusqlite::ErrorCode::DatabaseLocked) => Self::Connection(e.to_string()),
            _ => Self::Backend(e.to_string()),
        }
    }
}

impl From<redis::RedisError> for GraphError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error()
            || e.is_connection_refusal()
            || e.is_connection_dropped()
            || e.is_timeout()
        {
            Self::Connection(e.to_string())
        } else {
            Self::Backend(e.to_string())
        }
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Connection(e.to_string())
        } else {
            Self::Backend(e.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for GraphError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Backend(format!("blocking task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metric;

    #[test]
    fn status_codes() {
        assert_eq!(GraphError::validation("owner_id", "empty").status_code(), 400);
        assert_eq!(GraphError::NotFound("x".into()).status_code(), 404);
        assert_eq!(GraphError::Connection("down".into()).status_code(), 503);
        assert_eq!(GraphError::Embedding("bad".into()).status_code(), 502);
        assert_eq!(GraphError::config("provider", "unknown").status_code(), 500);
    }

    #[test]
    fn field_is_exposed_for_config_and_validation() {
        assert_eq!(GraphError::config("config.url", "missing").field(), Some("config.url"));
        assert_eq!(GraphError::validation("limit", "zero").field(), Some("limit"));
        assert_eq!(GraphError::Backend("x".into()).field(), None);
    }

    #[test]
    fn index_conflict_message_names_both_sides() {
        let existing = VectorIndexConfig::new(1024, Metric::Cosine);
        let requested = VectorIndexConfig::new(768, Metric::Cosine);
        let msg = GraphError::IndexConflict { existing, requested }.to_string();
        assert!(msg.contains("1024"));
        assert!(msg.contains("768"));
    }

    #[test]
    fn sqlite_open_failure_is_a_connection_error() {
        let err = rusqlite::Connection::open("/nonexistent-dir/definitely/missing.db").unwrap_err();
        assert!(GraphError::from(err).is_connection());
    }
}
