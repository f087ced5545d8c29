use rusqlite::ErrorCode;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of a single engine operation. Every mutating operation runs in one
/// transaction, so no variant ever leaves partial writes behind.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Legal input that the current tournament state or format disallows.
    #[error("rule violation: {0}")]
    RuleViolation(String),

    /// Unknown strategy key or invalid tournament settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lock or transaction contention; safe to retry.
    #[error("transient failure, retry: {0}")]
    Transient(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn rule(message: impl Into<String>) -> Self {
        EngineError::RuleViolation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration(message.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        if is_contention(&err) {
            EngineError::Transient(err.to_string())
        } else {
            EngineError::Database(err)
        }
    }
}

impl From<r2d2::Error> for EngineError {
    fn from(err: r2d2::Error) -> Self {
        EngineError::Transient(format!("connection pool: {}", err))
    }
}

fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

/// Context line for a failed operation on a tournament
pub fn tournament_context(operation: &str, tournament_id: i64) -> String {
    format!("Failed to {} tournament {}", operation, tournament_id)
}

/// Context line for a failed rating operation
pub fn rating_context(operation: &str) -> String {
    format!("Failed to {} ratings", operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    #[test]
    fn test_busy_maps_to_transient() {
        let busy = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        let err = EngineError::from(busy);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_constraint_is_not_retryable() {
        let constraint =
            rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_CONSTRAINT), None);
        let err = EngineError::from(constraint);
        assert!(matches!(err, EngineError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("tournament", 7);
        assert_eq!(err.to_string(), "tournament 7 not found");
    }
}
