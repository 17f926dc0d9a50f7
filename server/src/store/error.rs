use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationErrors;

/// Coarse classification the HTTP layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Cancelled,
    Storage,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid recipe request: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("recipe {0} not found")]
    NotFound(Uuid),

    /// A uniqueness constraint rejected a write.
    #[error("{context}: {source}")]
    Conflict {
        context: String,
        #[source]
        source: DieselError,
    },

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: DieselError,
    },

    #[error("database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Wrap a diesel error with context, classifying unique violations as conflicts.
    pub fn database(context: impl Into<String>, source: DieselError) -> Self {
        let context = context.into();
        match source {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::Conflict { context, source }
            }
            source => StoreError::Storage { context, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::Cancelled => ErrorKind::Cancelled,
            StoreError::Storage { .. } | StoreError::Pool(_) | StoreError::Worker(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// Errors raised by diesel's own transaction handling (begin, commit, rollback).
impl From<DieselError> for StoreError {
    fn from(source: DieselError) -> Self {
        StoreError::database("database transaction failed", source)
    }
}

pub(crate) trait DbResultExt<T> {
    fn db_context<C, F>(self, context: F) -> Result<T, StoreError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> DbResultExt<T> for Result<T, DieselError> {
    fn db_context<C, F>(self, context: F) -> Result<T, StoreError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| StoreError::database(context(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("constraint".to_string()))
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let err = StoreError::database("insert tag", db_error(DatabaseErrorKind::UniqueViolation));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().starts_with("insert tag: "));
    }

    #[test]
    fn test_other_database_errors_are_storage_faults() {
        let err = StoreError::database(
            "insert step",
            db_error(DatabaseErrorKind::CheckViolation),
        );
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err = StoreError::database("load recipe", DieselError::NotFound);
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_context_is_attached_lazily() {
        let result: Result<(), DieselError> = Err(db_error(DatabaseErrorKind::UniqueViolation));
        let err = result
            .db_context(|| format!("failed to insert step {} for recipe", 2))
            .unwrap_err();
        match err {
            StoreError::Conflict { context, .. } => {
                assert_eq!(context, "failed to insert step 2 for recipe")
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_names_the_recipe() {
        let id = Uuid::nil();
        let err = StoreError::NotFound(id);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "recipe 00000000-0000-0000-0000-000000000000 not found"
        );
    }
}
