//! Storage-specific error type wrapping sqlx errors.

use camlink_domain::error::CamlinkError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for CamlinkError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_wrap_sqlx_error_as_storage_error() {
        let err: CamlinkError = StorageError::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, CamlinkError::Storage(_)));
    }
}
