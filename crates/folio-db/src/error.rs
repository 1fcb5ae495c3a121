//! Error types for folio-db.

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for folio-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(folio_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(
        code(folio_db::query),
        help("Check that the view's table, columns and join exist in the database")
    )]
    QueryError(String),

    #[error("Row is not valid JSON: {0}")]
    #[diagnostic(code(folio_db::row))]
    RowError(#[from] serde_json::Error),

    #[error("Table `{0}` has no columns")]
    #[diagnostic(
        code(folio_db::no_columns),
        help("Declare the output columns of the view or check the table name")
    )]
    NoColumns(String),
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(_, info) => {
                DbError::QueryError(info.message().to_string())
            }
            other => DbError::QueryError(other.to_string()),
        }
    }
}

impl From<diesel::result::ConnectionError> for DbError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        DbError::ConnectionError(err.to_string())
    }
}

/// Result type alias for folio-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
