//! Error types for folio-core.

use miette::Diagnostic;
use thiserror::Error;

/// Error type for query derivation and execution.
#[derive(Error, Diagnostic, Debug)]
pub enum QueryError {
    #[error("Invalid page size: {0}")]
    #[diagnostic(
        code(folio_core::invalid_page_size),
        help("Page size must be positive; pass 0 to use the default page size")
    )]
    InvalidPageSize(i64),

    #[error("Malformed tag on field `{field}`: {reason}")]
    #[diagnostic(
        code(folio_core::malformed_tag),
        help("Fix the field declaration in the schema")
    )]
    MalformedTag { field: String, reason: String },

    #[error("Template has {markers} placeholder(s) but {values} value(s) were supplied")]
    #[diagnostic(code(folio_core::template_mismatch))]
    TemplateMismatch { markers: usize, values: usize },

    #[error("Storage query failed: {0}")]
    #[diagnostic(
        code(folio_core::storage),
        help("Check the database connection and the declared table and columns")
    )]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl QueryError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTag {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

/// Result type alias for folio-core operations.
pub type Result<T> = std::result::Result<T, QueryError>;
