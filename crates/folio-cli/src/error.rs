use folio_config::error::ConfigError;
use folio_core::QueryError;
use folio_db::DbError;
use folio_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(code(folio::path), help("Check the path and the variables it references"))]
    Path(#[from] PathError),

    #[error("Invalid filter `{0}`")]
    #[diagnostic(
        code(folio::invalid_filter),
        help("Filters are written as field=value, e.g. -f status=active")
    )]
    InvalidFilter(String),

    #[error(transparent)]
    #[diagnostic(code(folio::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(folio::toml), help("Check your configuration syntax"))]
    Toml(#[from] toml::ser::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
