use folio_core::QueryError;
use folio_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(folio_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(folio_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(folio_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid default page size: {0}")]
    #[diagnostic(
        code(folio_config::invalid_page_size),
        help("default_page_size must be a positive number")
    )]
    InvalidPageSize(i64),

    #[error("View name cannot be empty")]
    #[diagnostic(code(folio_config::empty_view_name))]
    EmptyViewName,

    #[error("Duplicate view name: {0}")]
    #[diagnostic(
        code(folio_config::duplicate_view),
        help("Each view must have a unique name")
    )]
    DuplicateView(String),

    #[error("View not found: {0}")]
    #[diagnostic(
        code(folio_config::missing_view),
        help("Run 'folio views' to list the configured views")
    )]
    MissingView(String),

    #[error("Invalid view `{view}`: {source}")]
    #[diagnostic(
        code(folio_config::invalid_view),
        help("Fix the filters and columns declared for this view")
    )]
    InvalidView {
        view: String,
        #[source]
        source: QueryError,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(folio_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(folio_config::path))]
    Path(#[from] PathError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(folio_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(folio_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
