use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
    sync::{LazyLock, RwLock},
};

use documented::{Documented, DocumentedFields};
use folio_core::DEFAULT_PAGE_SIZE;
use folio_utils::path::{resolve_path, xdg_config_home, xdg_data_home};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{info, warn};

use crate::{
    annotations::{annotate_array, annotate_table},
    error::{ConfigError, Result},
    view::{View, ViewConfig},
};

/// folio configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Path to the SQLite database the views query.
    /// Default: $XDG_DATA_HOME/folio/folio.db
    pub db_path: Option<String>,

    /// Page size used when a request asks for none.
    /// Default: 10
    pub default_page_size: Option<i64>,

    /// Log the rendered SQL of every query at info level.
    /// Default: false
    pub debug_trace: Option<bool>,

    /// Queryable views.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewConfig>,
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("FOLIO_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("folio").join("config.toml"),
    })
});

/// Points the configuration at a different file.
pub fn set_config_path(path: PathBuf) {
    *CONFIG_PATH.write().unwrap() = path;
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            db_path: Some(format!("{}/folio/folio.db", xdg_data_home().display())),
            default_page_size: Some(DEFAULT_PAGE_SIZE),
            debug_trace: Some(false),
            views: Vec::new(),
        }
    }

    /// Loads the configuration file, falling back to the defaults when it
    /// does not exist.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using defaults",
                    config_path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        let defaults = Self::default_config();

        if self.db_path.is_none() {
            self.db_path = defaults.db_path;
        }
        self.debug_trace.get_or_insert(false);

        let page_size = *self.default_page_size.get_or_insert(DEFAULT_PAGE_SIZE);
        if page_size <= 0 {
            return Err(ConfigError::InvalidPageSize(page_size));
        }

        let mut seen_views = HashSet::new();

        for view in &self.views {
            if view.name.trim().is_empty() {
                return Err(ConfigError::EmptyViewName);
            }
            if !seen_views.insert(&view.name) {
                return Err(ConfigError::DuplicateView(view.name.clone()));
            }

            view.compile()?;
        }

        Ok(())
    }

    pub fn get_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(resolve_path(path)?),
            None => Ok(xdg_data_home().join("folio").join("folio.db")),
        }
    }

    pub fn get_default_page_size(&self) -> i64 {
        self.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn get_debug_trace(&self) -> bool {
        self.debug_trace.unwrap_or(false)
    }

    /// Looks up a view by name and compiles it.
    pub fn get_view(&self, name: &str) -> Result<View> {
        self.views
            .iter()
            .find(|view| view.name == name)
            .ok_or_else(|| ConfigError::MissingView(name.to_string()))?
            .compile()
    }

    pub fn save(&self) -> Result<()> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, serialized)?;
        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_table::<Config>(doc.as_table_mut(), false)?;

        if let Some(views) = doc
            .get_mut("views")
            .and_then(|item| item.as_array_of_tables_mut())
        {
            annotate_array::<ViewConfig>(views)?;
        }

        Ok(doc)
    }
}

/// Writes the default configuration, annotated with field docs, to the
/// config path.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, doc.to_string())?;
    info!(
        "Default configuration file generated at: {}",
        config_path.display()
    );
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::{
        test_utils::with_env,
        view::{ColumnConfig, FilterConfig},
    };

    fn view(name: &str) -> ViewConfig {
        ViewConfig {
            name: name.into(),
            table: "users".into(),
            filters: vec![FilterConfig {
                name: "status".into(),
                kind: Some("equals-string".into()),
                rule: Some("{column} = ?".into()),
                ..Default::default()
            }],
            columns: vec![ColumnConfig {
                name: "id".into(),
                db_name: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let mut config = Config::default_config();
        assert_eq!(config.default_page_size, Some(10));
        assert_eq!(config.debug_trace, Some(false));
        assert!(config.views.is_empty());
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn test_resolve_sets_defaults() {
        let mut config: Config = toml::from_str(
            r#"
            [[views]]
            name = "users"
            table = "users"
            "#,
        )
        .unwrap();

        config.resolve().unwrap();
        assert_eq!(config.get_default_page_size(), 10);
        assert!(!config.get_debug_trace());
        assert!(config.db_path.is_some());
    }

    #[test]
    fn test_resolve_invalid_page_size() {
        let mut config = Config::default_config();
        config.default_page_size = Some(0);
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_resolve_duplicate_view() {
        let mut config = Config::default_config();
        config.views = vec![view("users"), view("users")];
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::DuplicateView(name)) if name == "users"
        ));
    }

    #[test]
    fn test_resolve_empty_view_name() {
        let mut config = Config::default_config();
        config.views = vec![view("  ")];
        assert!(matches!(config.resolve(), Err(ConfigError::EmptyViewName)));
    }

    #[test]
    fn test_resolve_surfaces_malformed_filters() {
        let mut config = Config::default_config();
        let mut bad = view("users");
        bad.filters[0].rule = Some("status = 1".into());
        config.views = vec![bad];

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidView { .. })
        ));
    }

    #[test]
    fn test_get_view() {
        let mut config = Config::default_config();
        config.views = vec![view("users"), view("admins")];

        let admins = config.get_view("admins").unwrap();
        assert_eq!(admins.name, "admins");
        assert_eq!(admins.schema.len(), 1);

        assert!(matches!(
            config.get_view("teams"),
            Err(ConfigError::MissingView(name)) if name == "teams"
        ));
    }

    #[test]
    #[serial]
    fn test_db_path_expands_env() {
        with_env(vec![("FOLIO_DATA", "/srv/folio")], || {
            let mut config = Config::default_config();
            config.db_path = Some("$FOLIO_DATA/app.db".into());
            assert_eq!(
                config.get_db_path().unwrap(),
                PathBuf::from("/srv/folio/app.db")
            );
        });
    }

    #[test]
    fn test_annotated_document() {
        let mut config = Config::default_config();
        config.views = vec![view("users")];

        let doc = config.to_annotated_document().unwrap().to_string();
        assert!(doc.contains("# Page size used when a request asks for none."));
        assert!(doc.contains("# Unique name of the view"));

        let parsed: Config = toml::from_str(&doc).unwrap();
        assert_eq!(parsed.views.len(), 1);
        assert_eq!(parsed.views[0].filters[0].rule.as_deref(), Some("{column} = ?"));
    }

    #[test]
    #[serial]
    fn test_save_load_and_generate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        set_config_path(path.clone());

        let config = Config::new().unwrap();
        assert!(config.views.is_empty());

        let path = generate_default_config().unwrap();
        assert!(path.exists());
        assert!(matches!(
            generate_default_config(),
            Err(ConfigError::ConfigAlreadyExists)
        ));

        let mut config = Config::new().unwrap();
        config.views.push(view("users"));
        config.default_page_size = Some(25);
        config.save().unwrap();

        let loaded = Config::new().unwrap();
        assert_eq!(loaded.get_default_page_size(), 25);
        assert_eq!(loaded.views.len(), 1);
        assert!(loaded.get_view("users").is_ok());
    }
}
