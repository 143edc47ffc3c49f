//! Configuration for seedling-elab
//!
//! Sources, highest priority first:
//! 1. Command-line arguments (`--port`, `--database`, `--auth-token`)
//! 2. Environment variables (`SEEDLING_*`, bound through clap)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Example file:
//!
//! ```toml
//! port = 5790
//! database_path = "seedling.db"
//!
//! [logging]
//! level = "debug"
//!
//! [auth]
//! tokens = ["dev-token"]
//!
//! [extraction]
//! mode = "http"
//! endpoint = "http://localhost:8088/extract"
//! timeout_ms = 3000
//!
//! [[schema.fields]]
//! name = "participants"
//! question = "How many participants?"
//! kind = "integer"
//! suggest = "participants"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use seedling_common::config::{
    default_config_file, load_toml, resolve_root_folder, resolve_under, LoggingConfig,
    ROOT_FOLDER_ENV,
};
use seedling_common::{Error, Result};

use crate::extractors::{FocusedFieldExtractor, HttpExtractor, MetadataExtractor};
use crate::models::{FieldDefinition, MetadataSchema};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5790;

/// Database file name under the root folder
pub const DEFAULT_DATABASE_FILE: &str = "seedling.db";

/// seedling-elab TOML configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ElabConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database path, relative to the root folder unless absolute
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Root folder (also read directly by root folder resolution)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Custom metadata schema; the youth exchange schema when absent
    #[serde(default)]
    pub schema: Option<SchemaConfig>,
}

/// Bearer token allow-list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Accepted tokens; empty disables authentication
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    #[default]
    Focused,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub mode: ExtractionMode,

    /// Remote extraction endpoint (required for `http` mode)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_extraction_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            endpoint: None,
            timeout_ms: default_extraction_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub fields: Vec<FieldDefinition>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_extraction_timeout_ms() -> u64 {
    5000
}

impl Default for ElabConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: None,
            root_folder: None,
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            extraction: ExtractionConfig::default(),
            schema: None,
        }
    }
}

impl ElabConfig {
    /// Load from `path`, or from the platform default config file
    ///
    /// No file at all means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Ok(path) => path,
                Err(_) => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config = load_toml::<Self>(&path)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot start
    pub fn validate(&self) -> Result<()> {
        if self.extraction.timeout_ms == 0 {
            return Err(Error::Config("extraction.timeout_ms must be positive".to_string()));
        }
        if self.extraction.mode == ExtractionMode::Http
            && self.extraction.endpoint.as_deref().map_or(true, |e| e.trim().is_empty())
        {
            return Err(Error::Config(
                "extraction.endpoint is required when extraction.mode = \"http\"".to_string(),
            ));
        }
        self.build_schema()?;
        Ok(())
    }

    /// Root folder: CLI, then `SEEDLING_ROOT_FOLDER`, then this file's
    /// `root_folder`, then the platform default resolution
    pub fn root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        let env_set = std::env::var(ROOT_FOLDER_ENV).is_ok_and(|v| !v.trim().is_empty());

        match (cli_arg, &self.root_folder) {
            (None, Some(from_file)) if !env_set => from_file.clone(),
            _ => resolve_root_folder(cli_arg, ROOT_FOLDER_ENV),
        }
    }

    /// Database file location under `root_folder`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        let path = self
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
        resolve_under(root_folder, &path)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction.timeout_ms)
    }

    /// Validated metadata schema
    pub fn build_schema(&self) -> Result<MetadataSchema> {
        match &self.schema {
            Some(schema) => MetadataSchema::new(schema.fields.clone()),
            None => Ok(MetadataSchema::youth_exchange()),
        }
    }

    /// Extractor selected by `extraction.mode`
    pub fn build_extractor(&self) -> Result<Arc<dyn MetadataExtractor>> {
        match self.extraction.mode {
            ExtractionMode::Focused => Ok(Arc::new(FocusedFieldExtractor::new())),
            ExtractionMode::Http => {
                let endpoint = self.extraction.endpoint.clone().ok_or_else(|| {
                    Error::Config("extraction.endpoint is required for http mode".to_string())
                })?;
                let extractor = HttpExtractor::new(endpoint, self.extraction_timeout())
                    .map_err(|e| Error::Config(e.to_string()))?;
                Ok(Arc::new(extractor))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKind, SuggestionRule};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ElabConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.logging.level, "info");
        assert!(config.auth.tokens.is_empty());
        assert_eq!(config.extraction.mode, ExtractionMode::Focused);
        assert_eq!(config.extraction_timeout(), Duration::from_millis(5000));
        assert_eq!(config.build_schema().unwrap().required_count(), 5);
    }

    #[test]
    fn test_full_file() {
        let config: ElabConfig = toml::from_str(
            r#"
            port = 6001
            database_path = "/tmp/elab.db"

            [auth]
            tokens = ["a", "b"]

            [extraction]
            mode = "http"
            endpoint = "http://localhost:9000/extract"
            timeout_ms = 250

            [[schema.fields]]
            name = "participants"
            question = "How many?"
            kind = "integer"
            min = 16
            max = 60

            [[schema.fields]]
            name = "days"
            question = "How long?"
            kind = "duration"
            suggest = "duration"

            [[schema.fields]]
            name = "budget"
            question = "Budget per person?"
            kind = "number"
            suggest = "budget"
            total_field = "totalBudget"

            [[schema.fields]]
            name = "notes"
            question = "Anything else?"
            required = false
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.port, 6001);
        assert_eq!(config.auth.tokens, vec!["a", "b"]);
        assert_eq!(config.database_path(Path::new("/root")), PathBuf::from("/tmp/elab.db"));
        assert_eq!(config.extraction_timeout(), Duration::from_millis(250));

        let schema = config.build_schema().unwrap();
        assert_eq!(schema.required_count(), 3);
        assert_eq!(schema.field("participants").unwrap().kind, FieldKind::Integer);
        assert_eq!(schema.field("days").unwrap().kind, FieldKind::Duration);
        assert_eq!(schema.field("budget").unwrap().suggest, Some(SuggestionRule::Budget));
        assert_eq!(schema.field("budget").unwrap().total_field.as_deref(), Some("totalBudget"));
        assert!(config.build_extractor().is_ok());
    }

    #[test]
    fn test_relative_database_path_resolves_under_root() {
        let config = ElabConfig::default();
        assert_eq!(
            config.database_path(Path::new("/srv/seedling")),
            PathBuf::from("/srv/seedling/seedling.db")
        );
    }

    #[test]
    fn test_cli_root_folder_wins_over_file() {
        let config: ElabConfig = toml::from_str("root_folder = \"/from/file\"").unwrap();
        assert_eq!(
            config.root_folder(Some(Path::new("/from/cli"))),
            PathBuf::from("/from/cli")
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_env_root_folder_wins_over_file() {
        let config: ElabConfig = toml::from_str("root_folder = \"/from/file\"").unwrap();

        std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
        assert_eq!(config.root_folder(None), PathBuf::from("/from/env"));

        std::env::remove_var(ROOT_FOLDER_ENV);
        assert_eq!(config.root_folder(None), PathBuf::from("/from/file"));
    }

    #[test]
    fn test_http_mode_requires_endpoint() {
        let config: ElabConfig = toml::from_str("[extraction]\nmode = \"http\"\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_schema_without_required_fields_fails_validation() {
        let config: ElabConfig = toml::from_str(
            r#"
            [[schema.fields]]
            name = "notes"
            question = "Anything else?"
            required = false
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
