use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tasker_core::{ListId, SortDirection, SortField, SortOptions};

const APP_DIR: &str = "tasker";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.json";

/// Top-level configuration loaded from `<config dir>/tasker/config.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Where the state file lives.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Fallbacks used by quick-add and listing.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl AppConfig {
    /// Default location of the configuration file, when the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`, or from [`default_path`](Self::default_path)
    /// when `path` is `None`. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, is not valid TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(config_path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("failed to parse {}", config_path.display()))
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// Returns an error when the document is not valid TOML or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.defaults.list.trim().is_empty() {
            bail!("defaults.list must not be empty");
        }
        self.defaults.sort()?;
        Ok(())
    }

    /// Resolved state file path.
    ///
    /// # Errors
    /// Returns an error when no path is configured and the platform has no data directory.
    pub fn state_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(STATE_FILE))
            .ok_or_else(|| anyhow!("failed to resolve data directory; set storage.path"))
    }
}

/// `[storage]` block.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Explicit state file path.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[defaults]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// List used by quick-add when neither the input nor the selection names one.
    #[serde(default = "default_list")]
    pub list: String,
    /// Sort field name.
    #[serde(default = "default_sort_field")]
    pub sort_field: String,
    /// Sort direction name.
    #[serde(default = "default_sort_direction")]
    pub sort_direction: String,
}

fn default_list() -> String {
    ListId::inbox().to_string()
}

fn default_sort_field() -> String {
    SortField::default().to_string()
}

fn default_sort_direction() -> String {
    "asc".to_owned()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            list: default_list(),
            sort_field: default_sort_field(),
            sort_direction: default_sort_direction(),
        }
    }
}

impl DefaultsConfig {
    /// Default list as an id.
    #[must_use]
    pub fn list_id(&self) -> ListId {
        ListId::new(self.list.trim())
    }

    /// Parsed default sort.
    ///
    /// # Errors
    /// Returns an error when the field or direction name is unknown.
    pub fn sort(&self) -> Result<SortOptions> {
        let field: SortField = self
            .sort_field
            .parse()
            .context("invalid defaults.sort_field")?;
        let direction: SortDirection = self
            .sort_direction
            .parse()
            .context("invalid defaults.sort_direction")?;
        Ok(SortOptions { field, direction })
    }
}
