/// Server configuration.
///
/// Settings come from up to four layers, each overriding the previous:
///
///   1. Built-in defaults ([`Config::default`])
///   2. The user config file, `<config dir>/plinth/config.toml`
///   3. The workspace file, `<workspace root>/.plinth.toml`
///   4. The editor's `initializationOptions` or `didChangeConfiguration`
///      settings (either the settings object itself or wrapped in a
///      `plinth` section)
///
/// Every layer except the defaults is partial: a missing key keeps the
/// value from the layer below.  Unreadable or malformed files are logged
/// and skipped.
use std::path::{Path, PathBuf};

use etcetera::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the per-workspace config file.
pub const WORKSPACE_CONFIG_FILE: &str = ".plinth.toml";

/// Settings section name used by editors.
pub const SETTINGS_SECTION: &str = "plinth";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// When false, completion requests return nothing.
    pub enable_autocompletion: bool,
    /// Directories scanned for components.  Relative entries resolve
    /// against the workspace root; an empty list means the root itself.
    pub component_search_paths: Vec<String>,
    /// Extension of component class files, without the dot.
    pub source_extension: String,
    /// Extension of paired template files, without the dot.
    pub template_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_autocompletion: true,
            component_search_paths: Vec::new(),
            source_extension: "php".to_string(),
            template_extension: "html".to_string(),
        }
    }
}

/// A partial [`Config`], as read from one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverlay {
    pub enable_autocompletion: Option<bool>,
    pub component_search_paths: Option<Vec<String>>,
    pub source_extension: Option<String>,
    pub template_extension: Option<String>,
}

impl ConfigOverlay {
    /// Read an overlay from a TOML file.  A missing file is `Ok(None)`.
    pub fn from_toml_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read an overlay from an editor settings object.
    ///
    /// Accepts both `{ "componentSearchPaths": [...] }` and
    /// `{ "plinth": { "componentSearchPaths": [...] } }`.  `null` is an
    /// empty overlay.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let section = value.get(SETTINGS_SECTION).unwrap_or(value);
        Ok(serde_json::from_value(section.clone())?)
    }
}

impl Config {
    /// Apply an overlay on top of this config.
    pub fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.enable_autocompletion {
            self.enable_autocompletion = v;
        }
        if let Some(v) = overlay.component_search_paths {
            self.component_search_paths = v;
        }
        if let Some(v) = overlay.source_extension {
            self.source_extension = normalise_extension(&v);
        }
        if let Some(v) = overlay.template_extension {
            self.template_extension = normalise_extension(&v);
        }
    }

    /// Build the file-backed layers: defaults, then the user config file,
    /// then the workspace file.
    pub fn load(workspace_root: Option<&Path>) -> Self {
        let mut config = Self::default();

        let mut files = Vec::new();
        if let Some(path) = user_config_path() {
            files.push(path);
        }
        if let Some(root) = workspace_root {
            files.push(root.join(WORKSPACE_CONFIG_FILE));
        }

        for path in files {
            match ConfigOverlay::from_toml_file(&path) {
                Ok(Some(overlay)) => {
                    tracing::debug!("applying config file {}", path.display());
                    config.apply(overlay);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{e}"),
            }
        }

        config
    }

    /// The absolute directories to scan.
    pub fn resolved_search_paths(&self, workspace_root: Option<&Path>) -> Vec<PathBuf> {
        if self.component_search_paths.is_empty() {
            return workspace_root.map(Path::to_path_buf).into_iter().collect();
        }
        self.component_search_paths
            .iter()
            .filter_map(|p| {
                let path = PathBuf::from(p);
                if path.is_absolute() {
                    Some(path)
                } else {
                    workspace_root.map(|root| root.join(path))
                }
            })
            .collect()
    }
}

fn normalise_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

fn user_config_path() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("plinth").join("config.toml"))
}
