//! Error conditions raised inside the registry and config layers.
//!
//! None of these escape the public registry operations: they are logged
//! at the boundary and turned into empty results.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The file contains no `class` declaration.
    #[error("no class declaration found in {}", .0.display())]
    ExtractionMiss(PathBuf),

    /// The file vanished, could not be read, or its metadata is unavailable.
    #[error("could not read {}: {source}", .path.display())]
    FileSystemTransient {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `extends` target was never found.
    #[error("parent class `{parent}` of `{child}` not found")]
    UnresolvedParent { child: String, parent: String },

    /// The registry was cleared while the file was being parsed.
    #[error("discarding parse of {}: registry was cleared", .0.display())]
    Superseded(PathBuf),

    /// The class extends itself, directly or through its ancestors.
    #[error("cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::FileSystemTransient {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings object: {0}")]
    Json(#[from] serde_json::Error),
}
