//! Plinth: a language server for PHP component templates.
//!
//! A component is a PHP class paired with a same-stem template file.  The
//! server offers completion and go-to-definition inside templates:
//!
//! - [`parser`]: lexical extraction of class, property and method
//!   signatures from component source files
//! - [`registry`]: the component cache, kept coherent with the files on
//!   disk, with inheritance flattening and the read API
//! - [`completion`]: cursor classification and completion items
//! - [`definition`]: jump targets for components and their members
//! - [`server`]: the `LanguageServer` implementation
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tower_lsp::Client;
use tower_lsp::lsp_types::MessageType;

pub mod completion;
pub mod config;
pub mod definition;
pub mod error;
pub mod parser;
pub mod registry;
mod server;
pub mod types;
pub mod util;

pub use config::Config;
pub use registry::{ComponentRegistry, RegistryOptions};
pub use types::*;

pub struct Backend {
    name: String,
    version: String,
    /// Text of every open document, keyed by URI string.
    open_files: Arc<Mutex<HashMap<String, String>>>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    config: Arc<RwLock<Config>>,
    registry: Arc<ComponentRegistry>,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::build(Some(client), None, Config::default())
    }

    /// A backend without a client connection, for tests.
    pub fn new_test() -> Self {
        Self::build(None, None, Config::default())
    }

    /// A client-less backend rooted at `workspace_root`.  The registry is
    /// configured but not scanned; the first query triggers the scan.
    pub fn new_test_with_workspace(workspace_root: PathBuf, config: Config) -> Self {
        Self::build(None, Some(workspace_root), config)
    }

    fn build(client: Option<Client>, workspace_root: Option<PathBuf>, config: Config) -> Self {
        let options = registry_options(&config, workspace_root.as_deref());
        Self {
            name: "Plinth".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            workspace_root: Arc::new(RwLock::new(workspace_root)),
            config: Arc::new(RwLock::new(config)),
            registry: Arc::new(ComponentRegistry::new(options)),
            client,
        }
    }

    /// The component registry backing this server.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Public helper for tests: the stored text of an open document.
    pub fn open_file_content(&self, uri: &str) -> Option<String> {
        self.open_files.lock().get(uri).cloned()
    }

    /// Push the current config into the registry, rescanning if the
    /// search setup changed.  Returns whether a rescan happened.
    pub(crate) async fn apply_config(&self) -> bool {
        let root = self.workspace_root.read().clone();
        let options = registry_options(&self.config.read(), root.as_deref());
        let rescanned = self.registry.reconfigure(options).await;
        if rescanned {
            let count = self.registry.len();
            self.log(
                MessageType::INFO,
                format!("Plinth indexed {count} component class(es)"),
            )
            .await;
        }
        rescanned
    }

    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        tracing::info!("{message}");
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}

fn registry_options(config: &Config, workspace_root: Option<&std::path::Path>) -> RegistryOptions {
    RegistryOptions {
        search_paths: config.resolved_search_paths(workspace_root),
        source_extension: config.source_extension.clone(),
        template_extension: config.template_extension.clone(),
    }
}
