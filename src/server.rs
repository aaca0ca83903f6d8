/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles all LSP protocol messages (initialize, document sync,
/// file watching, configuration, completion and definition).
use std::path::PathBuf;

use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::config::{Config, ConfigOverlay};

const WATCHER_REGISTRATION_ID: &str = "plinth-component-files";

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = workspace_root(&params);

        let mut config = Config::load(workspace_root.as_deref());
        if let Some(options) = &params.initialization_options {
            match ConfigOverlay::from_json(options) {
                Ok(overlay) => config.apply(overlay),
                Err(e) => tracing::warn!("ignoring initializationOptions: {e}"),
            }
        }

        *self.workspace_root.write() = workspace_root;
        *self.config.write() = config;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(
                        ["<", "{", "\"", " "].iter().map(|s| s.to_string()).collect(),
                    ),
                    ..CompletionOptions::default()
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..TextDocumentSyncOptions::default()
                    },
                )),
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.register_file_watcher().await;

        if !self.apply_config().await {
            self.registry.scan_all().await;
        }

        let count = self.registry.len();
        self.log(
            MessageType::INFO,
            format!("Plinth initialized! Indexed {count} component class(es)"),
        )
        .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let overlay = match ConfigOverlay::from_json(&params.settings) {
            Ok(overlay) => overlay,
            Err(e) => {
                tracing::warn!("ignoring configuration change: {e}");
                return;
            }
        };
        self.config.write().apply(overlay);
        self.apply_config().await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };
            if !self.registry.is_component_file(&path) {
                continue;
            }
            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    self.registry.update_component(&path).await;
                }
                FileChangeType::DELETED => {
                    self.registry.remove_component_by_file(&path).await;
                }
                other => tracing::debug!("ignoring file change {other:?}"),
            }
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();
        self.open_files.lock().insert(uri.clone(), doc.text);
        tracing::debug!("opened {uri}");
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.open_files
                .lock()
                .insert(params.text_document.uri.to_string(), change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Ok(path) = params.text_document.uri.to_file_path() else {
            return;
        };
        if self.registry.is_component_file(&path) {
            self.registry.update_component(&path).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        self.open_files.lock().remove(&uri);
        tracing::debug!("closed {uri}");
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        if let Some(content) = self.document_text(&uri).await
            && let Some(location) = self.resolve_definition(&uri, &content, position).await
        {
            return Ok(Some(GotoDefinitionResponse::Scalar(location)));
        }

        Ok(None)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        Ok(self.handle_completion(params).await)
    }
}

impl Backend {
    /// Ask the client to report changes to source and template files.
    async fn register_file_watcher(&self) {
        let Some(client) = &self.client else {
            return;
        };

        let pattern = {
            let config = self.config.read();
            format!(
                "**/*.{{{},{}}}",
                config.source_extension, config.template_extension
            )
        };
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(pattern),
                kind: None,
            }],
        };
        let register_options = match serde_json::to_value(options) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("could not encode watcher options: {e}");
                return;
            }
        };
        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(e) = client.register_capability(vec![registration]).await {
            tracing::warn!("file watcher registration failed: {e}");
        }
    }
}

/// The workspace root: `rootUri`, else the first workspace folder.
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .root_uri
        .as_ref()
        .or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first())
                .map(|folder| &folder.uri)
        })
        .and_then(|uri| uri.to_file_path().ok())
}
