/// Completion request orchestration.
///
/// Classifies the cursor, then picks exactly one strategy:
/// member bindings inside braces, attribute values and event bindings;
/// attribute snippets inside a registered component's opening tag; tag
/// names everywhere else.
use tower_lsp::lsp_types::*;

use super::builder::{attribute_items, member_items, tag_items};
use super::context::{classify, partial_tag_name};
use crate::Backend;
use crate::util::position_to_byte_offset;

impl Backend {
    /// Main completion handler, called by `LanguageServer::completion`.
    pub(crate) async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> Option<CompletionResponse> {
        if !self.config.read().enable_autocompletion {
            return None;
        }

        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let content = self.document_text(&uri).await?;

        let items = self.completion_items(&uri, &content, position).await;
        if items.is_empty() {
            None
        } else {
            Some(CompletionResponse::Array(items))
        }
    }

    pub(crate) async fn completion_items(
        &self,
        uri: &Url,
        content: &str,
        position: Position,
    ) -> Vec<CompletionItem> {
        let offset = position_to_byte_offset(content, position);
        let ctx = classify(content, offset);

        if ctx.inside_code || ctx.inside_attribute {
            let Ok(path) = uri.to_file_path() else {
                return Vec::new();
            };
            let members = self.registry.members_for(&path).await;
            return member_items(&members, ctx.region);
        }

        let tags = self.registry.components_for_tag_suggestions().await;

        if ctx.inside_tag
            && let Some(tag) = ctx.tag_name.as_deref()
            && tags.contains(tag)
            && let Some(component) = self.registry.lookup(tag)
        {
            let component = if component.resolved {
                component
            } else {
                self.registry.resolve_inheritance(tag).await;
                self.registry.lookup(tag).unwrap_or(component)
            };
            return attribute_items(&component);
        }

        let partial = partial_tag_name(content, offset).unwrap_or("");
        tag_items(&tags, partial)
    }

    /// The text of an open document, or its contents on disk.
    pub(crate) async fn document_text(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.open_files.lock().get(uri.as_str()).cloned() {
            return Some(text);
        }
        let path = uri.to_file_path().ok()?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("could not read {}: {e}", path.display());
                None
            }
        }
    }
}
