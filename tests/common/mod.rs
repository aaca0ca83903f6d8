#![allow(dead_code)]

use plinth_lsp::{Backend, ComponentRegistry, Config, RegistryOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub const COUNTER_PHP: &str = r#"<?php

namespace App\Components;

class Counter extends BaseComponent
{
    public int $count = 0;
    public string $label = 'Clicks';
    private array $history = [];

    public function mount(int $start = 0): void
    {
        $this->count = $start;
    }

    public function increment(): void
    {
        $this->count++;
    }

    public function onInput(InputEvent $event): void
    {
    }

    protected function record(): void
    {
    }
}
"#;

pub const BASE_COMPONENT_PHP: &str = r#"<?php

namespace App\Components;

abstract class BaseComponent
{
    public string $id = '';

    public function refresh(): void
    {
    }

    public function render(): string
    {
        return '';
    }
}
"#;

/// Helper: create a temp workspace containing `files` (paths relative to
/// the workspace root).
pub fn create_workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        write_file(dir.path(), rel_path, content);
    }
    dir
}

pub fn write_file(root: &Path, rel_path: &str, content: &str) -> PathBuf {
    let full = root.join(rel_path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("failed to create dirs");
    }
    fs::write(&full, content).expect("failed to write file");
    full
}

/// Rewrite a file and push its mtime forward, so that filesystems with
/// coarse timestamps still observe the change.
pub fn rewrite_file(path: &Path, content: &str) {
    fs::write(path, content).expect("failed to write file");
    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .expect("failed to open file");
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .expect("failed to set mtime");
}

pub fn registry_for(root: &Path) -> ComponentRegistry {
    ComponentRegistry::new(RegistryOptions::new(vec![root.to_path_buf()]))
}

/// Helper: a workspace with the counter component, its base class and a
/// template-less helper class, plus a backend rooted there.
pub fn create_counter_workspace() -> (Backend, tempfile::TempDir) {
    let dir = create_workspace(&[
        ("components/Counter.php", COUNTER_PHP),
        ("components/Counter.html", "<button>{{ count }}</button>"),
        ("components/BaseComponent.php", BASE_COMPONENT_PHP),
        (
            "components/Alert.php",
            "<?php\nclass Alert\n{\n    public string $message;\n    public bool $dismissible = false;\n}\n",
        ),
        ("components/Alert.html", "<div>{{ message }}</div>"),
    ]);
    let backend = Backend::new_test_with_workspace(dir.path().to_path_buf(), Config::default());
    (backend, dir)
}

pub fn file_uri(path: &Path) -> Url {
    Url::from_file_path(path).expect("absolute path")
}

/// Open `text` as the document at `path` and return its URI.
pub async fn open_document(backend: &Backend, path: &Path, text: &str) -> Url {
    let uri = file_uri(path);
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "html".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
    uri
}

/// Byte offset of the end of the first occurrence of `marker` in `text`,
/// as an LSP position.
pub fn position_after(text: &str, marker: &str) -> Position {
    let offset = text.find(marker).expect("marker not found") + marker.len();
    position_at(text, offset)
}

pub fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Position {
        line,
        character: before[line_start..].chars().count() as u32,
    }
}

pub async fn complete(backend: &Backend, uri: &Url, position: Position) -> Vec<CompletionItem> {
    let params = CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    };
    match backend.completion(params).await.expect("completion failed") {
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    }
}

pub async fn definition(backend: &Backend, uri: &Url, position: Position) -> Option<Location> {
    let params = GotoDefinitionParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };
    match backend
        .goto_definition(params)
        .await
        .expect("definition failed")
    {
        Some(GotoDefinitionResponse::Scalar(location)) => Some(location),
        _ => None,
    }
}

pub fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

pub fn insert_texts(items: &[CompletionItem]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|i| i.insert_text.as_deref())
        .collect()
}
