/// Completion-related modules.
///
/// - **context**: classifying the cursor position inside a template
/// - **builder**: building LSP `CompletionItem`s from registry data
/// - **handler**: choosing a strategy for a completion request
pub mod builder;
pub mod context;
mod handler;
