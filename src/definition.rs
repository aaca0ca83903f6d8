/// Go-to-definition for templates.
///
/// Given a cursor position in a template this module:
///   1. Extracts the word under the cursor.
///   2. Decides what it names: a component tag (`<Counter`), an attribute
///      of a component tag (`<Counter start=`), or a member of the
///      template's own component (`{{ count }}`, `(click)="increment"`).
///   3. Finds the declaring class's source file through the registry.
///   4. Re-scans that file's text for the declaration and returns the span
///      of the identifier itself.
///
/// Step 4 deliberately does not reuse the extracted signatures: they carry
/// no offsets, and a fresh textual search gives an exact highlight range.
use std::ops::Range;
use std::path::Path;

use regex::Regex;
use tower_lsp::lsp_types::{Location, Position, Url};

use crate::Backend;
use crate::completion::context::classify;
use crate::types::{Component, RegionKind};
use crate::util::{byte_range_to_range, position_to_byte_offset, word_range_at};

/// The kind of declaration to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Method,
    Property,
}

/// Byte range of the identifier in the first matching declaration of
/// `name` in `content`.
pub fn find_declaration(content: &str, name: &str, kind: DeclarationKind) -> Option<Range<usize>> {
    let name = regex::escape(name);
    let pattern = match kind {
        DeclarationKind::Class => format!(r"\bclass\s+({name})\b"),
        DeclarationKind::Method => format!(r"\bfunction\s+&?({name})\s*\("),
        DeclarationKind::Property => {
            format!(r"\b(?:public|protected|private)\s[^$;=(){{}}]*\$({name})\b")
        }
    };
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(content)?;
    caps.get(1).map(|m| m.range())
}

impl Backend {
    /// Handle a "go to definition" request inside a template.
    pub(crate) async fn resolve_definition(
        &self,
        uri: &Url,
        content: &str,
        position: Position,
    ) -> Option<Location> {
        if self.registry.is_empty() {
            self.registry.scan_all().await;
        }

        let offset = position_to_byte_offset(content, position);
        let word_range = word_range_at(content, offset)?;
        let word = &content[word_range.clone()];

        // `<Counter` or `</Counter`: the component class itself.
        let before = content[..word_range.start].trim_end_matches('/');
        if before.ends_with('<')
            && let Some(component) = self.registry.lookup(word)
        {
            return locate(&component.source_file, word, DeclarationKind::Class).await;
        }

        // `<Counter start=`: an attribute naming a property of the tag's
        // component.
        let ctx = classify(content, word_range.start);
        if ctx.inside_tag
            && let Some(tag) = ctx.tag_name.as_deref()
            && let Some(component) = self.registry.lookup(tag)
            && let Some(location) = self.locate_member(&component, word, false).await
        {
            return Some(location);
        }

        // A member of the template's own component.
        if let Ok(path) = uri.to_file_path()
            && let Some(component) = self.registry.component_for_template(&path).await
        {
            let prefer_method = ctx.region == RegionKind::Event
                || content[word_range.end..].trim_start().starts_with('(');
            if let Some(location) = self.locate_member(&component, word, prefer_method).await {
                return Some(location);
            }
        }

        // Any other mention of a component name.
        let component = self.registry.lookup(word)?;
        locate(&component.source_file, word, DeclarationKind::Class).await
    }

    /// Find `name` among `component`'s members and locate its declaration
    /// in the declaring class's file.
    async fn locate_member(
        &self,
        component: &Component,
        name: &str,
        prefer_method: bool,
    ) -> Option<Location> {
        let property = component
            .property(name)
            .map(|p| (p.declaring_class.as_str(), DeclarationKind::Property));
        let method = component
            .method(name)
            .map(|m| (m.declaring_class.as_str(), DeclarationKind::Method));
        let (declaring_class, kind) = if prefer_method {
            method.or(property)?
        } else {
            property.or(method)?
        };

        let source = if declaring_class == component.name {
            component.source_file.clone()
        } else {
            self.registry
                .lookup(declaring_class)
                .map_or_else(|| component.source_file.clone(), |c| c.source_file)
        };
        locate(&source, name, kind).await
    }
}

/// Read `file` and locate the declaration of `name`.
async fn locate(file: &Path, name: &str, kind: DeclarationKind) -> Option<Location> {
    let content = match tokio::fs::read_to_string(file).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("could not read {}: {e}", file.display());
            return None;
        }
    };
    let range = find_declaration(&content, name, kind)?;
    Some(Location {
        uri: Url::from_file_path(file).ok()?,
        range: byte_range_to_range(&content, range),
    })
}
