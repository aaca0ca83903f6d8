/// Completion item building.
///
/// Turns registry data into LSP `CompletionItem`s for a classified cursor:
/// member bindings for brace, attribute and event regions, attribute
/// snippets inside a component tag, and component tag names.
use tower_lsp::lsp_types::*;

use crate::types::*;

/// Build the label showing the full method signature.
///
/// Example: `increment(int $by = ...): void`
pub fn method_label(method: &Method) -> String {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| {
            let param = if p.type_hint == MIXED {
                format!("${}", p.name)
            } else {
                format!("{} ${}", p.type_hint, p.name)
            };
            if p.has_default {
                format!("{param} = ...")
            } else {
                param
            }
        })
        .collect();
    format!("{}({}): {}", method.name, params.join(", "), method.return_type)
}

/// Completion items for the members a template can bind to.
///
/// - Brace regions: properties as-is, methods as calls (`name()`).
/// - Plain attribute values: both wrapped in a `{{ }}` binding.
/// - Event regions: methods only.  A method declaring parameters is
///   offered as `name($event)`, any other as a bare reference.
/// - Anything else: nothing.
pub fn member_items(members: &Members, region: RegionKind) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    let (with_properties, wrap) = match region {
        RegionKind::SingleBrace | RegionKind::DoubleBrace => (true, false),
        RegionKind::Attribute => (true, true),
        RegionKind::Event => (false, false),
        RegionKind::None => return items,
    };

    if with_properties {
        for property in &members.properties {
            let insert = if wrap {
                format!("{{{{ {} }}}}", property.name)
            } else {
                property.name.clone()
            };
            items.push(CompletionItem {
                label: property.name.clone(),
                kind: Some(CompletionItemKind::PROPERTY),
                detail: Some(format!(
                    "{} — {}",
                    property.declaring_class, property.declared_type
                )),
                insert_text: Some(insert),
                filter_text: Some(property.name.clone()),
                ..CompletionItem::default()
            });
        }
    }

    for method in &members.methods {
        let insert = match region {
            RegionKind::Event if method.parameters.is_empty() => method.name.clone(),
            RegionKind::Event => format!("{}($event)", method.name),
            _ if wrap => format!("{{{{ {}() }}}}", method.name),
            _ => format!("{}()", method.name),
        };
        items.push(CompletionItem {
            label: method_label(method),
            kind: Some(CompletionItemKind::METHOD),
            detail: Some(format!("Class: {}", method.declaring_class)),
            insert_text: Some(insert),
            filter_text: Some(method.name.clone()),
            ..CompletionItem::default()
        });
    }

    items
}

/// Attribute snippets for the public instance properties of a tag's
/// component: `start="$1"`.
pub fn attribute_items(component: &Component) -> Vec<CompletionItem> {
    component
        .properties
        .iter()
        .filter(|p| p.visibility == Visibility::Public && !p.is_static)
        .map(|p| CompletionItem {
            label: p.name.clone(),
            kind: Some(CompletionItemKind::FIELD),
            detail: Some(format!("{} — {}", component.name, p.declared_type)),
            insert_text: Some(format!("{}=\"$1\"", p.name)),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            filter_text: Some(p.name.clone()),
            ..CompletionItem::default()
        })
        .collect()
}

/// Tag-name items for every component whose name starts with `partial`
/// (case-insensitively).  `names` is expected to be sorted already.
pub fn tag_items<'a>(
    names: impl IntoIterator<Item = &'a String>,
    partial: &str,
) -> Vec<CompletionItem> {
    let partial = partial.to_lowercase();
    names
        .into_iter()
        .filter(|name| name.to_lowercase().starts_with(&partial))
        .enumerate()
        .map(|(idx, name)| CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::CLASS),
            detail: Some("Component".to_string()),
            insert_text: Some(name.clone()),
            sort_text: Some(format!("{idx:05}")),
            ..CompletionItem::default()
        })
        .collect()
}
