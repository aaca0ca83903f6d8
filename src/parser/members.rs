/// Property, method and parameter extraction.
///
/// Type text is kept raw: nullable (`?int`), union (`int|string`) and
/// array-suffix (`Item[]`) notations pass through unparsed.
use std::sync::LazyLock;

use regex::Regex;

use crate::types::*;

/// `visibility [static] [readonly] [type] $name`.  The type may not cross
/// `;`, `=`, parentheses or braces, which keeps it from swallowing a
/// neighbouring declaration or a method signature.
static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(public|protected|private)\s+(?:(static)\s+)?(?:readonly\s+)?([^$;=(){}]*?)\s*\$([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("property pattern is valid")
});

/// `[modifiers] function name(params)[: return]`.  The parameter list ends
/// at the first `)`.
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:(?:public|protected|private|static|abstract|final)\s+)*)function\s+&?([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)(?:\s*:\s*([^{;]+))?",
    )
    .expect("method pattern is valid")
});

/// `[promotion modifiers] [type] [&][...]$name [= default]`.
static PARAMETER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^\s*(?:(?:public|protected|private|readonly)\s+)*(.*?)\s*&?\s*(?:\.\.\.)?\s*\$([A-Za-z_][A-Za-z0-9_]*)\s*(=.*)?$",
    )
    .expect("parameter pattern is valid")
});

/// Trimmed type text, or `fallback` when nothing was written.
fn type_or(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => fallback.to_string(),
    }
}

/// Extract every property declaration in source order.
///
/// Only declarations that start with a visibility keyword are found.
/// Promoted constructor parameters (`__construct(private int $id)`) carry
/// one too, so they are discovered as properties.
pub fn extract_properties(text: &str, class_name: &str) -> Vec<Property> {
    PROPERTY_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let visibility = Visibility::from_keyword(caps.get(1)?.as_str())?;
            Some(Property {
                name: caps.get(4)?.as_str().to_string(),
                declaring_class: class_name.to_string(),
                declared_type: type_or(caps.get(3).map(|m| m.as_str()), MIXED),
                visibility,
                is_static: caps.get(2).is_some(),
            })
        })
        .collect()
}

/// Extract every named function declaration in source order.
///
/// A method without a visibility keyword is public.
pub fn extract_methods(text: &str, class_name: &str) -> Vec<Method> {
    METHOD_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let modifiers = caps.get(1).map_or("", |m| m.as_str());
            let visibility = modifiers
                .split_whitespace()
                .find_map(Visibility::from_keyword)
                .unwrap_or(Visibility::Public);
            let is_static = modifiers.split_whitespace().any(|m| m == "static");

            Some(Method {
                name: caps.get(2)?.as_str().to_string(),
                declaring_class: class_name.to_string(),
                return_type: type_or(caps.get(4).map(|m| m.as_str()), VOID),
                visibility,
                is_static,
                parameters: split_parameters(caps.get(3).map_or("", |m| m.as_str())),
            })
        })
        .collect()
}

/// Split a raw parameter list on commas and parse each segment.
///
/// There is no nesting awareness: a default value containing a comma
/// (`array $a = [1, 2]`) produces a broken split.  Segments without a
/// `$name` are dropped.
pub fn split_parameters(raw: &str) -> Vec<Parameter> {
    raw.split(',')
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(|segment| {
            let caps = PARAMETER_RE.captures(segment)?;
            Some(Parameter {
                name: caps.get(2)?.as_str().to_string(),
                type_hint: type_or(caps.get(1).map(|m| m.as_str()), MIXED),
                has_default: caps.get(3).is_some(),
            })
        })
        .collect()
}
