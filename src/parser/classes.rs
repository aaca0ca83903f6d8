/// Class header extraction.
///
/// Finds the first `class Name [extends Parent]` declaration.  Modifiers
/// (`abstract`, `final`, `readonly`) before the keyword are irrelevant and
/// simply not part of the match.
use std::sync::LazyLock;

use regex::Regex;

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+extends\s+(\\?[A-Za-z_][A-Za-z0-9_\\]*))?",
    )
    .expect("class pattern is valid")
});

/// Words that can follow `class` without naming a class: anonymous
/// classes (`new class extends Base`, `new class implements Foo`).
const NOT_A_NAME: &[&str] = &["extends", "implements"];

/// Extract the class name and the raw parent name from source text.
///
/// Returns `(None, None)` when no class declaration is found.  The parent
/// is returned exactly as written, including any namespace qualification.
pub fn extract_class(text: &str) -> (Option<String>, Option<String>) {
    for caps in CLASS_RE.captures_iter(text) {
        // `$class` or `::class` are not declarations.
        let start = caps.get(0).map_or(0, |m| m.start());
        if start > 0 && matches!(text.as_bytes()[start - 1], b'$' | b':' | b'>') {
            continue;
        }

        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if NOT_A_NAME.contains(&name) {
            continue;
        }

        let parent = caps.get(2).map(|m| m.as_str().to_string());
        return (Some(name.to_string()), parent);
    }
    (None, None)
}

/// The last segment of a possibly namespace-qualified class name.
///
/// `\App\Components\Base` becomes `Base`.
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}
