/// Component signature extraction.
///
/// This module pulls class, property, method and parameter signatures out
/// of PHP component source text with regular expressions instead of a real
/// parser.  Templates only need declared signatures, and component classes
/// are expected to be simple data-carrying classes, so a lexical pass is
/// enough.  Nested constructs (default values with parentheses or commas,
/// braces inside strings, commented-out code) can confuse it.
///
/// Everything here is pure: no I/O and no shared state.  The registry only
/// sees the [`SignatureExtractor`] trait, so the regex pass can be swapped
/// for a tokenizer without touching it.
///
/// Sub-modules:
/// - [`classes`]: the `class Name extends Parent` header
/// - [`members`]: properties, methods and parameter lists
mod classes;
mod members;

pub use classes::{extract_class, short_name};
pub use members::{extract_methods, extract_properties, split_parameters};

use crate::types::{Method, Property};

/// Everything extracted from one component source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatures {
    pub class_name: String,
    pub parent: Option<String>,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
}

/// Turns source text into [`Signatures`].
///
/// Returns `None` when the text has no class declaration; the caller drops
/// the file.
pub trait SignatureExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Option<Signatures>;
}

/// The regex-driven extractor used by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalExtractor;

impl SignatureExtractor for LexicalExtractor {
    fn extract(&self, text: &str) -> Option<Signatures> {
        let (class_name, parent) = extract_class(text);
        let class_name = class_name?;
        let properties = extract_properties(text, &class_name);
        let methods = extract_methods(text, &class_name);
        Some(Signatures {
            class_name,
            parent,
            properties,
            methods,
        })
    }
}
