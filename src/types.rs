//! Data types used throughout the Plinth server.
//!
//! This module contains the "model" structs and enums that represent
//! extracted component metadata (components, properties, methods,
//! parameters) as well as the cursor classification produced for
//! template documents.
use std::path::PathBuf;

/// Type text recorded for a property or parameter declared without a type.
pub const MIXED: &str = "mixed";

/// Return type recorded for a method declared without a return type.
pub const VOID: &str = "void";

/// Visibility of a class member (method or property).
///
/// Methods without an explicit visibility modifier default to `Public`.
/// Properties always carry one; the extractor does not discover the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Map a visibility keyword as written in source.  Anything else is
    /// `None`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A single parameter from a method's parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// The parameter name WITHOUT the `$` prefix.
    pub name: String,
    /// Raw type text, or [`MIXED`] when the parameter is untyped.
    pub type_hint: String,
    /// Whether the parameter has a `= default` expression.
    pub has_default: bool,
}

/// A property declared on a component class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// The property name WITHOUT the `$` prefix (e.g. "count").
    pub name: String,
    /// The class that declares the property.  Differs from the owning
    /// component's name when the property was inherited.
    pub declaring_class: String,
    /// Raw declared type (`?int`, `string|int`, `Item[]`), or [`MIXED`].
    pub declared_type: String,
    pub visibility: Visibility,
    pub is_static: bool,
}

/// A method declared on a component class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    /// The class that declares the method.
    pub declaring_class: String,
    /// Raw return type text, or [`VOID`].
    pub return_type: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub parameters: Vec<Parameter>,
}

/// A component: a class, the file it lives in, and its paired template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// The class name.  Unique within the registry.
    pub name: String,
    pub source_file: PathBuf,
    /// The same-stem template file, when one exists.  Components without a
    /// template are only reachable as parent classes.
    pub template_file: Option<PathBuf>,
    /// The parent class from the `extends` clause, as written in source.
    pub extends_name: Option<String>,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    /// Set once the inheritance merge has run for this component.
    pub resolved: bool,
}

impl Component {
    /// Whether the component can be used as a tag in templates.
    pub fn is_taggable(&self) -> bool {
        self.template_file.is_some()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Publicly visible members of a component, as offered to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members {
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
}

/// The kind of template region the cursor sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionKind {
    /// Inside `{ ... }`.
    SingleBrace,
    /// Inside `{{ ... }}`.
    DoubleBrace,
    /// Inside a `name="..."` attribute value.
    Attribute,
    /// Inside a `(event)="..."` binding.
    Event,
    #[default]
    None,
}

/// Result of classifying a cursor position in template text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorContext {
    /// Inside a single- or double-brace bound expression.
    pub inside_code: bool,
    /// Inside an attribute value (plain or event binding).
    pub inside_attribute: bool,
    /// Inside an opening tag, after its name.
    pub inside_tag: bool,
    /// The tag name when `inside_tag` is set and a name was typed.
    pub tag_name: Option<String>,
    pub region: RegionKind,
}
