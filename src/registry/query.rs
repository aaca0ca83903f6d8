/// Read API for completion and definition providers.
use std::collections::BTreeSet;
use std::path::Path;

use super::ComponentRegistry;
use crate::types::{Component, Members, Visibility};

/// Framework hooks that are never offered to templates.
pub const LIFECYCLE_METHODS: &[&str] = &[
    "__construct",
    "__destruct",
    "mount",
    "boot",
    "booted",
    "hydrate",
    "dehydrate",
    "render",
];

impl ComponentRegistry {
    /// Names of every component usable as a template tag, sorted.
    ///
    /// Scans first when nothing is cached yet.
    pub async fn components_for_tag_suggestions(&self) -> BTreeSet<String> {
        if self.is_empty() {
            self.scan_all().await;
        }
        self.state
            .lock()
            .components
            .values()
            .filter(|c| c.is_taggable())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Public members the template at `template_file` can bind to.
    ///
    /// The paired component is re-parsed first if either file changed on
    /// disk.  Lifecycle hooks are excluded.
    pub async fn members_for(&self, template_file: &Path) -> Members {
        match self.component_for_template(template_file).await {
            Some(component) => public_members(&component),
            None => Members::default(),
        }
    }

    /// The component paired with a template, staleness-checked and with
    /// inheritance resolved.
    pub async fn component_for_template(&self, template_file: &Path) -> Option<Component> {
        let source = self.source_path_for(template_file);
        if source == template_file {
            return None;
        }
        let template = tokio::fs::metadata(template_file)
            .await
            .is_ok_and(|m| m.is_file())
            .then_some(template_file);

        let component = self.parse_one(&source, template).await?;
        if component.resolved {
            return Some(component);
        }
        self.resolve_inheritance(&component.name).await;
        self.refresh_dependents(&component.name);
        self.lookup(&component.name)
    }

    /// Direct cache lookup by class name.
    pub fn lookup(&self, name: &str) -> Option<Component> {
        self.state.lock().components.get(name).cloned()
    }
}

/// Public properties and public, non-lifecycle methods of `component`.
pub fn public_members(component: &Component) -> Members {
    Members {
        properties: component
            .properties
            .iter()
            .filter(|p| p.visibility == Visibility::Public)
            .cloned()
            .collect(),
        methods: component
            .methods
            .iter()
            .filter(|m| m.visibility == Visibility::Public)
            .filter(|m| !LIFECYCLE_METHODS.contains(&m.name.as_str()))
            .cloned()
            .collect(),
    }
}
