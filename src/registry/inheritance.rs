/// Inheritance flattening.
///
/// Each component has at most one `extends` pointer.  Resolving a
/// component merges its parent's (already resolved) members into it:
/// a parent member is added only when the child declares nothing with the
/// same name, so child declarations always win.
///
/// Resolution happens in two phases:
///
///   1. **Load** (async): walk the `extends` chain and parse any ancestor
///      that is not cached yet, found by class short name among the source
///      files seen so far.
///   2. **Merge** (sync, under the state lock): resolve ancestors first,
///      then strip the child's previously inherited members and merge the
///      parent's current ones.  Stripping first makes the merge idempotent
///      and lets a rebuilt parent's changes reach its children.
///
/// A class that extends itself, directly or through its ancestors, is
/// reported as [`RegistryError::CyclicInheritance`] and keeps only its own
/// members.
use std::collections::{HashSet, VecDeque};

use super::{ComponentRegistry, RegistryState};
use crate::error::RegistryError;
use crate::parser::short_name;

impl ComponentRegistry {
    /// Merge inherited members into the named component, loading missing
    /// ancestors on demand.  Returns whether the component ended up
    /// resolved.
    pub async fn resolve_inheritance(&self, name: &str) -> bool {
        self.load_ancestors(name, self.epoch()).await;
        let mut state = self.state.lock();
        match resolve_in(&mut state, name, &mut Vec::new()) {
            Ok(()) => {}
            Err(e @ RegistryError::UnresolvedParent { .. }) => tracing::debug!("{e}"),
            Err(e) => tracing::warn!("{e}"),
        }
        state.components.get(name).is_some_and(|c| c.resolved)
    }

    /// Resolve every cached component and mark the scan that started in
    /// `epoch` complete.  Returns false, merging nothing, once the registry
    /// has been cleared since.
    pub(super) async fn flatten_all(&self, epoch: u64) -> bool {
        let names: Vec<String> = self.state.lock().components.keys().cloned().collect();
        for name in &names {
            if self.epoch() != epoch {
                return false;
            }
            self.load_ancestors(name, epoch).await;
        }

        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }
        let mut names: Vec<String> = state.components.keys().cloned().collect();
        names.sort();
        for name in &names {
            match resolve_in(&mut state, name, &mut Vec::new()) {
                Ok(()) => {}
                Err(e @ RegistryError::UnresolvedParent { .. }) => tracing::debug!("{e}"),
                Err(e) => tracing::warn!("{e}"),
            }
        }
        state.scanned = true;
        true
    }

    /// Re-merge every component that (transitively) extends `name`.
    pub(super) fn refresh_dependents(&self, name: &str) {
        let mut state = self.state.lock();
        for dependent in dependents_of(&state, name) {
            if let Err(e) = resolve_in(&mut state, &dependent, &mut Vec::new()) {
                tracing::debug!("{e}");
            }
        }
    }

    /// Parse every ancestor of `name` that is not cached yet.
    ///
    /// An ancestor is looked up among the source files seen by earlier
    /// scans, then next to the file of the class extending it.
    async fn load_ancestors(&self, name: &str, epoch: u64) {
        let source_extension = self.options.lock().source_extension.clone();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = name.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return;
            }

            let (parent, parent_source) = {
                let state = self.state.lock();
                let Some(child) = state.components.get(&current) else {
                    return;
                };
                let Some(parent) = child
                    .extends_name
                    .as_deref()
                    .map(|p| short_name(p).to_string())
                else {
                    return;
                };
                if state.components.contains_key(&parent) {
                    (parent, None)
                } else {
                    let source = state.known_sources.get(&parent).cloned().unwrap_or_else(|| {
                        child
                            .source_file
                            .with_file_name(format!("{parent}.{source_extension}"))
                    });
                    (parent, Some(source))
                }
            };

            if let Some(source) = parent_source
                && tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_file())
            {
                let template = self.template_path_for(&source);
                let template = tokio::fs::metadata(&template)
                    .await
                    .is_ok_and(|m| m.is_file())
                    .then_some(template);
                tracing::debug!("loading parent {} on demand", parent);
                self.parse_in_epoch(&source, template.as_deref(), epoch).await;
            }

            if !self.state.lock().components.contains_key(&parent) {
                return;
            }
            current = parent;
        }
    }
}

/// Merge inherited members into `name`, resolving its ancestors first.
///
/// `visiting` holds the chain currently being resolved; meeting a name
/// already in it means the chain loops.
fn resolve_in(
    state: &mut RegistryState,
    name: &str,
    visiting: &mut Vec<String>,
) -> Result<(), RegistryError> {
    if visiting.iter().any(|v| v == name) {
        let mut chain = visiting.clone();
        chain.push(name.to_string());
        return Err(RegistryError::CyclicInheritance { chain });
    }

    let Some(component) = state.components.get_mut(name) else {
        return Ok(());
    };
    strip_inherited(component);

    let Some(parent) = component
        .extends_name
        .as_deref()
        .map(|p| short_name(p).to_string())
    else {
        component.resolved = true;
        return Ok(());
    };

    if !state.components.contains_key(&parent) {
        if let Some(component) = state.components.get_mut(name) {
            component.resolved = false;
        }
        return Err(RegistryError::UnresolvedParent {
            child: name.to_string(),
            parent,
        });
    }

    visiting.push(name.to_string());
    let parent_result = resolve_in(state, &parent, visiting);
    visiting.pop();

    match parent_result {
        // A missing grandparent does not stop the parent's own members
        // from being inherited.
        Ok(()) | Err(RegistryError::UnresolvedParent { .. }) => {}
        Err(e) => {
            if let Some(component) = state.components.get_mut(name) {
                component.resolved = false;
            }
            return Err(e);
        }
    }

    let Some(parent) = state.components.get(&parent) else {
        return Ok(());
    };
    let inherited_properties = parent.properties.clone();
    let inherited_methods = parent.methods.clone();

    let Some(component) = state.components.get_mut(name) else {
        return Ok(());
    };
    for property in inherited_properties {
        if !component.properties.iter().any(|p| p.name == property.name) {
            component.properties.push(property);
        }
    }
    for method in inherited_methods {
        if !component.methods.iter().any(|m| m.name == method.name) {
            component.methods.push(method);
        }
    }
    component.resolved = true;
    Ok(())
}

/// Remove members merged in by an earlier resolution.
fn strip_inherited(component: &mut crate::types::Component) {
    let own = component.name.clone();
    component.properties.retain(|p| p.declaring_class == own);
    component.methods.retain(|m| m.declaring_class == own);
}

/// Every component whose `extends` chain reaches `name`, nearest first.
fn dependents_of(state: &RegistryState, name: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([name.to_string()]);
    seen.insert(name.to_string());

    while let Some(current) = queue.pop_front() {
        let mut children: Vec<&String> = state
            .components
            .values()
            .filter(|c| {
                c.extends_name
                    .as_deref()
                    .is_some_and(|p| short_name(p) == current)
            })
            .map(|c| &c.name)
            .collect();
        children.sort();
        for child in children {
            if seen.insert(child.clone()) {
                result.push(child.clone());
                queue.push_back(child.clone());
            }
        }
    }
    result
}
