/// The component metadata registry.
///
/// Owns every [`Component`] extracted from the configured search paths and
/// keeps the cache coherent with a file set that changes while the user
/// edits:
///
/// - `components`: class name → component
/// - `by_file`: source file → class name (strict inverse of
///   `components[name].source_file`)
/// - `mtimes`: last-observed modification time of every source and
///   template file that took part in a successful parse.  This is the only
///   staleness signal; content is never hashed.
/// - `known_sources`: file stem → source path for every source file seen,
///   used to load a parent class on demand.
///
/// Sub-modules:
/// - [`scan`]: directory walking and source/template pairing
/// - [`inheritance`]: flattening `extends` chains into child components
/// - [`query`]: the read API used by completion and definition
///
/// All state sits behind one `parking_lot::Mutex` that is never held across
/// an `.await`.  Full scans are serialized by `scan_lock`; parses of the
/// same file are serialized by a per-path async lock so that a second
/// concurrent parse waits for the first and then hits the cache.
///
/// [`clear`](ComponentRegistry::clear) starts a new epoch.  Work that began
/// in an earlier epoch (a parse, an inheritance pass, a whole scan) never
/// writes into the cleared cache.
///
/// No error escapes the public operations.  Filesystem problems and files
/// without a class are logged and produce `None` / empty results.
mod inheritance;
mod query;
mod scan;

pub use query::{LIFECYCLE_METHODS, public_members};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::parser::{LexicalExtractor, SignatureExtractor};
use crate::types::Component;
use crate::util::{has_extension, with_extension};

/// Where to look for components and how files are paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Absolute directories to scan recursively.
    pub search_paths: Vec<PathBuf>,
    /// Extension of component class files, without the dot.
    pub source_extension: String,
    /// Extension of paired template files, without the dot.
    pub template_extension: String,
}

impl RegistryOptions {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            source_extension: "php".to_string(),
            template_extension: "html".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    components: HashMap<String, Component>,
    by_file: HashMap<PathBuf, String>,
    mtimes: HashMap<PathBuf, SystemTime>,
    known_sources: HashMap<String, PathBuf>,
    /// Incremented by every clear.
    epoch: u64,
    /// A full scan completed in the current epoch.
    scanned: bool,
}

impl RegistryState {
    /// Drop the component backed by `source`, with its reverse-index and
    /// mtime records.  Returns the evicted component.
    fn evict_file(&mut self, source: &Path) -> Option<Component> {
        let name = self.by_file.remove(source)?;
        self.mtimes.remove(source);
        let component = self.components.remove(&name)?;
        if let Some(template) = &component.template_file {
            self.mtimes.remove(template);
        }
        Some(component)
    }

    /// Insert a freshly extracted component, keeping `by_file` a strict
    /// inverse of `components`.
    fn insert(
        &mut self,
        component: Component,
        source_mtime: SystemTime,
        template_mtime: Option<SystemTime>,
    ) {
        let source = component.source_file.clone();

        // The file used to declare a different class.
        if self
            .by_file
            .get(&source)
            .is_some_and(|old| *old != component.name)
        {
            self.evict_file(&source);
        }

        // Another file used to declare this class.
        if let Some(other) = self.components.get(&component.name)
            && other.source_file != source
        {
            let other = other.source_file.clone();
            tracing::debug!(
                "class {} moved from {} to {}",
                component.name,
                other.display(),
                source.display()
            );
            self.evict_file(&other);
        }

        // The template went away since the last parse.
        if let Some(old) = self.components.get(&component.name)
            && let Some(old_template) = &old.template_file
            && component.template_file.as_ref() != Some(old_template)
        {
            let old_template = old_template.clone();
            self.mtimes.remove(&old_template);
        }

        self.mtimes.insert(source.clone(), source_mtime);
        if let (Some(template), Some(mtime)) = (&component.template_file, template_mtime) {
            self.mtimes.insert(template.clone(), mtime);
        }
        if let Some(stem) = file_stem(&source) {
            self.known_sources.insert(stem, source.clone());
        }
        self.by_file.insert(source, component.name.clone());
        self.components.insert(component.name.clone(), component);
    }

    /// The cached component for `source` if neither file changed since it
    /// was parsed.
    fn fresh(
        &self,
        source: &Path,
        source_mtime: SystemTime,
        template: Option<(&Path, SystemTime)>,
    ) -> Option<&Component> {
        let component = self.components.get(self.by_file.get(source)?)?;
        if self.mtimes.get(source) != Some(&source_mtime) {
            return None;
        }
        match (template, &component.template_file) {
            (None, None) => Some(component),
            (Some((path, mtime)), Some(cached)) if cached == path => {
                (self.mtimes.get(path) == Some(&mtime)).then_some(component)
            }
            _ => None,
        }
    }
}

pub struct ComponentRegistry {
    extractor: Arc<dyn SignatureExtractor>,
    options: Mutex<RegistryOptions>,
    state: Mutex<RegistryState>,
    scan_lock: tokio::sync::Mutex<()>,
    /// Bumped when a full scan completes.
    scan_generation: AtomicU64,
    file_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl ComponentRegistry {
    /// Create an empty registry.  Nothing is scanned until
    /// [`scan_all`](Self::scan_all) is called.
    pub fn new(options: RegistryOptions) -> Self {
        Self::with_extractor(options, Arc::new(LexicalExtractor))
    }

    /// Create an empty registry that extracts signatures with `extractor`.
    pub fn with_extractor(options: RegistryOptions, extractor: Arc<dyn SignatureExtractor>) -> Self {
        Self {
            extractor,
            options: Mutex::new(options),
            state: Mutex::new(RegistryState::default()),
            scan_lock: tokio::sync::Mutex::new(()),
            scan_generation: AtomicU64::new(0),
            file_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> RegistryOptions {
        self.options.lock().clone()
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.options.lock().search_paths.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().components.len()
    }

    /// Every cached component, sorted by name.
    pub fn all_components(&self) -> Vec<Component> {
        let state = self.state.lock();
        let mut all: Vec<Component> = state.components.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// The class name registered for a source file.
    pub fn name_for_file(&self, source: &Path) -> Option<String> {
        self.state.lock().by_file.get(source).cloned()
    }

    /// The recorded modification time of a file.
    pub fn recorded_mtime(&self, path: &Path) -> Option<SystemTime> {
        self.state.lock().mtimes.get(path).copied()
    }

    /// Map a template path to its source path.  Any other path is returned
    /// unchanged.
    pub fn source_path_for(&self, path: &Path) -> PathBuf {
        let options = self.options.lock();
        if has_extension(path, &options.template_extension) {
            with_extension(path, &options.source_extension)
        } else {
            path.to_path_buf()
        }
    }

    /// The template path paired with a source path.
    pub fn template_path_for(&self, source: &Path) -> PathBuf {
        with_extension(source, &self.options.lock().template_extension)
    }

    /// Whether `path` is a source or template file by extension.
    pub fn is_component_file(&self, path: &Path) -> bool {
        let options = self.options.lock();
        has_extension(path, &options.source_extension)
            || has_extension(path, &options.template_extension)
    }

    /// Parse one component, unless it is cached and neither the source nor
    /// the template changed on disk since.
    ///
    /// Returns `None` when the file has no class declaration or cannot be
    /// read.  A freshly parsed component is unresolved; call
    /// [`resolve_inheritance`](Self::resolve_inheritance) to merge its
    /// parent's members.
    pub async fn parse_one(&self, source: &Path, template: Option<&Path>) -> Option<Component> {
        let epoch = self.epoch();
        self.parse_in_epoch(source, template, epoch).await
    }

    /// [`parse_one`](Self::parse_one) on behalf of work that started in
    /// `epoch`.  Nothing is cached once the registry has been cleared since.
    pub(super) async fn parse_in_epoch(
        &self,
        source: &Path,
        template: Option<&Path>,
        epoch: u64,
    ) -> Option<Component> {
        let lock = self.file_lock(source);
        let _guard = lock.lock().await;

        match self.parse_one_locked(source, template, epoch).await {
            Ok(component) => Some(component),
            Err(e @ (RegistryError::ExtractionMiss(_) | RegistryError::Superseded(_))) => {
                tracing::debug!("{e}");
                None
            }
            Err(e) => {
                tracing::warn!("{e}");
                None
            }
        }
    }

    async fn parse_one_locked(
        &self,
        source: &Path,
        template: Option<&Path>,
        epoch: u64,
    ) -> Result<Component, RegistryError> {
        let source_mtime = modified(source).await?;

        // A template that cannot be stat'ed is treated as absent.
        let template = match template {
            Some(path) => match modified(path).await {
                Ok(mtime) => Some((path, mtime)),
                Err(e) => {
                    tracing::debug!("ignoring template: {e}");
                    None
                }
            },
            None => None,
        };

        if let Some(cached) = self.state.lock().fresh(source, source_mtime, template) {
            return Ok(cached.clone());
        }

        let text = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| RegistryError::io(source, e))?;
        let signatures = self
            .extractor
            .extract(&text)
            .ok_or_else(|| RegistryError::ExtractionMiss(source.to_path_buf()))?;

        let component = Component {
            name: signatures.class_name,
            source_file: source.to_path_buf(),
            template_file: template.map(|(path, _)| path.to_path_buf()),
            extends_name: signatures.parent,
            properties: signatures.properties,
            methods: signatures.methods,
            resolved: false,
        };

        let mut state = self.state.lock();
        if state.epoch != epoch {
            return Err(RegistryError::Superseded(source.to_path_buf()));
        }
        // Never apply an older observation over a newer one.
        if let Some(recorded) = state.mtimes.get(source)
            && *recorded > source_mtime
            && let Some(newer) = state.by_file.get(source).and_then(|n| state.components.get(n))
        {
            return Ok(newer.clone());
        }
        tracing::debug!("parsed {} from {}", component.name, source.display());
        state.insert(component.clone(), source_mtime, template.map(|(_, m)| m));
        Ok(component)
    }

    /// Re-parse the component behind `path` (a source or template file)
    /// after it was created or saved, then refresh its inherited members
    /// and those of every component extending it.
    ///
    /// If the source no longer declares a class, or no longer exists, the
    /// stale entry is evicted.
    pub async fn update_component(&self, path: &Path) -> Option<Component> {
        let epoch = self.epoch();
        let source = self.source_path_for(path);
        let template = self.template_path_for(&source);
        let template = tokio::fs::metadata(&template)
            .await
            .is_ok_and(|m| m.is_file())
            .then_some(template);

        if let Some(stem) = file_stem(&source)
            && tokio::fs::metadata(&source).await.is_ok()
        {
            self.state.lock().known_sources.insert(stem, source.clone());
        }

        let Some(component) = self.parse_in_epoch(&source, template.as_deref(), epoch).await
        else {
            if self.epoch() == epoch {
                self.evict(&source);
            }
            return None;
        };

        self.resolve_inheritance(&component.name).await;
        self.refresh_dependents(&component.name);
        self.lookup(&component.name)
    }

    /// Drop the component behind `path` after a file was deleted.
    ///
    /// Deleting a template while its source survives only detaches the
    /// template: the component is re-parsed without it.
    pub async fn remove_component_by_file(&self, path: &Path) {
        let source = self.source_path_for(path);
        if source != path && tokio::fs::metadata(&source).await.is_ok() {
            self.update_component(&source).await;
            return;
        }
        self.evict(&source);
    }

    fn evict(&self, source: &Path) {
        let evicted = {
            let mut state = self.state.lock();
            if let Some(stem) = file_stem(source)
                && state.known_sources.get(&stem).is_some_and(|p| p == source)
            {
                state.known_sources.remove(&stem);
            }
            state.evict_file(source)
        };
        self.release_file_lock(source);

        if let Some(component) = evicted {
            tracing::debug!("removed {} ({})", component.name, source.display());
            self.refresh_dependents(&component.name);
        }
    }

    /// Replace the search paths.  When they differ from the current ones
    /// the whole cache is dropped and rebuilt by a full scan.
    ///
    /// Returns whether a rescan happened.
    pub async fn set_search_paths(&self, paths: Vec<PathBuf>) -> bool {
        let options = RegistryOptions {
            search_paths: paths,
            ..self.options()
        };
        self.reconfigure(options).await
    }

    /// Replace all options.  Any difference clears the cache and rescans.
    pub async fn reconfigure(&self, options: RegistryOptions) -> bool {
        {
            let mut current = self.options.lock();
            if *current == options {
                return false;
            }
            *current = options;
        }
        tracing::info!("component search configuration changed; rescanning");
        self.clear();
        self.scan_all().await;
        true
    }

    /// Drop every cached component and index, and start a new epoch.
    ///
    /// A scan still running keeps walking but stops caching, so the next
    /// [`scan_all`](Self::scan_all) always scans again.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock();
            let epoch = state.epoch + 1;
            *state = RegistryState {
                epoch,
                ..RegistryState::default()
            };
        }
        // Locks still held by a running parse must stay shared.
        self.file_locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub(super) fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Clear and rescan.
    pub async fn reload(&self) -> Vec<Component> {
        self.clear();
        self.scan_all().await
    }

    fn file_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.file_locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Forget the lock for `path` unless a parse holds or awaits it.
    fn release_file_lock(&self, path: &Path) {
        let mut locks = self.file_locks.lock();
        if locks.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(path);
        }
    }
}

async fn modified(path: &Path) -> Result<SystemTime, RegistryError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| RegistryError::io(path, e))?;
    metadata.modified().map_err(|e| RegistryError::io(path, e))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
