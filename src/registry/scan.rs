/// Full directory scans.
///
/// Walks every search path, pairs each source file with its same-stem
/// template, parses each pair and finally flattens inheritance across the
/// whole cache.
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use ignore::WalkBuilder;

use super::{ComponentRegistry, file_stem};
use crate::types::Component;
use crate::util::{has_extension, with_extension};

/// A source file and its template, when one exists.
pub(super) type FilePair = (PathBuf, Option<PathBuf>);

/// Collect every source file under `search_paths` (recursively) and pair
/// it with a template sharing its stem.
///
/// Hidden entries are skipped; `.gitignore` rules are not applied.
/// Unreadable directories are logged and skipped.  The result is sorted so
/// scans are deterministic.
pub(super) fn collect_file_pairs(
    search_paths: &[PathBuf],
    source_extension: &str,
    template_extension: &str,
) -> Vec<FilePair> {
    let Some((first, rest)) = search_paths.split_first() else {
        return Vec::new();
    };

    let mut builder = WalkBuilder::new(first);
    for path in rest {
        builder.add(path);
    }
    builder.standard_filters(false).hidden(true);

    let mut pairs: Vec<FilePair> = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !has_extension(path, source_extension) {
            continue;
        }
        pairs.push((path.to_path_buf(), paired_template(path, template_extension)));
    }

    pairs.sort();
    pairs.dedup();
    pairs
}

fn paired_template(source: &Path, template_extension: &str) -> Option<PathBuf> {
    let template = with_extension(source, template_extension);
    template.is_file().then_some(template)
}

impl ComponentRegistry {
    /// Scan every search path and return all cached components.
    ///
    /// Unchanged files are served from the cache, so repeated scans are
    /// cheap.  Concurrent callers share one physical scan: a caller that
    /// had to wait for an in-flight scan returns that scan's result instead
    /// of starting another, unless the registry was cleared in between.
    ///
    /// A scan overtaken by [`clear`](Self::clear) stops caching and returns
    /// whatever the cleared registry holds.
    pub async fn scan_all(&self) -> Vec<Component> {
        let observed = self.scan_generation.load(Ordering::SeqCst);
        let _guard = self.scan_lock.lock().await;
        if self.scan_generation.load(Ordering::SeqCst) != observed && self.state.lock().scanned {
            tracing::debug!("joined a scan that finished while waiting");
            return self.all_components();
        }

        // Epoch before options: a scan over replaced options is always
        // invalidated by the clear that follows the replacement.
        let epoch = self.epoch();
        let options = self.options();
        tracing::info!(
            "scanning {} search path(s) for components",
            options.search_paths.len()
        );

        let pairs = tokio::task::spawn_blocking(move || {
            collect_file_pairs(
                &options.search_paths,
                &options.source_extension,
                &options.template_extension,
            )
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("directory walk failed: {e}");
            Vec::new()
        });

        {
            let mut state = self.state.lock();
            if state.epoch == epoch {
                for (source, _) in &pairs {
                    if let Some(stem) = file_stem(source) {
                        state.known_sources.insert(stem, source.clone());
                    }
                }
            }
        }

        let mut parsed = 0usize;
        for (source, template) in &pairs {
            if self.epoch() != epoch {
                break;
            }
            if self
                .parse_in_epoch(source, template.as_deref(), epoch)
                .await
                .is_some()
            {
                parsed += 1;
            }
        }

        if !self.flatten_all(epoch).await {
            tracing::debug!("registry cleared during scan; abandoning scan");
            return self.all_components();
        }
        self.scan_generation.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            "scan complete: {} source file(s), {} component(s)",
            pairs.len(),
            parsed
        );
        self.all_components()
    }
}
