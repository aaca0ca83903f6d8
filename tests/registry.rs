mod common;

use common::{
    BASE_COMPONENT_PHP, COUNTER_PHP, create_workspace, registry_for, rewrite_file, write_file,
};
use plinth_lsp::parser::{LexicalExtractor, SignatureExtractor, Signatures};
use plinth_lsp::{ComponentRegistry, RegistryOptions};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counts extractions while delegating to the real extractor.
#[derive(Default)]
struct CountingExtractor {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingExtractor {
    /// An extractor that blocks for `millis` on every file.
    fn slow(millis: u64) -> Self {
        Self {
            delay: Duration::from_millis(millis),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignatureExtractor for CountingExtractor {
    fn extract(&self, text: &str) -> Option<Signatures> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        LexicalExtractor.extract(text)
    }
}

fn component_names(registry: &ComponentRegistry) -> Vec<String> {
    registry.all_components().into_iter().map(|c| c.name).collect()
}

fn property_names(registry: &ComponentRegistry, name: &str) -> Vec<String> {
    registry
        .lookup(name)
        .expect("component expected")
        .properties
        .into_iter()
        .map(|p| p.name)
        .collect()
}

// ─── Scanning ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_pairs_sources_with_templates() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("Counter.html", "<b>{{ count }}</b>"),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
        ("nested/deep/Card.php", "<?php class Card { public $title; }"),
        ("nested/deep/Card.html", "<div></div>"),
        ("helpers.php", "<?php function helper() {}"),
        ("orphan.html", "<p>no source</p>"),
    ]);
    let registry = registry_for(dir.path());
    let components = registry.scan_all().await;

    let mut names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["BaseComponent", "Card", "Counter"]);

    let counter = registry.lookup("Counter").unwrap();
    assert_eq!(
        counter.template_file.as_deref(),
        Some(dir.path().join("Counter.html").as_path())
    );
    assert!(registry.lookup("BaseComponent").unwrap().template_file.is_none());
    assert_eq!(
        registry.name_for_file(&dir.path().join("nested/deep/Card.php")).as_deref(),
        Some("Card")
    );
}

#[tokio::test]
async fn test_scan_flattens_inheritance() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("Counter.html", ""),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let counter = registry.lookup("Counter").unwrap();
    assert!(counter.resolved);
    assert_eq!(property_names(&registry, "Counter"), ["count", "label", "history", "id"]);
    let refresh = counter.method("refresh").expect("inherited method");
    assert_eq!(refresh.declaring_class, "BaseComponent");
}

#[tokio::test]
async fn test_scan_missing_search_path_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_for(&dir.path().join("does-not-exist"));
    assert!(registry.scan_all().await.is_empty());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_scan_multiple_search_paths() {
    let dir = create_workspace(&[
        ("a/One.php", "<?php class One {}"),
        ("b/Two.php", "<?php class Two {}"),
        ("c/Three.php", "<?php class Three {}"),
    ]);
    let registry = ComponentRegistry::new(RegistryOptions::new(vec![
        dir.path().join("a"),
        dir.path().join("b"),
    ]));
    registry.scan_all().await;
    assert!(registry.lookup("One").is_some());
    assert!(registry.lookup("Two").is_some());
    assert!(registry.lookup("Three").is_none());
}

#[tokio::test]
async fn test_custom_extensions() {
    let dir = create_workspace(&[
        ("Card.inc", "<?php class Card { public $title; }"),
        ("Card.tpl", "<h1>{{ title }}</h1>"),
        ("Other.php", "<?php class Other {}"),
    ]);
    let registry = ComponentRegistry::new(RegistryOptions {
        search_paths: vec![dir.path().to_path_buf()],
        source_extension: "inc".to_string(),
        template_extension: "tpl".to_string(),
    });
    registry.scan_all().await;

    assert_eq!(registry.len(), 1);
    let card = registry.lookup("Card").unwrap();
    assert_eq!(
        card.template_file.as_deref(),
        Some(dir.path().join("Card.tpl").as_path())
    );
}

// ─── Cache coherence ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unchanged_files_are_not_reparsed() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("Counter.html", "<b></b>"),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
    ]);
    let extractor = Arc::new(CountingExtractor::default());
    let registry = ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    );
    registry.scan_all().await;
    let after_scan = extractor.calls();
    assert_eq!(after_scan, 2);

    let template = dir.path().join("Counter.html");
    registry.members_for(&template).await;
    registry.members_for(&template).await;
    assert_eq!(extractor.calls(), after_scan, "cache hit expected");
}

#[tokio::test]
async fn test_edited_source_is_reparsed_on_query() {
    let dir = create_workspace(&[
        ("Card.php", "<?php class Card { public $title; }"),
        ("Card.html", "<h1></h1>"),
    ]);
    let extractor = Arc::new(CountingExtractor::default());
    let registry = ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    );
    registry.scan_all().await;

    rewrite_file(
        &dir.path().join("Card.php"),
        "<?php class Card { public $title; public $subtitle; }",
    );
    let members = registry.members_for(&dir.path().join("Card.html")).await;
    let names: Vec<_> = members.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["title", "subtitle"]);
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_edited_template_triggers_reparse() {
    let dir = create_workspace(&[
        ("Card.php", "<?php class Card { public $title; }"),
        ("Card.html", "<h1></h1>"),
    ]);
    let extractor = Arc::new(CountingExtractor::default());
    let registry = ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    );
    registry.scan_all().await;

    let template = dir.path().join("Card.html");
    rewrite_file(&template, "<h1>{{ title }}</h1>");
    registry.members_for(&template).await;
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_update_component_after_edit() {
    let dir = create_workspace(&[("Card.php", "<?php class Card { public $title; }")]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let source = dir.path().join("Card.php");
    rewrite_file(&source, "<?php class Card { public $body; }");
    let card = registry.update_component(&source).await.unwrap();
    assert_eq!(card.properties.len(), 1);
    assert_eq!(card.properties[0].name, "body");
}

#[tokio::test]
async fn test_update_component_without_class_evicts() {
    let dir = create_workspace(&[("Card.php", "<?php class Card {}")]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let source = dir.path().join("Card.php");
    rewrite_file(&source, "<?php // emptied");
    assert!(registry.update_component(&source).await.is_none());
    assert!(registry.lookup("Card").is_none());
    assert_eq!(registry.name_for_file(&source), None);
}

#[tokio::test]
async fn test_created_template_attaches_to_component() {
    let dir = create_workspace(&[("Card.php", "<?php class Card {}")]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;
    assert!(registry.components_for_tag_suggestions().await.is_empty());

    let template = write_file(dir.path(), "Card.html", "<div></div>");
    registry.update_component(&template).await;
    let tags = registry.components_for_tag_suggestions().await;
    assert!(tags.contains("Card"));
}

// ─── Removal ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remove_source_evicts_component() {
    let dir = create_workspace(&[
        ("Card.php", "<?php class Card {}"),
        ("Card.html", "<div></div>"),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let source = dir.path().join("Card.php");
    fs::remove_file(&source).unwrap();
    registry.remove_component_by_file(&source).await;

    assert!(registry.lookup("Card").is_none());
    assert_eq!(registry.recorded_mtime(&source), None);
    assert_eq!(registry.recorded_mtime(&dir.path().join("Card.html")), None);
}

#[tokio::test]
async fn test_remove_template_keeps_component_without_tag() {
    let dir = create_workspace(&[
        ("Card.php", "<?php class Card { public $title; }"),
        ("Card.html", "<div></div>"),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let template = dir.path().join("Card.html");
    fs::remove_file(&template).unwrap();
    registry.remove_component_by_file(&template).await;

    let card = registry.lookup("Card").expect("component survives");
    assert!(card.template_file.is_none());
    assert!(!registry.components_for_tag_suggestions().await.contains("Card"));
}

#[tokio::test]
async fn test_removing_parent_strips_inherited_members() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;
    assert!(property_names(&registry, "Counter").contains(&"id".to_string()));

    let parent = dir.path().join("BaseComponent.php");
    fs::remove_file(&parent).unwrap();
    registry.remove_component_by_file(&parent).await;

    let counter = registry.lookup("Counter").unwrap();
    assert!(!counter.resolved);
    assert!(counter.property("id").is_none());
}

#[tokio::test]
async fn test_remove_unknown_file_is_noop() {
    let dir = create_workspace(&[("Card.php", "<?php class Card {}")]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;
    registry
        .remove_component_by_file(&dir.path().join("Nope.php"))
        .await;
    assert_eq!(registry.len(), 1);
}

// ─── Inheritance ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_parent_loaded_on_demand() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("Counter.html", ""),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
    ]);
    // No scan: only the queried component and its ancestors get parsed.
    let registry = registry_for(dir.path());

    let members = registry.members_for(&dir.path().join("Counter.html")).await;
    assert!(members.properties.iter().any(|p| p.name == "id"));
    assert!(registry.lookup("BaseComponent").is_some());
}

#[tokio::test]
async fn test_parent_edit_reaches_children() {
    let dir = create_workspace(&[
        ("Counter.php", COUNTER_PHP),
        ("BaseComponent.php", BASE_COMPONENT_PHP),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let parent = dir.path().join("BaseComponent.php");
    rewrite_file(
        &parent,
        "<?php abstract class BaseComponent { public string $key = ''; }",
    );
    registry.update_component(&parent).await;

    let names = property_names(&registry, "Counter");
    assert!(names.contains(&"key".to_string()));
    assert!(!names.contains(&"id".to_string()));
}

#[tokio::test]
async fn test_cyclic_inheritance_terminates() {
    let dir = create_workspace(&[
        ("A.php", "<?php class A extends B { public $a; }"),
        ("B.php", "<?php class B extends A { public $b; }"),
        ("A.html", ""),
    ]);
    let registry = registry_for(dir.path());
    registry.scan_all().await;

    let a = registry.lookup("A").unwrap();
    assert!(!a.resolved);
    assert_eq!(property_names(&registry, "A"), ["a"]);

    let members = registry.members_for(&dir.path().join("A.html")).await;
    assert_eq!(members.properties.len(), 1);
}

// ─── Configuration and concurrency ──────────────────────────────────────────

#[tokio::test]
async fn test_set_search_paths_rescans() {
    let dir = create_workspace(&[
        ("a/One.php", "<?php class One {}"),
        ("b/Two.php", "<?php class Two {}"),
    ]);
    let registry = registry_for(&dir.path().join("a"));
    registry.scan_all().await;
    assert!(registry.lookup("One").is_some());

    assert!(registry.set_search_paths(vec![dir.path().join("b")]).await);
    assert!(registry.lookup("One").is_none());
    assert!(registry.lookup("Two").is_some());

    assert!(!registry.set_search_paths(vec![dir.path().join("b")]).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_set_search_paths_during_scan() {
    let dir = create_workspace(&[
        ("old/Old1.php", "<?php class Old1 {}"),
        ("old/Old2.php", "<?php class Old2 {}"),
        ("old/Old3.php", "<?php class Old3 {}"),
        ("old/Old4.php", "<?php class Old4 {}"),
        ("old/Old5.php", "<?php class Old5 {}"),
        ("new/New.php", "<?php class New {}"),
    ]);
    let registry = Arc::new(ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().join("old")]),
        Arc::new(CountingExtractor::slow(100)),
    ));

    let scan = tokio::spawn({
        let registry = registry.clone();
        async move { registry.scan_all().await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(registry.set_search_paths(vec![dir.path().join("new")]).await);
    assert_eq!(component_names(&registry), ["New"]);

    scan.await.unwrap();
    assert_eq!(component_names(&registry), ["New"]);
    assert!(registry.lookup("Old1").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clear_during_scan_forces_fresh_scan() {
    let dir = create_workspace(&[
        ("One.php", "<?php class One {}"),
        ("Two.php", "<?php class Two {}"),
    ]);
    let registry = Arc::new(ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        Arc::new(CountingExtractor::slow(100)),
    ));

    let scan = tokio::spawn({
        let registry = registry.clone();
        async move { registry.scan_all().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let reloaded = registry.reload().await;
    assert_eq!(reloaded.len(), 2);
    scan.await.unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.lookup("One").unwrap().resolved);
}

#[tokio::test]
async fn test_concurrent_queries_parse_once() {
    let dir = create_workspace(&[
        ("Card.php", "<?php class Card { public $title; }"),
        ("Card.html", "<h1></h1>"),
    ]);
    let extractor = Arc::new(CountingExtractor::default());
    let registry = Arc::new(ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    ));

    let template = dir.path().join("Card.html");
    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let template = template.clone();
        handles.push(tokio::spawn(async move {
            registry.members_for(&template).await
        }));
    }
    for handle in handles {
        let members = handle.await.unwrap();
        assert_eq!(members.properties.len(), 1);
    }
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_during_parse_keeps_parses_serialized() {
    let dir = create_workspace(&[("Card.php", "<?php class Card { public $title; }")]);
    let extractor = Arc::new(CountingExtractor::slow(200));
    let registry = Arc::new(ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    ));
    let source = dir.path().join("Card.php");

    let first = tokio::spawn({
        let registry = registry.clone();
        let source = source.clone();
        async move { registry.parse_one(&source, None).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A delete event for a file still being parsed, then another parse.
    registry.remove_component_by_file(&source).await;
    let second = tokio::spawn({
        let registry = registry.clone();
        let source = source.clone();
        async move { registry.parse_one(&source, None).await }
    });

    assert!(first.await.unwrap().is_some());
    assert!(second.await.unwrap().is_some());
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_full_scans() {
    let dir = create_workspace(&[
        ("One.php", "<?php class One {}"),
        ("Two.php", "<?php class Two {}"),
    ]);
    let extractor = Arc::new(CountingExtractor::default());
    let registry = Arc::new(ComponentRegistry::with_extractor(
        RegistryOptions::new(vec![dir.path().to_path_buf()]),
        extractor.clone(),
    ));

    let (a, b) = tokio::join!(registry.scan_all(), registry.scan_all());
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert_eq!(registry.len(), 2);
    assert_eq!(extractor.calls(), 2);
}
