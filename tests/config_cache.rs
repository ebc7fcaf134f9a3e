//! Config finder and cache behavior against a real directory tree

use clustenv::config::{ConfigCache, ConfigFinder, ConfigKind, FinderError};
use clustenv::ErrorCategory;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_finder_walks_up_to_nearest_match() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let deep = root.join("a").join("b").join("c");
    fs::create_dir_all(&deep).unwrap();
    fs::write(root.join("server.env"), "A=1\n").unwrap();
    fs::write(root.join("a").join("server.env"), "A=2\n").unwrap();

    let found = ConfigFinder::default().find("server.env", &deep).unwrap();
    assert_eq!(found, root.join("a").join("server.env"));
}

#[test]
fn test_finder_reports_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigFinder::default()
        .find("definitely-not-here-7f3a.toml", temp_dir.path())
        .unwrap_err();

    assert!(matches!(err, FinderError::NotFound { .. }));
}

#[test]
fn test_cache_memoizes_until_bypassed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env2.toml");
    fs::write(&path, "[general]\nhostname = \"old\"\n").unwrap();

    let mut cache = ConfigCache::new();
    let first = cache.load(ConfigKind::Toml, "env2.toml", temp_dir.path(), false).unwrap();

    fs::write(&path, "[general]\nhostname = \"new\"\n").unwrap();

    let cached = cache.load(ConfigKind::Toml, "env2.toml", temp_dir.path(), false).unwrap();
    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(cached.node("general").get_str("hostname"), Some("old"));

    let fresh = cache.load(ConfigKind::Toml, "env2.toml", temp_dir.path(), true).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(fresh.node("general").get_str("hostname"), Some("new"));

    let after = cache.load(ConfigKind::Toml, "env2.toml", temp_dir.path(), false).unwrap();
    assert!(Arc::ptr_eq(&fresh, &after));
}

#[test]
fn test_same_file_under_different_formats_is_cached_separately() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("vars"), "KEY=value\n").unwrap();

    let mut cache = ConfigCache::new();
    let env = cache.load(ConfigKind::Env, "vars", temp_dir.path(), false).unwrap();
    let yaml = cache.load(ConfigKind::Yaml, "vars", temp_dir.path(), false).unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(env.kind(), ConfigKind::Env);
    assert_eq!(env.get_str("KEY"), Some("value"));
    assert_eq!(yaml.kind(), ConfigKind::Yaml);
}

#[test]
fn test_lenient_and_strict_loads() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.yml"), "a: [1, 2\n").unwrap();

    let mut cache = ConfigCache::new();
    let lenient = cache.load(ConfigKind::Yaml, "broken.yml", temp_dir.path(), true).unwrap();
    assert!(lenient.is_empty());

    let err = cache
        .load_strict(ConfigKind::Yaml, "broken.yml", temp_dir.path(), true)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);
}

#[test]
fn test_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let mut cache = ConfigCache::new();

    let err = cache
        .load(ConfigKind::Toml, "absent-91c2.toml", temp_dir.path(), false)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert!(cache.is_empty());
}

#[test]
fn test_load_path_and_invalidate() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("paper-global.yml");
    fs::write(&path, "proxies:\n  velocity:\n    enabled: false\n").unwrap();

    let mut cache = ConfigCache::new();
    let loaded = cache.load_yaml(&path, false).unwrap();
    assert_eq!(loaded.path(), path.as_path());
    assert_eq!(
        loaded.node("proxies").node("velocity").get_bool("enabled"),
        Some(false)
    );

    let requested = path.to_string_lossy();
    assert!(cache.invalidate(ConfigKind::Yaml, &requested, std::path::Path::new(".")));
    assert!(cache.is_empty());
}
