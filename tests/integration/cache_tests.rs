use dbinventory::cache::{CacheError, CacheStore};
use dbinventory::inventory::{BuildOptions, GroupBody, GroupNode, Hierarchy, HierarchyAssembler, HostVars};
use dbinventory::source::{HostRow, MemorySource};
use filetime::FileTime;
use serde_json::json;
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn set_age(store: &CacheStore, now: SystemTime, age: Duration) {
    let mtime = FileTime::from_system_time(now - age);
    filetime::set_file_mtime(store.hostvars_path(), mtime).unwrap();
    filetime::set_file_mtime(store.hierarchy_path(), mtime).unwrap();
}

fn built_inventory() -> (HostVars, Hierarchy) {
    let mut source = MemorySource::new()
        .with_group("webservers", r#"{"env": "prod", "nested": {"a": [1, 2]}}"#)
        .with_host(HostRow::new("10.0.0.1", "webservers", r#"{"port": 22}"#).with_hostname("web1"))
        .with_host(HostRow::new("10.0.0.2", "db", ""))
        .with_child("all_servers", "webservers")
        .with_child("db", "replicas");
    let inventory = HierarchyAssembler::new(&mut source, BuildOptions::default())
        .assemble()
        .unwrap();
    (inventory.hostvars, inventory.groups)
}

#[test]
fn test_cache_round_trip() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();

    store.save(&hostvars, &hierarchy).unwrap();
    let (loaded_vars, loaded_tree) = store.load().unwrap();

    assert_eq!(loaded_vars, hostvars);
    assert_eq!(loaded_tree, hierarchy);
}

#[test]
fn test_round_trip_preserves_shapes() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();
    store.save(&hostvars, &hierarchy).unwrap();

    let loaded = store.load_hierarchy().unwrap();
    assert!(loaded["all_servers"].vars().is_none());
    assert!(!loaded["all_servers"].has_hosts_field());
    assert_eq!(
        loaded["db"],
        GroupNode::Detailed(GroupBody {
            vars: None,
            hosts: Some(vec!["10.0.0.2".into()]),
            children: Some(vec!["replicas".into()]),
        })
    );
    assert_eq!(loaded["webservers"].vars().unwrap()["nested"], json!({"a": [1, 2]}));
}

#[test]
fn test_freshness_boundary() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();
    store.save(&hostvars, &hierarchy).unwrap();

    let now = SystemTime::now();
    let max_age = Duration::from_secs(60);

    set_age(&store, now, Duration::from_secs(59));
    assert!(store.is_valid_at(max_age, now));

    set_age(&store, now, Duration::from_secs(61));
    assert!(!store.is_valid_at(max_age, now));
}

#[test]
fn test_freshness_follows_hierarchy_artifact() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();
    store.save(&hostvars, &hierarchy).unwrap();

    let now = SystemTime::now();
    // Old host variables do not matter as long as the hierarchy is fresh.
    filetime::set_file_mtime(
        store.hostvars_path(),
        FileTime::from_system_time(now - Duration::from_secs(3600)),
    )
    .unwrap();
    filetime::set_file_mtime(
        store.hierarchy_path(),
        FileTime::from_system_time(now - Duration::from_secs(10)),
    )
    .unwrap();

    assert!(store.is_valid_at(Duration::from_secs(60), now));
}

#[test]
fn test_corrupt_hostvars_artifact() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();
    store.save(&hostvars, &hierarchy).unwrap();

    fs::write(store.hostvars_path(), b"not json at all").unwrap();

    // Still "valid" by age: corruption is only detected on load.
    assert!(store.is_valid(Duration::from_secs(60)));
    let err = store.load().unwrap_err();
    assert!(matches!(err, CacheError::Corrupt { .. }));
}

#[test]
fn test_wrong_shape_is_corrupt() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    store.save(&HostVars::new(), &Hierarchy::new()).unwrap();

    fs::write(store.hierarchy_path(), br#"{"web": 42}"#).unwrap();
    assert!(store.load_hierarchy().unwrap_err().is_corrupt());

    fs::write(store.hierarchy_path(), br#"{"web": {"hots": ["web1"], "bogus": 1}}"#).unwrap();
    assert!(store.load_hierarchy().unwrap_err().is_corrupt());

    fs::write(store.hostvars_path(), br#"{"web1": ["not", "an", "object"]}"#).unwrap();
    assert!(store.load_hostvars().unwrap_err().is_corrupt());
}

#[test]
fn test_save_overwrites_previous_content() {
    let dir = tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let (hostvars, hierarchy) = built_inventory();
    store.save(&hostvars, &hierarchy).unwrap();

    store.save(&HostVars::new(), &Hierarchy::new()).unwrap();
    let (loaded_vars, loaded_tree) = store.load().unwrap();
    assert!(loaded_vars.is_empty());
    assert!(loaded_tree.is_empty());
    assert_eq!(fs::read_to_string(store.hierarchy_path()).unwrap(), "{}");
}
