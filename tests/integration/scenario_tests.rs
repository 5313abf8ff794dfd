use dbinventory::cache::CacheStore;
use dbinventory::inventory::{BuildError, BuildOptions};
use dbinventory::service::{InventoryError, InventoryService};
use dbinventory::source::{IdentityColumn, SqliteSource};
use filetime::FileTime;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    db: PathBuf,
    cache: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let db = dir.path().join("inventory.db");
        let cache = dir.path().join("cache");
        let conn = Connection::open(&db).unwrap();
        SqliteSource::create_schema(&conn).unwrap();
        Self {
            _dir: dir,
            db,
            cache,
        }
    }

    fn conn(&self) -> Connection {
        Connection::open(&self.db).unwrap()
    }

    fn add_host(&self, host: &str, hostname: &str, group: &str, vars: &str) {
        self.conn()
            .execute(
                r#"INSERT INTO inventory (host, hostname, "group", host_vars) VALUES (?1, ?2, ?3, ?4)"#,
                params![host, hostname, group, vars],
            )
            .unwrap();
    }

    fn add_group(&self, name: &str, vars: &str) {
        self.conn()
            .execute(
                r#"INSERT INTO "group" (name, variables) VALUES (?1, ?2)"#,
                params![name, vars],
            )
            .unwrap();
    }

    fn add_child(&self, parent: &str, child: &str) {
        self.conn()
            .execute(
                "INSERT INTO children (parent, child) VALUES (?1, ?2)",
                params![parent, child],
            )
            .unwrap();
    }

    fn service(&self, max_age: Duration) -> InventoryService<SqliteSource> {
        InventoryService::new(
            SqliteSource::new(&self.db),
            CacheStore::new(&self.cache),
            max_age,
            BuildOptions::default().with_identity(IdentityColumn::Hostname),
        )
    }

    fn store(&self) -> CacheStore {
        CacheStore::new(&self.cache)
    }
}

fn parse(output: &str) -> Value {
    serde_json::from_str(output).unwrap()
}

fn age_cache(store: &CacheStore, age: Duration) {
    let mtime = FileTime::from_system_time(SystemTime::now() - age);
    for path in [store.hostvars_path(), store.hierarchy_path()] {
        filetime::set_file_mtime(path, mtime).unwrap();
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_scenario_plain_group() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");

    let listing = parse(&fx.service(Duration::from_secs(300)).list_all(false).unwrap());

    assert_eq!(
        listing,
        json!({
            "_meta": {"hostvars": {"web1": {"ansible_host": "10.0.0.1"}}},
            "webservers": ["web1"]
        })
    );
}

#[test]
fn test_scenario_group_with_variables() {
    let fx = Fixture::new();
    fx.add_group("webservers", r#"{"env": "prod"}"#);
    fx.add_host("10.0.0.1", "web1", "webservers", "");

    let listing = parse(&fx.service(Duration::from_secs(300)).list_all(false).unwrap());

    assert_eq!(
        listing["webservers"],
        json!({"vars": {"env": "prod"}, "hosts": ["web1"]})
    );
}

#[test]
fn test_scenario_malformed_host_variables() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "{not json");

    let err = fx.service(Duration::from_secs(300)).list_all(false).unwrap_err();

    match err {
        InventoryError::Build(BuildError::InvalidHostVariables { host, raw }) => {
            assert_eq!(host, "web1");
            assert_eq!(raw, "{not json");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fx.store().hostvars_path().exists());
    assert!(!fx.store().hierarchy_path().exists());
}

#[test]
fn test_failed_rebuild_keeps_previous_artifacts() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    let store = fx.store();
    let before = (read(store.hostvars_path()), read(store.hierarchy_path()));

    fx.add_host("10.0.0.2", "web2", "webservers", "{not json");
    let err = fx.service(Duration::from_secs(300)).list_all(true).unwrap_err();
    assert!(matches!(err, InventoryError::Build(_)));

    let after = (read(store.hostvars_path()), read(store.hierarchy_path()));
    assert_eq!(before, after);
}

#[test]
fn test_missing_host_lookup() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");

    // Populate the cache first so the lookup starts from a cached inventory.
    fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    let mut service = fx.service(Duration::from_secs(300));
    let output = service.host_info("ghost", false).unwrap();

    assert_eq!(parse(&output), json!({}));
    assert_eq!(service.rebuilds(), 1);
}

#[test]
fn test_missing_host_without_cache_rebuilds_once() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");

    let mut service = fx.service(Duration::from_secs(300));
    assert_eq!(parse(&service.host_info("ghost", false).unwrap()), json!({}));
    assert_eq!(service.rebuilds(), 1);
}

#[test]
fn test_new_host_found_after_rebuild() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    fx.add_host("10.0.0.2", "web2", "webservers", r#"{"role": "edge"}"#);

    let mut service = fx.service(Duration::from_secs(300));
    let vars = service.host_vars("web2", false).unwrap();
    assert_eq!(vars["role"], json!("edge"));
    assert_eq!(vars["ansible_host"], json!("10.0.0.2"));
    assert_eq!(service.rebuilds(), 1);

    // The rebuild refreshed the cache for later runs.
    assert!(fx.store().load_hostvars().unwrap().contains_key("web2"));
}

#[test]
fn test_fresh_cache_is_served_without_database() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    let first = fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    fs::remove_file(&fx.db).unwrap();

    let mut service = fx.service(Duration::from_secs(300));
    let second = service.list_all(false).unwrap();
    assert_eq!(first, second);
    assert_eq!(service.rebuilds(), 0);
    assert!(!service.source().is_connected());
}

#[test]
fn test_stale_cache_is_rebuilt() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    fx.service(Duration::from_secs(60)).list_all(false).unwrap();

    fx.add_host("10.0.0.2", "web2", "dbservers", "");
    age_cache(&fx.store(), Duration::from_secs(120));

    let mut service = fx.service(Duration::from_secs(60));
    let listing = parse(&service.list_all(false).unwrap());
    assert_eq!(listing["dbservers"], json!(["web2"]));
    assert_eq!(service.rebuilds(), 1);
}

#[test]
fn test_forced_refresh_ignores_fresh_cache() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    fx.add_host("10.0.0.2", "web2", "webservers", "");

    let mut service = fx.service(Duration::from_secs(300));
    let listing = parse(&service.list_all(true).unwrap());
    assert_eq!(listing["webservers"], json!(["web1", "web2"]));
    assert_eq!(service.rebuilds(), 1);
}

#[test]
fn test_parent_groups_and_cleanup() {
    let fx = Fixture::new();
    fx.add_group("webservers", r#"{"env": "prod"}"#);
    fx.add_group("production", r#"{"tier": 1}"#);
    fx.add_host("10.0.0.1", "web1", "webservers", "");
    fx.add_host("10.0.0.2", "web2", "webservers", "");
    fx.add_host("10.0.0.3", "lb1", "frontend", "");
    fx.add_child("frontend", "webservers");
    fx.add_child("production", "frontend");

    let listing = parse(&fx.service(Duration::from_secs(300)).list_all(false).unwrap());

    assert_eq!(
        listing["frontend"],
        json!({"hosts": ["lb1"], "children": ["webservers"]})
    );
    assert_eq!(
        listing["production"],
        json!({"vars": {"tier": 1}, "children": ["frontend"]})
    );
    assert_eq!(
        listing["webservers"],
        json!({"vars": {"env": "prod"}, "hosts": ["web1", "web2"]})
    );
}

#[test]
fn test_output_is_sorted_and_indented() {
    let fx = Fixture::new();
    fx.add_host("10.0.0.2", "zeta", "zgroup", r#"{"b": 1, "a": 2}"#);
    fx.add_host("10.0.0.1", "alpha", "agroup", "");

    let output = fx.service(Duration::from_secs(300)).list_all(false).unwrap();

    let meta = output.find("\"_meta\"").unwrap();
    let agroup = output.find("\"agroup\"").unwrap();
    let zgroup = output.find("\"zgroup\"").unwrap();
    assert!(meta < agroup && agroup < zgroup);
    assert!(output.starts_with("{\n  \""));

    let host = fx.service(Duration::from_secs(300)).host_info("zeta", false).unwrap();
    assert_eq!(
        host,
        "{\n  \"a\": 2,\n  \"ansible_host\": \"10.0.0.2\",\n  \"b\": 1\n}"
    );
}
