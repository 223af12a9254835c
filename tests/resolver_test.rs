//! Resolver semantics: the store is re-read on every call, capabilities are
//! created once and connected lazily, and the CLI override pins the target.

mod common;

use common::FakeDatabase;
use lazydb_mcp::db::Database;
use lazydb_mcp::resolver::{ActiveResolver, ResolveConnection};
use lazydb_mcp::store::ConnectionDescriptor;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn store_json(names: &[&str], active: &str) -> String {
    let connections: Vec<String> = names
        .iter()
        .map(|name| {
            format!(
                r#"{{"Name": "{name}", "Host": "localhost", "Port": 5432,
                    "Database": "app", "Username": "dev", "Password": "",
                    "SSLMode": "disable", "Environment": "Development"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"connections": [{}], "active_connection": "{active}"}}"#,
        connections.join(",")
    )
}

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    created: Arc<Mutex<Vec<Arc<FakeDatabase>>>>,
    resolver: ActiveResolver,
}

fn fixture(override_name: Option<&str>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("connections.json");
    let created: Arc<Mutex<Vec<Arc<FakeDatabase>>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = created.clone();
    let resolver = ActiveResolver::with_connector(
        path.clone(),
        override_name.map(String::from),
        Box::new(move |descriptor: ConnectionDescriptor| {
            let db = Arc::new(FakeDatabase::new(&descriptor.name));
            sink.lock().unwrap().push(db.clone());
            db as Arc<dyn Database>
        }),
    );

    Fixture {
        _dir: dir,
        path,
        created,
        resolver,
    }
}

impl Fixture {
    fn write_store(&self, names: &[&str], active: &str) {
        std::fs::write(&self.path, store_json(names, active)).unwrap();
    }

    fn instance(&self, name: &str) -> Arc<FakeDatabase> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|db| db.descriptor().name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no capability created for '{name}'"))
    }
}

#[tokio::test]
async fn test_resolve_connects_lazily_and_once() {
    let fx = fixture(None);
    fx.write_store(&["local"], "local");

    let first = fx.resolver.resolve().await.unwrap();
    assert_eq!(first.descriptor().name, "local");
    assert_eq!(fx.instance("local").connect_calls.load(Ordering::SeqCst), 1);
    first.ping().await.unwrap();

    // Second call re-reads the store but neither recreates nor reconnects
    let second = fx.resolver.resolve().await.unwrap();
    assert_eq!(second.descriptor().name, "local");
    assert_eq!(fx.created.lock().unwrap().len(), 1);
    assert_eq!(fx.instance("local").connect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_active_change_between_calls_switches_target() {
    let fx = fixture(None);
    fx.write_store(&["a", "b"], "a");
    let first = fx.resolver.resolve().await.unwrap();
    assert_eq!(first.descriptor().name, "a");

    // External writer flips the selector between two tool calls
    fx.write_store(&["a", "b"], "b");
    let second = fx.resolver.resolve().await.unwrap();
    assert_eq!(second.descriptor().name, "b");

    // The capability for "a" survives untouched with its connection open
    assert_eq!(fx.created.lock().unwrap().len(), 2);
    assert_eq!(fx.instance("a").connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.instance("a").status(),
        lazydb_mcp::db::ConnectionStatus::Connected
    );
}

#[tokio::test]
async fn test_descriptors_added_later_are_discovered() {
    let fx = fixture(None);
    fx.write_store(&["a"], "a");
    fx.resolver.resolve().await.unwrap();

    fx.write_store(&["a", "new"], "new");
    let resolved = fx.resolver.resolve().await.unwrap();
    assert_eq!(resolved.descriptor().name, "new");
    assert_eq!(fx.created.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_override_wins_over_store_selector() {
    let fx = fixture(Some("b"));
    fx.write_store(&["a", "b"], "a");
    let resolved = fx.resolver.resolve().await.unwrap();
    assert_eq!(resolved.descriptor().name, "b");
}

#[tokio::test]
async fn test_empty_active_without_override_fails() {
    let fx = fixture(None);
    fx.write_store(&["a"], "");
    let err = fx.resolver.resolve().await.unwrap_err();
    assert_eq!(err.to_string(), "no active connection specified");
}

#[tokio::test]
async fn test_unknown_selection_fails() {
    let fx = fixture(Some("ghost"));
    fx.write_store(&["a"], "a");
    let err = fx.resolver.resolve().await.unwrap_err();
    assert_eq!(err.to_string(), "connection 'ghost' not found");
}

#[tokio::test]
async fn test_unreadable_store_fails() {
    let fx = fixture(None);
    // No file written at all
    let err = fx.resolver.resolve().await.unwrap_err();
    assert!(err.to_string().starts_with("failed to load connections"));

    std::fs::write(&fx.path, "{broken").unwrap();
    let err = fx.resolver.resolve().await.unwrap_err();
    assert!(err.to_string().starts_with("failed to load connections"));
}

#[tokio::test]
async fn test_connect_failure_propagates_verbatim() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("connections.json");
    std::fs::write(&path, store_json(&["flaky"], "flaky")).unwrap();

    let resolver = ActiveResolver::with_connector(
        path,
        None,
        Box::new(|descriptor: ConnectionDescriptor| {
            Arc::new(FakeDatabase::new(&descriptor.name).failing_connect()) as Arc<dyn Database>
        }),
    );

    let err = resolver.resolve().await.unwrap_err();
    assert!(err.to_string().contains("simulated refusal"));

    // A later call may retry the connect
    let err = resolver.resolve().await.unwrap_err();
    assert!(err.to_string().contains("simulated refusal"));
}

#[tokio::test]
async fn test_broker_listing_stays_sorted() {
    let fx = fixture(None);
    fx.write_store(&["zeta", "alpha", "mid"], "alpha");
    fx.resolver.resolve().await.unwrap();
    let names = fx.resolver.broker().list();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}
