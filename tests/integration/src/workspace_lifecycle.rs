//! End-to-end flows the workspace lifecycle manager and HTTP layer drive:
//! provision -> edit -> enable sync -> commit/push -> pull -> disable -> delete.

use std::sync::Arc;
use std::thread;

use docstore_core::{
    Author, Credentials, DocumentStore, EnsureOutcome, ErrorKind, PullOutcome, RemoteConfig,
    StorageConfig, WorkspaceKey,
};
use docstore_test_utils::{DEFAULT_BRANCH, Sandbox, remote_file, remote_history, seed_commit};
use pretty_assertions::assert_eq;

fn open(sandbox: &Sandbox) -> DocumentStore {
    DocumentStore::open(&StorageConfig::with_root(sandbox.storage_root())).unwrap()
}

fn remote(url: &str) -> RemoteConfig {
    RemoteConfig::new(
        url,
        Credentials::new("bot", "token"),
        Author::new("Docstore Bot", "bot@example.com"),
    )
}

#[test]
fn test_notes_scenario_without_sync() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let key = WorkspaceKey::new(7, 3);
    store.provision_workspace(key).unwrap();
    let files = store.files();

    files.write(key, "notes/a.md", b"hello").unwrap();
    assert_eq!(files.read(key, "notes/a.md").unwrap(), b"hello");
    assert_eq!(files.find_by_name(key, "a.md").unwrap(), vec!["notes/a.md"]);

    files.delete(key, "notes/a.md").unwrap();
    let err = docstore_core::Error::from(files.read(key, "notes/a.md").unwrap_err());
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_full_lifecycle_with_sync() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let key = WorkspaceKey::new(1, 10);
    let url = sandbox.remote("docs");
    let remote_path = sandbox.remote_path("docs");

    store.provision_workspace(key).unwrap();
    assert_eq!(store.enable_sync(key, remote(&url)).unwrap(), EnsureOutcome::Cloned);

    store.files().write(key, "guide/intro.md", b"# Intro").unwrap();
    store.commit_and_push(key, "Write intro").unwrap();

    seed_commit(&remote_path, &[("CHANGELOG.md", "v1")], "Changelog from CI");
    assert_eq!(store.pull(key).unwrap(), PullOutcome::FastForward);

    let tree = store.files().list(key).unwrap();
    let names: Vec<_> = tree.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec![".git", "guide", "CHANGELOG.md", "README.md"]);

    let history = remote_history(&remote_path, DEFAULT_BRANCH);
    let summaries: Vec<_> = history.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(summaries, vec!["Changelog from CI", "Write intro", "Initial commit"]);

    // Turning sync off keeps the content; turning it back on reopens the clone
    assert!(store.disable_sync(key));
    assert_eq!(store.pull(key).unwrap_err().kind(), ErrorKind::GitNotConfigured);
    assert_eq!(
        store.enable_sync(key, remote(&url)).unwrap(),
        EnsureOutcome::Opened(PullOutcome::UpToDate)
    );

    store.remove_workspace(key).unwrap();
    assert!(!store.files().workspace_exists(key));
    assert!(!store.repos().contains(key));
    assert_eq!(
        remote_file(&remote_path, DEFAULT_BRANCH, "guide/intro.md").as_deref(),
        Some("# Intro")
    );
}

#[test]
fn test_retry_push_after_partial_failure() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let key = WorkspaceKey::new(2, 20);
    let url = sandbox.remote("docs");
    let remote_path = sandbox.remote_path("docs");
    let parked = sandbox.path().join("parked.git");
    store.enable_sync(key, remote(&url)).unwrap();

    std::fs::rename(&remote_path, &parked).unwrap();
    store.files().write(key, "draft.md", b"offline").unwrap();
    let err = store.commit_and_push(key, "Offline draft").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GitTransport);

    std::fs::rename(&parked, &remote_path).unwrap();
    store.repos().push(key).unwrap();

    assert_eq!(
        remote_file(&remote_path, DEFAULT_BRANCH, "draft.md").as_deref(),
        Some("offline")
    );
    assert_eq!(remote_history(&remote_path, DEFAULT_BRANCH)[0].0, "Offline draft");
}

#[test]
fn test_concurrent_saves_produce_linear_history() {
    let sandbox = Sandbox::new();
    let store = Arc::new(open(&sandbox));
    let key = WorkspaceKey::new(3, 30);
    let url = sandbox.remote("docs");
    store.enable_sync(key, remote(&url)).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let path = format!("page-{i}.md");
                store.files().write(key, &path, format!("page {i}").as_bytes()).unwrap();
                store.commit_and_push(key, &format!("Save page {i}")).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let history = remote_history(&sandbox.remote_path("docs"), DEFAULT_BRANCH);
    assert_eq!(history.len(), 5);
    assert!(history.iter().all(|(_, parents)| *parents <= 1));
    for i in 0..4 {
        assert_eq!(
            remote_file(&sandbox.remote_path("docs"), DEFAULT_BRANCH, &format!("page-{i}.md")),
            Some(format!("page {i}"))
        );
    }
}

#[test]
fn test_listing_serializes_for_http_layer() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let key = WorkspaceKey::new(4, 40);
    store.provision_workspace(key).unwrap();
    store.files().write(key, "docs/a.md", b"a").unwrap();
    store.files().write(key, "b.md", b"bb").unwrap();

    let tree = serde_json::to_value(store.files().list(key).unwrap()).unwrap();
    let stats = serde_json::to_value(store.files().stats(key).unwrap()).unwrap();

    assert_eq!(
        tree,
        serde_json::json!([
            {"id": "docs", "name": "docs", "path": "docs", "children": [
                {"id": "docs/a.md", "name": "a.md", "path": "docs/a.md"}
            ]},
            {"id": "b.md", "name": "b.md", "path": "b.md"}
        ])
    );
    assert_eq!(stats, serde_json::json!({"fileCount": 2, "totalBytes": 3}));
}
