//! Tenants and workspaces never see each other's files, whatever the path.

use docstore_core::{
    Author, Credentials, DocumentStore, ErrorKind, RemoteConfig, StorageConfig, WorkspaceKey,
};
use docstore_test_utils::{DEFAULT_BRANCH, Sandbox, remote_file};
use rstest::rstest;

fn open(sandbox: &Sandbox) -> DocumentStore {
    DocumentStore::open(&StorageConfig::with_root(sandbox.storage_root())).unwrap()
}

#[rstest]
#[case("../123/secret.md")]
#[case("../../8/1/secret.md")]
#[case("notes/../../123/secret.md")]
#[case("/etc/passwd")]
#[case("..")]
#[case("")]
fn test_escapes_are_rejected_on_every_operation(#[case] path: &str) {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let victim = WorkspaceKey::new(7, 123);
    let attacker = WorkspaceKey::new(7, 12);
    store.provision_workspace(victim).unwrap();
    store.provision_workspace(attacker).unwrap();
    store.files().write(victim, "secret.md", b"top secret").unwrap();

    let files = store.files();
    let kinds = [
        files.read(attacker, path).map(|_| ()),
        files.write(attacker, path, b"overwritten"),
        files.delete(attacker, path),
    ]
    .map(|result| docstore_core::Error::from(result.unwrap_err()).kind());

    assert_eq!(kinds, [ErrorKind::PathEscape; 3]);
    assert_eq!(files.read(victim, "secret.md").unwrap(), b"top secret");
}

#[test]
fn test_sibling_workspaces_stay_separate() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let a = WorkspaceKey::new(7, 12);
    let b = WorkspaceKey::new(7, 123);
    store.provision_workspace(a).unwrap();
    store.provision_workspace(b).unwrap();

    store.files().write(a, "shared-name.md", b"from a").unwrap();
    store.files().write(b, "shared-name.md", b"from b!").unwrap();

    assert_eq!(store.files().read(a, "shared-name.md").unwrap(), b"from a");
    assert_eq!(store.files().stats(a).unwrap().total_bytes, 6);
    assert_eq!(store.files().stats(b).unwrap().total_bytes, 7);
    assert_eq!(store.files().total_stats().unwrap().file_count, 2);

    store.remove_workspace(a).unwrap();
    assert_eq!(store.files().read(b, "shared-name.md").unwrap(), b"from b!");
}

#[test]
fn test_sync_handles_are_per_workspace() {
    let sandbox = Sandbox::new();
    let store = open(&sandbox);
    let a = WorkspaceKey::new(1, 1);
    let b = WorkspaceKey::new(2, 1);
    let author = Author::new("Docstore Bot", "bot@example.com");
    let url_a = sandbox.remote("tenant-a");
    let url_b = sandbox.remote("tenant-b");

    store
        .enable_sync(a, RemoteConfig::new(url_a, Credentials::new("a", "ta"), author.clone()))
        .unwrap();
    store
        .enable_sync(b, RemoteConfig::new(url_b, Credentials::new("b", "tb"), author))
        .unwrap();

    store.files().write(a, "only-a.md", b"a").unwrap();
    store.commit_and_push(a, "A's change").unwrap();

    assert!(remote_file(&sandbox.remote_path("tenant-a"), DEFAULT_BRANCH, "only-a.md").is_some());
    assert!(remote_file(&sandbox.remote_path("tenant-b"), DEFAULT_BRANCH, "only-a.md").is_none());

    store.disable_sync(a);
    assert_eq!(store.pull(a).unwrap_err().kind(), ErrorKind::GitNotConfigured);
    assert!(store.pull(b).is_ok());
}
