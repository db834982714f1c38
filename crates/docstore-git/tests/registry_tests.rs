//! Registry lifecycle and cross-thread behaviour.

use std::fs;
use std::sync::Arc;
use std::thread;

use docstore_fs::{PathResolver, WorkspaceKey};
use docstore_git::{
    Author, Credentials, EnsureOutcome, Error, PullOutcome, RemoteConfig, RepoRegistry,
    SyncOptions, SyncState,
};
use docstore_test_utils::{DEFAULT_BRANCH, Sandbox, head_of, remote_history};
use rstest::rstest;

fn remote_config(url: &str) -> RemoteConfig {
    RemoteConfig::new(
        url,
        Credentials::new("docstore-bot", "token"),
        Author::new("Docstore Bot", "bot@example.com"),
    )
}

fn registry(sandbox: &Sandbox) -> RepoRegistry {
    RepoRegistry::new(
        PathResolver::new(sandbox.storage_root()),
        SyncOptions::default(),
    )
}

#[test]
fn enable_registers_ready_handle() {
    let sandbox = Sandbox::new();
    let registry = registry(&sandbox);
    let key = WorkspaceKey::new(1, 1);
    let url = sandbox.remote("origin");

    assert_eq!(
        registry.enable(key, remote_config(&url)).unwrap(),
        EnsureOutcome::Cloned
    );

    let handle = registry.handle(key).unwrap();
    assert_eq!(handle.state(), SyncState::Ready);
    assert_eq!(handle.url(), url);
    assert_eq!(handle.work_dir(), sandbox.storage_root().join("1").join("1"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn failed_enable_leaves_other_workspaces_alone() {
    let sandbox = Sandbox::new();
    let registry = registry(&sandbox);
    let healthy = WorkspaceKey::new(1, 1);
    let broken = WorkspaceKey::new(1, 2);
    let url = sandbox.remote("origin");
    registry.enable(healthy, remote_config(&url)).unwrap();

    let missing = sandbox.remote_path("missing");
    let err = registry
        .enable(broken, remote_config(&missing.to_string_lossy()))
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert!(!registry.contains(broken));
    assert!(matches!(
        registry.commit(broken, "msg"),
        Err(Error::NotConfigured { .. })
    ));
    assert_eq!(registry.pull(healthy).unwrap(), PullOutcome::UpToDate);
}

#[test]
fn disable_is_idempotent_and_keeps_clone() {
    let sandbox = Sandbox::new();
    let registry = registry(&sandbox);
    let key = WorkspaceKey::new(3, 4);
    let url = sandbox.remote("origin");
    registry.enable(key, remote_config(&url)).unwrap();

    assert!(registry.disable(key));
    assert!(!registry.disable(key));

    assert!(registry.get(key).is_none());
    assert!(matches!(
        registry.pull(key),
        Err(Error::NotConfigured { key: k }) if k == key
    ));
    assert!(sandbox.storage_root().join("3/4/.git").is_dir());
}

#[test]
fn re_enable_reopens_existing_clone() {
    let sandbox = Sandbox::new();
    let registry = registry(&sandbox);
    let key = WorkspaceKey::new(3, 4);
    let url = sandbox.remote("origin");

    registry.enable(key, remote_config(&url)).unwrap();
    registry.disable(key);

    assert_eq!(
        registry.enable(key, remote_config(&url)).unwrap(),
        EnsureOutcome::Opened(PullOutcome::UpToDate)
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn replaced_handle_remains_usable() {
    let sandbox = Sandbox::new();
    let registry = registry(&sandbox);
    let key = WorkspaceKey::new(5, 6);
    let url = sandbox.remote("origin");

    registry.enable(key, remote_config(&url)).unwrap();
    let old = registry.handle(key).unwrap();
    registry.enable(key, remote_config(&url)).unwrap();

    assert!(!Arc::ptr_eq(&old, &registry.handle(key).unwrap()));
    old.commit("Through the old handle").unwrap();
    assert_eq!(
        registry.handle(key).unwrap().recent_commits(1).unwrap()[0].summary,
        "Through the old handle"
    );
}

#[test]
fn concurrent_commits_on_one_workspace_stay_linear() {
    let sandbox = Sandbox::new();
    let registry = Arc::new(registry(&sandbox));
    let key = WorkspaceKey::new(1, 1);
    let url = sandbox.remote("origin");
    registry.enable(key, remote_config(&url)).unwrap();
    let work_dir = registry.handle(key).unwrap().work_dir().to_path_buf();

    let workers: Vec<_> = (0..3)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let work_dir = work_dir.clone();
            thread::spawn(move || {
                fs::write(work_dir.join(format!("note-{i}.md")), format!("note {i}")).unwrap();
                registry.commit_and_push(key, &format!("Add note {i}")).unwrap()
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let remote = sandbox.remote_path("origin");
    let history = remote_history(&remote, DEFAULT_BRANCH);
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|(_, parents)| *parents <= 1));

    let local_head = &registry.handle(key).unwrap().recent_commits(1).unwrap()[0];
    assert_eq!(
        head_of(&remote, DEFAULT_BRANCH).map(|oid| oid.to_string()),
        Some(local_head.id.clone())
    );
}

#[rstest]
#[case(2)]
#[case(4)]
fn workspaces_sync_independently(#[case] count: u64) {
    let sandbox = Sandbox::new();
    let registry = Arc::new(registry(&sandbox));

    let workers: Vec<_> = (0..count)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let key = WorkspaceKey::new(9, i);
            let url = sandbox.remote(&format!("remote-{i}"));
            let work_dir = sandbox.storage_root().join("9").join(i.to_string());
            thread::spawn(move || {
                registry.enable(key, remote_config(&url)).unwrap();
                fs::write(work_dir.join("own.md"), format!("workspace {i}")).unwrap();
                registry.commit_and_push(key, &format!("Workspace {i}")).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(registry.len() as u64, count);
    for i in 0..count {
        let history = remote_history(&sandbox.remote_path(&format!("remote-{i}")), DEFAULT_BRANCH);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0, format!("Workspace {i}"));
    }
}
