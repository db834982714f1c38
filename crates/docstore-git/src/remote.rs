//! Remote settings, credentials and per-call deadlines

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use git2::{Cred, CredentialType, RemoteCallbacks};

/// Name of the remote every workspace clone tracks.
pub const REMOTE_NAME: &str = "origin";

/// Upper bound on a single clone, fetch or push unless configured otherwise.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP basic credentials for the remote.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Identity recorded on commits made by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Everything needed to bind a workspace to its remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub credentials: Credentials,
    pub author: Author,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, credentials: Credentials, author: Author) -> Self {
        Self {
            url: url.into(),
            credentials,
            author,
        }
    }
}

/// Tunables shared by every handle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Bound on one remote call (clone, fetch or push)
    pub remote_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// Why a remote call was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    TimedOut(Duration),
    Cancelled,
}

impl std::fmt::Display for Interruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs_f64()),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Time budget for one remote call, plus the owning handle's cancel flag.
///
/// libgit2 offers no direct timeout, so the budget is checked at each
/// transport callback and the call aborts at the first one past the limit.
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    pub fn new(limit: Duration, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            started: Instant::now(),
            limit,
            cancelled,
        }
    }

    /// `Some` once the call should stop.
    pub fn interrupted(&self) -> Option<Interruption> {
        if self.cancelled.load(Ordering::Acquire) {
            Some(Interruption::Cancelled)
        } else if self.started.elapsed() >= self.limit {
            Some(Interruption::TimedOut(self.limit))
        } else {
            None
        }
    }

    fn check(&self) -> std::result::Result<(), git2::Error> {
        match self.interrupted() {
            Some(reason) => Err(git2::Error::from_str(&reason.to_string())),
            None => Ok(()),
        }
    }
}

/// Callbacks for clone and fetch: credentials plus deadline checkpoints.
pub fn fetch_callbacks<'a>(
    credentials: &'a Credentials,
    deadline: &'a Deadline,
) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut offered = false;

    callbacks.credentials(move |_url, username_from_url, allowed| {
        deadline.check()?;
        // libgit2 asks again after a rejection; stop instead of looping
        if offered {
            return Err(git2::Error::from_str("remote rejected the configured credentials"));
        }
        offered = true;

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            Cred::userpass_plaintext(&credentials.username, &credentials.token)
        } else if allowed.contains(CredentialType::USERNAME) {
            Cred::username(username_from_url.unwrap_or(&credentials.username))
        } else {
            Cred::default()
        }
    });
    callbacks.transfer_progress(move |_| deadline.interrupted().is_none());
    callbacks.sideband_progress(move |_| deadline.interrupted().is_none());

    callbacks
}

/// Callbacks for push: fetch callbacks plus negotiation checkpoint and
/// per-reference rejection reporting.
pub fn push_callbacks<'a>(
    credentials: &'a Credentials,
    deadline: &'a Deadline,
) -> RemoteCallbacks<'a> {
    let mut callbacks = fetch_callbacks(credentials, deadline);

    callbacks.push_negotiation(move |_| deadline.check());
    callbacks.push_update_reference(|refname, status| match status {
        Some(reason) => Err(git2::Error::from_str(&format!(
            "remote rejected {refname}: {reason}"
        ))),
        None => Ok(()),
    });

    callbacks
}
