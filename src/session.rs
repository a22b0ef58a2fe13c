//! # Session Store
//!
//! Client-held record of the currently authenticated user and their bearer
//! token, with a synchronous publish/subscribe mechanism so every part of
//! the view layer observes session changes in the same pass.
//!
//! ## Design
//!
//! - [`Session`] is a cheaply clonable handle around shared interior state.
//!   It is passed into the HTTP client and the operation clients explicitly;
//!   there is no module-level singleton.
//! - The token is persisted as a single file named `token` under the state
//!   directory, mirroring the lifecycle of the original browser storage:
//!   set on successful login/register, cleared on logout or 401, and never
//!   reused once cleared until a new login succeeds.
//! - `publish` snapshots the listener list before invoking anything, so
//!   unsubscribing during a publish pass does not affect listeners already
//!   scheduled in that pass, and a listener unsubscribed before a publish
//!   never receives that publish's value.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let session = Session::open(Path::new(".shareai"))?;
//! let _sub = session.subscribe(|user| match user {
//!     Some(u) => info!("signed in as {}", u.username),
//!     None => info!("signed out"),
//! });
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use log::warn;

use crate::common::models::User;

/// Name of the token file under the state directory.
const TOKEN_FILE: &str = "token";

/// Callback invoked with the current user (or absent) on every change.
pub type SessionListener = Arc<dyn Fn(Option<&User>) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: SessionListener,
}

struct SessionInner {
    token_path: PathBuf,
    token: Mutex<Option<String>>,
    user: Mutex<Option<User>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
}

/// Shared session state handle.
///
/// Cloning is cheap; all clones observe the same token, user, and
/// subscriber list.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Open the session store rooted at `state_dir`, loading a previously
    /// persisted token if one exists.
    ///
    /// # Arguments
    /// - `state_dir`: Directory holding the `token` file; created if absent
    pub fn open(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("failed to create state dir {}", state_dir.display()))?;
        let token_path = state_dir.join(TOKEN_FILE);

        let token = match fs::read_to_string(&token_path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(_) => None,
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                token_path,
                token: Mutex::new(token),
                user: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        })
    }

    /// The currently stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner.token.lock().unwrap().clone()
    }

    /// Store a new bearer token, persisting it before it becomes visible.
    pub fn set_token(&self, token: &str) -> Result<()> {
        fs::write(&self.inner.token_path, token).with_context(|| {
            format!(
                "failed to persist token to {}",
                self.inner.token_path.display()
            )
        })?;
        *self.inner.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    /// Remove the stored token from memory and disk.
    ///
    /// Best-effort on the disk side: a failure to delete the file is logged,
    /// but the in-memory token is gone either way, so no request issued
    /// through this store will ever carry the cleared token again.
    pub fn clear_token(&self) {
        *self.inner.token.lock().unwrap() = None;
        if let Err(e) = fs::remove_file(&self.inner.token_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "failed to remove token file {}: {}",
                    self.inner.token_path.display(),
                    e
                );
            }
        }
    }

    /// The most recently published user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.inner.user.lock().unwrap().clone()
    }

    /// Publish a session change: record the new value, then invoke every
    /// currently registered listener synchronously, in registration order.
    ///
    /// The listener list is snapshotted before the first invocation, so
    /// subscriptions dropped by a listener mid-pass still see this value.
    pub fn publish(&self, user: Option<User>) {
        *self.inner.user.lock().unwrap() = user.clone();

        let snapshot: Vec<SessionListener> = self
            .inner
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        for listener in snapshot {
            listener(user.as_ref());
        }
    }

    /// Tear the session down: clear the stored token and publish the absent
    /// user, in that order, exactly once.
    ///
    /// Used by the global 401 handler and by logout; both mutations are
    /// visible to every subscriber before the triggering call returns.
    pub fn reset(&self) {
        self.clear_token();
        self.publish(None);
    }

    /// Register a listener invoked with the current-user-or-absent on every
    /// publish. The returned handle deregisters the listener when dropped.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().unwrap().push(ListenerEntry {
            id,
            listener: Arc::new(listener),
        });
        SubscriptionHandle {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    fn remove_listener(inner: &SessionInner, id: u64) {
        inner
            .listeners
            .lock()
            .unwrap()
            .retain(|entry| entry.id != id);
    }
}

/// Scoped subscription to session changes.
///
/// Dropping the handle deregisters the listener; it will not be invoked by
/// any publish that starts afterwards.
pub struct SubscriptionHandle {
    inner: Weak<SessionInner>,
    id: u64,
}

impl SubscriptionHandle {
    /// Explicitly deregister the listener (equivalent to dropping the handle).
    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            Session::remove_listener(&inner, self.id);
        }
    }
}
