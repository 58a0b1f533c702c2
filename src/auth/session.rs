//! In-memory session store.
//!
//! Holds the current [`CredentialPair`] and the gate that serializes token
//! refreshes. One store is shared by `Arc` between the request client, the
//! streaming client and the duplex channel.

use std::fmt;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::debug;

/// Access and refresh token, always replaced together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// A pair without a refresh token. Such a session cannot be refreshed.
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }
}

// Token values never reach logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Shared holder of the current credentials.
///
/// Reads never block. Writers replace the whole pair at once, so readers never
/// observe an access token from one pair next to a refresh token from another.
pub struct SessionStore {
    current: watch::Sender<Option<CredentialPair>>,
    refresh_gate: Mutex<()>,
}

impl SessionStore {
    /// An empty store (logged out).
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            refresh_gate: Mutex::new(()),
        }
    }

    /// A store that starts with `pair`.
    pub fn with_credentials(pair: CredentialPair) -> Self {
        let store = Self::new();
        store.replace(pair);
        store
    }

    /// Snapshot of the current pair.
    pub fn get(&self) -> Option<CredentialPair> {
        self.current.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Install a new pair (login or refresh).
    pub fn replace(&self, pair: CredentialPair) {
        debug!("Session credentials replaced");
        self.current.send_replace(Some(pair));
    }

    /// Forget the current pair.
    pub fn clear(&self) {
        if self.current.send_replace(None).is_some() {
            debug!("Session credentials cleared");
        }
    }

    /// Watch credential changes, e.g. to redirect to login once cleared.
    pub fn subscribe(&self) -> watch::Receiver<Option<CredentialPair>> {
        self.current.subscribe()
    }

    /// Take the refresh gate. At most one refresh runs per store at any time.
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
