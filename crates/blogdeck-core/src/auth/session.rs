//! The session store: single authority for who the current user is.
//!
//! State lives in a `watch` channel. The state enum only lets an identity
//! exist together with the credential that resolved it, and every
//! transition replaces the whole value, so readers never observe a
//! credential/identity mismatch.
//!
//! ```text
//!  Loading --restore ok--> Authenticated --logout/expire/revalidate err--> Anonymous
//!     \--restore err / no token--> Anonymous --login ok--> Authenticated
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::User;

use super::{Credential, CredentialSource, IdentityResolver, TokenStore};

/// Derived authentication status consumers gate their UI on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Boot-time restore still in flight; don't decide anything yet.
    Loading,
    Anonymous,
    Authenticated,
}

impl SessionStatus {
    pub fn is_decided(self) -> bool {
        !matches!(self, SessionStatus::Loading)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not resolve identity: {0}")]
    Identity(#[from] ApiError),

    #[error("could not persist session token: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl SessionError {
    /// Whether the failure was the backend being unreachable rather than
    /// the credential being rejected.
    pub fn is_network(&self) -> bool {
        matches!(self, SessionError::Identity(e) if e.is_network())
    }
}

#[derive(Debug, Clone)]
enum SessionState {
    Loading,
    Anonymous,
    Authenticated { credential: Credential, identity: User },
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Anonymous => SessionStatus::Anonymous,
            SessionState::Authenticated { .. } => SessionStatus::Authenticated,
        }
    }

    fn identity(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    fn credential(&self) -> Option<&Credential> {
        match self {
            SessionState::Authenticated { credential, .. } => Some(credential),
            _ => None,
        }
    }
}

struct Inner {
    state: watch::Sender<SessionState>,
    resolver: Arc<dyn IdentityResolver>,
    store: Arc<dyn TokenStore>,
    /// Serialises "write storage + commit state" so a stale restore can't
    /// clear a token a concurrent login just persisted. Never held across
    /// an await.
    commit: Mutex<()>,
    restore_started: AtomicBool,
}

/// Handle to the session store. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a session in the `Loading` state. Call [`Session::restore`]
    /// once at startup to decide it.
    pub fn new(resolver: Arc<dyn IdentityResolver>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            inner: Arc::new(Inner {
                state,
                resolver,
                store,
                commit: Mutex::new(()),
                restore_started: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    pub fn identity(&self) -> Option<User> {
        self.inner.state.borrow().identity().cloned()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.state.borrow().credential().cloned()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.inner.state.subscribe(),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Restore a persisted session at boot.
    ///
    /// No persisted token: `Anonymous` without touching the network. A token
    /// that fails to resolve for any reason is deleted and the session ends
    /// `Anonymous`. Only the first call does anything; later calls return
    /// the current status.
    pub async fn restore(&self) -> SessionStatus {
        if self.inner.restore_started.swap(true, Ordering::SeqCst) {
            debug!("Restore already started, ignoring");
            return self.status();
        }

        let persisted = match self.inner.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token, clearing it");
                self.commit_restore(SessionState::Anonymous, true);
                return self.status();
            }
        };

        let Some(credential) = persisted else {
            debug!("No persisted token");
            self.commit_restore(SessionState::Anonymous, false);
            return self.status();
        };

        match self.inner.resolver.resolve_identity(&credential).await {
            Ok(identity) => {
                info!(user_id = identity.id, username = %identity.username, "Session restored");
                self.commit_restore(SessionState::Authenticated { credential, identity }, false);
            }
            Err(e) => {
                warn!(error = %e, "Persisted token rejected, starting anonymous");
                self.commit_restore(SessionState::Anonymous, true);
            }
        }
        self.status()
    }

    /// Apply a restore result unless a login/logout already decided the
    /// session while the restore was in flight.
    fn commit_restore(&self, next: SessionState, clear_store: bool) {
        let _guard = self.lock_commit();
        let applied = self.inner.state.send_if_modified(|state| {
            if matches!(state, SessionState::Loading) {
                *state = next;
                true
            } else {
                false
            }
        });

        if !applied {
            debug!("Session decided during restore, discarding restore result");
            return;
        }
        if clear_store {
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "Failed to clear rejected token");
            }
        }
    }

    /// Log in with a freshly exchanged credential.
    ///
    /// Resolves the identity, persists the token, then commits. On error
    /// nothing has been committed: status and durable storage are exactly
    /// what they were before the call.
    pub async fn login(&self, credential: Credential) -> Result<User, SessionError> {
        let identity = match self.inner.resolver.resolve_identity(&credential).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Login rejected: identity resolution failed");
                return Err(SessionError::Identity(e));
            }
        };

        let _guard = self.lock_commit();
        self.inner
            .store
            .save(&credential)
            .map_err(SessionError::Storage)?;
        self.inner.state.send_replace(SessionState::Authenticated {
            credential,
            identity: identity.clone(),
        });

        info!(user_id = identity.id, username = %identity.username, "Logged in");
        Ok(identity)
    }

    /// Clear the session from memory and durable storage. Idempotent.
    pub fn logout(&self) {
        let _guard = self.lock_commit();
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear persisted token");
        }
        let changed = self.inner.state.send_if_modified(|state| {
            if matches!(state, SessionState::Anonymous) {
                false
            } else {
                *state = SessionState::Anonymous;
                true
            }
        });
        if changed {
            info!("Logged out");
        }
    }

    /// Forced logout after the backend rejected the current credential on
    /// some other request.
    pub fn expire(&self) {
        if self.is_authenticated() {
            warn!("Credential rejected by the backend, ending session");
        }
        self.logout();
    }

    /// Re-resolve the current credential in the background. Any failure
    /// ends the session, the same as at boot.
    pub async fn revalidate(&self) -> SessionStatus {
        let Some(credential) = self.credential() else {
            return self.status();
        };

        let result = self.inner.resolver.resolve_identity(&credential).await;

        let _guard = self.lock_commit();
        let still_current = self.inner.state.borrow().credential() == Some(&credential);
        if !still_current {
            debug!("Session changed during revalidation, discarding result");
            return self.status();
        }

        match result {
            Ok(identity) => {
                self.inner.state.send_if_modified(|state| match state {
                    SessionState::Authenticated { identity: current, .. } if *current != identity => {
                        *current = identity;
                        true
                    }
                    _ => false,
                });
            }
            Err(e) => {
                warn!(error = %e, "Revalidation failed, ending session");
                if let Err(e) = self.inner.store.clear() {
                    warn!(error = %e, "Failed to clear persisted token");
                }
                self.inner.state.send_replace(SessionState::Anonymous);
            }
        }
        self.status()
    }

    fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.inner.commit.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialSource for Session {
    fn current_credential(&self) -> Option<Credential> {
        self.credential()
    }
}

/// A live view of the session status.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// stops notifications.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status()
    }

    pub fn identity(&self) -> Option<User> {
        self.rx.borrow().identity().cloned()
    }

    /// Whether the session changed since the last [`seen`](Self::seen) or
    /// [`changed`](Self::changed).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark the current value as seen and return its status.
    pub fn seen(&mut self) -> SessionStatus {
        self.rx.borrow_and_update().status()
    }

    /// Wait for the next transition. `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<SessionStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().status())
    }

    pub fn unsubscribe(self) {}
}
