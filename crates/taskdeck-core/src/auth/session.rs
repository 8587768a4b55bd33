//! Process-wide session state.
//!
//! `SessionController` is the only owner of the logged-in / logged-out
//! state. It hydrates from the credential store on startup, handles explicit
//! login and logout, and performs the teardown the gateway requests when the
//! server rejects a credential. Views observe it through [`SessionController::subscribe`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::User;

use super::credentials::{CredentialStore, StoreError};
use super::guard::Route;
use super::token::{self, TokenClaims, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Storage has not been read yet
    Unresolved,
    LoggedOut,
    LoggedIn(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unresolved)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn(_))
    }
}

/// Receives navigation requests raised by the session layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that ignores every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        debug!(route = route.path(), "Navigation ignored");
    }
}

struct Inner {
    store: CredentialStore,
    state: watch::Sender<SessionState>,
    navigator: Arc<dyn Navigator>,
}

/// Handle to the session. Clone is cheap; all clones share one state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(store: CredentialStore, navigator: impl Navigator + 'static) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self {
            inner: Arc::new(Inner {
                store,
                state,
                navigator: Arc::new(navigator),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.state.borrow().is_resolved()
    }

    /// Watch channel over the state, for views that re-render on change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Bearer token of the stored credential
    pub fn token(&self) -> Result<Option<SecretString>, StoreError> {
        self.inner.store.token()
    }

    /// Hydrate from storage.
    ///
    /// A stored credential whose token fails the local check is removed.
    /// Runs once; later calls return the current state untouched.
    pub fn init(&self) -> SessionState {
        if self.is_resolved() {
            debug!("Session already resolved");
            return self.state();
        }

        let next = match self.inner.store.load() {
            Ok(Some(credential)) => match token::validate(credential.token.expose_secret()) {
                Ok(_) => {
                    debug!(user_id = credential.user.id, "Restored session");
                    SessionState::LoggedIn(credential.user)
                }
                Err(e) => {
                    info!(error = %e, "Discarding stored session");
                    self.clear_store();
                    SessionState::LoggedOut
                }
            },
            Ok(None) => {
                debug!("No stored session");
                // Drops any half-written leftover
                self.clear_store();
                SessionState::LoggedOut
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                SessionState::LoggedOut
            }
        };

        self.inner.state.send_if_modified(|state| {
            if state.is_resolved() {
                false
            } else {
                *state = next;
                true
            }
        });
        self.state()
    }

    /// Hydrate from storage, then confirm a restored session with the server.
    ///
    /// A rejected credential ends logged out (the gateway tears it down).
    /// Transport and server failures keep the stored session.
    pub async fn init_verified(&self, api: &ApiClient) -> SessionState {
        if !self.init().is_logged_in() {
            return self.state();
        }

        match api.verify().await {
            Ok(_) => debug!("Session confirmed by server"),
            Err(e) if e.logged_out() => info!(error = %e, "Server rejected stored session"),
            Err(e) => warn!(error = %e, "Could not confirm session; keeping stored credential"),
        }
        self.state()
    }

    /// Run the local token check against the stored token.
    ///
    /// Malformed or expired tokens are removed from storage.
    pub fn check_stored_token(&self) -> Result<TokenClaims, ValidationError> {
        let token = match self.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        let result = token::validate(token.as_ref().map_or("", |t| t.expose_secret()));
        if let Err(ref e) = result {
            if e.requires_clear() {
                debug!(error = %e, "Clearing invalid stored token");
                self.clear_store();
            }
        }
        result
    }

    /// Store the credential, then become logged in.
    ///
    /// The state is untouched when the credential cannot be stored.
    pub fn login(&self, user: User, token: &str) -> Result<(), StoreError> {
        self.inner.store.save(&user, token)?;
        info!(user_id = user.id, "Logged in");
        self.inner.state.send_replace(SessionState::LoggedIn(user));
        Ok(())
    }

    /// Replace the stored profile of the signed-in user, keeping the token.
    ///
    /// Returns `false` when `user` is not the signed-in user.
    pub fn update_profile(&self, user: User) -> Result<bool, StoreError> {
        let is_current = self
            .inner
            .state
            .borrow()
            .user()
            .is_some_and(|current| current.id == user.id);
        if !is_current {
            return Ok(false);
        }

        let Some(token) = self.token()? else {
            return Ok(false);
        };
        self.inner.store.save(&user, token.expose_secret())?;
        debug!(user_id = user.id, "Stored profile refreshed");
        self.inner.state.send_replace(SessionState::LoggedIn(user));
        Ok(true)
    }

    /// Clear the credential and become logged out.
    ///
    /// The state changes even when storage fails; the error is still returned.
    pub fn logout(&self) -> Result<(), StoreError> {
        let result = self.inner.store.clear();
        if self.transition_to_logged_out() {
            info!("Logged out");
        }
        result
    }

    /// Teardown after the server rejected the credential.
    ///
    /// Equivalent to `logout` plus navigation to sign-in. Returns whether this
    /// call performed the transition; concurrent callers after the first only
    /// re-clear storage.
    pub fn expire(&self) -> bool {
        self.clear_store();
        let transitioned = self.transition_to_logged_out();
        if transitioned {
            warn!("Session expired; redirecting to sign-in");
            self.inner.navigator.navigate(Route::SignIn);
        }
        transitioned
    }

    fn transition_to_logged_out(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::LoggedOut {
                false
            } else {
                *state = SessionState::LoggedOut;
                true
            }
        })
    }

    fn clear_store(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
