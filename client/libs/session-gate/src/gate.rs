/// Session gate - authentication state machine
///
/// State transitions:
/// - Checking → Authenticated: the current-user lookup yields a user
/// - Checking → Unauthenticated: the lookup yields nothing or fails
/// - Unauthenticated → Checking: after a successful sign-in
/// - Authenticated → Unauthenticated: on sign-out
///
/// Sign-in and sign-out start a new check epoch. A check that began in an
/// earlier epoch is discarded when it resolves.
use async_trait::async_trait;
use parking_lot::RwLock;
use remote_ops::{RemoteOps, RemoteResult};
use snapgram_types::User;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::flag::{SessionFlag, SessionFlagStore};
use crate::route::{Navigator, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup check or post-sign-in check in progress
    Checking,
    Unauthenticated,
    Authenticated,
}

/// Outcome of a route access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Allow,
    /// Session still being checked; render a placeholder
    Wait,
    Redirect(Route),
}

/// Source of the signed-in user's profile
#[async_trait]
pub trait CurrentUserSource: Send + Sync {
    async fn current_user(&self) -> RemoteResult<Option<User>>;
}

#[async_trait]
impl CurrentUserSource for RemoteOps {
    async fn current_user(&self) -> RemoteResult<Option<User>> {
        self.get_current_user().await
    }
}

struct GateState {
    current: SessionState,
    user: Option<User>,
    epoch: u64,
}

pub struct SessionGate {
    source: Arc<dyn CurrentUserSource>,
    navigator: Arc<dyn Navigator>,
    flags: Arc<dyn SessionFlagStore>,
    state: RwLock<GateState>,
    updates: watch::Sender<SessionState>,
    startup: OnceCell<SessionState>,
}

impl SessionGate {
    pub fn new(
        source: Arc<dyn CurrentUserSource>,
        navigator: Arc<dyn Navigator>,
        flags: Arc<dyn SessionFlagStore>,
    ) -> Self {
        let (updates, _) = watch::channel(SessionState::Checking);
        Self {
            source,
            navigator,
            flags,
            state: RwLock::new(GateState {
                current: SessionState::Checking,
                user: None,
                epoch: 0,
            }),
            updates,
            startup: OnceCell::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().current
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    /// Startup check. Runs once per process; later calls return the first
    /// outcome without querying again.
    pub async fn initialize(&self) -> SessionState {
        *self
            .startup
            .get_or_init(|| async {
                let flag = self.flags.load().unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read session flag");
                    None
                });

                if flag != Some(SessionFlag::SignedIn) {
                    info!(?flag, "No signed-in flag, redirecting to sign-in");
                    self.navigator.navigate(Route::SignIn);
                }

                match self.check().await {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(error = %e, "Startup session check failed");
                        SessionState::Unauthenticated
                    }
                }
            })
            .await
    }

    /// Look up the current user and settle the state. A failed lookup
    /// leaves the gate unauthenticated and returns the failure.
    ///
    /// If a sign-in or sign-out happened while the lookup was running, its
    /// result is dropped and the current state is returned unchanged.
    pub async fn check(&self) -> SessionResult<SessionState> {
        let epoch = self.state.read().epoch;
        self.check_in(epoch).await
    }

    /// A session was just created; re-check who is signed in
    pub async fn on_signed_in(&self) -> SessionResult<SessionState> {
        let epoch = self.next_epoch();
        self.transition(SessionState::Checking, None);
        self.check_in(epoch).await
    }

    pub fn on_signed_out(&self) {
        self.next_epoch();
        self.transition(SessionState::Unauthenticated, None);
    }

    /// Access decision for `route` under the current state
    pub fn guard(&self, route: &Route) -> RouteAccess {
        match (self.state(), route.is_protected()) {
            (SessionState::Authenticated, false) => RouteAccess::Redirect(Route::Home),
            (SessionState::Authenticated, true) => RouteAccess::Allow,
            (SessionState::Unauthenticated, true) => RouteAccess::Redirect(Route::SignIn),
            (SessionState::Unauthenticated, false) => RouteAccess::Allow,
            (SessionState::Checking, true) => RouteAccess::Wait,
            (SessionState::Checking, false) => RouteAccess::Allow,
        }
    }

    /// Persist the flag for the current state
    pub fn shutdown(&self) {
        let state = self.state();
        if let Some(flag) = flag_for(state) {
            if let Err(e) = self.flags.store(flag) {
                warn!(error = %e, "Failed to persist session flag on shutdown");
            }
        }
        info!(?state, "Session gate shut down");
    }

    async fn check_in(&self, epoch: u64) -> SessionResult<SessionState> {
        let (next, user, failure) = match self.source.current_user().await {
            Ok(Some(user)) => (SessionState::Authenticated, Some(user), None),
            Ok(None) => (SessionState::Unauthenticated, None, None),
            Err(e) => (SessionState::Unauthenticated, None, Some(e)),
        };

        match self.apply(Some(epoch), next, user) {
            Some(state) => match failure {
                Some(e) => Err(SessionError::Check(e)),
                None => Ok(state),
            },
            None => {
                let current = self.state();
                debug!(
                    epoch,
                    discarded = ?next,
                    ?current,
                    "Superseded session check discarded"
                );
                Ok(current)
            }
        }
    }

    fn next_epoch(&self) -> u64 {
        let mut state = self.state.write();
        state.epoch += 1;
        state.epoch
    }

    fn transition(&self, next: SessionState, user: Option<User>) -> SessionState {
        self.apply(None, next, user).unwrap_or(next)
    }

    /// Move to `next`. With `expected_epoch` set, nothing happens unless the
    /// gate is still in that epoch.
    fn apply(
        &self,
        expected_epoch: Option<u64>,
        next: SessionState,
        user: Option<User>,
    ) -> Option<SessionState> {
        let previous = {
            let mut state = self.state.write();
            if expected_epoch.is_some_and(|epoch| epoch != state.epoch) {
                return None;
            }
            let previous = state.current;
            state.current = next;
            state.user = user;
            previous
        };

        if previous != next {
            info!(from = ?previous, to = ?next, "Session state transition");
        } else {
            debug!(state = ?next, "Session state unchanged");
        }
        self.updates.send_replace(next);

        if let Some(flag) = flag_for(next) {
            if let Err(e) = self.flags.store(flag) {
                warn!(error = %e, "Failed to persist session flag");
            }
        }

        let route = self.navigator.current();
        match next {
            SessionState::Unauthenticated if route.is_protected() => {
                self.navigator.navigate(Route::SignIn);
            }
            SessionState::Authenticated if route.is_auth_entry() => {
                self.navigator.navigate(Route::Home);
            }
            _ => {}
        }

        Some(next)
    }
}

fn flag_for(state: SessionState) -> Option<SessionFlag> {
    match state {
        SessionState::Authenticated => Some(SessionFlag::SignedIn),
        SessionState::Unauthenticated => Some(SessionFlag::LoggedOut),
        SessionState::Checking => None,
    }
}
