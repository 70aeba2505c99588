//! Authentication session: token plus logged-in flag.
//!
//! The session is an explicit service shared by the gateway (which reads the
//! token) and the navigator (which logs in and out). Every mutation is
//! persisted through a [`KeyValueStore`] before it becomes visible, and
//! observers are told about changes through a `watch` channel.

pub mod store;

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::SessionError;
pub use store::{FileStore, KeyValueStore, KvWrite, MemoryStore};

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "authToken";
/// Storage key for the logged-in flag.
pub const LOGGED_IN_KEY: &str = "isLoggedIn";

/// What observers see when the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedIn,
    LoggedOut,
}

fn clear_persisted(store: &dyn KeyValueStore) -> Result<(), SessionError> {
    store.write_batch(&[KvWrite::Remove(TOKEN_KEY), KvWrite::Set(LOGGED_IN_KEY, "false")])
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    logged_in: bool,
}

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
    tx: watch::Sender<SessionStatus>,
}

impl Session {
    /// Restore the session persisted in `store`.
    ///
    /// A flag without a token (or the reverse) is not a usable session, and
    /// neither is an unreadable store; both keys are cleared in those cases
    /// and the session starts logged out.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, SessionError> {
        let persisted = store
            .get(TOKEN_KEY)
            .and_then(|token| Ok((token, store.get(LOGGED_IN_KEY)?)));

        let state = match persisted {
            Ok((token, flag)) => {
                let token = token.filter(|t| !t.is_empty());
                match (flag.as_deref() == Some("true"), token) {
                    (true, Some(token)) => SessionState {
                        token: Some(token),
                        logged_in: true,
                    },
                    (true, None) | (false, Some(_)) => {
                        warn!("Persisted session is inconsistent, clearing it");
                        clear_persisted(store.as_ref())?;
                        SessionState::default()
                    }
                    (false, None) => SessionState::default(),
                }
            }
            Err(err @ SessionError::Corrupt { .. }) => {
                warn!(error = %err, "Persisted session is unreadable, clearing it");
                clear_persisted(store.as_ref())?;
                SessionState::default()
            }
            Err(err) => return Err(err),
        };

        let status = if state.logged_in {
            SessionStatus::LoggedIn
        } else {
            SessionStatus::LoggedOut
        };
        debug!(?status, "Session restored");
        let (tx, _rx) = watch::channel(status);

        Ok(Self {
            store,
            state: RwLock::new(state),
            tx,
        })
    }

    /// A fresh, non-persistent session.
    pub fn in_memory() -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::LoggedOut);
        Self {
            store: Arc::new(MemoryStore::new()),
            state: RwLock::new(SessionState::default()),
            tx,
        }
    }

    /// Store `token` and mark the session logged in.
    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        self.store
            .write_batch(&[KvWrite::Set(TOKEN_KEY, token), KvWrite::Set(LOGGED_IN_KEY, "true")])?;
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.token = Some(token.to_string());
            state.logged_in = true;
        }
        info!("Logged in");
        self.tx.send_replace(SessionStatus::LoggedIn);
        Ok(())
    }

    /// Clear the token and the flag together.
    ///
    /// In-memory state is cleared even if persisting fails; the store error
    /// is still returned.
    pub fn logout(&self) -> Result<(), SessionError> {
        let persisted = self
            .store
            .write_batch(&[KvWrite::Remove(TOKEN_KEY), KvWrite::Set(LOGGED_IN_KEY, "false")]);
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.token = None;
            state.logged_in = false;
        }
        info!("Logged out");
        self.tx.send_replace(SessionStatus::LoggedOut);
        persisted
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).logged_in
    }

    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .token
            .clone()
    }

    pub fn status(&self) -> SessionStatus {
        *self.tx.borrow()
    }

    /// Subscribe to login/logout changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }
}
