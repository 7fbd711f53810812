use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::storage::TokenStore;

/// Authentication state observed by the rest of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted token lookup still outstanding.
    Loading,
    SignedIn,
    SignedOut,
}

/// Owns the session token lifecycle and publishes the session state.
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { store, state }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Startup lookup of the persisted token.
    pub async fn init(&self) -> SessionState {
        let next = match self.store.get().await {
            Ok(Some(_)) => SessionState::SignedIn,
            Ok(None) => SessionState::SignedOut,
            Err(e) => {
                warn!(error = %e, "reading persisted token failed");
                SessionState::SignedOut
            }
        };
        debug!(state = ?next, "session initialised");
        self.transition(next);
        next
    }

    /// Persisted token, if any. Not validated against the server.
    pub async fn load_token(&self) -> anyhow::Result<Option<String>> {
        self.store.get().await
    }

    /// Like `load_token`, with read failures logged and reported as absent.
    pub async fn token(&self) -> Option<String> {
        match self.load_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "reading token failed");
                None
            }
        }
    }

    pub async fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.store.set(token).await?;
        self.transition(SessionState::SignedIn);
        Ok(())
    }

    pub async fn clear_token(&self) -> anyhow::Result<()> {
        self.store.clear().await
    }

    /// Called when an authenticated request was rejected by the server.
    pub async fn expire(&self) {
        info!("session rejected by server; signing out");
        self.transition(SessionState::SignedOut);
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "clearing rejected token failed");
        }
    }

    /// User-initiated sign out. The state flips before the token is removed.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.transition(SessionState::SignedOut);
        self.store.clear().await
    }

    fn transition(&self, next: SessionState) {
        self.state.send_if_modified(|cur| {
            if *cur == next {
                false
            } else {
                *cur = next;
                true
            }
        });
    }
}
