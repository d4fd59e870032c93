//! In-memory session store holding one cart per login session.
//!
//! Session ids are minted at login and carried inside the auth token. Each session owns its
//! cart behind an async mutex; handlers lock it for the whole operation so requests on the
//! same session run one after another. Map guards are never held across an `.await`.
//!
//! A session ends on logout, on account deletion, or when its token expires. Expired sessions
//! are dropped lazily, whenever a session is opened or looked up.

use crate::core::cart::Cart;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Shared handle to a session's cart.
pub type CartHandle = Arc<Mutex<Cart>>;

#[derive(Debug)]
struct Session {
    user_id: i64,
    expires_at: DateTime<Utc>,
    cart: CartHandle,
}

/// Session id to session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `user_id` with an empty cart and returns its id.
    ///
    /// The session lives until `expires_at`, the expiry of the token carrying it.
    #[must_use]
    pub fn open(&self, user_id: i64, expires_at: DateTime<Utc>) -> String {
        self.prune_expired(Utc::now());
        let sid = Uuid::new_v4().to_string();
        self.sessions.insert(
            sid.clone(),
            Session {
                user_id,
                expires_at,
                cart: CartHandle::default(),
            },
        );
        sid
    }

    /// True while the session is open and unexpired. An expired session is dropped.
    #[must_use]
    pub fn contains(&self, sid: &str) -> bool {
        self.live(sid, Utc::now()).is_some()
    }

    /// The session's cart.
    ///
    /// # Errors
    /// [`Error::InvalidToken`] when the session is closed or expired.
    pub fn cart(&self, sid: &str) -> Result<CartHandle> {
        self.live(sid, Utc::now()).ok_or(Error::InvalidToken)
    }

    fn live(&self, sid: &str, now: DateTime<Utc>) -> Option<CartHandle> {
        if let Some(session) = self.sessions.get(sid)
            && session.expires_at > now
        {
            return Some(Arc::clone(&session.cart));
        }
        if self
            .sessions
            .remove_if(sid, |_, s| s.expires_at <= now)
            .is_some()
        {
            debug!("Dropped expired session");
        }
        None
    }

    /// Ends a session and drops its cart.
    ///
    /// Requests already holding the cart finish against a detached copy; nothing they do
    /// reopens the session.
    pub fn close(&self, sid: &str) {
        self.sessions.remove(sid);
    }

    /// Ends every session of a user.
    pub fn close_user(&self, user_id: i64) {
        self.sessions.retain(|_, s| s.user_id != user_id);
    }

    /// Drops every session that expired before `now`.
    pub fn prune_expired(&self, now: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            debug!("Pruned {} expired session(s)", dropped);
        }
    }

    /// Number of sessions held, including expired ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
