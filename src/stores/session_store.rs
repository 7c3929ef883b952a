//! Single source of truth for "is the user logged in" and the cached profile.
//!
//! The authenticated flag is the only authorization gate. The cached profile
//! is a display cache and is always removed in the same storage batch as the
//! flag.

use crate::core::error::StorageError;
use crate::stores::key_value::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const LOGGED_IN_KEY: &str = "loggedIn";
pub const USER_KEY: &str = "user";

const EVENT_CAPACITY: usize = 16;

/// Notifications for the routing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated,
    /// The session is gone; navigate to `redirect_to` immediately.
    Cleared { redirect_to: String },
}

/// Decision for a protected route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Granted,
    Redirect(String),
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    login_route: String,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, login_route: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            login_route: login_route.into(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn set_authenticated(&self) -> Result<(), StorageError> {
        self.storage.set(LOGGED_IN_KEY, "true")?;
        tracing::info!("Session marked as authenticated");
        // No receivers is fine
        let _ = self.events.send(SessionEvent::Authenticated);
        Ok(())
    }

    /// Anything other than the exact string `"true"` counts as logged out,
    /// including a storage read failure.
    pub fn is_authenticated(&self) -> bool {
        match self.storage.get(LOGGED_IN_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session flag, treating as logged out");
                false
            }
        }
    }

    pub fn set_cached_user(&self, profile: &Value) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(profile)?;
        self.storage.set(USER_KEY, &serialized)?;
        tracing::debug!("Cached user profile updated");
        Ok(())
    }

    /// Absent, unreadable and corrupt entries all read as `None`.
    pub fn get_cached_user(&self) -> Option<Value> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached user");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Cached user is not valid JSON, ignoring it");
                None
            }
        }
    }

    /// Remove the flag and the profile in one batch, then announce the
    /// redirect to the login route. Safe to call repeatedly.
    ///
    /// The redirect is announced even when the removal fails: the server
    /// side of the session is gone either way, so protected screens must
    /// not stay interactive. The storage error is still returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let removed = self.storage.remove(&[LOGGED_IN_KEY, USER_KEY]);

        match &removed {
            Ok(()) => tracing::info!(redirect_to = %self.login_route, "Session cleared"),
            Err(e) => tracing::error!(
                error = %e,
                redirect_to = %self.login_route,
                "Failed to remove persisted session, redirecting anyway"
            ),
        }

        let _ = self.events.send(SessionEvent::Cleared {
            redirect_to: self.login_route.clone(),
        });
        removed
    }

    pub fn guard(&self) -> RouteAccess {
        if self.is_authenticated() {
            RouteAccess::Granted
        } else {
            RouteAccess::Redirect(self.login_route.clone())
        }
    }
}
