//! In-memory auth state.
//!
//! # Design Pattern
//!
//! The store is the single writer-defined source of truth for "who is logged
//! in". Reads hand out immutable [`AuthSnapshot`]s; the only mutations are
//! [`AuthStore::logged_in`] and [`AuthStore::logged_out`], invoked by the
//! auth side-effect hooks. Authentication status is derived from the presence
//! of a user record, so the two can never disagree.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::auth::storage::TokenStore;

/// The signed-in user, as returned by the profile endpoints.
///
/// Servers vary in which fields they populate, so everything is optional and
/// unrecognized fields are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A point-in-time view of the auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<UserRecord>,
    pub token: Option<String>,
}

impl AuthSnapshot {
    /// Whether a user is signed in.
    ///
    /// Derived from the user record, never stored separately.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct AuthState {
    user: Option<UserRecord>,
    token: Option<String>,
}

/// Shared auth state plus its durable token storage.
pub struct AuthStore {
    state: RwLock<AuthState>,
    storage: Arc<dyn TokenStore>,
}

impl AuthStore {
    /// Creates a store rehydrated from durable storage.
    ///
    /// A persisted token yields a snapshot with a token but no user; callers
    /// that want the user record back issue a profile query. A storage read
    /// failure degrades to the signed-out state.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStore>) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("failed to read persisted token, starting signed out: {e}");
                None
            }
        };
        Self {
            state: RwLock::new(AuthState { user: None, token }),
            storage,
        }
    }

    /// Returns the current auth state.
    pub fn snapshot(&self) -> AuthSnapshot {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        AuthSnapshot {
            user: state.user.clone(),
            token: state.token.clone(),
        }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .user
            .is_some()
    }

    /// Records a sign-in.
    ///
    /// A token, when present, replaces the stored one and is persisted; when
    /// absent the existing token is kept, which lets a profile refresh update
    /// the user record without touching the session. Persistence failures are
    /// logged and do not roll back the in-memory state.
    pub(crate) fn logged_in(&self, user: UserRecord, token: Option<String>) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.user = Some(user);
            if let Some(token) = &token {
                state.token = Some(token.clone());
            }
        }
        if let Some(token) = token {
            if let Err(e) = self.storage.save(&token) {
                error!("failed to persist session token: {e}");
            }
        }
    }

    /// Records a sign-out, wiping both the in-memory state and the
    /// persisted token.
    pub(crate) fn logged_out(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.user = None;
            state.token = None;
        }
        if let Err(e) = self.storage.clear() {
            error!("failed to clear persisted session token: {e}");
        }
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("AuthStore")
            .field("authenticated", &state.user.is_some())
            .field("has_token", &state.token.is_some())
            .finish()
    }
}
