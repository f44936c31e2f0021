//! The course-authoring API surface: every endpoint this client speaks,
//! declared against the generic sync engine.
//!
//! Each submodule registers one namespace of endpoints and exposes the
//! qualified names callers pass to [`SyncClient::query`] and
//! [`SyncClient::mutate`]. [`build`] wires the whole stack together: the
//! registry, the auth hooks, the fetch executor, and the shared auth state.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lectern::api;
//! use lectern::auth::FileTokenStore;
//! use lectern::cache::SyncConfig;
//! use serde_json::json;
//!
//! let storage = Arc::new(FileTokenStore::new("/var/lib/lectern/token.json"));
//! let api = api::build(SyncConfig::default(), storage)?;
//!
//! api.client
//!     .mutate(api::auth::LOGIN, json!({"email": "a@b.c", "password": "…"}))
//!     .await?;
//! assert!(api.auth.is_authenticated());
//! ```

pub mod auth;
pub mod course;
pub mod media;
pub mod tests;

use std::sync::Arc;

use crate::auth::{AuthStore, TokenStore};
use crate::cache::SyncConfig;
use crate::client::SyncClient;
use crate::cookie::CookieJar;
use crate::endpoint::{Registry, RegistryError};
use crate::fetch::Fetcher;
use crate::hooks::Dispatcher;

/// The assembled client stack.
pub struct Api {
    /// The query/mutation cache over the full endpoint registry.
    pub client: SyncClient,
    /// Shared auth state, driven by the login/logout/profile hooks.
    pub auth: Arc<AuthStore>,
    jar: Arc<CookieJar>,
}

impl Api {
    /// The cookie jar shared by the fetch executor and the login hook.
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("client", &self.client)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Builds the full client: registers every endpoint namespace, wires the
/// auth hooks to a store rehydrated from `storage`, and hands back the
/// cache engine ready for queries.
pub fn build(config: SyncConfig, storage: Arc<dyn TokenStore>) -> Result<Api, RegistryError> {
    let jar = Arc::new(CookieJar::new());
    let auth_store = Arc::new(AuthStore::new(storage.clone()));

    let mut registry = Registry::new();
    auth::register(&mut registry)?;
    course::register(&mut registry)?;
    tests::register(&mut registry)?;

    let mut dispatcher = Dispatcher::new();
    auth::register_hooks(&mut dispatcher, auth_store.clone(), jar.clone());

    let fetcher = Fetcher::new(
        config.base_url.clone(),
        storage,
        jar.clone(),
        config.retry.clone(),
    );
    let client = SyncClient::new(registry, fetcher, dispatcher, config);

    Ok(Api {
        client,
        auth: auth_store,
        jar,
    })
}
