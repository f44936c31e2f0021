//! The `auth` namespace: session endpoints and the hooks that keep the
//! auth store in step with them.
//!
//! Login and logout are the two endpoints with real side effects. Their
//! hooks own every write to [`AuthStore`]: login extracts the session token
//! (payload first, cookie jar second) and records the user; logout clears
//! everything even when the server call failed, because an unreachable
//! server must not pin a client into a signed-in state.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::auth::{
    AuthStore, CookieCredential, CredentialSource, PayloadCredential, UserRecord, first_credential,
};
use crate::cookie::CookieJar;
use crate::endpoint::{EndpointDescriptor, Registry, RegistryError};
use crate::hooks::{Dispatcher, HookError};
use crate::request::RequestSpec;
use crate::tag::Tag;

/// `POST /user/login`
pub const LOGIN: &str = "auth.login";
/// `GET /user/logout`
pub const LOGOUT: &str = "auth.logout";
/// `GET /user/profile`
pub const LOAD_USER: &str = "auth.loadUser";
/// `POST /user/register`
pub const REGISTER_USER: &str = "auth.registerUser";
/// `PUT /user/profile/update`
pub const UPDATE_USER: &str = "auth.updateUser";

/// Registers the auth endpoints.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        EndpointDescriptor::mutation(LOGIN, |args| {
            Ok(RequestSpec::post("/user/login").json(args.clone()))
        })
        .invalidates(|_| vec![Tag::of("Auth")]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(LOGOUT, |_| Ok(RequestSpec::get("/user/logout")))
            .invalidates(|_| vec![Tag::of("Auth")]),
    )?;

    registry.register(
        EndpointDescriptor::query(LOAD_USER, |_| Ok(RequestSpec::get("/user/profile")))
            .provides(|_, _| vec![Tag::of("Auth")]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(REGISTER_USER, |args| {
            Ok(RequestSpec::post("/user/register").json(args.clone()))
        })
        .invalidates(|_| vec![]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(UPDATE_USER, |args| {
            Ok(RequestSpec::put("/user/profile/update").json(args.clone()))
        })
        .invalidates(|_| vec![]),
    )?;

    Ok(())
}

/// Registers the login, logout, and profile-load hooks against `store`.
pub fn register_hooks(dispatcher: &mut Dispatcher, store: Arc<AuthStore>, jar: Arc<CookieJar>) {
    let sources: Arc<Vec<Box<dyn CredentialSource>>> = Arc::new(vec![
        Box::new(PayloadCredential::default()),
        Box::new(CookieCredential::new(jar, "token")),
    ]);

    let login_store = store.clone();
    dispatcher.on_settled(LOGIN, move |settled| {
        let Some(data) = settled.data() else {
            // A failed login changes nothing.
            return Ok(());
        };
        let user = parse_user(data)?;
        let token = first_credential(&sources, data);
        if token.is_none() {
            debug!("login settled without a token; relying on the session cookie");
        }
        login_store.logged_in(user, token);
        Ok(())
    });

    let logout_store = store.clone();
    dispatcher.on_settled(LOGOUT, move |settled| {
        // Best-effort: the local session ends whatever the server said.
        if let Some(e) = settled.error() {
            debug!("logout request failed, clearing local session anyway: {e}");
        }
        logout_store.logged_out();
        Ok(())
    });

    dispatcher.on_settled(LOAD_USER, move |settled| {
        let Some(data) = settled.data() else {
            return Ok(());
        };
        let user = parse_user(data)?;
        // The profile payload carries no token; the persisted one stands.
        store.logged_in(user, None);
        Ok(())
    });
}

fn parse_user(data: &Value) -> Result<UserRecord, HookError> {
    let Some(user) = data.get("user") else {
        return Err(HookError::new("response is missing the user record"));
    };
    Ok(serde_json::from_value(user.clone())?)
}
