//! Session-token extraction strategies.
//!
//! Servers deliver the session token either inline in the login response
//! body or as a `Set-Cookie` header captured into the client's cookie jar.
//! Each strategy is a [`CredentialSource`]; the login hook tries them in
//! order and keeps the first hit.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cookie::CookieJar;

/// One place a session token may be found after a successful login.
pub trait CredentialSource: Send + Sync {
    /// A short label for logging.
    fn name(&self) -> &'static str;

    /// Pulls a token out of the login response payload, if present here.
    fn extract(&self, payload: &Value) -> Option<String>;
}

/// Reads the token from a top-level field of the response body.
pub struct PayloadCredential {
    field: String,
}

impl PayloadCredential {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for PayloadCredential {
    fn default() -> Self {
        Self::new("token")
    }
}

impl CredentialSource for PayloadCredential {
    fn name(&self) -> &'static str {
        "payload"
    }

    fn extract(&self, payload: &Value) -> Option<String> {
        payload
            .get(&self.field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Reads the token from the client's cookie jar.
pub struct CookieCredential {
    jar: Arc<CookieJar>,
    name: String,
}

impl CookieCredential {
    #[must_use]
    pub fn new(jar: Arc<CookieJar>, name: impl Into<String>) -> Self {
        Self {
            jar,
            name: name.into(),
        }
    }
}

impl CredentialSource for CookieCredential {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn extract(&self, _payload: &Value) -> Option<String> {
        self.jar.get(&self.name)
    }
}

/// Returns the first token any source yields, in order.
pub fn first_credential(sources: &[Box<dyn CredentialSource>], payload: &Value) -> Option<String> {
    for source in sources {
        if let Some(token) = source.extract(payload) {
            debug!(source = source.name(), "session token extracted");
            return Some(token);
        }
    }
    None
}
