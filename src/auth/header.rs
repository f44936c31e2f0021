//! Bearer-token header injection.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::warn;

/// Attaches `Authorization: Bearer <token>` to the headers.
///
/// Injection is idempotent: an `Authorization` header already present is
/// left untouched, so callers may pre-set one to override the stored token.
/// With no token the headers pass through unchanged. A token that is not
/// valid header text is skipped rather than propagated as an error.
pub fn attach_bearer(headers: &mut HeaderMap, token: Option<&str>) {
    if headers.contains_key(AUTHORIZATION) {
        return;
    }
    let Some(token) = token else {
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(value) => {
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => {
            warn!("stored token is not valid header text, sending request without it");
        }
    }
}
