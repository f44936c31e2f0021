//! In-process cookie storage shared by the fetch executor and the
//! credential extractor.
//!
//! The jar keeps name/value pairs only; attributes (`Path`, `HttpOnly`,
//! `Max-Age`, …) are dropped on store. That is all this client needs: the
//! executor replays the pairs on requests whose credentials mode is
//! `Include`, and the login hook inspects the jar for a `token` entry when
//! the server sets the session cookie instead of returning the token in the
//! payload.

use std::fmt;

use dashmap::DashMap;

/// A process-wide name/value cookie store.
#[derive(Default)]
pub struct CookieJar {
    cookies: DashMap<String, String>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `Set-Cookie` header value, keeping only the leading
    /// name/value pair. Malformed headers are ignored.
    pub fn store_set_cookie(&self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.cookies
                    .insert(name.to_string(), value.trim().to_string());
            }
        }
    }

    /// Inserts a cookie directly.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Looks up a cookie value by name.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|v| v.clone())
    }

    /// Renders the jar as a `Cookie` request-header value, or `None` when
    /// the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|entry| format!("{}={}", entry.key(), entry.value()))
            .collect();
        Some(pairs.join("; "))
    }

    /// Removes every stored cookie.
    pub fn clear(&self) {
        self.cookies.clear();
    }

    /// Number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are session credentials; log names only.
        let names: Vec<String> = self.cookies.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("CookieJar").field("names", &names).finish()
    }
}
