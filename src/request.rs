//! Request descriptors produced by endpoint builders.
//!
//! A [`RequestSpec`] is a plain value describing one HTTP exchange: method,
//! path relative to the configured base URL, optional JSON body, extra
//! headers, and the credentials mode. Endpoint request builders construct a
//! fresh spec per call; the fetch executor turns it into a real request.

use reqwest::Method;
use serde_json::Value;

/// Whether the request carries cookie credentials.
///
/// [`Include`](CredentialsMode::Include) is the default: the executor
/// attaches the shared cookie jar, matching a browser's
/// `credentials: "include"`. [`Omit`](CredentialsMode::Omit) sends no
/// cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    #[default]
    Include,
    Omit,
}

/// A single outgoing request, built fresh per call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path (plus query string) relative to the base URL, e.g. `/course/42`.
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub credentials: CredentialsMode,
}

impl RequestSpec {
    /// Creates a spec with the given method and relative path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            credentials: CredentialsMode::default(),
        }
    }

    /// Shorthand for a GET spec.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST spec.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a PUT spec.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a PATCH spec.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Shorthand for a DELETE spec.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds an extra header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the credentials mode.
    #[must_use]
    pub const fn credentials(mut self, mode: CredentialsMode) -> Self {
        self.credentials = mode;
        self
    }
}
