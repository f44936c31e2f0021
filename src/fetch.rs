//! The fetch executor: one [`RequestSpec`] in, one normalized result out.
//!
//! The executor owns everything about a single HTTP exchange that the rest
//! of the crate should not care about: joining the relative path onto the
//! base URL, injecting the bearer header from durable storage, replaying and
//! capturing cookies, bounded transport retries, and collapsing the response
//! into `Result<Value, ApiError>`. It holds no per-request state; the cache
//! engine calls [`Fetcher::execute`] from as many tasks as it likes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{TokenStore, attach_bearer};
use crate::cookie::CookieJar;
use crate::error::ApiError;
use crate::request::{CredentialsMode, RequestSpec};

/// Bounded retry for transport errors only.
///
/// Server responses, whatever their status, are never retried; a response
/// means the request may have been applied. Disabled by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first. Zero disables retry.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Executes requests against the configured base URL.
pub struct Fetcher {
    client: reqwest::Client,
    base_url: Url,
    storage: Arc<dyn TokenStore>,
    jar: Arc<CookieJar>,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates an executor for the given base URL.
    ///
    /// The base URL's path is treated as a prefix for every request path, so
    /// `http://localhost:8080/api/v1` plus `/course/` yields
    /// `http://localhost:8080/api/v1/course/`.
    #[must_use]
    pub fn new(
        base_url: Url,
        storage: Arc<dyn TokenStore>,
        jar: Arc<CookieJar>,
        retry: RetryPolicy,
    ) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            storage,
            jar,
            retry,
        }
    }

    /// The shared cookie jar.
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    /// Runs one exchange, retrying transport errors per the policy.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Value, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            let request = self.build(spec)?;
            debug!(method = %spec.method, path = %spec.path, attempt, "dispatching request");
            match self.client.execute(request).await {
                Ok(response) => return self.settle(spec, response).await,
                Err(e) if attempt < self.retry.max_retries => {
                    warn!(attempt, "transport error, retrying: {e}");
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(ApiError::network(e)),
            }
        }
    }

    fn build(&self, spec: &RequestSpec) -> Result<reqwest::Request, ApiError> {
        let url = join_url(&self.base_url, &spec.path)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::transform(format!("invalid header name `{name}`: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::transform(format!("invalid header value: {e}")))?;
            headers.append(name, value);
        }

        // The token comes from durable storage on every request, not from
        // the in-memory auth state, so a restarted process keeps its session.
        let token = match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("failed to read persisted token, sending request without it: {e}");
                None
            }
        };
        attach_bearer(&mut headers, token.as_deref());

        if spec.credentials == CredentialsMode::Include {
            if let Some(cookie) = self.jar.header_value() {
                let value = HeaderValue::from_str(&cookie)
                    .map_err(|e| ApiError::transform(format!("invalid cookie value: {e}")))?;
                headers.insert(COOKIE, value);
            }
        }

        let mut builder = self
            .client
            .request(spec.method.clone(), url)
            .headers(headers);
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }
        builder.build().map_err(ApiError::network)
    }

    async fn settle(
        &self,
        spec: &RequestSpec,
        response: reqwest::Response,
    ) -> Result<Value, ApiError> {
        if spec.credentials == CredentialsMode::Include {
            for set_cookie in response.headers().get_all(SET_COOKIE) {
                if let Ok(raw) = set_cookie.to_str() {
                    self.jar.store_set_cookie(raw);
                }
            }
        }

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::network)?;
        debug!(path = %spec.path, status = status.as_u16(), "request settled");

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::transform(format!("malformed response body: {e}")))
        } else {
            Err(ApiError::server(
                status.as_u16(),
                server_message(status, &bytes),
            ))
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Joins a request path (plus optional query string) onto the base URL.
///
/// A leading `/` on the path is relative to the base prefix, not the host
/// root.
fn join_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    let relative = path.trim_start_matches('/');
    base.join(relative)
        .map_err(|e| ApiError::transform(format!("invalid request path `{path}`: {e}")))
}

/// Extracts the server's `{"message": …}` when the error body carries one,
/// falling back to the status line.
fn server_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/api/v1").expect("base url")
    }

    #[test]
    fn test_join_url_keeps_base_prefix() {
        let fetcher_base = {
            // Mirror the constructor's trailing-slash normalization.
            let mut url = base();
            url.set_path(&format!("{}/", url.path()));
            url
        };
        assert_eq!(
            join_url(&fetcher_base, "/course/").expect("join").as_str(),
            "http://localhost:8080/api/v1/course/"
        );
        assert_eq!(
            join_url(&fetcher_base, "course/42").expect("join").as_str(),
            "http://localhost:8080/api/v1/course/42"
        );
    }

    #[test]
    fn test_join_url_preserves_query_string() {
        let mut url = base();
        url.set_path(&format!("{}/", url.path()));
        assert_eq!(
            join_url(&url, "/course/42?publish=true").expect("join").as_str(),
            "http://localhost:8080/api/v1/course/42?publish=true"
        );
    }

    #[test]
    fn test_server_message_prefers_structured_body() {
        assert_eq!(
            server_message(StatusCode::CONFLICT, br#"{"message": "course exists"}"#),
            "course exists"
        );
        assert_eq!(
            server_message(StatusCode::NOT_FOUND, b"<html>nope</html>"),
            "Not Found"
        );
        assert_eq!(
            server_message(StatusCode::INTERNAL_SERVER_ERROR, b""),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_retry_policy_disabled_by_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
    }
}
