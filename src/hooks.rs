//! Per-endpoint completion hooks.
//!
//! A hook observes one settled exchange: the endpoint name, the call
//! arguments, and the shaped outcome. Hooks run strictly after the cache has
//! stored the result and notified waiting subscribers, on the settling task.
//! A failing hook is logged and isolated; it cannot un-store the entry or
//! stop other hooks.
//!
//! The auth side effects (login persisting the session token, logout wiping
//! it, profile loads refreshing the user record) are registered this way by
//! [`crate::api`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::error;

use crate::error::ApiError;

/// One settled exchange, as observed by hooks and returned by mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    endpoint: String,
    args: Value,
    outcome: Result<Value, ApiError>,
}

impl Settled {
    pub(crate) fn new(
        endpoint: impl Into<String>,
        args: Value,
        outcome: Result<Value, ApiError>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            args,
            outcome,
        }
    }

    /// The qualified endpoint name.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The arguments the call was made with.
    #[must_use]
    pub const fn args(&self) -> &Value {
        &self.args
    }

    /// The shaped outcome.
    #[must_use]
    pub const fn outcome(&self) -> &Result<Value, ApiError> {
        &self.outcome
    }

    /// The shaped data, when the exchange succeeded.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// The failure, when the exchange failed.
    #[must_use]
    pub fn error(&self) -> Option<&ApiError> {
        self.outcome.as_ref().err()
    }

    /// Returns `true` if the exchange succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// An error raised by a completion hook.
///
/// Dispatch logs it as an operational error and moves on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("malformed payload: {e}"))
    }
}

type Hook = Arc<dyn Fn(&Settled) -> Result<(), HookError> + Send + Sync>;

/// Routes settled exchanges to the hooks registered for their endpoint.
#[derive(Default)]
pub struct Dispatcher {
    hooks: HashMap<String, Vec<Hook>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook to run whenever the named endpoint settles.
    ///
    /// Hooks for the same endpoint run in registration order.
    pub fn on_settled(
        &mut self,
        endpoint: impl Into<String>,
        hook: impl Fn(&Settled) -> Result<(), HookError> + Send + Sync + 'static,
    ) {
        self.hooks
            .entry(endpoint.into())
            .or_default()
            .push(Arc::new(hook));
    }

    /// Runs the hooks for a settled exchange, isolating failures.
    pub(crate) fn dispatch(&self, settled: &Settled) {
        let Some(hooks) = self.hooks.get(settled.endpoint()) else {
            return;
        };
        for hook in hooks {
            if let Err(e) = hook(settled) {
                error!(endpoint = settled.endpoint(), "completion hook failed: {e}");
            }
        }
    }

    /// Number of endpoints with at least one hook.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut endpoints: Vec<&String> = self.hooks.keys().collect();
        endpoints.sort();
        f.debug_struct("Dispatcher")
            .field("endpoints", &endpoints)
            .finish()
    }
}
