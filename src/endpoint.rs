//! Endpoint descriptors and the registry.
//!
//! Every remote operation is declared once as an [`EndpointDescriptor`]: how
//! to build the request from arguments, how to shape the response, and which
//! cache tags it provides or invalidates. The [`Registry`] validates the
//! declarations up front so misuse surfaces at registration, not mid-request.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern::endpoint::{EndpointDescriptor, Registry, Shaped};
//! use lectern::request::RequestSpec;
//! use lectern::tag::Tag;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     EndpointDescriptor::query("course.getCourses", |_args| {
//!         Ok(RequestSpec::get("/course/"))
//!     })
//!     .provides(|_result, _args| vec![Tag::of("Courses")]),
//! )?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;
use crate::request::RequestSpec;
use crate::tag::Tag;

/// Whether an endpoint reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// A cacheable read. Provides tags, never invalidates them.
    Query,
    /// A write. Invalidates tags, never provides them.
    Mutation,
}

impl EndpointKind {
    /// Returns `true` if this is a query.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query)
    }

    /// Returns `true` if this is a mutation.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation)
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
        }
    }
}

/// A transformed response, tagged with whether the endpoint's fallback shape
/// was substituted for a malformed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// The payload had the expected shape.
    Valid(Value),
    /// The payload was malformed and the endpoint's declared default was
    /// substituted. Logged by the cache engine when stored.
    Defaulted(Value),
}

impl Shaped {
    /// Returns `true` if the fallback shape was substituted.
    #[must_use]
    pub const fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted(_))
    }

    /// Borrows the shaped value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Valid(value) | Self::Defaulted(value) => value,
        }
    }

    /// Unwraps the shaped value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Valid(value) | Self::Defaulted(value) => value,
        }
    }
}

type RequestFn = Arc<dyn Fn(&Value) -> Result<RequestSpec, ApiError> + Send + Sync>;
type TransformFn = Arc<dyn Fn(Value) -> Result<Shaped, ApiError> + Send + Sync>;
type ProvidesFn = Arc<dyn Fn(&Value, &Value) -> Vec<Tag> + Send + Sync>;
type InvalidatesFn = Arc<dyn Fn(&Value) -> Vec<Tag> + Send + Sync>;

/// An immutable description of one remote operation.
#[derive(Clone)]
pub struct EndpointDescriptor {
    name: String,
    kind: EndpointKind,
    request: RequestFn,
    transform: Option<TransformFn>,
    provides: Option<ProvidesFn>,
    invalidates: Option<InvalidatesFn>,
}

impl EndpointDescriptor {
    /// Declares a query endpoint.
    #[must_use]
    pub fn query(
        name: impl Into<String>,
        request: impl Fn(&Value) -> Result<RequestSpec, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, EndpointKind::Query, request)
    }

    /// Declares a mutation endpoint.
    #[must_use]
    pub fn mutation(
        name: impl Into<String>,
        request: impl Fn(&Value) -> Result<RequestSpec, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, EndpointKind::Mutation, request)
    }

    fn new(
        name: impl Into<String>,
        kind: EndpointKind,
        request: impl Fn(&Value) -> Result<RequestSpec, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            request: Arc::new(request),
            transform: None,
            provides: None,
            invalidates: None,
        }
    }

    /// Sets the response transform, run once before the result is stored.
    ///
    /// Returning an error converts the exchange into an error result, never
    /// the reverse. Returning [`Shaped::Defaulted`] substitutes the
    /// endpoint's fallback shape and is logged when stored.
    #[must_use]
    pub fn transform(
        mut self,
        transform: impl Fn(Value) -> Result<Shaped, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Declares the tags a query provides, derived from the settled result
    /// and the call arguments. Until an exchange settles the result is
    /// `Value::Null`, so argument-derived tags hold from the first fetch and
    /// result-derived tags (per-item ids, say) join once data arrives.
    /// Required for queries; an empty list is a valid result.
    #[must_use]
    pub fn provides(
        mut self,
        provides: impl Fn(&Value, &Value) -> Vec<Tag> + Send + Sync + 'static,
    ) -> Self {
        self.provides = Some(Arc::new(provides));
        self
    }

    /// Declares the tags a successful mutation invalidates, derived from the
    /// call arguments. Required for mutations; an empty list is a valid
    /// result.
    #[must_use]
    pub fn invalidates(
        mut self,
        invalidates: impl Fn(&Value) -> Vec<Tag> + Send + Sync + 'static,
    ) -> Self {
        self.invalidates = Some(Arc::new(invalidates));
        self
    }

    /// The qualified endpoint name, e.g. `course.getCourses`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this endpoint is a query or a mutation.
    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Builds the request for the given arguments.
    pub fn build_request(&self, args: &Value) -> Result<RequestSpec, ApiError> {
        (self.request)(args)
    }

    /// Shapes a raw success payload. Without a declared transform the
    /// payload passes through as [`Shaped::Valid`].
    pub fn shape_response(&self, raw: Value) -> Result<Shaped, ApiError> {
        match &self.transform {
            Some(transform) => transform(raw),
            None => Ok(Shaped::Valid(raw)),
        }
    }

    /// The tags provided for the given result and arguments. Empty for
    /// mutations.
    #[must_use]
    pub fn provided_tags(&self, result: &Value, args: &Value) -> Vec<Tag> {
        self.provides
            .as_ref()
            .map_or_else(Vec::new, |f| f(result, args))
    }

    /// The tags invalidated for the given arguments. Empty for queries.
    #[must_use]
    pub fn invalidated_tags(&self, args: &Value) -> Vec<Tag> {
        self.invalidates.as_ref().map_or_else(Vec::new, |f| f(args))
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_transform", &self.transform.is_some())
            .field("has_provides", &self.provides.is_some())
            .field("has_invalidates", &self.invalidates.is_some())
            .finish()
    }
}

/// Endpoint declaration and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("endpoint `{0}` is already registered")]
    Duplicate(String),

    #[error("query endpoint `{0}` must declare provided tags (an empty list is fine)")]
    MissingProvides(String),

    #[error("mutation endpoint `{0}` must declare invalidated tags (an empty list is fine)")]
    MissingInvalidates(String),

    #[error("query endpoint `{0}` must not declare invalidated tags")]
    QueryInvalidates(String),

    #[error("mutation endpoint `{0}` must not declare provided tags")]
    MutationProvides(String),

    #[error("no endpoint named `{0}` is registered")]
    Unknown(String),

    #[error("endpoint `{name}` is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: EndpointKind,
        actual: EndpointKind,
    },
}

/// A validated, immutable-after-construction set of endpoint descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: HashMap<String, Arc<EndpointDescriptor>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, validating its declarations.
    pub fn register(&mut self, descriptor: EndpointDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name.clone();
        if self.endpoints.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        match descriptor.kind {
            EndpointKind::Query => {
                if descriptor.provides.is_none() {
                    return Err(RegistryError::MissingProvides(name));
                }
                if descriptor.invalidates.is_some() {
                    return Err(RegistryError::QueryInvalidates(name));
                }
            }
            EndpointKind::Mutation => {
                if descriptor.invalidates.is_none() {
                    return Err(RegistryError::MissingInvalidates(name));
                }
                if descriptor.provides.is_some() {
                    return Err(RegistryError::MutationProvides(name));
                }
            }
        }
        self.endpoints.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Looks up an endpoint by qualified name.
    pub fn get(&self, name: &str) -> Result<&Arc<EndpointDescriptor>, RegistryError> {
        self.endpoints
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    /// Looks up a query endpoint, rejecting mutations.
    pub fn get_query(&self, name: &str) -> Result<&Arc<EndpointDescriptor>, RegistryError> {
        self.get_kind(name, EndpointKind::Query)
    }

    /// Looks up a mutation endpoint, rejecting queries.
    pub fn get_mutation(&self, name: &str) -> Result<&Arc<EndpointDescriptor>, RegistryError> {
        self.get_kind(name, EndpointKind::Mutation)
    }

    fn get_kind(
        &self,
        name: &str,
        expected: EndpointKind,
    ) -> Result<&Arc<EndpointDescriptor>, RegistryError> {
        let descriptor = self.get(name)?;
        if descriptor.kind != expected {
            return Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected,
                actual: descriptor.kind,
            });
        }
        Ok(descriptor)
    }

    /// The number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no endpoints are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
