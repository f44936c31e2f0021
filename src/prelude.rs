//! Prelude module for convenient imports.
//!
//! ```
//! use lectern::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Api`] and [`build`] - The wired course-authoring client
//! - [`SyncClient`] / [`QuerySubscription`] - The cache engine
//! - [`SyncConfig`] - Caching and fetching configuration
//! - [`Registry`] / [`EndpointDescriptor`] - Endpoint declarations
//! - [`Tag`] - Cache invalidation tags
//! - [`AuthStore`] - Session state
//! - [`LectureDraft`] - The lecture/test editing model

pub use crate::api::{Api, build};
pub use crate::auth::{AuthSnapshot, AuthStore, FileTokenStore, MemoryTokenStore, TokenStore};
pub use crate::authoring::{AnswerType, LectureDraft, Question};
pub use crate::cache::{CacheKey, CacheStatus, QuerySnapshot, SyncConfig};
pub use crate::client::{QuerySubscription, SyncClient};
pub use crate::endpoint::{EndpointDescriptor, EndpointKind, Registry, Shaped};
pub use crate::error::ApiError;
pub use crate::hooks::Settled;
pub use crate::tag::Tag;
