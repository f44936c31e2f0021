//! # Lectern - Data Synchronization for Course Authoring
//!
//! Lectern is the data layer of an administrative client for authoring
//! online courses, lectures, and embedded tests. It sits between a UI and a
//! REST-style API and keeps the two consistent: a request cache keyed by
//! endpoint and arguments, tag-based invalidation, deduplication of
//! in-flight requests, and auth state driven by endpoint side effects.
//!
//! ## Architecture
//!
//! 1. **Endpoint registry**: every remote operation declared once, with its
//!    request builder, response transform, and cache tags
//! 2. **Query/mutation cache**: subscriptions, in-flight dedup, staleness,
//!    and invalidation fan-out
//! 3. **Fetch executor**: one normalized HTTP exchange, with cookie replay
//!    and bearer injection from durable storage
//! 4. **Side-effect dispatcher**: per-endpoint completion hooks
//! 5. **Auth store**: process-wide session state with a durable token
//!
//! ## Core Components
//!
//! - [`api::build`]: wires the full stack for the course-authoring API
//! - [`SyncClient`](client::SyncClient): the cache engine
//! - [`Registry`](endpoint::Registry): validated endpoint declarations
//! - [`LectureDraft`](authoring::LectureDraft): the lecture/test editing model
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lectern::api;
//! use lectern::auth::FileTokenStore;
//! use lectern::cache::SyncConfig;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileTokenStore::new("/tmp/lectern-token.json"));
//! let api = api::build(SyncConfig::default(), storage)?;
//!
//! api.client
//!     .mutate(api::auth::LOGIN, json!({"email": "a@b.c", "password": "secret"}))
//!     .await?;
//!
//! let mut courses = api.client.query(api::course::GET_COURSES, json!(null))?;
//! let snapshot = courses.settled().await;
//! println!("{:?}", snapshot.data);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod authoring;
pub mod cache;
pub mod client;
pub mod cookie;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod prelude;
pub mod request;
pub mod tag;
