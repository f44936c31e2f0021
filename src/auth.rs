//! Session state, durable token storage, and header injection.
//!
//! Auth state is a side effect of the sync layer, not something callers
//! mutate directly: the login, logout, and profile hooks registered by
//! [`crate::api`] drive [`AuthStore`] transitions, and the fetcher reads the
//! persisted token back on every outgoing request.
//!
//! # Features
//!
//! - **State**: [`AuthStore`] with immutable [`AuthSnapshot`] reads
//! - **Storage**: [`TokenStore`] with file-backed and in-memory implementations
//! - **Extraction**: [`CredentialSource`] strategies for payload and cookie tokens
//! - **Injection**: idempotent `Authorization: Bearer` attachment
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lectern::auth::{AuthStore, FileTokenStore};
//!
//! let storage = Arc::new(FileTokenStore::new("/var/lib/lectern/token.json"));
//! let auth = Arc::new(AuthStore::new(storage));
//! assert!(!auth.is_authenticated());
//! ```

mod extract;
mod header;
mod storage;
mod store;

// Re-export main types
pub use extract::{CookieCredential, CredentialSource, PayloadCredential, first_credential};
pub use header::attach_bearer;
pub use storage::{FileTokenStore, MemoryTokenStore, StorageError, TokenStore};
pub use store::{AuthSnapshot, AuthStore, UserRecord};
