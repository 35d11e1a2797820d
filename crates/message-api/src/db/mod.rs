//! MongoDB access: the client factory, the message record, and the store.
//!
//! # Lifecycle
//!
//! 1. [`DatabaseHandle::connect`] runs once at startup with the validated
//!    [`TlsContext`](crate::tls::TlsContext). It does not contact the server.
//! 2. The handle is wrapped in a [`MongoMessageStore`] and shared with every
//!    request handler through [`AppState`](crate::server::state::AppState).
//! 3. [`DatabaseHandle::shutdown`] runs after the HTTP server has drained.

pub mod factory;
pub mod message;
pub mod store;

pub use factory::{ConnectionConfigError, DatabaseHandle, SERVER_SELECTION_TIMEOUT};
pub use message::{Message, DEFAULT_COLLECTION, MESSAGE_TEXT};
pub use store::{MessageStore, MongoMessageStore, PersistError};
