//! Error and response types shared by the `message-api` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
