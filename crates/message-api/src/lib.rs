//! `message-api` — writes a fixed message to MongoDB over mutual TLS.
//!
//! Startup is a linear pipeline, each stage consuming the previous one:
//!
//! 1. [`keystore`] opens the sealed identity and trust stores.
//! 2. [`tls`] validates the material and builds the client TLS context.
//! 3. [`db`] configures the shared MongoDB client with that context.
//! 4. [`server`] serves `GET /api`, one insert per request.

pub mod config;
pub mod db;
pub mod keystore;
pub mod server;
pub mod telemetry;
pub mod tls;

#[cfg(test)]
mod testutil;
