//! Configuration loading and validation for the message service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::db::DEFAULT_COLLECTION;
use crate::keystore::Passphrase;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// MongoDB connection string (host, port, auth options). **Required.**
    pub mongodb_uri: String,

    /// Database that messages are written to. **Required.**
    pub mongodb_database: String,

    /// Collection that messages are written to.
    #[serde(default = "default_collection")]
    pub mongodb_collection: String,

    /// Path to the sealed client identity store.
    #[serde(default = "default_keystore_path")]
    pub keystore_path: PathBuf,

    /// Passphrase for the client identity store. **Required.**
    pub keystore_passphrase: Passphrase,

    /// Path to the sealed trust store.
    #[serde(default = "default_truststore_path")]
    pub truststore_path: PathBuf,

    /// Passphrase for the trust store. **Required.**
    pub truststore_passphrase: Passphrase,

    /// Port the HTTP server listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.into()
}
fn default_keystore_path() -> PathBuf {
    "ssl/client-cert.store".into()
}
fn default_truststore_path() -> PathBuf {
    "ssl/truststore.store".into()
}
fn default_http_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.mongodb_uri, "MONGODB_URI")?;
        ensure_non_empty(&self.mongodb_database, "MONGODB_DATABASE")?;
        ensure_non_empty(&self.mongodb_collection, "MONGODB_COLLECTION")?;

        if self.keystore_passphrase.is_empty() {
            anyhow::bail!("KEYSTORE_PASSPHRASE is required and must not be empty");
        }
        if self.truststore_passphrase.is_empty() {
            anyhow::bail!("TRUSTSTORE_PASSPHRASE is required and must not be empty");
        }
        if self.http_port == 0 {
            anyhow::bail!("HTTP_PORT must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
