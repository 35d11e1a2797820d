//! [`DatabaseHandle`]: the shared MongoDB client, configured for mutual TLS.
//!
//! The driver takes TLS material as file paths, so the factory stages the
//! [`TlsContext`] PEM renderings into a private temporary directory (mode
//! `0700` on Unix) that lives exactly as long as the handle and its clones.
//! This means the decrypted client private key touches disk. Both files are
//! created `0600` on Unix. The directory is removed on drop, but a process
//! killed by a signal or aborted by a panic leaves it behind in the system
//! temp directory.
//!
//! Server selection is bounded by [`SERVER_SELECTION_TIMEOUT`] unless the
//! descriptor sets `serverSelectionTimeoutMS` itself.
//!
//! Construction never touches the network for `mongodb://` descriptors:
//! a malformed descriptor is rejected by the connection-string parser, and
//! server reachability is only discovered on first use.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, ConnectionString, Tls, TlsOptions};
use mongodb::{Client, Collection, Database};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use crate::tls::TlsContext;

const APP_NAME: &str = "message-api";

/// Server selection timeout applied when the descriptor does not set one.
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced while configuring the database client.
#[derive(Debug, Error)]
pub enum ConnectionConfigError {
    /// The connection descriptor is not a valid MongoDB connection string.
    #[error("invalid connection descriptor: {0}")]
    InvalidUri(#[source] mongodb::error::Error),

    /// No database name was supplied.
    #[error("database name is required")]
    MissingDatabase,

    /// The TLS material could not be written for the driver.
    #[error("failed to stage TLS material: {0}")]
    Material(#[from] io::Error),

    /// The driver rejected the resolved client options.
    #[error("failed to create database client: {0}")]
    Client(#[source] mongodb::error::Error),
}

/// PEM files handed to the driver. Removed from disk on drop.
struct StagedMaterial {
    dir: TempDir,
    ca_file: PathBuf,
    cert_key_file: PathBuf,
}

impl StagedMaterial {
    fn write(tls: &TlsContext) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("message-api-tls-").tempdir()?;
        let ca_file = dir.path().join("ca.pem");
        let cert_key_file = dir.path().join("client.pem");
        write_private(&ca_file, tls.trust_pem().as_bytes())?;
        write_private(&cert_key_file, tls.identity_pem().as_bytes())?;
        Ok(Self {
            dir,
            ca_file,
            cert_key_file,
        })
    }
}

/// Create `path` readable by the owner only and write `contents` to it.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Long-lived database handle shared by all request handlers.
///
/// Cheap to clone: the driver client is internally reference counted and the
/// staged TLS material is behind an [`Arc`].
#[derive(Clone)]
pub struct DatabaseHandle {
    client: Client,
    database: Database,
    material: Arc<StagedMaterial>,
}

impl DatabaseHandle {
    /// Build a client for `descriptor` that negotiates every connection with
    /// `tls`, and select `database`.
    ///
    /// TLS is forced on regardless of the descriptor's `tls` option. The
    /// trust store replaces the default root set.
    ///
    /// # Errors
    ///
    /// - [`ConnectionConfigError::InvalidUri`] if the descriptor does not parse.
    /// - [`ConnectionConfigError::MissingDatabase`] if `database` is blank.
    /// - [`ConnectionConfigError::Material`] if the TLS files cannot be written.
    /// - [`ConnectionConfigError::Client`] if the driver rejects the options.
    pub async fn connect(
        descriptor: &str,
        database: &str,
        tls: TlsContext,
    ) -> Result<Self, ConnectionConfigError> {
        // Syntactic check first; this never performs I/O.
        ConnectionString::parse(descriptor).map_err(ConnectionConfigError::InvalidUri)?;

        if database.trim().is_empty() {
            return Err(ConnectionConfigError::MissingDatabase);
        }

        // `mongodb+srv://` descriptors resolve their SRV/TXT records here.
        let mut options = ClientOptions::parse(descriptor)
            .await
            .map_err(ConnectionConfigError::InvalidUri)?;

        let material = StagedMaterial::write(&tls)?;
        let mut tls_options = TlsOptions::default();
        tls_options.ca_file_path = Some(material.ca_file.clone());
        tls_options.cert_key_file_path = Some(material.cert_key_file.clone());
        options.tls = Some(Tls::Enabled(tls_options));
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_owned());
        }
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        }

        let hosts: Vec<String> = options.hosts.iter().map(ToString::to_string).collect();
        let client = Client::with_options(options).map_err(ConnectionConfigError::Client)?;
        let database = client.database(database);

        info!(
            ?hosts,
            database = database.name(),
            trust_anchors = tls.anchor_count(),
            "database client configured for mutual TLS"
        );
        debug!(material_dir = %material.dir.path().display(), "TLS material staged");

        Ok(Self {
            client,
            database,
            material: Arc::new(material),
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Untyped handle to `name` in the selected database.
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Run the `ping` command against the selected database.
    pub async fn ping(&self) -> mongodb::error::Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Paths of the staged CA bundle and client certificate/key file.
    pub fn tls_files(&self) -> (&Path, &Path) {
        (&self.material.ca_file, &self.material.cert_key_file)
    }

    /// Close all connections. The staged TLS material is removed once the
    /// last clone of this handle is dropped.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("database client shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    const UNREACHABLE: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

    #[tokio::test]
    async fn malformed_descriptors_are_rejected() {
        for descriptor in [
            "",
            "localhost:27017",
            "http://localhost:27017",
            "mongodb://localhost:notaport",
        ] {
            let err = DatabaseHandle::connect(descriptor, "demo", testutil::tls_context())
                .await
                .err()
                .unwrap_or_else(|| panic!("{descriptor:?} was accepted"));
            assert!(
                matches!(err, ConnectionConfigError::InvalidUri(_)),
                "{descriptor:?}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn blank_database_name_is_rejected() {
        let err = DatabaseHandle::connect(UNREACHABLE, "  ", testutil::tls_context())
            .await
            .err()
            .expect("blank database accepted");
        assert!(matches!(err, ConnectionConfigError::MissingDatabase));
    }

    #[tokio::test]
    async fn construction_does_not_require_a_reachable_server() {
        let handle = DatabaseHandle::connect(UNREACHABLE, "demo", testutil::tls_context())
            .await
            .expect("lazy client");
        assert_eq!(handle.database().name(), "demo");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn staged_material_matches_context_and_is_removed_on_drop() {
        let ctx = testutil::tls_context();
        let handle = DatabaseHandle::connect(UNREACHABLE, "demo", ctx.clone())
            .await
            .unwrap();

        let (ca, cert_key) = handle.tls_files();
        let (ca, cert_key) = (ca.to_path_buf(), cert_key.to_path_buf());
        assert_eq!(std::fs::read_to_string(&ca).unwrap(), ctx.trust_pem());
        assert_eq!(std::fs::read_to_string(&cert_key).unwrap(), ctx.identity_pem());

        handle.shutdown().await;
        assert!(!ca.exists());
        assert!(!cert_key.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn staged_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let handle = DatabaseHandle::connect(UNREACHABLE, "demo", testutil::tls_context())
            .await
            .unwrap();
        let (ca, cert_key) = handle.tls_files();
        for path in [ca, cert_key] {
            let mode = std::fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
        let dir_mode = std::fs::metadata(cert_key.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[tokio::test]
    async fn ping_fails_against_unreachable_server() {
        let handle = DatabaseHandle::connect(UNREACHABLE, "demo", testutil::tls_context())
            .await
            .unwrap();
        assert!(handle.ping().await.is_err());
    }
}
