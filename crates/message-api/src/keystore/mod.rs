//! Credential loading: opens the sealed client-identity and trust stores.
//!
//! A store is a [`sealed`] blob whose plaintext is a PEM bundle. Opening it
//! yields a [`KeyStore`]: the certificates in file order plus at most one
//! private key. Loading is all-or-nothing; on any error no store is returned
//! and the decrypted plaintext is zeroed before the error propagates.
//!
//! # Security invariants
//!
//! - Passphrases and private key bytes never appear in `Debug` output or logs.
//! - The decrypted PEM text lives only in a [`Zeroizing`] buffer.

pub mod sealed;

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::Item;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use sealed::{SealError, SealedStore};

/// Errors produced while loading a key store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The store file does not exist.
    #[error("key store {} not found", .path.display())]
    Missing { path: PathBuf },

    /// The store file exists but could not be read.
    #[error("key store {} unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The blob or its decrypted PEM payload is structurally invalid.
    #[error("key store is malformed: {0}")]
    Malformed(String),

    /// The passphrase does not open the store.
    #[error("wrong passphrase for key store")]
    WrongPassphrase,
}

impl From<SealError> for CredentialError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::AuthenticationFailed => CredentialError::WrongPassphrase,
            other => CredentialError::Malformed(other.to_string()),
        }
    }
}

/// Secret passphrase for a sealed store.
///
/// Deserialises from a plain string. The backing memory is zeroed on drop.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw passphrase bytes for key derivation.
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Decrypted contents of a key store: certificates and an optional private key.
pub struct KeyStore {
    certificates: Vec<CertificateDer<'static>>,
    private_key: Option<PrivateKeyDer<'static>>,
}

impl KeyStore {
    /// Read the sealed store at `path` and open it with `passphrase`.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Missing`] / [`CredentialError::Unreadable`] on I/O failure.
    /// - [`CredentialError::WrongPassphrase`] if authentication fails.
    /// - [`CredentialError::Malformed`] if the blob or PEM payload is invalid.
    pub fn load(path: &Path, passphrase: &Passphrase) -> Result<Self, CredentialError> {
        let blob = std::fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CredentialError::Missing {
                path: path.to_path_buf(),
            },
            _ => CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let store = Self::from_sealed(&blob, passphrase)?;
        debug!(
            path = %path.display(),
            certificates = store.certificates.len(),
            has_private_key = store.private_key.is_some(),
            "key store loaded"
        );
        Ok(store)
    }

    /// Open an in-memory sealed blob.
    ///
    /// # Errors
    ///
    /// Same as [`KeyStore::load`], minus the I/O variants.
    pub fn from_sealed(blob: &[u8], passphrase: &Passphrase) -> Result<Self, CredentialError> {
        let sealed = SealedStore::parse(blob)?;
        let plaintext: Zeroizing<Vec<u8>> = sealed.open(passphrase.expose())?;
        Self::from_pem(&plaintext)
    }

    /// Parse a PEM bundle of certificates and at most one private key.
    ///
    /// Sections other than certificates and private keys are ignored. A
    /// non-blank payload with no PEM sections at all is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Malformed`] on invalid PEM, more than one
    /// private key, or a non-blank payload without PEM sections.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CredentialError> {
        let mut certificates = Vec::new();
        let mut private_key: Option<PrivateKeyDer<'static>> = None;
        let mut sections = 0usize;

        for item in rustls_pemfile::read_all(&mut BufReader::new(pem)) {
            let item = item.map_err(|e| CredentialError::Malformed(format!("invalid PEM: {e}")))?;
            sections += 1;
            let key: PrivateKeyDer<'static> = match item {
                Item::X509Certificate(cert) => {
                    certificates.push(cert);
                    continue;
                }
                Item::Pkcs8Key(key) => key.into(),
                Item::Pkcs1Key(key) => key.into(),
                Item::Sec1Key(key) => key.into(),
                _ => continue,
            };
            if private_key.replace(key).is_some() {
                return Err(CredentialError::Malformed(
                    "more than one private key in store".into(),
                ));
            }
        }

        if sections == 0 && !pem.iter().all(u8::is_ascii_whitespace) {
            return Err(CredentialError::Malformed("no PEM sections found".into()));
        }

        Ok(Self {
            certificates,
            private_key,
        })
    }

    /// Certificates in the order they appear in the store.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.private_key.as_ref()
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("certificates", &self.certificates.len())
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
