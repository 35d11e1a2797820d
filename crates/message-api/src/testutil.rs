//! Fixture material shared by unit tests.
//!
//! `testdata/` holds a throwaway P-256 issuing CA and a client certificate
//! signed by it, with the client key in unencrypted PKCS#8.

use std::io::BufReader;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::keystore::sealed::{seal_with_rounds, MIN_ROUNDS};
use crate::keystore::KeyStore;
use crate::tls::TlsContext;

pub const CA_PEM: &[u8] = include_bytes!("../testdata/ca.pem");
pub const CLIENT_CERT_PEM: &[u8] = include_bytes!("../testdata/client.pem");
pub const CLIENT_KEY_PEM: &[u8] = include_bytes!("../testdata/client.key");

/// Client certificate followed by its private key.
pub fn identity_pem() -> Vec<u8> {
    let mut pem = CLIENT_CERT_PEM.to_vec();
    pem.extend_from_slice(CLIENT_KEY_PEM);
    pem
}

pub fn client_cert_der() -> rustls::pki_types::CertificateDer<'static> {
    rustls_pemfile::certs(&mut BufReader::new(CLIENT_CERT_PEM))
        .next()
        .expect("fixture certificate")
        .expect("valid fixture certificate")
}

pub fn client_key_der() -> Vec<u8> {
    rustls_pemfile::private_key(&mut BufReader::new(CLIENT_KEY_PEM))
        .expect("valid fixture key")
        .expect("fixture key present")
        .secret_der()
        .to_vec()
}

/// Seal `plaintext` with the cheapest accepted KDF cost.
pub fn sealed(plaintext: &[u8], passphrase: &str) -> Vec<u8> {
    seal_with_rounds(plaintext, passphrase.as_bytes(), MIN_ROUNDS)
        .expect("seal fixture")
        .to_string_repr()
        .into_bytes()
}

pub fn write_sealed(dir: &TempDir, name: &str, plaintext: &[u8], passphrase: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, sealed(plaintext, passphrase)).expect("write sealed fixture");
    path
}

pub fn identity_store() -> KeyStore {
    KeyStore::from_pem(&identity_pem()).expect("identity fixture")
}

pub fn trust_store() -> KeyStore {
    KeyStore::from_pem(CA_PEM).expect("trust fixture")
}

pub fn tls_context() -> TlsContext {
    TlsContext::build(&identity_store(), &trust_store()).expect("tls context fixture")
}
