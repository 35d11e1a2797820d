//! Mutual-TLS client context built from the identity and trust stores.
//!
//! Construction validates the material in a fixed order (key material, then
//! trust material, then the rustls context itself) so that a given bad input
//! always produces the same error. The result is immutable and cheap to clone.

use std::sync::Arc;

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::keystore::KeyStore;

/// Errors produced while assembling a [`TlsContext`].
#[derive(Debug, Error)]
pub enum TlsContextError {
    /// The identity store has no usable private key or certificate chain.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// The trust store yields no usable trust anchor.
    #[error("trust material error: {0}")]
    TrustMaterial(String),

    /// rustls rejected the configuration or no secure random source exists.
    #[error("TLS context initialisation failed: {0}")]
    ContextInit(String),
}

/// Validated mutual-TLS client context.
///
/// Holds the rustls [`ClientConfig`] plus PEM renderings of the same material
/// for consumers that take certificate files rather than a config object.
#[derive(Clone)]
pub struct TlsContext {
    inner: Arc<Inner>,
}

struct Inner {
    config: Arc<ClientConfig>,
    trust_pem: String,
    identity_pem: Zeroizing<String>,
    anchors: usize,
}

impl TlsContext {
    /// Build a client context from a decrypted identity store and trust store.
    ///
    /// # Errors
    ///
    /// - [`TlsContextError::KeyMaterial`] if `identity` holds no private key,
    ///   no certificate, or a key the crypto provider cannot load.
    /// - [`TlsContextError::TrustMaterial`] if `trust` yields no trust anchor.
    /// - [`TlsContextError::ContextInit`] if randomness is unavailable or
    ///   rustls rejects the final configuration.
    pub fn build(identity: &KeyStore, trust: &KeyStore) -> Result<Self, TlsContextError> {
        let provider = Arc::new(ring::default_provider());

        // (a) key material
        let key = identity.private_key().ok_or_else(|| {
            TlsContextError::KeyMaterial("identity store holds no private key".into())
        })?;
        if identity.certificates().is_empty() {
            return Err(TlsContextError::KeyMaterial(
                "identity store holds no certificate chain".into(),
            ));
        }
        provider
            .key_provider
            .load_private_key(key.clone_key())
            .map_err(|e| TlsContextError::KeyMaterial(format!("unusable private key: {e}")))?;
        let key_tag = pem_tag(key)?;

        // (b) trust material
        let mut roots = RootCertStore::empty();
        let (anchors, rejected) =
            roots.add_parsable_certificates(trust.certificates().iter().cloned());
        if anchors == 0 {
            return Err(TlsContextError::TrustMaterial(format!(
                "trust store yields no usable anchors ({rejected} rejected)"
            )));
        }

        // (c) context
        let config = build_client_config(provider, roots, identity.certificates(), key)?;

        let trust_pem = encode_certificates(trust.certificates());
        let mut identity_pem = Zeroizing::new(encode_certificates(identity.certificates()));
        identity_pem.push_str(&pem::encode(&pem::Pem::new(key_tag, key.secret_der().to_vec())));

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                trust_pem,
                identity_pem,
                anchors,
            }),
        })
    }

    /// The rustls client configuration presenting the identity and trusting
    /// only the trust-store anchors.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.inner.config)
    }

    /// Trust anchors as a PEM bundle.
    pub fn trust_pem(&self) -> &str {
        &self.inner.trust_pem
    }

    /// Client certificate chain followed by the private key, as PEM.
    pub fn identity_pem(&self) -> &str {
        &self.inner.identity_pem
    }

    /// Number of trust anchors accepted from the trust store.
    pub fn anchor_count(&self) -> usize {
        self.inner.anchors
    }
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext")
            .field("anchors", &self.inner.anchors)
            .field("identity", &"[REDACTED]")
            .finish()
    }
}

fn build_client_config(
    provider: Arc<CryptoProvider>,
    roots: RootCertStore,
    chain: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> Result<Arc<ClientConfig>, TlsContextError> {
    let mut probe = [0u8; 32];
    provider
        .secure_random
        .fill(&mut probe)
        .map_err(|_| TlsContextError::ContextInit("secure random source unavailable".into()))?;

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsContextError::ContextInit(e.to_string()))?
        .with_root_certificates(roots)
        .with_client_auth_cert(chain.to_vec(), key.clone_key())
        .map_err(|e| TlsContextError::ContextInit(e.to_string()))?;

    Ok(Arc::new(config))
}

fn pem_tag(key: &PrivateKeyDer<'_>) -> Result<&'static str, TlsContextError> {
    match key {
        PrivateKeyDer::Pkcs8(_) => Ok("PRIVATE KEY"),
        PrivateKeyDer::Pkcs1(_) => Ok("RSA PRIVATE KEY"),
        PrivateKeyDer::Sec1(_) => Ok("EC PRIVATE KEY"),
        _ => Err(TlsContextError::KeyMaterial("unsupported private key encoding".into())),
    }
}

fn encode_certificates(certs: &[CertificateDer<'_>]) -> String {
    let blocks: Vec<pem::Pem> = certs
        .iter()
        .map(|c| pem::Pem::new("CERTIFICATE", c.as_ref().to_vec()))
        .collect();
    pem::encode_many(&blocks)
}
