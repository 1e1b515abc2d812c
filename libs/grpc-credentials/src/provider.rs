//! Transport credential construction from on-disk PEM material

use crate::error::CredentialError;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tonic::transport::{Certificate, Identity, ServerTlsConfig};
use tracing::{info, warn};

/// Filesystem locations of the PEM material for one listener.
///
/// Owned by the configuration layer and read-only here; paths are not
/// checked for existence beyond the load attempt itself.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    /// Server certificate (PEM, leaf first when a chain is supplied)
    pub certificate: PathBuf,
    /// Server private key (PEM)
    pub private_key: PathBuf,
    /// CA bundle (PEM, one or more concatenated certificates)
    pub ca_bundle: PathBuf,
}

/// Selects between one-way and mutual TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsPolicy {
    /// When true, connections without a CA-signed client certificate are
    /// rejected at the handshake.
    pub verify_client_certificate: bool,
}

/// A fully loaded server TLS credential.
///
/// Only constructible through [`build_transport_credential`], after the
/// key pair and trust pool have both been loaded successfully. Immutable
/// for the lifetime of the server.
#[derive(Clone)]
pub struct TransportCredential {
    server_config: Arc<ServerConfig>,
    cert_pem: String,
    key_pem: String,
    ca_pem: String,
    policy: TlsPolicy,
}

impl TransportCredential {
    /// The underlying rustls server configuration.
    pub fn rustls_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.server_config)
    }

    /// Tonic view of the credential, for `Server::builder().tls_config(..)`.
    pub fn tonic_server_tls(&self) -> ServerTlsConfig {
        let identity = Identity::from_pem(&self.cert_pem, &self.key_pem);
        let mut tls = ServerTlsConfig::new().identity(identity);

        if self.policy.verify_client_certificate {
            tls = tls.client_ca_root(Certificate::from_pem(&self.ca_pem));
        }

        tls
    }

    /// Whether this credential enforces mutual TLS.
    pub fn verifies_client_certificates(&self) -> bool {
        self.policy.verify_client_certificate
    }
}

impl fmt::Debug for TransportCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material is deliberately not printed.
        f.debug_struct("TransportCredential")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// The crypto provider backing every credential built by this crate.
///
/// Also installs it as the process default on first call: the dependency
/// graph carries two rustls providers (aws-lc-rs here, ring via tonic), so
/// consumers that rely on the implicit default, like tonic's own acceptor
/// config, would otherwise panic.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    static INSTALL_DEFAULT: Once = Once::new();
    INSTALL_DEFAULT.call_once(|| {
        let _ = aws_lc_rs::default_provider().install_default();
    });

    Arc::new(aws_lc_rs::default_provider())
}

/// Build the server transport credential from PEM files on disk.
///
/// Blocking file I/O; call once at startup before the listener is active.
/// Deterministic for identical inputs and filesystem state.
///
/// ## Errors
///
/// - [`CredentialError::Keypair`]: certificate or private key unreadable,
///   or not parseable as PEM material.
/// - [`CredentialError::CaBundle`]: CA bundle unreadable, or (mutual TLS
///   only) no usable trust anchors in the bundle.
pub fn build_transport_credential(
    material: &CertificateMaterial,
    policy: TlsPolicy,
) -> Result<TransportCredential, CredentialError> {
    let cert_pem =
        fs::read_to_string(&material.certificate).map_err(CredentialError::keypair)?;
    let key_pem = fs::read_to_string(&material.private_key).map_err(CredentialError::keypair)?;

    let cert_chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<_, _>>()
        .map_err(CredentialError::keypair)?;
    if cert_chain.is_empty() {
        return Err(CredentialError::keypair(format!(
            "no certificate found in {}",
            material.certificate.display()
        )));
    }

    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(CredentialError::keypair)?
        .ok_or_else(|| {
            CredentialError::keypair(format!(
                "no private key found in {}",
                material.private_key.display()
            ))
        })?;

    let ca_pem = fs::read_to_string(&material.ca_bundle).map_err(CredentialError::ca_bundle)?;

    let mut roots = RootCertStore::empty();
    // The cursor must outlive the lazy certificate iterator.
    let mut ca_reader = ca_pem.as_bytes();
    let ca_certs = rustls_pemfile::certs(&mut ca_reader).filter_map(|cert| cert.ok());
    let (added, skipped) = roots.add_parsable_certificates(ca_certs);
    if skipped > 0 {
        warn!(
            ca_bundle = %material.ca_bundle.display(),
            skipped,
            "skipped unparsable entries in CA bundle"
        );
    }

    // Explicit provider: the dependency graph carries more than one rustls
    // crypto provider, so the implicit process default is not available.
    let provider = crypto_provider();

    let server_config = if policy.verify_client_certificate {
        // The verifier refuses an empty trust pool, which is exactly the
        // invariant mutual TLS needs.
        let verifier = WebPkiClientVerifier::builder_with_provider(
            Arc::new(roots),
            Arc::clone(&provider),
        )
        .build()
        .map_err(CredentialError::ca_bundle)?;

        ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(CredentialError::keypair)?
            .with_client_cert_verifier(verifier)
            .with_single_cert(cert_chain, key)
            .map_err(CredentialError::keypair)?
    } else {
        ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(CredentialError::keypair)?
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .map_err(CredentialError::keypair)?
    };

    info!(
        certificate = %material.certificate.display(),
        ca_bundle = %material.ca_bundle.display(),
        trust_anchors = added,
        verify_client_certificate = policy.verify_client_certificate,
        "transport credential loaded"
    );

    Ok(TransportCredential {
        server_config: Arc::new(server_config),
        cert_pem,
        key_pem,
        ca_pem,
        policy,
    })
}
