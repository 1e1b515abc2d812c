//! Secure gRPC server assembly
//!
//! Glues the transport credential and the observability chain onto a tonic
//! server builder, starting from configuration values an external loader has
//! already resolved. No configuration parsing or schema validation happens
//! here; both credential stages are fatal and must abort startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let settings: ApiListenerSettings = load_from_somewhere()?;
//! let addr = settings.bind.parse()?;
//!
//! grpc_bootstrap::secure_server(&settings)?
//!     .add_service(device_service)
//!     .serve(addr)
//!     .await?;
//! ```

use grpc_credentials::{
    build_transport_credential, CertificateMaterial, CredentialError, TlsPolicy,
    TransportCredential,
};
use grpc_observability::ObservabilityLayer;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tonic::transport::Server;
use tower::layer::util::{Identity, Stack};
use tracing::info;

/// Resolved listener settings for the gRPC API.
///
/// Passive data: filled by an external configuration loader and consumed
/// read-only here. Field names follow the configuration keys (`ca_cert`,
/// `tls_cert`, `tls_key`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiListenerSettings {
    /// Listen address, e.g. `0.0.0.0:8001`
    pub bind: String,
    /// CA bundle path
    pub ca_cert: PathBuf,
    /// Server certificate path
    pub tls_cert: PathBuf,
    /// Server private key path
    pub tls_key: PathBuf,
    /// Enforce mutual TLS on this listener
    #[serde(default)]
    pub require_client_cert: bool,
}

/// Fatal startup errors from server assembly.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("transport credential: {0}")]
    Credential(#[from] CredentialError),

    #[error("tls configuration rejected by server: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Server builder with the observability chain attached.
pub type SecureServer = Server<Stack<ObservabilityLayer, Identity>>;

/// Build the transport credential for a listener.
pub fn transport_credential(
    settings: &ApiListenerSettings,
) -> Result<TransportCredential, CredentialError> {
    let material = CertificateMaterial {
        certificate: settings.tls_cert.clone(),
        private_key: settings.tls_key.clone(),
        ca_bundle: settings.ca_cert.clone(),
    };
    let policy = TlsPolicy {
        verify_client_certificate: settings.require_client_cert,
    };

    build_transport_credential(&material, policy)
}

/// The server-side interceptor chain (request tagging, then logging).
///
/// Pure assembly: cannot fail, and repeated calls produce equivalent chains.
pub fn server_options() -> ObservabilityLayer {
    ObservabilityLayer::new()
}

/// Assemble a TLS-terminating server builder with the interceptor chain
/// attached, ready for `add_service`.
pub fn secure_server(settings: &ApiListenerSettings) -> Result<SecureServer, BootstrapError> {
    let credential = transport_credential(settings)?;

    let server = Server::builder()
        .tls_config(credential.tonic_server_tls())?
        .layer(server_options());

    info!(
        bind = %settings.bind,
        require_client_cert = settings.require_client_cert,
        "gRPC server assembled with TLS and observability chain"
    );

    Ok(server)
}
