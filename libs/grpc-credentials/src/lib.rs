//! Transport credentials for the gRPC API listener
//!
//! Loads an X.509 certificate/key pair and a CA bundle from disk and builds a
//! ready-to-use TLS credential for the server, optionally enforcing client
//! certificate verification (mTLS).
//!
//! The credential is built eagerly: all PEM material is read and parsed into
//! a complete `rustls::ServerConfig` before a [`TransportCredential`] exists,
//! so a partially loaded credential is unconstructible. Both failure stages
//! are fatal startup errors; there is no fallback to plaintext transport.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grpc_credentials::{build_transport_credential, CertificateMaterial, TlsPolicy};
//!
//! # fn example() -> Result<(), grpc_credentials::CredentialError> {
//! let material = CertificateMaterial {
//!     certificate: "/certs/server.crt".into(),
//!     private_key: "/certs/server.key".into(),
//!     ca_bundle: "/certs/ca.crt".into(),
//! };
//! let credential = build_transport_credential(
//!     &material,
//!     TlsPolicy { verify_client_certificate: true },
//! )?;
//!
//! // Hand credential.tonic_server_tls() to Server::builder().tls_config(..)
//! # Ok(())
//! # }
//! ```

pub mod cert_generation;
mod error;
mod provider;

pub use cert_generation::{generate_dev_certificates, write_cert_bundle, CertificateBundle};
pub use error::CredentialError;
pub use provider::{
    build_transport_credential, crypto_provider, CertificateMaterial, TlsPolicy,
    TransportCredential,
};
