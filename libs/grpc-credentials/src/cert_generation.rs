//! Certificate generation for development and testing
//!
//! Generates a self-signed CA plus CA-signed server and client certificates.
//! **WARNING**: never use these in production; deploy CA-issued certificates.

use anyhow::{Context, Result};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, Issuer, KeyPair,
    SanType,
};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use tracing::info;

/// PEM bundle of development certificates.
#[derive(Clone)]
pub struct CertificateBundle {
    /// CA certificate
    pub ca_cert: String,
    /// CA private key
    pub ca_key: String,
    /// Server certificate signed by the CA
    pub server_cert: String,
    /// Server private key
    pub server_key: String,
    /// Client certificate for mTLS
    pub client_cert: String,
    /// Client private key
    pub client_key: String,
}

fn named_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
        .distinguished_name
        .push(DnType::OrganizationName, "App Server Development");
    params
}

fn issue_leaf(
    mut params: CertificateParams,
    issuer: &Issuer<'_, &KeyPair>,
    sans: &[SanType],
) -> Result<(String, String)> {
    params.subject_alt_names.extend_from_slice(sans);

    let keypair = KeyPair::generate()?;
    let cert = params
        .signed_by(&keypair, issuer)
        .context("failed to sign leaf certificate")?;

    Ok((cert.pem(), keypair.serialize_pem()))
}

/// Generate a development bundle (CA, server, client).
///
/// The server certificate carries `localhost` and `127.0.0.1` SANs so it
/// validates for loopback listeners.
pub fn generate_dev_certificates() -> Result<CertificateBundle> {
    let mut ca_params = named_params("App Server Development CA");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

    let ca_keypair = KeyPair::generate()?;
    let ca_cert = ca_params
        .clone()
        .self_signed(&ca_keypair)
        .context("failed to generate CA certificate")?;
    let issuer = Issuer::new(ca_params, &ca_keypair);

    let server_sans = [
        SanType::DnsName(
            "localhost"
                .try_into()
                .context("failed to create SAN for localhost")?,
        ),
        SanType::IpAddress(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
    ];
    let (server_cert, server_key) =
        issue_leaf(named_params("localhost"), &issuer, &server_sans)?;

    let (client_cert, client_key) = issue_leaf(named_params("client"), &issuer, &[])?;

    info!("generated development certificates (CA, server, client)");

    Ok(CertificateBundle {
        ca_cert: ca_cert.pem(),
        ca_key: ca_keypair.serialize_pem(),
        server_cert,
        server_key,
        client_cert,
        client_key,
    })
}

/// Write a bundle to disk as `ca.crt`, `ca.key`, `server.crt`, `server.key`,
/// `client.crt` and `client.key` under `output_dir`.
pub fn write_cert_bundle(bundle: &CertificateBundle, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create directory: {output_dir:?}"))?;

    let files = [
        ("ca.crt", &bundle.ca_cert),
        ("ca.key", &bundle.ca_key),
        ("server.crt", &bundle.server_cert),
        ("server.key", &bundle.server_key),
        ("client.crt", &bundle.client_cert),
        ("client.key", &bundle.client_key),
    ];

    for (name, pem) in files {
        fs::write(output_dir.join(name), pem)
            .with_context(|| format!("failed to write {name}"))?;
    }

    info!(output_dir = ?output_dir, "certificate bundle written to disk");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generates_complete_pem_bundle() {
        let bundle = generate_dev_certificates().unwrap();

        assert!(bundle.ca_cert.contains("BEGIN CERTIFICATE"));
        assert!(bundle.server_cert.contains("BEGIN CERTIFICATE"));
        assert!(bundle.client_cert.contains("BEGIN CERTIFICATE"));
        assert!(bundle.ca_key.contains("PRIVATE KEY"));
        assert!(bundle.server_key.contains("PRIVATE KEY"));
        assert!(bundle.client_key.contains("PRIVATE KEY"));
    }

    #[test]
    fn writes_bundle_files() {
        let bundle = generate_dev_certificates().unwrap();
        let dir = TempDir::new().unwrap();

        write_cert_bundle(&bundle, dir.path()).unwrap();

        for name in ["ca.crt", "ca.key", "server.crt", "server.key", "client.crt", "client.key"] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }
    }
}
