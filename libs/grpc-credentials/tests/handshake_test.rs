//! Handshake-level tests for the transport credential
//!
//! Drives a rustls client against the built server configuration over an
//! in-memory byte pipe, without a network listener, to verify that the
//! client-certificate policy is enforced at the handshake.

use grpc_credentials::{
    build_transport_credential, crypto_provider, generate_dev_certificates, write_cert_bundle,
    CertificateMaterial, TlsPolicy,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, ServerConnection};
use std::sync::Arc;
use tempfile::TempDir;

struct TestEnv {
    _dir: TempDir,
    material: CertificateMaterial,
    ca_cert: String,
    client_cert: String,
    client_key: String,
}

fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let bundle = generate_dev_certificates().unwrap();
    write_cert_bundle(&bundle, dir.path()).unwrap();

    let material = CertificateMaterial {
        certificate: dir.path().join("server.crt"),
        private_key: dir.path().join("server.key"),
        ca_bundle: dir.path().join("ca.crt"),
    };

    TestEnv {
        _dir: dir,
        material,
        ca_cert: bundle.ca_cert,
        client_cert: bundle.client_cert,
        client_key: bundle.client_key,
    }
}

fn trust_roots(ca_pem: &str) -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let mut reader = ca_pem.as_bytes();
    let certs = rustls_pemfile::certs(&mut reader).filter_map(|c| c.ok());
    roots.add_parsable_certificates(certs);
    roots
}

fn client_without_certificate(ca_pem: &str) -> Arc<ClientConfig> {
    Arc::new(
        ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(trust_roots(ca_pem))
            .with_no_client_auth(),
    )
}

fn client_with_certificate(ca_pem: &str, cert_pem: &str, key_pem: &str) -> Arc<ClientConfig> {
    let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<_, _>>()
        .unwrap();
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .unwrap()
        .unwrap();

    Arc::new(
        ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(trust_roots(ca_pem))
            .with_client_auth_cert(chain, key)
            .unwrap(),
    )
}

/// Shuttle handshake records between the two connections until both sides
/// finish or either side rejects the peer.
fn run_handshake(
    client: &mut ClientConnection,
    server: &mut ServerConnection,
) -> Result<(), rustls::Error> {
    while client.is_handshaking() || server.is_handshaking() {
        let mut progressed = false;

        while client.wants_write() {
            let mut wire = Vec::new();
            client.write_tls(&mut wire).unwrap();
            let mut rd = &wire[..];
            while !rd.is_empty() {
                server.read_tls(&mut rd).unwrap();
            }
            server.process_new_packets()?;
            progressed = true;
        }

        while server.wants_write() {
            let mut wire = Vec::new();
            server.write_tls(&mut wire).unwrap();
            let mut rd = &wire[..];
            while !rd.is_empty() {
                client.read_tls(&mut rd).unwrap();
            }
            client.process_new_packets()?;
            progressed = true;
        }

        if !progressed {
            break;
        }
    }

    Ok(())
}

fn connect(
    client_config: Arc<ClientConfig>,
    server_config: Arc<rustls::ServerConfig>,
) -> Result<(), rustls::Error> {
    let server_name = ServerName::try_from("localhost").unwrap();
    let mut client = ClientConnection::new(client_config, server_name).unwrap();
    let mut server = ServerConnection::new(server_config).unwrap();

    run_handshake(&mut client, &mut server)
}

#[test]
fn mutual_tls_rejects_client_without_certificate() {
    let env = setup();
    let credential = build_transport_credential(
        &env.material,
        TlsPolicy {
            verify_client_certificate: true,
        },
    )
    .unwrap();

    let result = connect(
        client_without_certificate(&env.ca_cert),
        credential.rustls_config(),
    );
    assert!(result.is_err(), "handshake should fail without a client cert");
}

#[test]
fn mutual_tls_accepts_ca_signed_client() {
    let env = setup();
    let credential = build_transport_credential(
        &env.material,
        TlsPolicy {
            verify_client_certificate: true,
        },
    )
    .unwrap();

    let result = connect(
        client_with_certificate(&env.ca_cert, &env.client_cert, &env.client_key),
        credential.rustls_config(),
    );
    assert!(result.is_ok(), "CA-signed client should complete: {result:?}");
}

#[test]
fn one_way_tls_accepts_client_without_certificate() {
    let env = setup();
    let credential = build_transport_credential(&env.material, TlsPolicy::default()).unwrap();

    let result = connect(
        client_without_certificate(&env.ca_cert),
        credential.rustls_config(),
    );
    assert!(result.is_ok(), "one-way TLS should complete: {result:?}");
}
