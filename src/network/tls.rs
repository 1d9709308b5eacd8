//! Secure Channel
//!
//! Mutually authenticated TLS over blocking TCP streams.
//!
//! ## Trust Model
//! - One CA signs both the server and the client certificate
//! - The server requires a client certificate chaining to that CA
//! - The client verifies the server certificate against that CA and the
//!   configured server name
//!
//! ```text
//! Client                                    Server
//!   |-------- ClientHello ---------------->   |
//!   |<------- ServerHello, Certificate ---    |
//!   |<------- CertificateRequest ---------    |
//!   |-------- Certificate, Finished ------>   |
//!   |======== protocol lines ============>    |
//! ```

use std::fs;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    ClientConfig, ClientConnection, RootCertStore, ServerConfig, ServerConnection, StreamOwned,
};
use tracing::{debug, info};

use crate::config::TlsPaths;
use crate::error::{Result, TransferError};
use crate::protocol::Transport;

/// Server side of an established channel
pub type TlsServerStream = StreamOwned<ServerConnection, TcpStream>;

/// Client side of an established channel
pub type TlsClientStream = StreamOwned<ClientConnection, TcpStream>;

impl Transport for TlsServerStream {
    fn close(&mut self) -> io::Result<()> {
        self.conn.send_close_notify();
        while self.conn.wants_write() {
            self.conn.write_tls(&mut self.sock)?;
        }
        self.sock.shutdown(Shutdown::Both)
    }
}

impl Transport for TlsClientStream {
    fn close(&mut self) -> io::Result<()> {
        self.conn.send_close_notify();
        while self.conn.wants_write() {
            self.conn.write_tls(&mut self.sock)?;
        }
        self.sock.shutdown(Shutdown::Both)
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

// =============================================================================
// Server
// =============================================================================

/// TLS configuration for the server
pub struct ServerTlsConfig {
    config: Arc<ServerConfig>,
}

impl ServerTlsConfig {
    /// Load the CA, certificate and key files
    pub fn from_paths(paths: &TlsPaths) -> Result<Self> {
        let config = Self::from_pem(
            &read_pem(&paths.ca_cert)?,
            &read_pem(&paths.cert)?,
            &read_pem(&paths.key)?,
        )?;
        info!("Loaded server credentials from {:?}", paths.cert);
        Ok(config)
    }

    /// Build from PEM data; client certificates signed by `ca_pem` are required
    pub fn from_pem(ca_pem: &[u8], cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let provider = provider();
        let roots = root_store(ca_pem)?;
        let certs = parse_certificates(cert_pem)?;
        let key = parse_private_key(key_pem)?;

        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .map_err(|e| TransferError::Tls(format!("client verifier error: {}", e)))?;

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_client_cert_verifier(verifier)
            .with_single_cert(certs, key)?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Run the handshake on an accepted connection
    pub fn accept(&self, tcp: TcpStream) -> Result<TlsServerStream> {
        let conn = ServerConnection::new(Arc::clone(&self.config))?;
        let mut stream = StreamOwned::new(conn, tcp);

        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|e| TransferError::Tls(format!("handshake failed: {}", e)))?;
        }

        debug!(
            "Client presented {} certificate(s)",
            stream.conn.peer_certificates().map_or(0, |c| c.len())
        );
        Ok(stream)
    }
}

// =============================================================================
// Client
// =============================================================================

/// TLS configuration for the client
pub struct ClientTlsConfig {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
}

impl ClientTlsConfig {
    /// Load the CA, certificate and key files
    pub fn from_paths(paths: &TlsPaths, server_name: &str) -> Result<Self> {
        let config = Self::from_pem(
            &read_pem(&paths.ca_cert)?,
            &read_pem(&paths.cert)?,
            &read_pem(&paths.key)?,
            server_name,
        )?;
        info!("Loaded client credentials from {:?}", paths.cert);
        Ok(config)
    }

    /// Build from PEM data; the server must present a certificate for
    /// `server_name` signed by `ca_pem`
    pub fn from_pem(
        ca_pem: &[u8],
        cert_pem: &[u8],
        key_pem: &[u8],
        server_name: &str,
    ) -> Result<Self> {
        let roots = root_store(ca_pem)?;
        let certs = parse_certificates(cert_pem)?;
        let key = parse_private_key(key_pem)?;

        let config = ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_client_auth_cert(certs, key)?;

        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|e| TransferError::Config(format!("invalid server name: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            server_name,
        })
    }

    /// Run the handshake on a connected socket
    pub fn connect(&self, tcp: TcpStream) -> Result<TlsClientStream> {
        let conn = ClientConnection::new(Arc::clone(&self.config), self.server_name.clone())?;
        let mut stream = StreamOwned::new(conn, tcp);

        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|e| TransferError::Tls(format!("handshake failed: {}", e)))?;
        }
        Ok(stream)
    }
}

// =============================================================================
// PEM Helpers
// =============================================================================

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| TransferError::Certificate(format!("failed to read {:?}: {}", path, e)))
}

fn root_store(ca_pem: &[u8]) -> Result<RootCertStore> {
    let ca_certs = parse_certificates(ca_pem)?;
    let mut roots = RootCertStore::empty();
    for cert in ca_certs {
        roots
            .add(cert)
            .map_err(|e| TransferError::Certificate(format!("failed to add CA certificate: {}", e)))?;
    }
    Ok(roots)
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TransferError::Certificate(format!("failed to parse certificates: {}", e)))?;
    if certs.is_empty() {
        return Err(TransferError::Certificate("no certificates found".into()));
    }
    Ok(certs)
}

fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_slice(pem)
        .map_err(|e| TransferError::Certificate(format!("failed to parse private key: {}", e)))
}

// =============================================================================
// Development Credentials
// =============================================================================

/// A CA plus CA-signed server and client credentials, PEM encoded
pub struct GeneratedCredentials {
    pub ca_cert_pem: String,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

/// File locations written by `GeneratedCredentials::write_to`
pub struct CredentialFiles {
    pub server: TlsPaths,
    pub client: TlsPaths,
}

/// Generate a development CA and the two endpoint certificates
///
/// `server_names` become the server certificate's subject alternative names;
/// IP addresses are recognized.
pub fn generate_credentials(server_names: &[String]) -> Result<GeneratedCredentials> {
    let ca_key = KeyPair::generate().map_err(cert_error)?;
    let mut ca_params = CertificateParams::default();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "securefile development CA");
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let ca_cert = ca_params.self_signed(&ca_key).map_err(cert_error)?;

    let server_key = KeyPair::generate().map_err(cert_error)?;
    let mut server_params = CertificateParams::new(server_names.to_vec()).map_err(cert_error)?;
    server_params
        .distinguished_name
        .push(DnType::CommonName, "securefile server");
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let server_cert = server_params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .map_err(cert_error)?;

    let client_key = KeyPair::generate().map_err(cert_error)?;
    let mut client_params = CertificateParams::default();
    client_params
        .distinguished_name
        .push(DnType::CommonName, "securefile client");
    client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    let client_cert = client_params
        .signed_by(&client_key, &ca_cert, &ca_key)
        .map_err(cert_error)?;

    info!("Generated credentials for {:?}", server_names);

    Ok(GeneratedCredentials {
        ca_cert_pem: ca_cert.pem(),
        server_cert_pem: server_cert.pem(),
        server_key_pem: server_key.serialize_pem(),
        client_cert_pem: client_cert.pem(),
        client_key_pem: client_key.serialize_pem(),
    })
}

impl GeneratedCredentials {
    /// Write every PEM file into `dir`; private keys get mode 600 on unix
    pub fn write_to(&self, dir: &Path) -> Result<CredentialFiles> {
        fs::create_dir_all(dir)?;

        let ca_cert = dir.join("ca.pem");
        fs::write(&ca_cert, &self.ca_cert_pem)?;

        let server = TlsPaths {
            ca_cert: ca_cert.clone(),
            cert: write_file(dir, "server.pem", &self.server_cert_pem)?,
            key: write_key(dir, "server.key", &self.server_key_pem)?,
        };
        let client = TlsPaths {
            ca_cert,
            cert: write_file(dir, "client.pem", &self.client_cert_pem)?,
            key: write_key(dir, "client.key", &self.client_key_pem)?,
        };

        info!("Saved credentials to {:?}", dir);
        Ok(CredentialFiles { server, client })
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn write_key(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = write_file(dir, name, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(path)
}

fn cert_error(err: rcgen::Error) -> TransferError {
    TransferError::Certificate(err.to_string())
}
