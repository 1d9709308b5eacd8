//! Configuration for securefile
//!
//! Centralized configuration with sensible defaults, shared by the server and
//! the client.

use std::path::PathBuf;

use crate::protocol::Framing;

/// Port used when none is given on the command line
pub const DEFAULT_PORT: u16 = 8189;

/// Main configuration for a securefile endpoint
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Directory every file name is resolved against
    pub store_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host to connect to (client) or bind on (server)
    pub host: String,

    /// TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Section framing used for the session
    pub framing: Framing,

    /// Bounds applied while reading sections
    pub limits: Limits,

    // -------------------------------------------------------------------------
    // TLS Configuration
    // -------------------------------------------------------------------------
    /// Credential files for the mutually authenticated channel
    pub tls: TlsPaths,

    /// Name the server certificate must be valid for (client only)
    pub server_name: String,
}

/// Limits enforced by section readers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Max lines accepted before `DATA_NAME_SENT`
    pub max_name_lines: usize,

    /// Max reassembled content size (in bytes)
    pub max_content_bytes: usize,

    /// Max size of a single received line, terminator excluded (in bytes)
    pub max_line_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_lines: 64,
            max_content_bytes: 16 * 1024 * 1024, // 16 MB
            max_line_bytes: 1024 * 1024,         // 1 MB
        }
    }
}

/// PEM files used to set up the secure channel
///
/// Layout produced by `securefile-certs`:
///   {dir}/
///     ├── ca.pem
///     ├── server.pem / server.key
///     └── client.pem / client.key
#[derive(Debug, Clone)]
pub struct TlsPaths {
    /// CA that signs the peer's certificate
    pub ca_cert: PathBuf,

    /// Our own certificate chain
    pub cert: PathBuf,

    /// Our own private key
    pub key: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./files"),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            framing: Framing::Legacy,
            limits: Limits::default(),
            tls: TlsPaths {
                ca_cert: PathBuf::from("./certificates/ca.pem"),
                cert: PathBuf::from("./certificates/server.pem"),
                key: PathBuf::from("./certificates/server.key"),
            },
            server_name: "localhost".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string for binding or connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store directory
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_dir = path.into();
        self
    }

    /// Set the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the section framing
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the max number of lines in a name section
    pub fn max_name_lines(mut self, count: usize) -> Self {
        self.config.limits.max_name_lines = count;
        self
    }

    /// Set the max reassembled content size (in bytes)
    pub fn max_content_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_content_bytes = bytes;
        self
    }

    /// Set the max size of a single received line (in bytes)
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_line_bytes = bytes;
        self
    }

    /// Set the CA certificate path
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.ca_cert = path.into();
        self
    }

    /// Set our certificate path
    pub fn cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.cert = path.into();
        self
    }

    /// Set our private key path
    pub fn key(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.key = path.into();
        self
    }

    /// Set the expected server name
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
