//! Network Module
//!
//! Secure channel setup and the two protocol endpoints.
//!
//! ## Architecture
//! - Blocking I/O on both ends, one connection per server run
//! - `Session` owns the server side of the channel
//! - `Client` owns the client side and drives one request at a time

mod client;
mod server;
mod session;
mod tls;

pub use client::Client;
pub use server::Server;
pub use session::{Session, SessionState};
pub use tls::{
    generate_credentials, ClientTlsConfig, CredentialFiles, GeneratedCredentials,
    ServerTlsConfig, TlsClientStream, TlsServerStream,
};
