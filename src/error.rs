//! Error types for securefile
//!
//! Provides a unified error type for the protocol, the file store and the
//! secure channel.

use std::io;

use thiserror::Error;

/// Result type alias using TransferError
pub type Result<T> = std::result::Result<T, TransferError>;

/// Unified error type for securefile operations
#[derive(Debug, Error)]
pub enum TransferError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // File Store Errors
    // -------------------------------------------------------------------------
    #[error("The file {0} can not be found.")]
    NotFound(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Channel closed by peer")]
    ChannelClosed,

    // -------------------------------------------------------------------------
    // TLS Errors
    // -------------------------------------------------------------------------
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransferError {
    /// Classify a channel I/O error.
    ///
    /// Errors that mean the peer is gone become `ChannelClosed`; everything
    /// else stays an `Io` error.
    pub fn from_channel(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransferError::ChannelClosed,
            _ => TransferError::Io(err),
        }
    }

    /// True when the session that produced this error can not continue
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, TransferError::ChannelClosed)
    }
}

impl From<rustls::Error> for TransferError {
    fn from(err: rustls::Error) -> Self {
        TransferError::Tls(err.to_string())
    }
}
