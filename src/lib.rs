//! # securefile
//!
//! A minimal remote file-management protocol:
//! - DOWNLOAD, UPLOAD and DELETE of whole text files
//! - Line-oriented framing with sentinel-terminated sections
//! - Mutually authenticated TLS channel (client certificates required)
//! - One client, one server, one session
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────┐                       ┌──────────────────┐
//! │      Client      │                       │     Session      │
//! │ (request driver) │                       │ (state machine)  │
//! └────────┬─────────┘                       └────────┬─────────┘
//!          │                                          │
//! ┌────────▼─────────┐                       ┌────────▼─────────┐
//! │    LineCodec     │                       │    LineCodec     │
//! └────────┬─────────┘                       └────────┬─────────┘
//!          │                                          │
//! ┌────────▼─────────┐      TLS (mutual)     ┌────────▼─────────┐
//! │   LineChannel    │◄─────────────────────►│   LineChannel    │
//! └──────────────────┘                       └────────┬─────────┘
//!                                                     │
//!                                            ┌────────▼─────────┐
//!                                            │    FileStore     │
//!                                            └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod store;
pub mod network;
pub mod menu;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TransferError, Result};
pub use config::Config;
pub use network::{Client, Server, Session};
pub use store::FileStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of securefile
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
