//! TLS Server
//!
//! Accepts a single connection and serves it until the session ends.

use std::net::{SocketAddr, TcpListener};

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Framing, LineCodec};
use crate::store::FileStore;

use super::{ServerTlsConfig, Session};

/// One-shot server: bind, accept one client, serve it, return
pub struct Server {
    config: Config,
    tls: ServerTlsConfig,
    listener: TcpListener,
    store: FileStore,
}

impl Server {
    /// Open the store and bind the listener
    pub fn bind(config: Config, tls: ServerTlsConfig) -> Result<Self> {
        let store = FileStore::open(&config.store_dir)?;
        let listener = TcpListener::bind(config.address())?;
        info!(
            "Listening on {} (store: {:?})",
            listener.local_addr()?,
            store.root()
        );

        Ok(Self {
            config,
            tls,
            listener,
            store,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one connection, complete the handshake and serve the session
    ///
    /// Every session starts in legacy framing; clients switch explicitly with
    /// `FRAMING`. The listener is dropped when the session ends.
    pub fn serve_one(self) -> Result<()> {
        info!("The server is online and waiting for incoming connections.");
        let (tcp, peer) = self.listener.accept()?;
        tcp.set_nodelay(true)?;

        let stream = self.tls.accept(tcp)?;
        info!("TLS handshake with {} completed", peer);

        let codec = LineCodec::new(Framing::Legacy, self.config.limits);
        let mut session = Session::new(stream, self.store, codec, peer.to_string());
        session.run();
        Ok(())
    }
}
