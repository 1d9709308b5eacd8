//! Client Request Driver
//!
//! One entry point per command. Each call writes a framed request and reads
//! the server's response back into an `Outcome`; nothing is kept between
//! calls except the channel.

use std::net::TcpStream;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TransferError};
use crate::protocol::{
    Command, Framing, LineChannel, LineCodec, Outcome, Request, Sentinel, Status, Transport,
};
use crate::store::FileStore;

use super::{ClientTlsConfig, TlsClientStream};

/// Client side of one connection
pub struct Client<S> {
    channel: LineChannel<S>,
    codec: LineCodec,

    /// Local directory files are uploaded from and downloaded to
    store: FileStore,
}

impl Client<TlsClientStream> {
    /// Connect, complete the handshake and negotiate framing if configured
    pub fn connect(config: &Config, tls: &ClientTlsConfig) -> Result<Self> {
        let store = FileStore::open(&config.store_dir)?;

        let tcp = TcpStream::connect(config.address())?;
        tcp.set_nodelay(true)?;
        let stream = tls.connect(tcp)?;
        info!("Connected to {}", config.address());

        let codec = LineCodec::new(Framing::Legacy, config.limits);
        let mut client = Client::new(stream, store, codec);

        if config.framing != Framing::Legacy {
            let outcome = client.negotiate_framing(config.framing)?;
            if !outcome.is_success() {
                return Err(TransferError::Config(format!(
                    "server refused {} framing: {}",
                    config.framing, outcome.message
                )));
            }
        }

        Ok(client)
    }
}

impl<S: Transport> Client<S> {
    /// Create a client over an established stream
    pub fn new(stream: S, store: FileStore, codec: LineCodec) -> Self {
        Self {
            channel: LineChannel::with_max_line(stream, codec.limits().max_line_bytes),
            codec,
            store,
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn framing(&self) -> Framing {
        self.codec.framing()
    }

    /// Fetch `name` from the server into the local store
    ///
    /// An `ERROR` first line means the file was not sent; its message is
    /// surfaced and the trailing `FINISHED_REQUEST` is discarded.
    pub fn download(&mut self, name: &str) -> Result<Outcome> {
        self.codec
            .write_request(&mut self.channel, &Request::download(name));
        let response = self.read_download(name);
        response.map_err(|e| self.abandon(e))
    }

    fn read_download(&mut self, name: &str) -> Result<Outcome> {
        let first = self.next_line()?;
        if first == Sentinel::Error.as_str() {
            let message = self.next_line()?;
            let trailing = self.next_line()?;
            if trailing != Sentinel::FinishedRequest.as_str() {
                debug!("Unexpected trailing line after download error: {:?}", trailing);
            }
            return Ok(Outcome::error(message));
        }

        let content = self.codec.read_content_after(&mut self.channel, first)?;
        let persisted = self.store.write(name, &content);
        let outcome = self.codec.read_outcome(&mut self.channel)?;
        persisted?;

        debug!("Downloaded {} ({} bytes)", name, content.len());
        Ok(outcome)
    }

    /// Send the local file `name` to the server
    ///
    /// A missing local file is reported as `NotFound` without contacting the
    /// server.
    pub fn upload(&mut self, name: &str) -> Result<Outcome> {
        let lines = self.store.read_lines(name)?;
        debug!("Uploading {} ({} lines)", name, lines.len());

        self.codec
            .write_request(&mut self.channel, &Request::upload(name, lines));
        let response = self.codec.read_outcome(&mut self.channel);
        response.map_err(|e| self.abandon(e))
    }

    /// Remove `name` from the server
    ///
    /// Lines before the outcome status are skipped.
    pub fn delete(&mut self, name: &str) -> Result<Outcome> {
        self.codec
            .write_request(&mut self.channel, &Request::delete(name));
        let response = self.read_delete();
        response.map_err(|e| self.abandon(e))
    }

    fn read_delete(&mut self) -> Result<Outcome> {
        loop {
            let line = self.next_line()?;
            match Sentinel::parse(&line).and_then(Status::from_sentinel) {
                Some(status) => {
                    let message = self.next_line()?;
                    return Ok(Outcome::new(status, message));
                }
                None => debug!("Skipping unexpected line before outcome: {:?}", line),
            }
        }
    }

    /// Remove `name` from the local store only
    pub fn delete_local(&self, name: &str) -> Result<()> {
        self.store.delete(name)
    }

    /// Ask the server to switch framing; ours switches only on success
    pub fn negotiate_framing(&mut self, framing: Framing) -> Result<Outcome> {
        self.channel.write_line(&Command::Framing(framing).to_line());
        let response = self.codec.read_outcome(&mut self.channel);
        let outcome = response.map_err(|e| self.abandon(e))?;
        if outcome.is_success() {
            self.codec = self.codec.with_framing(framing);
            info!("Using {} framing", framing);
        }
        Ok(outcome)
    }

    /// Send `EXIT` and close our side of the channel
    pub fn exit(mut self) -> Result<()> {
        self.channel.write_line(&Command::Exit.to_line());
        self.channel.flush()?;
        if let Err(e) = self.channel.close() {
            debug!("Closing channel failed: {}", e);
        }
        Ok(())
    }

    /// Give up on a response that broke framing
    ///
    /// Its remaining lines are still in flight and would be read as the
    /// next response, so the channel is closed and the failure reported as
    /// `ChannelClosed`.
    fn abandon(&mut self, err: TransferError) -> TransferError {
        if let TransferError::ProtocolViolation(reason) = &err {
            warn!("Response from server broke framing: {}", reason);
            if let Err(e) = self.channel.close() {
                debug!("Closing channel failed: {}", e);
            }
            return TransferError::ChannelClosed;
        }
        err
    }

    fn next_line(&mut self) -> Result<String> {
        self.channel
            .read_line()?
            .ok_or(TransferError::ChannelClosed)
    }
}
