//! securefile Server Binary
//!
//! Serves a single mutually authenticated client session.

use clap::Parser;
use securefile::config::DEFAULT_PORT;
use securefile::network::{Server, ServerTlsConfig};
use securefile::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// securefile Server
#[derive(Parser, Debug)]
#[command(name = "securefile-server")]
#[command(about = "Serve file downloads, uploads and deletes over mutual TLS")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Directory files are served from
    #[arg(short, long, default_value = "./files")]
    store_dir: String,

    /// CA certificate that client certificates must chain to
    #[arg(long, default_value = "./certificates/ca.pem")]
    ca: String,

    /// Server certificate (PEM)
    #[arg(long, default_value = "./certificates/server.pem")]
    cert: String,

    /// Server private key (PEM)
    #[arg(long, default_value = "./certificates/server.key")]
    key: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,securefile=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("securefile Server v{}", securefile::VERSION);
    tracing::info!("Store directory: {}", args.store_dir);

    let config = Config::builder()
        .host(&args.bind)
        .port(args.port)
        .store_dir(&args.store_dir)
        .ca_cert(&args.ca)
        .cert(&args.cert)
        .key(&args.key)
        .build();

    let tls = match ServerTlsConfig::from_paths(&config.tls) {
        Ok(tls) => tls,
        Err(e) => {
            tracing::error!("Failed to load credentials: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, tls) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.serve_one() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
