//! securefile Credential Generator
//!
//! Writes a development CA plus server and client credentials.

use std::path::PathBuf;

use clap::Parser;
use securefile::network::generate_credentials;
use tracing_subscriber::{fmt, EnvFilter};

/// securefile Credential Generator
#[derive(Parser, Debug)]
#[command(name = "securefile-certs")]
#[command(about = "Generate development certificates for securefile")]
#[command(version)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "./certificates")]
    out_dir: PathBuf,

    /// Names the server certificate is valid for (DNS names or IPs)
    #[arg(short, long = "name", default_values_t = vec!["localhost".to_string(), "127.0.0.1".to_string()])]
    names: Vec<String>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let written = generate_credentials(&args.names).and_then(|creds| creds.write_to(&args.out_dir));
    match written {
        Ok(files) => {
            tracing::info!("Server credentials: {:?}, {:?}", files.server.cert, files.server.key);
            tracing::info!("Client credentials: {:?}, {:?}", files.client.cert, files.client.key);
        }
        Err(e) => {
            tracing::error!("Failed to generate credentials: {}", e);
            std::process::exit(1);
        }
    }
}
