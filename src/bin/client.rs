//! securefile Client Binary
//!
//! Interactive menu for downloading, uploading and deleting files.

use std::io;

use clap::Parser;
use securefile::config::DEFAULT_PORT;
use securefile::menu::run_menu;
use securefile::network::{Client, ClientTlsConfig};
use securefile::protocol::Framing;
use securefile::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// securefile Client
#[derive(Parser, Debug)]
#[command(name = "securefile-client")]
#[command(about = "Interactive client for a securefile server")]
#[command(version)]
struct Args {
    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Server host
    #[arg(default_value = "localhost")]
    host: String,

    /// Local directory for downloads and uploads
    #[arg(short, long, default_value = "./files")]
    store_dir: String,

    /// Section framing (legacy or counted)
    #[arg(short, long, default_value = "legacy")]
    framing: Framing,

    /// Name the server certificate must be valid for (defaults to the host)
    #[arg(long)]
    server_name: Option<String>,

    /// CA certificate the server certificate must chain to
    #[arg(long, default_value = "./certificates/ca.pem")]
    ca: String,

    /// Client certificate (PEM)
    #[arg(long, default_value = "./certificates/client.pem")]
    cert: String,

    /// Client private key (PEM)
    #[arg(long, default_value = "./certificates/client.key")]
    key: String,
}

fn main() {
    // Diagnostics go to stderr; the menu owns stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let server_name = args.server_name.clone().unwrap_or_else(|| args.host.clone());

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .store_dir(&args.store_dir)
        .framing(args.framing)
        .ca_cert(&args.ca)
        .cert(&args.cert)
        .key(&args.key)
        .server_name(server_name)
        .build();

    let tls = match ClientTlsConfig::from_paths(&config.tls, &config.server_name) {
        Ok(tls) => tls,
        Err(e) => {
            eprintln!("Client error: {}", e);
            std::process::exit(1);
        }
    };

    let client = match Client::connect(&config, &tls) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Client error: {}", e);
            std::process::exit(1);
        }
    };

    println!("--------------------------------------------");
    println!("The TLS handshake was completed.");
    println!("The client is now connected to the server.");
    println!("--------------------------------------------");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    if let Err(e) = run_menu(client, &mut input, &mut output) {
        eprintln!("Client error: {}", e);
        std::process::exit(1);
    }
}
