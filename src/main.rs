mod cli;
mod config;
mod cooldown;
mod coordinator;
mod hardware;
mod ingest;
mod model;
mod node;
mod parse;
mod sequencer;
mod storage;

use std::process;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Log to stderr, `firewatch=info` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("firewatch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
