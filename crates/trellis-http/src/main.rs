//! Demo backend serving the contact directory over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use trellis_http::{demo, start_server, ServerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "trellis-demo",
    about = "Serve the trellis contact directory demo"
)]
struct Args {
    /// Server configuration file with a [server] table.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config = config.with_listen(listen);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(config.log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = Arc::new(demo::registry(demo::sample_contacts()));
    let server = start_server(&config, registry)?;
    info!("open {}/index", server.base_url());

    server.join();
    Ok(())
}
