// HBNB - Web Server
// Read-only HTML pages over the configured storage

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use hbnb::config::StorageArgs;
use hbnb::{logging, storage, web, StorageConfig};

#[derive(Parser)]
#[command(name = "hbnb-web", version, about = "HBNB web pages")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "HBNB_WEB_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "HBNB_WEB_PORT", default_value_t = 5000)]
    port: u16,

    #[command(flatten)]
    storage: StorageArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(logging::WEB_LEVEL);

    let config = StorageConfig::from(cli.storage);
    let storage = storage::open(&config).context("opening storage")?;
    let app = web::router(storage);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cli.host, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(%addr, backend = ?config.kind, "serving HBNB pages");

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
