use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use websim_server::build_app;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve similarity queries over a crawled snapshot")]
struct Args {
    /// Snapshot directory holding vectors.bin, urls.txt and meta.json as
    /// written by the crawler. Rebuilt from urls.txt if vectors.bin is unusable.
    #[arg(long, default_value = "./data")]
    data: String,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let admin = std::env::var_os("ADMIN_TOKEN").is_some();
    if !admin {
        tracing::warn!("ADMIN_TOKEN not set; POST /sites will reject every request");
    }
    let app = build_app(args.data.clone()).await?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, snapshot = %args.data, admin, "similarity server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
