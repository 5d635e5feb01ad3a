use dropline::prelude::*;
use dropline::DEFAULT_BIND_ADDR;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("DROPLINE_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let server = DroplineServer::builder()
        .bind(&addr)
        .build::<ConnectFour>()
        .await?;
    server.run().await?;
    Ok(())
}
