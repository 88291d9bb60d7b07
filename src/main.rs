use books_api::config::Config;
use books_api::http::{AppState, HttpServer, HttpServerConfig};
use books_api::postgres::Postgres;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let store = Postgres::new(config.database_url()).await?;
    let state = AppState::new(store.clone(), store);

    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
