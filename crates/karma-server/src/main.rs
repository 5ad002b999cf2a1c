mod config;

use tracing::{error, info};

use karma_engine::pipeline;
use karma_transport::error::TransportError;
use karma_transport::http::HttpReplySink;
use karma_transport::ws::WsEventSource;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "karma=debug,karma_engine=debug,karma_transport=info".into()
            }),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    let source = match WsEventSource::connect(&config.gateway_url, &config.token).await {
        Ok(source) => source,
        Err(TransportError::InvalidAuth) => {
            error!("Invalid credentials, not starting");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let sink = HttpReplySink::new(&config.api_url, &config.token);

    info!("Karma bot listening on {}", config.gateway_url);
    let engine = pipeline::run(source, sink, config.pipeline()).await?;

    info!(
        "Event loop finished: {} users, {} messages tracked",
        engine.users().len(),
        engine.messages().len()
    );
    Ok(())
}
