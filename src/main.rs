use anyhow::Context;
use docsum::{api, config, logging, pipeline::SummaryPipeline};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("Failed to load configuration")?;
    logging::init_tracing();
    tracing::debug!(?config, "Configuration loaded");

    let pipeline = SummaryPipeline::from_config(&config)
        .context("Failed to build summarization pipeline")?;
    let app = api::create_router(Arc::new(pipeline), api::ApiOptions::from_config(&config));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
