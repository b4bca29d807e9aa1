use std::sync::Arc;

use tracing::{error, info};
use voipms_sms::bridge::Bridge;
use voipms_sms::config::AppConfig;
use voipms_sms::{server, telemetry};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet, so also print to stderr.
        error!("{}", e);
        eprintln!("voipms-sms: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.logging)?;
    config.validate()?;

    let bridge = Arc::new(Bridge::from_config(&config)?);
    for did in &config.account.dids {
        if let Some(url) = bridge.webhook_url(did) {
            info!(did = %did, webhook_url = %url, "webhook ready");
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, server::router(bridge))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
