//! `serve`: run the extension endpoint until told to stop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tailquery_config::Settings;
use tailquery_core::TailnetService;

use crate::error::CliError;
use crate::server::{self, Endpoint};

pub async fn handle(settings: &Settings) -> Result<(), CliError> {
    let socket = settings.require_socket()?.to_path_buf();
    let service = TailnetService::from_config(&settings.service_config()?)?;
    service.start().await;

    let listener = server::bind(&socket)?;
    let endpoint = Arc::new(Endpoint::new(&service, settings.response_timeout()));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "could not listen for Ctrl-C");
                    return;
                }
                info!("shutdown signal received (SIGINT)");
                signal.cancel();
            }
            () = signal.cancelled() => {}
        }
    });

    server::run(
        listener,
        socket,
        endpoint,
        settings.keep_alive_interval(),
        shutdown.clone(),
    )
    .await;

    shutdown.cancel();
    service.shutdown().await;
    Ok(())
}
