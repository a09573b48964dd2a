// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;

use tracing::{debug, error, info, info_span, Instrument};

use qss_logscale::{
    config::Config,
    hec::HecEvent,
    ingest::IngestApi,
    logger,
    oauth::{websocket_uri, TokenClient},
    session::Session,
};

pub fn main() -> ExitCode {
    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error creating config on qss bridge startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Lives for the whole process; the runtime below is single threaded so
    // both session activities log through it.
    let _log_guard = match logger::install(&config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Logging subsystem enabled");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("Crypto provider already installed");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Shutting down qss bridge: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let forwarder = match &config.logscale_ingest_url {
        Some(url) => IngestApi::with_base_url(
            url.clone(),
            &config.logscale_ingest_token,
            config.flush_timeout,
        )?,
        None => IngestApi::new(
            &config.logscale_host,
            &config.logscale_ingest_token,
            config.flush_timeout,
        )?,
    };

    let token_client = TokenClient::new(
        config.zoom_oauth_url.clone(),
        config.zoom_account_id.clone(),
        config.zoom_client_id.clone(),
        config.zoom_client_secret.clone(),
        config.flush_timeout,
    )?;
    let access_token = token_client.fetch_access_token().await?;
    let uri = websocket_uri(&config.zoom_wss_url, &access_token);

    let hec_event = HecEvent::new(
        config.logscale_repository.clone(),
        config.logscale_host.clone(),
        config.source.clone(),
        config.sourcetype.clone(),
    );

    let mut session = Session::new(forwarder, hec_event, config.heartbeat_interval);
    // the uri carries the access token, only the subscription url is logged
    let span = info_span!("session", url = %config.zoom_wss_url);
    async {
        info!("Connecting to QSS websocket");
        session.connect(&uri).await?;
        session.flush_remaining().await?;
        info!("QSS websocket session ended");
        Ok::<(), Box<dyn std::error::Error>>(())
    }
    .instrument(span)
    .await
}
