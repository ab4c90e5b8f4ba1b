/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;
mod http_ingress;
mod nats_broker;

use crate::config::Config;
use crate::nats_broker::NatsBroker;
use clap::Parser;
use fhir_streamer::IngestionRouter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BROKER_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command()]
struct StreamerArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    info!("Started configurable-fhir-streamer");

    let args = StreamerArgs::parse();
    let config = Config::load(&args.config)?;
    let table = Arc::new(config.descriptor_table()?);

    let broker = Arc::new(
        NatsBroker::connect(
            &config.broker.address,
            BROKER_CONNECT_TIMEOUT,
            config.broker.delivery,
            config.audit.topic.as_str(),
        )
        .await?
        .with_ack_timeout(Duration::from_millis(config.broker.publish_timeout_ms)),
    );

    let router = Arc::new(IngestionRouter::new(
        &config.streamer.name,
        table,
        broker.clone(),
        config.router_config(),
    )?);

    let listener = tokio::net::TcpListener::bind(&config.ingress.bind_address).await?;
    info!(
        bind_address = config.ingress.bind_address.as_str(),
        endpoints = router.endpoints().count(),
        "HTTP ingress listening"
    );

    axum::serve(listener, http_ingress::ingress_routes(router.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    router.shutdown().await;
    if let Err(err) = broker.flush().await {
        warn!(err = %err, "unable to flush broker on shutdown");
    }
    info!(audit = ?router.audit_stats(), "configurable-fhir-streamer stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(err = %err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
