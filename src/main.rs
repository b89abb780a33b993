// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use dns_manager::{
    config::Config,
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    context::Context,
    reconcilers::{
        run_dnsgenerator_controller, run_dnsprovider_controller, run_dnsrecord_controller,
        run_ingress_controller,
    },
    server::{run_health_server, run_metrics_server},
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = Config::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_logging() {
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json switches
    // to JSON lines.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: Config) -> Result<()> {
    init_logging();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting dns-manager");
    debug!(?config, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_address = config.metrics_bind_address;
    let health_address = config.health_probe_bind_address;
    let clean_interval = config.cache_clean_interval();

    let ctx = Arc::new(Context::new(client, config)?);
    info!(generators = ?ctx.generators.names(), "Default generators installed");

    let _janitor = ctx.ip_cache.spawn_janitor(clean_interval);

    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the process
    tokio::select! {
        result = run_dnsrecord_controller(ctx.clone()) => {
            error!("CRITICAL: DNSRecord controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSRecord controller exited unexpectedly without error")
        }
        result = run_dnsprovider_controller(ctx.clone()) => {
            error!("CRITICAL: DNSProvider controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSProvider controller exited unexpectedly without error")
        }
        result = run_dnsgenerator_controller(ctx.clone()) => {
            error!("CRITICAL: DNSGenerator controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSGenerator controller exited unexpectedly without error")
        }
        result = run_ingress_controller(ctx.clone()) => {
            error!("CRITICAL: Ingress controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Ingress controller exited unexpectedly without error")
        }
        result = run_metrics_server(metrics_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_health_server(health_address) => {
            error!("CRITICAL: health probe server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("health probe server exited unexpectedly without error")
        }
    }
}
