// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client
//! - the process configuration
//! - the provider registry (factories plus the adapter cache)
//! - the generator registry (factories plus named instances)
//! - the public IP cache shared by DDNS generators
//!
//! Registries are explicit values built once in `main`; nothing is looked up
//! through globals.

use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;

use crate::config::Config;
use crate::generators::GeneratorRegistry;
use crate::providers::ProviderRegistry;
use crate::public_ip::PublicIpCache;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Process configuration
    pub config: Arc<Config>,

    /// Provider factories and cached adapters
    pub providers: Arc<ProviderRegistry>,

    /// Generator factories and named generator instances
    pub generators: Arc<GeneratorRegistry>,

    /// Public IP cache shared by every DDNS generator
    pub ip_cache: Arc<PublicIpCache>,
}

impl Context {
    /// Build the registries from `config` and install the default generators.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built or a default generator
    /// cannot be constructed.
    pub fn new(client: Client, config: Config) -> Result<Self> {
        let http = build_http_client(&config)?;
        let ip_cache = Arc::new(PublicIpCache::new());

        let providers = ProviderRegistry::with_defaults(http.clone(), config.provider_cache_ttl());
        let generators = GeneratorRegistry::with_defaults(http, Arc::clone(&ip_cache));
        generators
            .install_defaults(&config)
            .context("failed to install default generators")?;

        Ok(Self {
            client,
            config: Arc::new(config),
            providers: Arc::new(providers),
            generators: Arc::new(generators),
            ip_cache,
        })
    }
}

/// HTTP client for backend DNS APIs and public IP discovery.
///
/// # Errors
///
/// Fails when the TLS backend cannot be initialised.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!("dns-manager/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
