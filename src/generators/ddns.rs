// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dynamic-address generator: one A record per host pointing at the
//! cluster's public IPv4 address.
//!
//! The address is discovered through [`PublicIpResolver`] and cached in the
//! process-wide [`PublicIpCache`] for `cacheExpire` seconds. Sources using this
//! generator are re-derived every `refreshInterval` seconds so a changed
//! address propagates. Expired cache entries are evicted by the cache janitor
//! started in `main`, whose interval is the process `clean_interval`.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    records_for_hosts, GeneratorFactory, GeneratorSource, RecordGenerator, Reporter, SourceKind,
};
use crate::crd::{DNSGeneratorSpec, DNSRecordSpec, DdnsGeneratorConfig, RecordType};
use crate::dns_errors::GeneratorError;
use crate::public_ip::{PublicIpCache, PublicIpResolver, PUBLIC_IPV4_CACHE_KEY};

/// Builds [`DdnsGenerator`]s sharing one HTTP client and one address cache.
pub struct DdnsFactory {
    http: reqwest::Client,
    cache: Arc<PublicIpCache>,
}

impl DdnsFactory {
    #[must_use]
    pub fn new(http: reqwest::Client, cache: Arc<PublicIpCache>) -> Self {
        Self { http, cache }
    }
}

impl GeneratorFactory for DdnsFactory {
    fn build(&self, spec: &DNSGeneratorSpec) -> Result<Arc<dyn RecordGenerator>> {
        let config = spec.ddns.clone().unwrap_or_default();
        let resolver = PublicIpResolver::new(
            self.http.clone(),
            Duration::from_secs(config.timeout),
            &config.extra_apis,
        );
        Ok(Arc::new(DdnsGenerator::new(
            resolver,
            Arc::clone(&self.cache),
            &config,
        )))
    }
}

pub struct DdnsGenerator {
    resolver: PublicIpResolver,
    cache: Arc<PublicIpCache>,
    cache_expire: Duration,
    refresh_interval: Duration,
}

impl DdnsGenerator {
    #[must_use]
    pub fn new(
        resolver: PublicIpResolver,
        cache: Arc<PublicIpCache>,
        config: &DdnsGeneratorConfig,
    ) -> Self {
        Self {
            resolver,
            cache,
            cache_expire: Duration::from_secs(config.cache_expire),
            refresh_interval: Duration::from_secs(config.refresh_interval),
        }
    }
}

#[async_trait]
impl RecordGenerator for DdnsGenerator {
    async fn generate(
        &self,
        source: GeneratorSource<'_>,
        _reporter: &dyn Reporter,
    ) -> Result<Vec<DNSRecordSpec>> {
        let ip = self
            .cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, self.cache_expire, &self.resolver)
            .await
            .ok_or(GeneratorError::NoPublicIp)?;
        debug!(ip = %ip, "Using public IP for A records");

        Ok(records_for_hosts(
            source.hosts(),
            RecordType::A,
            &ip.to_string(),
        ))
    }

    fn supports(&self, kind: SourceKind) -> bool {
        matches!(kind, SourceKind::Ingress)
    }

    fn requeue_after(&self, _kind: SourceKind) -> Duration {
        self.refresh_interval
    }
}

#[cfg(test)]
#[path = "ddns_tests.rs"]
mod ddns_tests;
