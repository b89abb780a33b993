// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-wide operator configuration.
//!
//! Every setting can be given as a command-line flag or through a `DNSM_*`
//! environment variable. The configuration is parsed once in `main` and
//! shared with all controllers through [`crate::context::Context`].

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DDNS_CACHE_EXPIRE_SECS, DEFAULT_DDNS_CLEAN_INTERVAL_SECS,
    DEFAULT_DDNS_REFRESH_INTERVAL_SECS, DEFAULT_DDNS_TIMEOUT_SECS, DEFAULT_DNS_RECORD_TTL_SECS,
    DEFAULT_HEALTH_PROBE_BIND_ADDRESS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_METRICS_BIND_ADDRESS,
    DEFAULT_PROVIDER_CACHE_TTL_SECS,
};
use crate::crd::{CnameGeneratorConfig, DNSGeneratorSpec, DdnsGeneratorConfig, GeneratorType};

/// Operator configuration.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "dns-manager",
    version,
    about = "Projects Ingress hosts into records on external DNS providers"
)]
pub struct Config {
    /// TTL applied to records that do not declare one (seconds)
    #[arg(long, env = "DNSM_DEFAULT_RECORD_TTL", default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
    pub default_record_ttl: i32,

    /// Generator used for Ingresses without a generator annotation; empty ignores them
    #[arg(long, env = "DNSM_DEFAULT_GENERATOR", default_value = "")]
    pub default_generator: String,

    /// Timeout for each public IP endpoint of the default DDNS generator (seconds)
    #[arg(long, env = "DNSM_DDNS_TIMEOUT", default_value_t = DEFAULT_DDNS_TIMEOUT_SECS)]
    pub ddns_timeout: u64,

    /// Extra public IP endpoints for the default DDNS generator (comma separated)
    #[arg(long, env = "DNSM_DDNS_EXTRA_APIS", value_delimiter = ',')]
    pub ddns_extra_apis: Vec<String>,

    /// Public IP cache lifetime (seconds)
    #[arg(long, env = "DNSM_DDNS_CACHE_EXPIRE", default_value_t = DEFAULT_DDNS_CACHE_EXPIRE_SECS)]
    pub ddns_cache_expire: u64,

    /// Interval between public IP cache evictions (seconds)
    #[arg(long, env = "DNSM_DDNS_CLEAN_INTERVAL", default_value_t = DEFAULT_DDNS_CLEAN_INTERVAL_SECS)]
    pub ddns_clean_interval: u64,

    /// Interval between re-derivations of DDNS-backed sources (seconds)
    #[arg(long, env = "DNSM_DDNS_REFRESH_INTERVAL", default_value_t = DEFAULT_DDNS_REFRESH_INTERVAL_SECS)]
    pub ddns_refresh_interval: u64,

    /// CNAME target of the default CNAME generator
    #[arg(long, env = "DNSM_CNAME_VALUE", default_value = "")]
    pub cname_value: String,

    /// Bind address of the Prometheus metrics endpoint
    #[arg(long, env = "DNSM_METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Bind address of the health and readiness probes
    #[arg(long, env = "DNSM_HEALTH_PROBE_BIND_ADDRESS", default_value = DEFAULT_HEALTH_PROBE_BIND_ADDRESS)]
    pub health_probe_bind_address: SocketAddr,

    /// How long a constructed provider adapter is reused (seconds)
    #[arg(long, env = "DNSM_PROVIDER_CACHE_TTL", default_value_t = DEFAULT_PROVIDER_CACHE_TTL_SECS)]
    pub provider_cache_ttl: u64,

    /// Request timeout for backend DNS API calls (seconds)
    #[arg(long, env = "DNSM_HTTP_TIMEOUT", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_record_ttl: DEFAULT_DNS_RECORD_TTL_SECS,
            default_generator: String::new(),
            ddns_timeout: DEFAULT_DDNS_TIMEOUT_SECS,
            ddns_extra_apis: Vec::new(),
            ddns_cache_expire: DEFAULT_DDNS_CACHE_EXPIRE_SECS,
            ddns_clean_interval: DEFAULT_DDNS_CLEAN_INTERVAL_SECS,
            ddns_refresh_interval: DEFAULT_DDNS_REFRESH_INTERVAL_SECS,
            cname_value: String::new(),
            metrics_bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            health_probe_bind_address: SocketAddr::from(([0, 0, 0, 0], 8081)),
            provider_cache_ttl: DEFAULT_PROVIDER_CACHE_TTL_SECS,
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Spec of the process-default generator of the given type.
    ///
    /// One default instance per type is registered at startup under the
    /// type name, so `dnsmanager.firestoned.io/generator: DDNS` works without
    /// any `DNSGenerator` object.
    #[must_use]
    pub fn default_generator_spec(&self, generator_type: GeneratorType) -> DNSGeneratorSpec {
        DNSGeneratorSpec {
            generator_type,
            ddns: Some(DdnsGeneratorConfig {
                timeout: self.ddns_timeout,
                extra_apis: self
                    .ddns_extra_apis
                    .iter()
                    .map(|api| api.trim().to_string())
                    .filter(|api| !api.is_empty())
                    .collect(),
                cache_expire: self.ddns_cache_expire,
                clean_interval: self.ddns_clean_interval,
                refresh_interval: self.ddns_refresh_interval,
            }),
            cname: Some(CnameGeneratorConfig {
                value: self.cname_value.clone(),
            }),
        }
    }

    /// Interval of the public IP cache janitor.
    #[must_use]
    pub fn cache_clean_interval(&self) -> Duration {
        Duration::from_secs(self.ddns_clean_interval.max(1))
    }

    /// Lifetime of a cached provider adapter.
    #[must_use]
    pub fn provider_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.provider_cache_ttl)
    }

    /// Timeout for backend HTTP requests.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
