// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public IPv4 discovery and the shared expiring cache used by DDNS generators.
//!
//! [`PublicIpResolver`] queries every configured "what is my IP" endpoint
//! concurrently and adjudicates the answers:
//!
//! 1. As soon as one address has been reported by at least half of the
//!    endpoints, it wins and the remaining requests are dropped.
//! 2. Otherwise the address with the most votes wins.
//! 3. If no endpoint produced an address, the first endpoint is retried once
//!    with a longer timeout.
//!
//! [`PublicIpCache`] is shared by every DDNS generator in the process. It
//! serializes lookups so that concurrent reconciliations do not fan out a
//! second round of discovery requests while one is already in flight.

use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::PUBLIC_IP_FALLBACK_TIMEOUT_MULTIPLIER;
use crate::metrics::record_public_ip_lookup;

/// Cache key under which the discovered IPv4 address is stored
pub const PUBLIC_IPV4_CACHE_KEY: &str = "public-ipv4";

/// Endpoints queried for the public IPv4 address
pub const DEFAULT_IPV4_APIS: &[&str] = &[
    "http://www.net.cn/static/customercare/yourip.asp",
    "http://ddns.oray.com/checkip",
    "http://speedtest.ecnu.edu.cn/getIP.php",
    "http://members.3322.org/dyndns/getip",
    "http://ifconfig.cc",
    "http://cip.cc",
    "https://v6r.ipip.net",
    "http://pv.sohu.com/cityjson?ie=utf-8",
    "http://whois.pconline.com.cn/ipJson.jsp",
    "http://ipba.cc",
    "http://v4.myip.la",
    "https://api.ipify.org",
    "http://ip-api.com",
    "http://whatismyip.akamai.com",
    "https://ip.cn/api/index?ip=&type=0",
];

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(25[0-5]|2[0-4]\d|[0-1]\d{2}|[1-9]?\d)\.(25[0-5]|2[0-4]\d|[0-1]\d{2}|[1-9]?\d)\.(25[0-5]|2[0-4]\d|[0-1]\d{2}|[1-9]?\d)\.(25[0-5]|2[0-4]\d|[0-1]\d{2}|[1-9]?\d)",
    )
    .unwrap()
});

/// Extract the first IPv4 address found anywhere in a response body.
#[must_use]
pub fn extract_ipv4(body: &str) -> Option<Ipv4Addr> {
    IPV4_PATTERN
        .find(body)
        .and_then(|m| m.as_str().parse::<Ipv4Addr>().ok())
}

/// Pick the winning address from a vote tally.
///
/// Highest count wins; equal counts go to the numerically lowest address so
/// that the outcome does not depend on hash map ordering.
#[must_use]
pub fn plurality(votes: &HashMap<Ipv4Addr, usize>) -> Option<Ipv4Addr> {
    votes
        .iter()
        .max_by(|(ip_a, count_a), (ip_b, count_b)| count_a.cmp(count_b).then(ip_b.cmp(ip_a)))
        .map(|(ip, _)| *ip)
}

/// Races a list of endpoints for the host's public IPv4 address.
#[derive(Clone, Debug)]
pub struct PublicIpResolver {
    http: reqwest::Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl PublicIpResolver {
    /// Resolver over [`DEFAULT_IPV4_APIS`] followed by `extra_apis`.
    #[must_use]
    pub fn new(http: reqwest::Client, timeout: Duration, extra_apis: &[String]) -> Self {
        let endpoints = DEFAULT_IPV4_APIS
            .iter()
            .map(ToString::to_string)
            .chain(extra_apis.iter().cloned())
            .collect();
        Self::with_endpoints(http, timeout, endpoints)
    }

    /// Resolver over exactly `endpoints`.
    #[must_use]
    pub fn with_endpoints(http: reqwest::Client, timeout: Duration, endpoints: Vec<String>) -> Self {
        Self {
            http,
            endpoints,
            timeout,
        }
    }

    /// Endpoints this resolver queries, in order.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Discover the public IPv4 address, or `None` if no endpoint answered.
    pub async fn resolve(&self) -> Option<Ipv4Addr> {
        let first = self.endpoints.first()?;
        let quorum = self.endpoints.len() / 2;

        let mut pending: FuturesUnordered<_> = self
            .endpoints
            .iter()
            .map(|endpoint| self.fetch(endpoint, self.timeout))
            .collect();

        let mut votes: HashMap<Ipv4Addr, usize> = HashMap::new();
        while let Some(answer) = pending.next().await {
            let Some(ip) = answer else {
                continue;
            };
            let count = votes.entry(ip).or_insert(0);
            *count += 1;
            if *count >= quorum {
                debug!(ip = %ip, votes = *count, "Public IP reached quorum");
                return Some(ip);
            }
        }

        if let Some(ip) = plurality(&votes) {
            debug!(ip = %ip, "Public IP chosen by plurality");
            return Some(ip);
        }

        warn!(
            endpoint = %first,
            "No public IP endpoint answered, retrying the first one with a longer timeout"
        );
        self.fetch(first, self.timeout * PUBLIC_IP_FALLBACK_TIMEOUT_MULTIPLIER)
            .await
    }

    async fn fetch(&self, endpoint: &str, timeout: Duration) -> Option<Ipv4Addr> {
        let response = match self.http.get(endpoint).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(endpoint, error = %e, "Public IP endpoint unreachable");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(endpoint, status = %response.status(), "Public IP endpoint returned error status");
            return None;
        }
        match response.text().await {
            Ok(body) => extract_ipv4(&body),
            Err(e) => {
                debug!(endpoint, error = %e, "Failed to read public IP response body");
                None
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CachedIp {
    ip: Ipv4Addr,
    expires_at: Instant,
}

/// Process-wide cache of discovered addresses.
///
/// Entries carry their own expiry, so generators with different
/// `cacheExpire` settings can share one cache.
#[derive(Debug, Default)]
pub struct PublicIpCache {
    entries: Mutex<HashMap<String, CachedIp>>,
}

impl PublicIpCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached, unexpired address under `key`.
    pub async fn get(&self, key: &str) -> Option<Ipv4Addr> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.ip)
    }

    /// Store `ip` under `key` for `ttl`.
    pub async fn insert(&self, key: &str, ip: Ipv4Addr, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CachedIp {
                ip,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Return the cached address, or run `resolver` and cache its answer.
    ///
    /// The cache lock is held across discovery so that concurrent callers
    /// wait for the in-flight lookup instead of starting their own.
    pub async fn get_or_resolve(
        &self,
        key: &str,
        ttl: Duration,
        resolver: &PublicIpResolver,
    ) -> Option<Ipv4Addr> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if let Some(entry) = entries.get(key).filter(|entry| now < entry.expires_at) {
            record_public_ip_lookup("cache_hit");
            return Some(entry.ip);
        }

        let Some(ip) = resolver.resolve().await else {
            record_public_ip_lookup("failed");
            return None;
        };
        record_public_ip_lookup("resolved");
        entries.insert(
            key.to_string(),
            CachedIp {
                ip,
                expires_at: Instant::now() + ttl,
            },
        );
        Some(ip)
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Spawn a task evicting expired entries every `interval`.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval = ?interval, "Starting public IP cache janitor");
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = cache.evict_expired().await;
                if evicted > 0 {
                    debug!(evicted, "Evicted expired public IP cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "public_ip_tests.rs"]
mod public_ip_tests;
