// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS backend adapters and the registry that builds them.
//!
//! A [`DnsProvider`] performs record CRUD against one external DNS service for
//! one domain. Adapters are never constructed directly by reconcilers: they
//! ask the [`ProviderRegistry`], which maps each [`ProviderType`] to a
//! [`ProviderFactory`] and keeps constructed adapters for a bounded time.
//!
//! # Adapter cache
//!
//! Building an adapter validates credentials against the live backend (and,
//! for Cloudflare, resolves the zone), so adapters are cached per
//! `DNSProvider` object. An entry is reused while:
//!
//! - the object's `metadata.generation` is unchanged, and
//! - the entry is younger than the configured TTL.
//!
//! Any spec edit bumps the generation and forces a rebuild on next use.

pub mod aliyun;
pub mod cloudflare;

use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::crd::{DNSProvider, DNSProviderSpec, DNSRecord, DNSRecordSpec, ProviderType};
use crate::dns_errors::RegistryError;
use crate::metrics::record_backend_operation;

/// Record CRUD against one DNS backend.
///
/// Every method receives the whole `DNSRecord` so adapters can read
/// backend-specific annotations and the remembered `status.recordId`.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Find the backend record, returning its id.
    ///
    /// Implementations try `status.recordId` first and fall back to a lookup
    /// by name.
    async fn search(&self, record: &DNSRecord) -> Result<Option<String>>;

    /// Create the record and return its backend id.
    async fn create(&self, record: &DNSRecord) -> Result<String>;

    /// Bring the backend record `id` in line with `record`.
    ///
    /// Must not write when the backend already matches.
    async fn update(&self, record: &DNSRecord, id: &str) -> Result<()>;

    /// Delete the backend record `id`.
    async fn delete(&self, record: &DNSRecord, id: &str) -> Result<()>;
}

/// Builds a [`DnsProvider`] from a `DNSProvider` spec.
///
/// Construction must fail fast when credentials are missing or rejected.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn build(&self, spec: &DNSProviderSpec) -> Result<Arc<dyn DnsProvider>>;
}

/// Adapter wrapper counting backend calls by type, operation and outcome.
struct InstrumentedProvider {
    provider_type: ProviderType,
    inner: Arc<dyn DnsProvider>,
}

impl InstrumentedProvider {
    fn observe<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        record_backend_operation(self.provider_type.as_str(), operation, result.is_ok());
        result
    }
}

#[async_trait]
impl DnsProvider for InstrumentedProvider {
    async fn search(&self, record: &DNSRecord) -> Result<Option<String>> {
        let result = self.inner.search(record).await;
        self.observe("search", result)
    }

    async fn create(&self, record: &DNSRecord) -> Result<String> {
        let result = self.inner.create(record).await;
        self.observe("create", result)
    }

    async fn update(&self, record: &DNSRecord, id: &str) -> Result<()> {
        let result = self.inner.update(record, id).await;
        self.observe("update", result)
    }

    async fn delete(&self, record: &DNSRecord, id: &str) -> Result<()> {
        let result = self.inner.delete(record, id).await;
        self.observe("delete", result)
    }
}

struct CachedAdapter {
    generation: Option<i64>,
    built_at: Instant,
    adapter: Arc<dyn DnsProvider>,
}

/// Maps provider types to factories and caches constructed adapters.
///
/// The factory map is fixed once the registry is shared; only the adapter
/// cache changes at runtime.
pub struct ProviderRegistry {
    factories: HashMap<ProviderType, Arc<dyn ProviderFactory>>,
    adapters: Mutex<HashMap<String, CachedAdapter>>,
    cache_ttl: Duration,
}

impl ProviderRegistry {
    /// Empty registry whose adapters live for `cache_ttl`.
    #[must_use]
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            factories: HashMap::new(),
            adapters: Mutex::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Registry with the Aliyun and Cloudflare factories against their
    /// public endpoints.
    #[must_use]
    pub fn with_defaults(http: reqwest::Client, cache_ttl: Duration) -> Self {
        let mut registry = Self::new(cache_ttl);
        registry.register(
            ProviderType::Aliyun,
            Arc::new(aliyun::AliyunFactory::new(http.clone())),
        );
        registry.register(
            ProviderType::Cloudflare,
            Arc::new(cloudflare::CloudflareFactory::new(http)),
        );
        registry
    }

    /// Register (or replace) the factory for `provider_type`.
    pub fn register(&mut self, provider_type: ProviderType, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(provider_type, factory);
    }

    /// Provider types with a registered factory.
    #[must_use]
    pub fn registered_types(&self) -> Vec<ProviderType> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    /// Build a fresh adapter for `spec`, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ProviderNotFound`] for an unregistered type,
    /// or the factory's construction error.
    pub async fn build(&self, spec: &DNSProviderSpec) -> Result<Arc<dyn DnsProvider>> {
        let factory = self.factories.get(&spec.provider_type).ok_or_else(|| {
            RegistryError::ProviderNotFound {
                name: spec.provider_type.as_str().to_string(),
            }
        })?;
        let inner = factory.build(spec).await?;
        Ok(Arc::new(InstrumentedProvider {
            provider_type: spec.provider_type,
            inner,
        }))
    }

    /// Adapter for `provider`, reusing a cached one when still fresh.
    ///
    /// # Errors
    ///
    /// Same as [`ProviderRegistry::build`].
    pub async fn adapter_for(&self, provider: &DNSProvider) -> Result<Arc<dyn DnsProvider>> {
        let key = cache_key(provider);
        let generation = provider.metadata.generation;

        if let Some(adapter) = self.cached(&key, generation) {
            return Ok(adapter);
        }

        let adapter = self.build(&provider.spec).await?;
        debug!(provider = %key, ?generation, "Built provider adapter");
        self.lock_adapters().insert(
            key,
            CachedAdapter {
                generation,
                built_at: Instant::now(),
                adapter: Arc::clone(&adapter),
            },
        );
        Ok(adapter)
    }

    /// Drop the cached adapter of the provider `namespace/name`.
    pub fn invalidate(&self, namespace: &str, name: &str) {
        self.lock_adapters().remove(&format!("{namespace}/{name}"));
    }

    fn cached(&self, key: &str, generation: Option<i64>) -> Option<Arc<dyn DnsProvider>> {
        let adapters = self.lock_adapters();
        adapters
            .get(key)
            .filter(|entry| entry.generation == generation)
            .filter(|entry| entry.built_at.elapsed() < self.cache_ttl)
            .map(|entry| Arc::clone(&entry.adapter))
    }

    fn lock_adapters(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedAdapter>> {
        // A poisoned cache only holds adapters; keep using it.
        self.adapters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn cache_key(provider: &DNSProvider) -> String {
    format!(
        "{}/{}",
        provider.namespace().unwrap_or_default(),
        provider.name_any()
    )
}

/// Pick the provider whose domain covers `record`.
///
/// Among all dot-boundary suffix matches the longest `domainName` wins, so
/// `dev.example.com` beats `example.com` for `app.dev.example.com`. Equal
/// lengths fall back to `(namespace, name)` order.
#[must_use]
pub fn select_provider<'a>(
    record: &DNSRecordSpec,
    providers: &'a [DNSProvider],
) -> Option<&'a DNSProvider> {
    providers
        .iter()
        .filter(|provider| record.matches_domain(&provider.spec.domain_name))
        .min_by(|a, b| {
            b.spec
                .domain_name
                .len()
                .cmp(&a.spec.domain_name.len())
                .then_with(|| a.namespace().cmp(&b.namespace()))
                .then_with(|| a.name_any().cmp(&b.name_any()))
        })
}
