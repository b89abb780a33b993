// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record generators: strategies that turn a routing object into the
//! `DNSRecord` specs it should publish.
//!
//! Generators are looked up by name in the [`GeneratorRegistry`]. Names come
//! from `DNSGenerator` objects (installed by the `DNSGenerator` reconciler) and
//! from the process defaults registered at startup, one per
//! [`GeneratorType`] and named after it (`DDNS`, `CNAME`).
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_manager::config::Config;
//! use dns_manager::generators::GeneratorRegistry;
//! use dns_manager::public_ip::PublicIpCache;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let registry = GeneratorRegistry::with_defaults(reqwest::Client::new(), Arc::new(PublicIpCache::new()));
//! registry.install_defaults(&Config::default())?;
//! assert!(registry.get("DDNS").is_some());
//! # Ok(())
//! # }
//! ```

pub mod cname;
pub mod ddns;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::constants::KIND_INGRESS;
use crate::crd::{DNSGeneratorSpec, DNSRecordSpec, GeneratorType};
use crate::dns_errors::RegistryError;
use crate::public_ip::PublicIpCache;

/// Kinds of objects a generator can derive records from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Ingress,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => f.write_str(KIND_INGRESS),
        }
    }
}

/// The object records are generated from.
#[derive(Clone, Copy, Debug)]
pub enum GeneratorSource<'a> {
    Ingress(&'a Ingress),
}

impl GeneratorSource<'_> {
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Ingress(_) => SourceKind::Ingress,
        }
    }

    /// Annotation value on the source object.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        match self {
            Self::Ingress(ingress) => ingress
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(key))
                .map(String::as_str),
        }
    }

    /// Hostnames the source routes, in rule order. Rules without a host are
    /// skipped.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        match self {
            Self::Ingress(ingress) => ingress
                .spec
                .as_ref()
                .and_then(|s| s.rules.as_ref())
                .map(|rules| {
                    rules
                        .iter()
                        .filter_map(|rule| rule.host.clone())
                        .filter(|host| !host.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Surfaces generator outcomes on the source object.
///
/// Implementations emit a Kubernetes Event (Warning when `error` is set) and
/// log the message.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, reason: &str, message: &str, error: Option<&anyhow::Error>);
}

/// Strategy producing record specs from a source object.
#[async_trait]
pub trait RecordGenerator: Send + Sync {
    /// Desired records for `source`.
    ///
    /// A generator may report a problem through `reporter` and return no
    /// records instead of failing.
    async fn generate(
        &self,
        source: GeneratorSource<'_>,
        reporter: &dyn Reporter,
    ) -> Result<Vec<DNSRecordSpec>>;

    /// Whether this generator understands `kind`.
    fn supports(&self, kind: SourceKind) -> bool;

    /// How long until `kind` sources should be regenerated. Zero means only
    /// on change.
    fn requeue_after(&self, kind: SourceKind) -> Duration;
}

/// Builds a generator from a `DNSGenerator` spec.
pub trait GeneratorFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the generator configuration cannot produce a working generator.
    fn build(&self, spec: &DNSGeneratorSpec) -> Result<Arc<dyn RecordGenerator>>;
}

/// Generator factories by type and live generator instances by name.
pub struct GeneratorRegistry {
    factories: HashMap<GeneratorType, Arc<dyn GeneratorFactory>>,
    instances: RwLock<HashMap<String, Arc<dyn RecordGenerator>>>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorRegistry {
    /// Registry without factories or instances.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the DDNS and CNAME factories. DDNS generators share
    /// `ip_cache`.
    #[must_use]
    pub fn with_defaults(http: reqwest::Client, ip_cache: Arc<PublicIpCache>) -> Self {
        let mut registry = Self::new();
        registry.register_factory(
            GeneratorType::DDNS,
            Arc::new(ddns::DdnsFactory::new(http, ip_cache)),
        );
        registry.register_factory(GeneratorType::CNAME, Arc::new(cname::CnameFactory));
        registry
    }

    /// Register (or replace) the factory for `generator_type`.
    pub fn register_factory(
        &mut self,
        generator_type: GeneratorType,
        factory: Arc<dyn GeneratorFactory>,
    ) {
        self.factories.insert(generator_type, factory);
    }

    /// Build a generator from `spec` without registering it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::GeneratorNotFound`] when no factory handles the
    /// type, or the factory's own error.
    pub fn build(&self, spec: &DNSGeneratorSpec) -> Result<Arc<dyn RecordGenerator>> {
        let factory = self.factories.get(&spec.generator_type).ok_or_else(|| {
            RegistryError::GeneratorNotFound {
                name: spec.generator_type.as_str().to_string(),
            }
        })?;
        factory.build(spec)
    }

    /// Build a generator from `spec` and make it available as `name`,
    /// replacing any previous instance of that name.
    ///
    /// # Errors
    ///
    /// Same as [`GeneratorRegistry::build`]; on error the previous instance
    /// stays in place.
    pub fn install(&self, name: &str, spec: &DNSGeneratorSpec) -> Result<()> {
        let generator = self.build(spec)?;
        self.write_instances().insert(name.to_string(), generator);
        info!(generator = name, generator_type = %spec.generator_type, "Installed generator");
        Ok(())
    }

    /// Install the process-default generator of every registered type.
    ///
    /// # Errors
    ///
    /// Returns the first construction error.
    pub fn install_defaults(&self, config: &Config) -> Result<()> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        for generator_type in types {
            self.install(
                generator_type.as_str(),
                &config.default_generator_spec(generator_type),
            )?;
        }
        Ok(())
    }

    /// Generator instance named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn RecordGenerator>> {
        self.read_instances().get(name).cloned()
    }

    /// Names of all installed generators, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read_instances().keys().cloned().collect();
        names.sort();
        names
    }

    fn read_instances(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn RecordGenerator>>> {
        self.instances
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_instances(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn RecordGenerator>>> {
        self.instances
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Record specs with one entry per host.
pub(crate) fn records_for_hosts(
    hosts: Vec<String>,
    record_type: crate::crd::RecordType,
    value: &str,
) -> Vec<DNSRecordSpec> {
    hosts
        .into_iter()
        .map(|name| DNSRecordSpec {
            record_type,
            name,
            value: value.to_string(),
            ttl: None,
        })
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
