// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for registries, provider backends and generators.
//!
//! Reconcilers work with `anyhow::Result` and attach context as errors bubble
//! up. The types here are the leaf errors that callers (and tests) want to
//! match on: a registry lookup that found nothing, a backend that rejected a
//! call, or a generator that could not produce records.

use thiserror::Error;

/// Errors raised when a registry has no factory or instance for a name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No generator factory or instance is registered under this name
    #[error("generator not found: {name}")]
    GeneratorNotFound {
        /// The generator name or type that was requested
        name: String,
    },

    /// No provider factory is registered for this provider type
    #[error("provider not found: {name}")]
    ProviderNotFound {
        /// The provider type that was requested
        name: String,
    },
}

/// Errors raised by provider adapters while talking to a DNS backend.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider spec does not carry the credentials its type needs
    #[error("{reason}")]
    MissingCredentials {
        /// Provider type (e.g. `CLOUDFLARE`)
        provider: String,
        /// What is missing
        reason: String,
    },

    /// The zone backing the provider domain does not exist in the account
    #[error("zone '{zone}' not found on {provider}")]
    ZoneNotFound {
        /// Provider type
        provider: String,
        /// Zone name that was looked up
        zone: String,
    },

    /// The backend answered with an error payload
    #[error("{provider} API error {code}: {message}")]
    Api {
        /// Provider type
        provider: String,
        /// Backend error code (HTTP status or vendor code)
        code: String,
        /// Backend error message
        message: String,
    },

    /// An update or delete was attempted without a backend record id
    #[error("record '{name}' has no backend id")]
    MissingRecordId {
        /// Record FQDN
        name: String,
    },
}

/// Errors raised by generators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// Every public IP endpoint failed or disagreed to the point of no answer
    #[error("can't get public ip")]
    NoPublicIp,
}

/// Errors raised by the status writer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Every attempt hit a resourceVersion conflict
    #[error("status update for {kind} {name} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        /// Resource kind
        kind: String,
        /// Resource namespace/name
        name: String,
        /// Attempts made
        attempts: u32,
    },
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
