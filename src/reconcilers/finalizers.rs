// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! Finalizers are written with a JSON merge patch of the full
//! `metadata.finalizers` list. Both operations are idempotent and skip the
//! API call when the list already has the wanted shape.
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_manager::crd::DNSRecord;
//! use dns_manager::labels::FINALIZER_DNS_RECORD;
//! use dns_manager::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//! use kube::Client;
//!
//! # async fn example(client: Client, record: DNSRecord) -> anyhow::Result<()> {
//! ensure_finalizer(&client, &record, FINALIZER_DNS_RECORD).await?;
//! // ... backend record deleted ...
//! remove_finalizer(&client, &record, FINALIZER_DNS_RECORD).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Debug;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<K: Resource>(resource: &K, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Finalizer list of `resource` with `finalizer` appended, or `None` if it is
/// already there.
#[must_use]
pub fn finalizers_with<K: Resource>(resource: &K, finalizer: &str) -> Option<Vec<String>> {
    if has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list of `resource` without `finalizer`, or `None` if it is not
/// there.
#[must_use]
pub fn finalizers_without<K: Resource>(resource: &K, finalizer: &str) -> Option<Vec<String>> {
    if !has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);
    Some(finalizers)
}

async fn patch_finalizers<K>(client: &Client, resource: &K, finalizers: &[String]) -> Result<()>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + Debug
        + DeserializeOwned,
{
    let namespace = resource.namespace().unwrap_or_default();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&resource.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Add `finalizer` to `resource` if missing.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<K>(client: &Client, resource: &K, finalizer: &str) -> Result<()>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + Debug
        + DeserializeOwned,
{
    if let Some(finalizers) = finalizers_with(resource, finalizer) {
        patch_finalizers(client, resource, &finalizers).await?;
        info!(
            kind = %K::kind(&()),
            namespace = resource.namespace().unwrap_or_default(),
            name = resource.name_any(),
            finalizer,
            "Added finalizer"
        );
    }
    Ok(())
}

/// Remove `finalizer` from `resource` if present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<K>(client: &Client, resource: &K, finalizer: &str) -> Result<()>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + Debug
        + DeserializeOwned,
{
    if let Some(finalizers) = finalizers_without(resource, finalizer) {
        patch_finalizers(client, resource, &finalizers).await?;
        info!(
            kind = %K::kind(&()),
            namespace = resource.namespace().unwrap_or_default(),
            name = resource.name_any(),
            finalizer,
            "Removed finalizer"
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
