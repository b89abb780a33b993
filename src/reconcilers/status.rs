// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status subresource writes with optimistic concurrency.
//!
//! Every status write is a JSON merge patch carrying the
//! `metadata.resourceVersion` of the object it was computed from. When the
//! object changed in between, the API server answers 409 and the write is
//! recomputed against a fresh copy, up to
//! [`MAX_STATUS_UPDATE_ATTEMPTS`] times.
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_manager::crd::{DNSProvider, ValidityStatus};
//! use dns_manager::reconcilers::status::update_status;
//! use kube::{Api, Client};
//!
//! # async fn example(client: Client) -> anyhow::Result<()> {
//! let api: Api<DNSProvider> = Api::namespaced(client, "dns-system");
//! let wanted = ValidityStatus { valid: true, message: Some("ok".to_string()) };
//! update_status(&api, "example-com", |current: &DNSProvider| {
//!     (current.status.as_ref() != Some(&wanted)).then(|| wanted.clone())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use tracing::{debug, warn};

use super::retry::retry_api_call;
use crate::constants::MAX_STATUS_UPDATE_ATTEMPTS;
use crate::dns_errors::StatusError;

/// Merge patch writing `status`, preconditioned on `resource_version`.
#[must_use]
pub fn status_patch<S: Serialize>(resource_version: Option<&str>, status: &S) -> Value {
    match resource_version {
        Some(rv) => json!({
            "metadata": { "resourceVersion": rv },
            "status": status,
        }),
        None => json!({ "status": status }),
    }
}

/// Whether the API server rejected a write because the object changed.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

/// Write the status computed by `compute` from the live object.
///
/// `compute` returns `None` when the live status is already what it should
/// be, in which case nothing is written. Returns whether a write happened.
///
/// # Errors
///
/// Returns the API error of a failed read or write, or
/// [`StatusError::ConflictRetriesExhausted`] when every attempt conflicted.
pub async fn update_status<K, S, F>(api: &Api<K>, name: &str, mut compute: F) -> Result<bool>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    S: Serialize,
    F: FnMut(&K) -> Option<S>,
{
    for attempt in 1..=MAX_STATUS_UPDATE_ATTEMPTS {
        let current = retry_api_call(|| api.get(name), &format!("get {} {name}", K::kind(&())))
            .await?;
        let Some(status) = compute(&current) else {
            debug!(kind = %K::kind(&()), name, "Status unchanged, skipping update");
            return Ok(false);
        };

        let patch = status_patch(current.resource_version().as_deref(), &status);
        match api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                debug!(kind = %K::kind(&()), name, attempt, "Updated status");
                return Ok(true);
            }
            Err(e) if is_conflict(&e) => {
                warn!(kind = %K::kind(&()), name, attempt, "Status update conflicted, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StatusError::ConflictRetriesExhausted {
        kind: K::kind(&()).to_string(),
        name: name.to_string(),
        attempts: MAX_STATUS_UPDATE_ATTEMPTS,
    }
    .into())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
