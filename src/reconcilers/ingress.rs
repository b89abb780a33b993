// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Projection of `Ingress` hosts into owned `DNSRecord` objects.
//!
//! The generator selected by the Ingress turns its hosts into desired record
//! specs. [`plan_record_changes`] diffs them against the records in the
//! Ingress namespace and the driver applies the plan:
//!
//! - desired records that do not exist are created, owned by the Ingress
//! - owned records that drifted are replaced
//! - owned records no longer desired are deleted
//! - records controlled by another owner are never touched
//!
//! Deleting the Ingress needs no work here; the API server cascades the
//! owned records through their controller owner reference.

use anyhow::{Context as _, Result};
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, ListParams, ObjectMeta, PostParams};
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::events::{create_event, EventReporter};
use super::retry::retry_api_call;
use super::ReconcileError;
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_INGRESS, RETRY_INTERVAL_SECS};
use crate::context::Context;
use crate::crd::{DNSRecord, DNSRecordSpec};
use crate::generators::{GeneratorSource, Reporter};
use crate::labels::{
    ANNOTATION_GENERATOR, K8S_MANAGED_BY, MANAGED_BY_DNS_MANAGER, RECORD_ANNOTATION_PREFIX,
};
use crate::metrics;
use crate::status_reasons::{
    EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING, REASON_ERROR, REASON_RECORD_CONFLICT,
    REASON_RECORD_CREATED, REASON_RECORD_DELETED, REASON_RECORD_UPDATED, REASON_WARNING,
};

const MSG_NO_GENERATOR: &str = "no generator found";
const MSG_GENERATOR_UNSUPPORTED: &str = "generator not support ingress";
const MSG_GENERATOR_ERROR: &str = "generator error";
const MSG_RECORD_CREATED: &str = "dns record created";
const MSG_RECORD_UPDATED: &str = "dns record updated";
const MSG_RECORD_DELETED: &str = "dns record deleted";

/// One step of a projection plan.
#[derive(Clone, Debug)]
pub enum RecordChange {
    /// Create this record.
    Create(DNSRecord),
    /// Replace the live record with this one (metadata carries the
    /// resourceVersion read during planning).
    Update(DNSRecord),
    /// Delete the owned record with this object name.
    Delete(String),
    /// A record with this object name exists but another owner controls it.
    Foreign(String),
}

/// Generator selected by `ingress`, if any.
///
/// The annotation wins even when empty; an empty result means the Ingress is
/// not managed.
#[must_use]
pub fn generator_name(ingress: &Ingress, default_generator: &str) -> Option<String> {
    let name = ingress
        .annotations()
        .get(ANNOTATION_GENERATOR)
        .map_or(default_generator, String::as_str);
    (!name.is_empty()).then(|| name.to_string())
}

/// Keys of `source` starting with the record prefix.
#[must_use]
pub fn carried_metadata(source: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    source
        .iter()
        .filter(|(key, _)| key.starts_with(RECORD_ANNOTATION_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Labels every projected record carries.
#[must_use]
pub fn projected_labels(ingress: &Ingress) -> BTreeMap<String, String> {
    let mut labels = carried_metadata(ingress.labels());
    labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_DNS_MANAGER.to_string());
    labels
}

fn controller_uid(record: &DNSRecord) -> Option<&str> {
    record
        .owner_references()
        .iter()
        .find(|owner| owner.controller == Some(true))
        .map(|owner| owner.uid.as_str())
}

fn is_owned_by(record: &DNSRecord, owner_uid: &str) -> bool {
    controller_uid(record) == Some(owner_uid)
}

/// Owner references of `existing` with `controller` as the only controller.
fn owner_references_with(
    existing: &[OwnerReference],
    controller: &OwnerReference,
) -> Vec<OwnerReference> {
    existing
        .iter()
        .filter(|owner| owner.controller != Some(true) && owner.uid != controller.uid)
        .cloned()
        .chain(std::iter::once(controller.clone()))
        .collect()
}

/// Diff the desired record specs of `ingress` against the records of its
/// namespace.
///
/// `existing` is every `DNSRecord` in the Ingress namespace. Duplicate
/// desired specs (same object name) are planned once, first one wins.
#[must_use]
pub fn plan_record_changes(
    ingress: &Ingress,
    desired: &[DNSRecordSpec],
    existing: &[DNSRecord],
) -> Vec<RecordChange> {
    let Some(owner) = ingress.controller_owner_ref(&()) else {
        return Vec::new();
    };
    let namespace = ingress.namespace();
    let labels = projected_labels(ingress);
    let annotations = carried_metadata(ingress.annotations());

    let by_name: BTreeMap<String, &DNSRecord> = existing
        .iter()
        .map(|record| (record.name_any(), record))
        .collect();

    let mut changes = Vec::new();
    let mut wanted_names = HashSet::new();

    for spec in desired {
        let name = spec.object_name();
        if !wanted_names.insert(name.clone()) {
            continue;
        }

        match by_name.get(&name) {
            None => {
                let record = DNSRecord {
                    metadata: ObjectMeta {
                        name: Some(name),
                        namespace: namespace.clone(),
                        labels: Some(labels.clone()),
                        annotations: Some(annotations.clone()),
                        owner_references: Some(vec![owner.clone()]),
                        ..Default::default()
                    },
                    spec: spec.clone(),
                    status: None,
                };
                changes.push(RecordChange::Create(record));
            }
            Some(live) => {
                if controller_uid(live).is_some_and(|uid| uid != owner.uid) {
                    changes.push(RecordChange::Foreign(name));
                    continue;
                }
                let in_sync = live.spec == *spec
                    && live.labels() == &labels
                    && live.annotations() == &annotations
                    && is_owned_by(live, &owner.uid);
                if in_sync {
                    continue;
                }

                let mut record = (*live).clone();
                record.spec = spec.clone();
                record.metadata.labels = Some(labels.clone());
                record.metadata.annotations = Some(annotations.clone());
                record.metadata.owner_references =
                    Some(owner_references_with(live.owner_references(), &owner));
                record.status = None;
                changes.push(RecordChange::Update(record));
            }
        }
    }

    for record in existing {
        let name = record.name_any();
        if is_owned_by(record, &owner.uid) && !wanted_names.contains(&name) {
            changes.push(RecordChange::Delete(name));
        }
    }

    changes
}

/// Project one `Ingress` into `DNSRecord` objects.
///
/// # Errors
///
/// Returns generator errors and Kubernetes API errors; the error policy
/// requeues the Ingress.
pub async fn reconcile_ingress(ingress: Arc<Ingress>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = ingress.namespace().unwrap_or_default();
    let name = ingress.name_any();

    if ingress.metadata.deletion_timestamp.is_some() {
        debug!(namespace, name, "Ingress is being deleted, nothing to project");
        return Ok(Action::await_change());
    }

    let Some(selected) = generator_name(&ingress, &ctx.config.default_generator) else {
        debug!(namespace, name, "Ingress ignored");
        return Ok(Action::await_change());
    };

    let reporter = EventReporter::new(ctx.client.clone(), ingress.as_ref());
    let source = GeneratorSource::Ingress(ingress.as_ref());

    let Some(generator) = ctx.generators.get(&selected) else {
        reporter.report(REASON_WARNING, MSG_NO_GENERATOR, None).await;
        return Ok(Action::requeue(Duration::from_secs(RETRY_INTERVAL_SECS)));
    };
    if !generator.supports(source.kind()) {
        reporter
            .report(REASON_WARNING, MSG_GENERATOR_UNSUPPORTED, None)
            .await;
        return Ok(Action::await_change());
    }

    let desired = match generator.generate(source, &reporter).await {
        Ok(desired) => desired,
        Err(e) => {
            reporter
                .report(REASON_ERROR, MSG_GENERATOR_ERROR, Some(&e))
                .await;
            return Err(e);
        }
    };

    let api: Api<DNSRecord> = Api::namespaced(ctx.client.clone(), &namespace);
    let lp = ListParams::default();
    let existing = retry_api_call(
        || api.list(&lp),
        &format!("list DNSRecords in {namespace}"),
    )
    .await?;

    let changes = plan_record_changes(&ingress, &desired, &existing.items);
    for change in &changes {
        apply_change(&ctx.client, &api, ingress.as_ref(), change).await?;
    }

    info!(
        namespace,
        name,
        generator = selected,
        desired = desired.len(),
        changes = changes.len(),
        "Ingress reconciled"
    );

    let requeue_after = generator.requeue_after(source.kind());
    if requeue_after.is_zero() {
        Ok(Action::await_change())
    } else {
        Ok(Action::requeue(requeue_after))
    }
}

async fn apply_change(
    client: &Client,
    api: &Api<DNSRecord>,
    ingress: &Ingress,
    change: &RecordChange,
) -> Result<()> {
    match change {
        RecordChange::Create(record) => {
            let name = record.name_any();
            api.create(&PostParams::default(), record)
                .await
                .with_context(|| format!("create dns record {name} error"))?;
            info!(record = name, value = %record.spec.value, "{MSG_RECORD_CREATED}");
            metrics::record_projection("create");
            create_event(client, ingress, EVENT_TYPE_NORMAL, REASON_RECORD_CREATED, MSG_RECORD_CREATED)
                .await;
        }
        RecordChange::Update(record) => {
            let name = record.name_any();
            api.replace(&name, &PostParams::default(), record)
                .await
                .with_context(|| format!("update dns record {name} error"))?;
            info!(record = name, value = %record.spec.value, "{MSG_RECORD_UPDATED}");
            metrics::record_projection("update");
            create_event(client, ingress, EVENT_TYPE_NORMAL, REASON_RECORD_UPDATED, MSG_RECORD_UPDATED)
                .await;
        }
        RecordChange::Delete(name) => {
            match api.delete(name, &DeleteParams::default()).await {
                Ok(_) => {}
                Err(kube::Error::Api(e)) if e.code == 404 => {
                    debug!(record = name, "DNSRecord already gone");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("delete dns record {name} error"));
                }
            }
            info!(record = name, "{MSG_RECORD_DELETED}");
            metrics::record_projection("delete");
            create_event(client, ingress, EVENT_TYPE_NORMAL, REASON_RECORD_DELETED, MSG_RECORD_DELETED)
                .await;
        }
        RecordChange::Foreign(name) => {
            let message = format!("dns record {name} is controlled by another owner, skipped");
            warn!(record = name, "{message}");
            create_event(client, ingress, EVENT_TYPE_WARNING, REASON_RECORD_CONFLICT, &message)
                .await;
        }
    }
    Ok(())
}

async fn reconcile_ingress_wrapper(
    ingress: Arc<Ingress>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_ingress(ingress.clone(), ctx).await {
        Ok(action) => {
            metrics::record_reconciliation_success(KIND_INGRESS, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!(
                namespace = ingress.namespace().unwrap_or_default(),
                name = ingress.name_any(),
                error = %format!("{e:#}"),
                "Failed to reconcile Ingress"
            );
            metrics::record_reconciliation_error(KIND_INGRESS, start.elapsed());
            Err(e.into())
        }
    }
}

fn error_policy(_ingress: Arc<Ingress>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_INGRESS, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the `Ingress` controller.
///
/// Changes to owned `DNSRecord`s requeue their Ingress, so hand edits to
/// projected records are reverted.
///
/// # Errors
///
/// Never returns an error today; the signature matches the other controllers.
pub async fn run_ingress_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting Ingress controller");

    let client = ctx.client.clone();
    Controller::new(Api::<Ingress>::all(client.clone()), watcher::Config::default())
        .owns(Api::<DNSRecord>::all(client), watcher::Config::default())
        .run(reconcile_ingress_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
