// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSGenerator` registration.
//!
//! Each `DNSGenerator` is built through the generator registry and installed
//! under its object name, where Ingresses can select it with the
//! `dnsmanager.firestoned.io/generator` annotation. A spec that cannot be
//! built leaves the previous instance of that name in place.

use anyhow::Result;
use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::dnsprovider::{validity, validity_action};
use super::events::create_event;
use super::status::update_status;
use super::ReconcileError;
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_DNS_GENERATOR};
use crate::context::Context;
use crate::crd::DNSGenerator;
use crate::metrics;
use crate::status_reasons::{EVENT_TYPE_WARNING, REASON_ERROR};

/// Install one `DNSGenerator` and publish whether it could be built.
///
/// # Errors
///
/// Returns an error when the status cannot be written.
pub async fn reconcile_dnsgenerator(
    generator: Arc<DNSGenerator>,
    ctx: Arc<Context>,
) -> Result<Action> {
    let namespace = generator.namespace().unwrap_or_default();
    let name = generator.name_any();

    let installed = ctx.generators.install(&name, &generator.spec);
    let wanted = validity(&installed);
    match &installed {
        Ok(()) => info!(
            namespace,
            name,
            generator_type = %generator.spec.generator_type,
            "DNSGenerator registered"
        ),
        Err(e) => warn!(namespace, name, error = %format!("{e:#}"), "Unable to create generator"),
    }

    let api: Api<DNSGenerator> = Api::namespaced(ctx.client.clone(), &namespace);
    let written = update_status(&api, &name, |live: &DNSGenerator| {
        (live.status.as_ref() != Some(&wanted)).then(|| wanted.clone())
    })
    .await?;

    if written && !wanted.valid {
        let message = wanted.message.clone().unwrap_or_default();
        create_event(
            &ctx.client,
            generator.as_ref(),
            EVENT_TYPE_WARNING,
            REASON_ERROR,
            &message,
        )
        .await;
    }

    Ok(validity_action(&wanted))
}

async fn reconcile_dnsgenerator_wrapper(
    generator: Arc<DNSGenerator>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_dnsgenerator(generator.clone(), ctx).await {
        Ok(action) => {
            metrics::record_reconciliation_success(KIND_DNS_GENERATOR, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!(name = generator.name_any(), error = %format!("{e:#}"), "Failed to reconcile DNSGenerator");
            metrics::record_reconciliation_error(KIND_DNS_GENERATOR, start.elapsed());
            Err(e.into())
        }
    }
}

fn error_policy(_generator: Arc<DNSGenerator>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_DNS_GENERATOR, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the `DNSGenerator` controller.
///
/// # Errors
///
/// Never returns an error today; the signature matches the other controllers.
pub async fn run_dnsgenerator_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSGenerator controller");

    Controller::new(
        Api::<DNSGenerator>::all(ctx.client.clone()),
        watcher::Config::default(),
    )
    .run(reconcile_dnsgenerator_wrapper, error_policy, ctx)
    .for_each(|_| futures::future::ready(()))
    .await;

    Ok(())
}

#[cfg(test)]
#[path = "dnsgenerator_tests.rs"]
mod dnsgenerator_tests;
