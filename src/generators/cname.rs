// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Alias generator: one CNAME per host pointing at a fixed target.
//!
//! The target is taken from the `dnsmanager.firestoned.io/cname` annotation on
//! the source when that annotation is present (even empty), otherwise from the
//! generator's configured value.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{
    records_for_hosts, GeneratorFactory, GeneratorSource, RecordGenerator, Reporter, SourceKind,
};
use crate::crd::{DNSGeneratorSpec, DNSRecordSpec, RecordType};
use crate::labels::ANNOTATION_CNAME;
use crate::status_reasons::REASON_ERROR;

/// Builds [`CnameGenerator`]s.
pub struct CnameFactory;

impl GeneratorFactory for CnameFactory {
    fn build(&self, spec: &DNSGeneratorSpec) -> Result<Arc<dyn RecordGenerator>> {
        let value = spec
            .cname
            .as_ref()
            .map(|c| c.value.clone())
            .unwrap_or_default();
        Ok(Arc::new(CnameGenerator::new(value)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CnameGenerator {
    value: String,
}

impl CnameGenerator {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Configured fallback target.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[async_trait]
impl RecordGenerator for CnameGenerator {
    async fn generate(
        &self,
        source: GeneratorSource<'_>,
        reporter: &dyn Reporter,
    ) -> Result<Vec<DNSRecordSpec>> {
        let target = source
            .annotation(ANNOTATION_CNAME)
            .unwrap_or(self.value.as_str());
        if target.is_empty() {
            reporter
                .report(
                    REASON_ERROR,
                    &format!("generate cname record error, annotation {ANNOTATION_CNAME} not found"),
                    None,
                )
                .await;
            return Ok(Vec::new());
        }

        Ok(records_for_hosts(source.hosts(), RecordType::CNAME, target))
    }

    fn supports(&self, kind: SourceKind) -> bool {
        matches!(kind, SourceKind::Ingress)
    }

    fn requeue_after(&self, _kind: SourceKind) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
#[path = "cname_tests.rs"]
mod cname_tests;
