// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `generators/mod.rs`

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::crd::{CnameGeneratorConfig, DNSGeneratorSpec, GeneratorType};
    use crate::dns_errors::RegistryError;
    use crate::generators::{GeneratorRegistry, GeneratorSource, SourceKind};
    use crate::public_ip::PublicIpCache;
    use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn defaults() -> GeneratorRegistry {
        GeneratorRegistry::with_defaults(reqwest::Client::new(), Arc::new(PublicIpCache::new()))
    }

    fn cname_spec(value: &str) -> DNSGeneratorSpec {
        DNSGeneratorSpec {
            generator_type: GeneratorType::CNAME,
            ddns: None,
            cname: Some(CnameGeneratorConfig {
                value: value.to_string(),
            }),
        }
    }

    #[test]
    fn test_install_defaults_registers_one_per_type() {
        let registry = defaults();
        let config = Config {
            ddns_refresh_interval: 42,
            ..Config::default()
        };
        registry.install_defaults(&config).unwrap();

        assert_eq!(registry.names(), vec!["CNAME", "DDNS"]);
        let ddns = registry.get("DDNS").unwrap();
        assert_eq!(
            ddns.requeue_after(SourceKind::Ingress),
            Duration::from_secs(42)
        );
    }

    #[test]
    fn test_install_replaces_named_instance() {
        let registry = defaults();
        registry.install("edge", &cname_spec("a.example.net")).unwrap();
        registry
            .install(
                "edge",
                &DNSGeneratorSpec {
                    generator_type: GeneratorType::DDNS,
                    ddns: None,
                    cname: None,
                },
            )
            .unwrap();

        assert_eq!(registry.names(), vec!["edge"]);
        assert_eq!(
            registry
                .get("edge")
                .unwrap()
                .requeue_after(SourceKind::Ingress),
            Duration::from_secs(crate::constants::DEFAULT_DDNS_REFRESH_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_unknown_type_is_generator_not_found() {
        let registry = GeneratorRegistry::new();
        let err = registry.install("edge", &cname_spec("x")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RegistryError>(),
            Some(&RegistryError::GeneratorNotFound {
                name: "CNAME".to_string()
            })
        );
        assert!(registry.get("edge").is_none());
    }

    #[test]
    fn test_get_missing_name() {
        assert!(defaults().get("nope").is_none());
    }

    #[test]
    fn test_source_accessors() {
        let mut ingress = Ingress::default();
        ingress.metadata.annotations = Some(BTreeMap::from([(
            "dnsmanager.firestoned.io/generator".to_string(),
            "DDNS".to_string(),
        )]));
        ingress.spec = Some(IngressSpec {
            rules: Some(vec![
                IngressRule {
                    host: Some("a.example.com".to_string()),
                    http: None,
                },
                IngressRule {
                    host: None,
                    http: None,
                },
            ]),
            ..IngressSpec::default()
        });

        let source = GeneratorSource::Ingress(&ingress);
        assert_eq!(source.kind(), SourceKind::Ingress);
        assert_eq!(source.hosts(), vec!["a.example.com"]);
        assert_eq!(
            source.annotation("dnsmanager.firestoned.io/generator"),
            Some("DDNS")
        );
        assert_eq!(source.annotation("missing"), None);
        assert_eq!(SourceKind::Ingress.to_string(), "Ingress");
    }
}
