// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        DNSGenerator, DNSGeneratorSpec, DNSProviderSpec, DNSRecordSpec, DNSRecordStatus, GeneratorType,
        ProviderRef, ProviderType, RecordPhase, RecordType,
    };
    use kube::CustomResourceExt;
    use serde_json::json;

    fn spec(name: &str) -> DNSRecordSpec {
        DNSRecordSpec {
            record_type: RecordType::A,
            name: name.to_string(),
            value: "1.2.3.4".to_string(),
            ttl: None,
        }
    }

    #[test]
    fn test_matches_domain_requires_dot_boundary() {
        assert!(spec("a.example.com").matches_domain("example.com"));
        assert!(spec("a.b.example.com").matches_domain("example.com"));
        assert!(!spec("badexample.com").matches_domain("example.com"));
        assert!(!spec("example.com").matches_domain("example.com"));
        assert!(!spec("a.example.org").matches_domain("example.com"));
    }

    #[test]
    fn test_matches_domain_rejects_empty_domain() {
        assert!(!spec("a.example.com").matches_domain(""));
    }

    #[test]
    fn test_relative_name_strips_domain() {
        assert_eq!(spec("app.example.com").relative_name("example.com"), "app");
        assert_eq!(
            spec("a.b.example.com").relative_name("example.com"),
            "a.b"
        );
        assert_eq!(
            spec("a.sub.example.com").relative_name("sub.example.com"),
            "a"
        );
    }

    #[test]
    fn test_relative_name_keeps_unrelated_name() {
        assert_eq!(
            spec("app.example.org").relative_name("example.com"),
            "app.example.org"
        );
    }

    #[test]
    fn test_object_name_is_lowercase_hyphenated() {
        assert_eq!(spec("App.Example.COM").object_name(), "app-example-com");
        assert_eq!(spec(" a.example.com ").object_name(), "a-example-com");
    }

    #[test]
    fn test_record_spec_serializes_camel_case() {
        let value = serde_json::to_value(DNSRecordSpec {
            ttl: Some(120),
            ..spec("a.example.com")
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"recordType": "A", "name": "a.example.com", "value": "1.2.3.4", "ttl": 120})
        );
    }

    #[test]
    fn test_record_spec_omits_absent_ttl() {
        let value = serde_json::to_value(spec("a.example.com")).unwrap();
        assert!(value.get("ttl").is_none());
    }

    #[test]
    fn test_record_status_serializes_nulls_for_merge_patch() {
        let value = serde_json::to_value(DNSRecordStatus::default()).unwrap();
        assert!(value["providerRef"].is_null());
        assert!(value["phase"].is_null());
        assert!(value.as_object().unwrap().contains_key("providerRef"));
    }

    #[test]
    fn test_record_status_same_as_ignores_last_updated() {
        let a = DNSRecordStatus {
            phase: Some(RecordPhase::Success),
            message: Some("synced".to_string()),
            last_updated: Some("2025-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let b = DNSRecordStatus {
            last_updated: Some("2025-06-01T00:00:00Z".to_string()),
            ..a.clone()
        };
        assert!(a.same_as(&b));

        let c = DNSRecordStatus {
            phase: Some(RecordPhase::Failed),
            ..a.clone()
        };
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_provider_ref_display() {
        let with_ns = ProviderRef {
            namespace: Some("dns".to_string()),
            name: "cf".to_string(),
        };
        assert_eq!(with_ns.to_string(), "dns/cf");

        let without_ns = ProviderRef {
            namespace: None,
            name: "cf".to_string(),
        };
        assert_eq!(without_ns.to_string(), "cf");
    }

    #[test]
    fn test_provider_spec_deserializes_type_names() {
        let spec: DNSProviderSpec = serde_json::from_value(json!({
            "domainName": "example.com",
            "providerType": "CLOUDFLARE",
            "cloudflare": {"apiToken": "t"}
        }))
        .unwrap();
        assert_eq!(spec.provider_type, ProviderType::Cloudflare);
        let cf = spec.cloudflare.unwrap();
        assert_eq!(cf.api_token.as_deref(), Some("t"));
        assert!(!cf.proxied);
    }

    #[test]
    fn test_generator_spec_applies_ddns_defaults() {
        let spec: DNSGeneratorSpec = serde_json::from_value(json!({
            "generatorType": "DDNS",
            "ddns": {"refreshInterval": 120}
        }))
        .unwrap();
        assert_eq!(spec.generator_type, GeneratorType::DDNS);
        let ddns = spec.ddns.unwrap();
        assert_eq!(ddns.timeout, 2);
        assert_eq!(ddns.cache_expire, 60);
        assert_eq!(ddns.clean_interval, 30);
        assert_eq!(ddns.refresh_interval, 120);
        assert!(ddns.extra_apis.is_empty());
    }

    #[test]
    fn test_ddns_clean_interval_is_documented_as_operator_wide() {
        let crd = serde_json::to_string(&DNSGenerator::crd()).unwrap();
        assert!(crd.contains("cleanInterval"));
        assert!(crd.contains("--ddns-clean-interval"));
    }

    #[test]
    fn test_type_names_round_trip_as_str() {
        assert_eq!(RecordType::CNAME.to_string(), "CNAME");
        assert_eq!(ProviderType::Aliyun.to_string(), "ALIYUN");
        assert_eq!(GeneratorType::CNAME.as_str(), "CNAME");
        assert_eq!(RecordPhase::Matching.to_string(), "Matching");
    }
}
