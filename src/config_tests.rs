// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::crd::GeneratorType;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_parse_without_flags_matches_default() {
        let parsed = Config::try_parse_from(["dns-manager"]).unwrap();
        assert_eq!(parsed.default_record_ttl, 300);
        assert_eq!(parsed.default_generator, "");
        assert_eq!(parsed.ddns_timeout, 2);
        assert_eq!(parsed.ddns_cache_expire, 60);
        assert_eq!(parsed.ddns_clean_interval, 30);
        assert_eq!(parsed.ddns_refresh_interval, 600);
        assert_eq!(parsed.metrics_bind_address.port(), 8080);
        assert_eq!(parsed.health_probe_bind_address.port(), 8081);
    }

    #[test]
    fn test_parse_flags() {
        let parsed = Config::try_parse_from([
            "dns-manager",
            "--default-record-ttl",
            "120",
            "--default-generator",
            "CNAME",
            "--cname-value",
            "edge.example.net",
            "--ddns-extra-apis",
            "http://a.example/ip,http://b.example/ip",
            "--metrics-bind-address",
            "127.0.0.1:9090",
        ])
        .unwrap();

        assert_eq!(parsed.default_record_ttl, 120);
        assert_eq!(parsed.default_generator, "CNAME");
        assert_eq!(parsed.cname_value, "edge.example.net");
        assert_eq!(
            parsed.ddns_extra_apis,
            vec!["http://a.example/ip", "http://b.example/ip"]
        );
        assert_eq!(parsed.metrics_bind_address.to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn test_parse_rejects_bad_bind_address() {
        assert!(
            Config::try_parse_from(["dns-manager", "--metrics-bind-address", "nope"]).is_err()
        );
    }

    #[test]
    fn test_default_generator_spec_carries_ddns_settings() {
        let config = Config {
            ddns_timeout: 5,
            ddns_extra_apis: vec![" http://ip.example ".to_string(), String::new()],
            ddns_refresh_interval: 90,
            ..Config::default()
        };

        let spec = config.default_generator_spec(GeneratorType::DDNS);
        assert_eq!(spec.generator_type, GeneratorType::DDNS);
        let ddns = spec.ddns.unwrap();
        assert_eq!(ddns.timeout, 5);
        assert_eq!(ddns.refresh_interval, 90);
        assert_eq!(ddns.extra_apis, vec!["http://ip.example"]);
    }

    #[test]
    fn test_default_generator_spec_carries_cname_value() {
        let config = Config {
            cname_value: "lb.example.net".to_string(),
            ..Config::default()
        };
        let spec = config.default_generator_spec(GeneratorType::CNAME);
        assert_eq!(spec.cname.unwrap().value, "lb.example.net");
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config {
            ddns_clean_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.cache_clean_interval(), Duration::from_secs(1));
        assert_eq!(config.provider_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }
}
