// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `public_ip.rs`

#[cfg(test)]
mod tests {
    use crate::public_ip::{
        extract_ipv4, plurality, PublicIpCache, PublicIpResolver, DEFAULT_IPV4_APIS,
        PUBLIC_IPV4_CACHE_KEY,
    };
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_ip(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_failure(server: &MockServer, route: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    fn resolver(server: &MockServer, routes: &[&str], timeout: Duration) -> PublicIpResolver {
        let endpoints = routes
            .iter()
            .map(|route| format!("{}{route}", server.uri()))
            .collect();
        PublicIpResolver::with_endpoints(reqwest::Client::new(), timeout, endpoints)
    }

    #[test]
    fn test_extract_ipv4_from_plain_text() {
        assert_eq!(
            extract_ipv4("203.0.113.7\n"),
            Some(Ipv4Addr::new(203, 0, 113, 7))
        );
    }

    #[test]
    fn test_extract_ipv4_from_json_and_html() {
        assert_eq!(
            extract_ipv4(r#"{"ip":"198.51.100.23","country":"CN"}"#),
            Some(Ipv4Addr::new(198, 51, 100, 23))
        );
        assert_eq!(
            extract_ipv4("<html><body>Current IP Address: 192.0.2.1</body></html>"),
            Some(Ipv4Addr::new(192, 0, 2, 1))
        );
    }

    #[test]
    fn test_extract_ipv4_none_without_address() {
        assert_eq!(extract_ipv4("rate limited"), None);
        assert_eq!(extract_ipv4(""), None);
    }

    #[test]
    fn test_plurality_prefers_most_votes() {
        let mut votes = HashMap::new();
        votes.insert(Ipv4Addr::new(10, 0, 0, 1), 1);
        votes.insert(Ipv4Addr::new(10, 0, 0, 2), 3);
        assert_eq!(plurality(&votes), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_plurality_breaks_ties_by_lowest_address() {
        let mut votes = HashMap::new();
        votes.insert(Ipv4Addr::new(10, 0, 0, 9), 2);
        votes.insert(Ipv4Addr::new(10, 0, 0, 3), 2);
        assert_eq!(plurality(&votes), Some(Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(plurality(&HashMap::new()), None);
    }

    #[test]
    fn test_new_appends_extra_apis_after_defaults() {
        let resolver = PublicIpResolver::new(
            reqwest::Client::new(),
            Duration::from_secs(2),
            &["http://ip.internal/".to_string()],
        );
        assert_eq!(resolver.endpoints().len(), DEFAULT_IPV4_APIS.len() + 1);
        assert_eq!(resolver.endpoints()[0], DEFAULT_IPV4_APIS[0]);
        assert_eq!(resolver.endpoints().last().unwrap(), "http://ip.internal/");
    }

    #[tokio::test]
    async fn test_resolve_returns_majority_answer() {
        let server = MockServer::start().await;
        mount_ip(&server, "/a", "1.1.1.1").await;
        mount_ip(&server, "/b", "ip=1.1.1.1").await;
        mount_ip(&server, "/c", "2.2.2.2").await;
        mount_failure(&server, "/d").await;

        let resolver = resolver(&server, &["/a", "/b", "/c", "/d"], Duration::from_secs(2));
        assert_eq!(resolver.resolve().await, Some(Ipv4Addr::new(1, 1, 1, 1)));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_plurality() {
        let server = MockServer::start().await;
        mount_ip(&server, "/a", "3.3.3.3").await;
        mount_ip(&server, "/b", "3.3.3.3").await;
        mount_ip(&server, "/c", "4.4.4.4").await;
        mount_failure(&server, "/d").await;
        mount_failure(&server, "/e").await;
        mount_failure(&server, "/f").await;

        // Six endpoints need three votes for quorum; only two agree.
        let resolver = resolver(
            &server,
            &["/a", "/b", "/c", "/d", "/e", "/f"],
            Duration::from_secs(2),
        );
        assert_eq!(resolver.resolve().await, Some(Ipv4Addr::new(3, 3, 3, 3)));
    }

    #[tokio::test]
    async fn test_resolve_retries_first_endpoint_with_longer_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("5.5.5.5")
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        mount_failure(&server, "/broken").await;

        let resolver = resolver(&server, &["/slow", "/broken"], Duration::from_millis(200));
        assert_eq!(resolver.resolve().await, Some(Ipv4Addr::new(5, 5, 5, 5)));
    }

    #[tokio::test]
    async fn test_resolve_none_when_nothing_answers() {
        let server = MockServer::start().await;
        mount_failure(&server, "/a").await;
        mount_failure(&server, "/b").await;

        let resolver = resolver(&server, &["/a", "/b"], Duration::from_millis(200));
        assert_eq!(resolver.resolve().await, None);
    }

    #[tokio::test]
    async fn test_resolve_none_without_endpoints() {
        let resolver =
            PublicIpResolver::with_endpoints(reqwest::Client::new(), Duration::from_secs(1), vec![]);
        assert_eq!(resolver.resolve().await, None);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_second_discovery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("6.6.6.6"))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver(&server, &["/ip"], Duration::from_secs(2));
        let cache = PublicIpCache::new();
        let ttl = Duration::from_secs(60);

        let first = cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, ttl, &resolver)
            .await;
        let second = cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, ttl, &resolver)
            .await;

        assert_eq!(first, Some(Ipv4Addr::new(6, 6, 6, 6)));
        assert_eq!(second, first);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_new_discovery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("7.7.7.7"))
            .expect(2)
            .mount(&server)
            .await;

        let resolver = resolver(&server, &["/ip"], Duration::from_secs(2));
        let cache = PublicIpCache::new();

        cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, Duration::ZERO, &resolver)
            .await;
        cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, Duration::ZERO, &resolver)
            .await;
        server.verify().await;
    }

    #[tokio::test]
    async fn test_failed_discovery_is_not_cached() {
        let server = MockServer::start().await;
        mount_failure(&server, "/ip").await;

        let resolver = resolver(&server, &["/ip"], Duration::from_millis(100));
        let cache = PublicIpCache::new();

        let result = cache
            .get_or_resolve(PUBLIC_IPV4_CACHE_KEY, Duration::from_secs(60), &resolver)
            .await;
        assert_eq!(result, None);
        assert_eq!(cache.get(PUBLIC_IPV4_CACHE_KEY).await, None);
    }

    #[tokio::test]
    async fn test_evict_expired_removes_only_stale_entries() {
        let cache = PublicIpCache::new();
        cache
            .insert("stale", Ipv4Addr::new(1, 2, 3, 4), Duration::ZERO)
            .await;
        cache
            .insert("fresh", Ipv4Addr::new(5, 6, 7, 8), Duration::from_secs(60))
            .await;

        assert_eq!(cache.evict_expired().await, 1);
        assert_eq!(cache.get("stale").await, None);
        assert_eq!(cache.get("fresh").await, Some(Ipv4Addr::new(5, 6, 7, 8)));
    }
}
