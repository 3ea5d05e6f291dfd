//! Robustness tests for edge cases and error conditions.
//!
//! These tests verify that hostile or broken inputs fail cleanly instead of
//! panicking or reaching nftables.

use std::collections::HashSet;
use std::time::Duration;

use nft_prefix_import::config::Config;
use nft_prefix_import::extractor::{extract, extract_with_stats};
use nft_prefix_import::fetcher::{Fetcher, TableSource};
use nft_prefix_import::partition::partition;
use nft_prefix_import::validation::{parse_network, validate_nft_identifier, validate_user_agent};

fn wanted(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Test that an unreachable source fails instead of hanging
#[tokio::test]
async fn test_fetch_timeout() {
    // Non-routable address, very short timeout
    let fetcher = Fetcher::new(
        "http://10.255.255.1:12345/table.txt",
        Duration::from_millis(50),
        1024,
    )
    .unwrap();
    let result = fetcher.fetch_table("acme-fw/1.0").await;
    assert!(result.is_err());
}

/// Test that invalid URLs are handled gracefully
#[tokio::test]
async fn test_invalid_url_handling() {
    let fetcher = Fetcher::new("not-a-url", Duration::from_secs(1), 1024).unwrap();
    assert!(fetcher.fetch_table("acme-fw/1.0").await.is_err());

    let fetcher =
        Fetcher::new("ftp://invalid-scheme.example", Duration::from_secs(1), 1024).unwrap();
    assert!(fetcher.fetch_table("acme-fw/1.0").await.is_err());
}

/// Test prefix parsing edge cases
#[test]
fn test_prefix_parsing_edge_cases() {
    // Valid edge cases
    assert!(parse_network("0.0.0.0/0").is_ok());
    assert!(parse_network("255.255.255.255/32").is_ok());
    assert!(parse_network("::/0").is_ok());
    assert!(parse_network("::1").is_ok());

    // Invalid cases
    assert!(parse_network("256.0.0.0/8").is_err());
    assert!(parse_network("10.0.0.0/33").is_err());
    assert!(parse_network("2001:db8::/129").is_err());
    assert!(parse_network("1.2.3/24").is_err());
    assert!(parse_network("10.0.0.0/").is_err());
    assert!(parse_network("/8").is_err());
    assert!(parse_network("").is_err());
    assert!(parse_network("hello").is_err());
}

/// Test Unicode handling in table lines
#[test]
fn test_unicode_handling() {
    // Full-width digits and zero-width spaces are not valid prefixes
    assert!(parse_network("１０.０.０.０/８").is_err());
    assert!(parse_network("10.0.0.0/8\u{200B}").is_err());
    assert!(parse_network("10.0.0.0/8\u{FEFF}").is_err());

    // Extraction does not choke on them either; the AS token must match exactly
    let table = "１０.０.０.０/８ 64500\n10.0.0.0/8 ６４５００\n";
    let prefixes = extract(table, &wanted(&["64500"]));
    assert_eq!(prefixes.len(), 1);
    assert!(partition(&prefixes).is_err());
}

/// Test a table with CRLF line endings and blank lines
#[test]
fn test_crlf_and_blank_lines() {
    let table = "\r\n10.0.0.0/8 64500\r\n\r\n2001:db8::/32 64500\r\n";
    let (prefixes, stats) = extract_with_stats(table, &wanted(&["64500"]));
    assert_eq!(prefixes.len(), 2);
    assert_eq!(stats.matched, 2);
    assert!(partition(&prefixes).is_ok());
}

/// Test extraction on a table the size of the real one
#[test]
fn test_large_input_handling() {
    let mut table = String::new();
    for i in 0..200_000u32 {
        let asn = 64496 + (i % 16);
        table.push_str(&format!("{}.{}.0.0/16 {}\n", (i >> 8) % 224, i % 256, asn));
    }

    let (prefixes, stats) = extract_with_stats(&table, &wanted(&["64500"]));
    assert_eq!(stats.lines, 200_000);
    assert_eq!(stats.malformed, 0);
    assert!(!prefixes.is_empty());
    assert!(partition(&prefixes).is_ok());
}

/// Test that injection attempts never pass identifier or header checks
#[test]
fn test_injection_attempts_rejected() {
    for name in [
        "filter; flush ruleset",
        "filter\nflush ruleset",
        "set }",
        "$(reboot)",
        "`id`",
        "a b",
    ] {
        assert!(validate_nft_identifier(name).is_err(), "accepted {:?}", name);
    }

    assert!(validate_user_agent("acme\r\nX-Evil: 1").is_err());
    assert!(validate_user_agent("acme\0").is_err());
    assert!(validate_user_agent("").is_err());
}

/// Test that YAML parsing handles malformed input
#[test]
fn test_yaml_malformed_input() {
    let result: Result<Config, _> = serde_yaml::from_str("{{{{not valid yaml");
    assert!(result.is_err());

    // Wrong types
    let result: Result<Config, _> = serde_yaml::from_str("timeout_secs: forever\n");
    assert!(result.is_err());

    // Empty document falls back to defaults
    let result: Result<Config, _> = serde_yaml::from_str("{}");
    assert_eq!(result.unwrap(), Config::default());
}

/// Test that a cache file in a missing directory surfaces as an error
#[tokio::test]
async fn test_cache_in_missing_directory() {
    use async_trait::async_trait;
    use chrono::Utc;
    use nft_prefix_import::cache::{RoutingTableCache, DEFAULT_MAX_AGE};
    use nft_prefix_import::clock::FixedClock;
    use nft_prefix_import::fs_abstraction::RealFileSystem;

    struct Static;

    #[async_trait]
    impl TableSource for Static {
        async fn fetch_table(&self, _user_agent: &str) -> anyhow::Result<String> {
            Ok("10.0.0.0/8 64500\n".to_string())
        }
    }

    let cache = RoutingTableCache::new(
        Static,
        RealFileSystem,
        FixedClock(Utc::now()),
        "/nonexistent/path/to/table.txt",
        DEFAULT_MAX_AGE,
    );
    let err = cache.acquire("acme-fw/1.0").await.unwrap_err();
    assert!(err.to_string().contains("Failed to write cache file"));
}
