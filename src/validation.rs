//! Centralized validation functions.
//!
//! This module provides unified validation for:
//! - IP networks in CIDR or bare-address form
//! - nftables table and set names
//! - Cache age intervals (systemd timer format)
//! - The HTTP `User-Agent` value

use anyhow::{bail, Result};
use chrono::TimeDelta;
use ipnet::IpNet;
use std::net::IpAddr;

use crate::error::ImportError;

/// Longest table or set name nftables accepts (NFT_NAME_MAXLEN minus the NUL byte)
const MAX_NFT_NAME_LEN: usize = 255;

/// Longest accepted `User-Agent` value
const MAX_USER_AGENT_LEN: usize = 1024;

/// Parse a prefix string into a network.
///
/// Plain addresses (without /prefix) become a /32 (IPv4) or /128 (IPv6)
/// network. Networks with host bits set are rejected.
///
/// # Examples
/// ```
/// use nft_prefix_import::validation::parse_network;
/// assert_eq!(parse_network("192.0.2.0/24").unwrap().to_string(), "192.0.2.0/24");
/// assert_eq!(parse_network("192.0.2.1").unwrap().to_string(), "192.0.2.1/32");
/// assert!(parse_network("192.0.2.1/24").is_err());
/// assert!(parse_network("not-an-ip").is_err());
/// ```
pub fn parse_network(prefix: &str) -> Result<IpNet, ImportError> {
    let invalid = |reason: &str| ImportError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: reason.to_string(),
    };

    if prefix.contains('/') {
        let net: IpNet = prefix.parse().map_err(|_| invalid("invalid CIDR"))?;
        if net.trunc() != net {
            return Err(invalid("host bits set"));
        }
        Ok(net)
    } else {
        let ip: IpAddr = prefix.parse().map_err(|_| invalid("invalid IP address"))?;
        Ok(IpNet::from(ip))
    }
}

/// Validate an nftables table or set name.
///
/// Names start with a letter or underscore, followed by letters, digits,
/// `_`, `-`, `.` or `/`. Anything else could change the meaning of an
/// `nft` command line or script.
///
/// # Examples
/// ```
/// use nft_prefix_import::validation::validate_nft_identifier;
/// assert!(validate_nft_identifier("ipv4prefixes").is_ok());
/// assert!(validate_nft_identifier("filter; flush ruleset").is_err());
/// ```
pub fn validate_nft_identifier(name: &str) -> Result<(), ImportError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest =
        chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));

    if valid_first && valid_rest && name.len() <= MAX_NFT_NAME_LEN {
        Ok(())
    } else {
        Err(ImportError::InvalidName(name.to_string()))
    }
}

/// Validate the `User-Agent` header value (reject header injection).
pub fn validate_user_agent(user_agent: &str) -> Result<(), ImportError> {
    if user_agent.trim().is_empty() {
        return Err(ImportError::InvalidUserAgent("must not be empty".to_string()));
    }
    if user_agent.len() > MAX_USER_AGENT_LEN {
        return Err(ImportError::InvalidUserAgent(format!(
            "longer than {} bytes",
            MAX_USER_AGENT_LEN
        )));
    }
    if user_agent.chars().any(|c| c.is_control()) {
        return Err(ImportError::InvalidUserAgent(
            "contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Parse an interval like `30m`, `2h` or `1d` into a duration.
///
/// Accepts formats like: 30s, 5m, 2h, 1d
/// Requires ASCII-only input to prevent Unicode-related edge cases.
///
/// # Examples
/// ```
/// use chrono::TimeDelta;
/// use nft_prefix_import::validation::parse_interval;
/// assert_eq!(parse_interval("2h").unwrap(), TimeDelta::hours(2));
/// assert!(parse_interval("2x").is_err());
/// ```
pub fn parse_interval(interval: &str) -> Result<TimeDelta> {
    if interval.is_empty() {
        bail!("Interval cannot be empty");
    }

    if !interval.is_ascii() {
        bail!("Invalid interval '{}'. Only ASCII characters allowed", interval);
    }

    if interval.len() < 2 {
        bail!("Invalid interval '{}'. Use format like '2h', '30m', '1d'", interval);
    }

    let (num_part, suffix) = interval.split_at(interval.len() - 1);

    let multiplier: i64 = match suffix {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => bail!("Invalid interval '{}'. Suffix must be s, m, h, or d", interval),
    };

    let value: u32 = num_part.parse().map_err(|_| {
        anyhow::anyhow!(
            "Invalid interval '{}'. Number part must be a positive integer",
            interval
        )
    })?;

    Ok(TimeDelta::seconds(i64::from(value) * multiplier))
}
