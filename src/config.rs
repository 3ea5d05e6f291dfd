//! Configuration management for nft-prefix-import.
//!
//! Every setting can come from three places. A command-line flag wins over
//! the YAML config file, which wins over the built-in default.

use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CACHE_FILE;
use crate::fetcher::{DEFAULT_MAX_TABLE_SIZE, DEFAULT_SOURCE_URL, DEFAULT_TIMEOUT_SECS};
use crate::validation::{parse_interval, validate_nft_identifier};

/// How elements are pushed into nftables
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Binding {
    /// One JSON API command per family (`nft -j -f -`)
    #[default]
    Json,
    /// One `add element` script per family (`nft -f -`)
    CliBulk,
    /// One `nft add element` call per prefix
    CliElement,
}

/// Exit status policy when some elements could not be added
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Any reconciliation failure makes the run fail
    #[default]
    Strict,
    /// Log failures but exit successfully
    Lenient,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// nftables table holding both sets (family inet)
    pub table: String,

    /// Set receiving IPv4 prefixes
    pub ipv4_set: String,

    /// Set receiving IPv6 prefixes
    pub ipv6_set: String,

    pub binding: Binding,

    pub exit_policy: ExitPolicy,

    /// Local copy of the routing table
    pub cache_file: PathBuf,

    /// Refetch once the cache is older than this ("30m", "2h", "1d")
    pub cache_max_age: String,

    /// Routing table URL (HTTPS only)
    pub source_url: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum accepted routing table size in bytes
    pub max_table_size: usize,

    /// Path or name of the nft binary
    pub nft_binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table: "filter".to_string(),
            ipv4_set: "ipv4prefixes".to_string(),
            ipv6_set: "ipv6prefixes".to_string(),
            binding: Binding::default(),
            exit_policy: ExitPolicy::default(),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            cache_max_age: "2h".to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
            nft_binary: "nft".to_string(),
        }
    }
}

/// Settings given on the command line, each overriding the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub table: Option<String>,
    pub ipv4_set: Option<String>,
    pub ipv6_set: Option<String>,
    pub binding: Option<Binding>,
    pub exit_policy: Option<ExitPolicy>,
    pub cache_file: Option<PathBuf>,
    pub cache_max_age: Option<String>,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Values are only parsed here; [`Config::resolve`] validates once the
    /// command-line overrides are in place.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise start from the defaults, then apply
    /// command-line overrides and validate the result.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref table) = overrides.table {
            self.table = table.clone();
        }
        if let Some(ref set) = overrides.ipv4_set {
            self.ipv4_set = set.clone();
        }
        if let Some(ref set) = overrides.ipv6_set {
            self.ipv6_set = set.clone();
        }
        if let Some(binding) = overrides.binding {
            self.binding = binding;
        }
        if let Some(policy) = overrides.exit_policy {
            self.exit_policy = policy;
        }
        if let Some(ref path) = overrides.cache_file {
            self.cache_file = path.clone();
        }
        if let Some(ref age) = overrides.cache_max_age {
            self.cache_max_age = age.clone();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_nft_identifier(&self.table).context("Invalid table")?;
        validate_nft_identifier(&self.ipv4_set).context("Invalid ipv4_set")?;
        validate_nft_identifier(&self.ipv6_set).context("Invalid ipv6_set")?;

        if self.ipv4_set == self.ipv6_set {
            anyhow::bail!(
                "ipv4_set and ipv6_set must differ (both are '{}')",
                self.ipv4_set
            );
        }

        self.max_age()?;

        if !self.source_url.starts_with("https://") {
            anyhow::bail!("source_url must use HTTPS: {}", self.source_url);
        }

        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }

        if self.max_table_size == 0 {
            anyhow::bail!("max_table_size must be greater than 0");
        }

        if self.cache_file.as_os_str().is_empty() {
            anyhow::bail!("cache_file must not be empty");
        }

        if self.nft_binary.trim().is_empty() {
            anyhow::bail!("nft_binary must not be empty");
        }

        Ok(())
    }

    /// Parsed `cache_max_age`
    pub fn max_age(&self) -> Result<TimeDelta> {
        parse_interval(&self.cache_max_age).with_context(|| {
            format!(
                "Invalid cache_max_age '{}'. Use format like '30m', '2h', '1d'",
                self.cache_max_age
            )
        })
    }
}
