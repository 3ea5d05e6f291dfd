//! # nft-prefix-import
//!
//! Keeps nftables sets in step with the address space announced by a chosen
//! group of autonomous systems, for allow-lists or block-lists built from
//! BGP data. Meant to run from cron or a systemd timer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     nft-prefix-import                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap) + Config (serde_yaml)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RoutingTableCache                                          │
//! │    ├── Fetcher (reqwest + rustls), bgp.tools table.txt      │
//! │    └── Local table.txt, refreshed when older than 2h        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Extractor: "<prefix> <asn>" lines for the wanted AS        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Partition (ipnet): IPv4 / IPv6                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SetReconciler (FirewallTransport trait)                    │
//! │    ├── NftJsonTransport     nft -j -f -                     │
//! │    ├── NftBulkTransport     nft -f -                        │
//! │    └── NftElementTransport  nft add element, one per prefix │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use nft_prefix_import::cache::{RoutingTableCache, DEFAULT_MAX_AGE};
//! use nft_prefix_import::clock::SystemClock;
//! use nft_prefix_import::commands::import::collect_prefixes;
//! use nft_prefix_import::config::{Binding, Config};
//! use nft_prefix_import::enforcer::create_transport;
//! use nft_prefix_import::fetcher::{Fetcher, DEFAULT_MAX_TABLE_SIZE, DEFAULT_SOURCE_URL};
//! use nft_prefix_import::fs_abstraction::RealFileSystem;
//! use nft_prefix_import::reconciler::{SetNames, SetReconciler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let timeout = Duration::from_secs(120);
//!     let fetcher = Fetcher::new(DEFAULT_SOURCE_URL, timeout, DEFAULT_MAX_TABLE_SIZE)?;
//!     let cache = RoutingTableCache::new(
//!         fetcher,
//!         RealFileSystem,
//!         SystemClock,
//!         "./table.txt",
//!         DEFAULT_MAX_AGE,
//!     );
//!
//!     let autnums = vec!["64500".to_string()];
//!     let prefixes = collect_prefixes(&cache, "acme-fw/1.0 noc@example.com", &autnums).await?;
//!
//!     let reconciler = SetReconciler::new(create_transport(Binding::Json, "nft"));
//!     let result = reconciler.reconcile(&prefixes, &SetNames::from(&Config::default())).await;
//!     println!("IPv4: {}, IPv6: {}", result.ipv4, result.ipv6);
//!     Ok(())
//! }
//! ```
//!
//! ## Known limitations
//!
//! - Strictly additive: prefixes an AS stops announcing stay in the sets.
//! - No file locking: two concurrent runs may both refresh the cache.
//!
//! ## Modules
//!
//! - [`cache`] - Time-based cache for the routing table
//! - [`cli`] - Command-line interface definitions
//! - [`clock`] - Time source abstraction
//! - [`cmd_abstraction`] - Command execution abstraction
//! - [`commands`] - Command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`enforcer`] - nftables transports
//! - [`error`] - Typed errors
//! - [`extractor`] - Prefix extraction by AS number
//! - [`fetcher`] - HTTP client for the routing table
//! - [`fs_abstraction`] - Filesystem abstraction
//! - [`partition`] - Address family split
//! - [`reconciler`] - Set reconciliation and exit policy
//! - [`utils`] - Formatting helpers
//! - [`validation`] - Input validation

pub mod cache;
pub mod cli;
pub mod clock;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod fs_abstraction;
pub mod partition;
pub mod reconciler;
pub mod utils;
pub mod validation;

pub use cli::Cli;
pub use config::Config;
pub use error::ImportError;
