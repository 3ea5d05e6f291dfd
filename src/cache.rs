//! Time-based cache for the downloaded routing table.
//!
//! The table is only pulled from upstream when the local copy is missing or
//! older than the configured maximum age (two hours by default). This bounds
//! the load on the upstream service while keeping the firewall sets
//! reasonably fresh.
//!
//! There is no file locking: two concurrent runs may both decide to refresh
//! the cache. Writes are atomic, so the worst case is a redundant download.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::fetcher::TableSource;
use crate::fs_abstraction::FileSystem;
use crate::utils::{format_age, format_bytes};

/// Default cache location, relative to the working directory
pub const DEFAULT_CACHE_FILE: &str = "./table.txt";

/// Don't pull more often than every two hours
pub const DEFAULT_MAX_AGE: TimeDelta = TimeDelta::hours(2);

/// State of the cache file relative to the freshness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale(TimeDelta),
    Fresh(TimeDelta),
}

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Fetched,
    Cached { age: TimeDelta },
}

/// Raw routing table text, one `<prefix> <asn>` record per line
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub text: String,
    pub origin: SnapshotOrigin,
}

/// Routing table cache with an mtime-based freshness policy
pub struct RoutingTableCache<S, F, C> {
    source: S,
    fs: F,
    clock: C,
    path: PathBuf,
    max_age: TimeDelta,
}

impl<S: TableSource, F: FileSystem, C: Clock> RoutingTableCache<S, F, C> {
    pub fn new(source: S, fs: F, clock: C, path: impl Into<PathBuf>, max_age: TimeDelta) -> Self {
        Self {
            source,
            fs,
            clock,
            path: path.into(),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Classify the cache file against the freshness policy.
    ///
    /// A modification time in the future (clock skew) counts as fresh. An
    /// unreadable modification time counts as missing.
    pub fn freshness(&self) -> Freshness {
        let mtime = match self.fs.modified(&self.path) {
            Ok(mtime) => DateTime::<Utc>::from(mtime),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Freshness::Missing,
            Err(e) => {
                warn!("Cannot read modification time of {:?}: {}", self.path, e);
                return Freshness::Missing;
            }
        };

        let age = self.clock.now() - mtime;
        if age > self.max_age {
            Freshness::Stale(age)
        } else {
            Freshness::Fresh(age)
        }
    }

    /// Return the routing table, downloading it only when the cache is
    /// missing or stale.
    ///
    /// A failed download is fatal even if a stale copy exists: running on
    /// outdated data without noticing is worse than a visible failure.
    pub async fn acquire(&self, user_agent: &str) -> Result<Snapshot> {
        match self.freshness() {
            Freshness::Fresh(age) => {
                info!(
                    "Loading routing table from cache {:?} (age {})",
                    self.path,
                    format_age(age)
                );
                let text = self
                    .fs
                    .read_to_string(&self.path)
                    .with_context(|| format!("Failed to read cache file {:?}", self.path))?;
                Ok(Snapshot {
                    text,
                    origin: SnapshotOrigin::Cached { age },
                })
            }
            freshness => {
                match freshness {
                    Freshness::Stale(age) => info!(
                        "Cache {:?} is stale (age {}), pulling routing table",
                        self.path,
                        format_age(age)
                    ),
                    _ => info!("No cached routing table at {:?}, pulling routing table", self.path),
                }

                let text = self.source.fetch_table(user_agent).await?;
                self.fs
                    .write_atomic(&self.path, text.as_bytes())
                    .with_context(|| format!("Failed to write cache file {:?}", self.path))?;
                info!(
                    "Cached routing table at {:?} ({})",
                    self.path,
                    format_bytes(text.len() as u64)
                );

                Ok(Snapshot {
                    text,
                    origin: SnapshotOrigin::Fetched,
                })
            }
        }
    }
}
