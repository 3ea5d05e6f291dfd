//! Import command: routing table → AS prefixes → nftables sets.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{RoutingTableCache, SnapshotOrigin};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::enforcer::{check_privileges, create_transport};
use crate::extractor::extract_with_stats;
use crate::fetcher::{Fetcher, TableSource};
use crate::fs_abstraction::{FileSystem, RealFileSystem};
use crate::partition::{partition, Family, PartitionedPrefixes};
use crate::reconciler::{ReconcileResult, SetNames, SetReconciler};
use crate::utils::{format_age, format_count};
use crate::validation::validate_user_agent;

/// What to import, from the command line
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub autnums: Vec<String>,
    pub user_agent: String,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Acquire the table, keep the prefixes of `autnums` and split them by
/// family.
///
/// Any prefix that does not parse aborts the run before nftables is
/// touched.
pub async fn collect_prefixes<S, F, C>(
    cache: &RoutingTableCache<S, F, C>,
    user_agent: &str,
    autnums: &[String],
) -> Result<PartitionedPrefixes>
where
    S: TableSource,
    F: FileSystem,
    C: Clock,
{
    let snapshot = cache.acquire(user_agent).await?;
    if let SnapshotOrigin::Cached { age } = snapshot.origin {
        debug!("Using cached table, {} old", format_age(age));
    }

    let wanted: HashSet<String> = autnums.iter().cloned().collect();
    let (prefixes, stats) = extract_with_stats(&snapshot.text, &wanted);
    debug!(
        "Scanned {} lines: {} malformed, {} matching",
        format_count(stats.lines),
        format_count(stats.malformed),
        format_count(stats.matched)
    );

    let partitioned = partition(&prefixes).context("Routing table contains an invalid prefix")?;
    info!(
        "{} prefixes announced by {} AS ({} IPv4, {} IPv6)",
        format_count(partitioned.len()),
        wanted.len(),
        format_count(partitioned.ipv4.len()),
        format_count(partitioned.ipv6.len())
    );

    if partitioned.is_empty() {
        warn!("No prefixes found for {}", autnums.join(", "));
    }

    Ok(partitioned)
}

/// Dry-run listing, one network per line under a header per family
pub fn format_dry_run(prefixes: &PartitionedPrefixes, names: &SetNames) -> String {
    let mut out = String::new();
    for family in [Family::V4, Family::V6] {
        let target = names.target(family);
        let networks = prefixes.networks(family);
        let _ = writeln!(out, "# {} -> {} ({} prefixes)", family, target, networks.len());
        for network in networks {
            let _ = writeln!(out, "{}", network);
        }
    }
    out
}

/// One summary line per family
pub fn format_summary(result: &ReconcileResult, names: &SetNames) -> String {
    let mut out = String::new();
    for family in [Family::V4, Family::V6] {
        let outcome = result.outcome(family);
        let status = if outcome.is_success() { "[OK]" } else { "[FAIL]" };
        let _ = writeln!(
            out,
            "{} {}: {}",
            status,
            names.target(family),
            outcome
        );
    }
    out
}

/// Run the import and return the process exit status
pub async fn run(request: &ImportRequest, config: &Config) -> Result<u8> {
    validate_user_agent(&request.user_agent)?;

    let fetcher = Fetcher::new(
        config.source_url.clone(),
        Duration::from_secs(config.timeout_secs),
        config.max_table_size,
    )?;
    let cache = RoutingTableCache::new(
        fetcher,
        RealFileSystem,
        SystemClock,
        config.cache_file.clone(),
        config.max_age()?,
    );
    let names = SetNames::from(config);

    let prefixes = collect_prefixes(&cache, &request.user_agent, &request.autnums).await?;

    if request.dry_run {
        info!("[DRY-RUN] Not touching nftables");
        print!("{}", format_dry_run(&prefixes, &names));
        return Ok(0);
    }

    check_privileges();

    let reconciler = SetReconciler::new(create_transport(config.binding, &config.nft_binary));
    let result = reconciler.reconcile(&prefixes, &names).await;

    if !request.quiet {
        print!("{}", format_summary(&result, &names));
    }

    let code = result.exit_code(config.exit_policy);
    if result.has_failures() && code == 0 {
        warn!("Some prefixes were not added; exiting successfully (lenient policy)");
    }
    Ok(code)
}
