//! nftables set transports.
//!
//! Every transport only ever *adds* elements to an existing set in the
//! `inet` family. `add` is a no-op for elements already present, so running
//! the import twice leaves the set unchanged.

mod cli;
mod json;

use async_trait::async_trait;
use ipnet::IpNet;
use std::fmt;
use tracing::{debug, warn};

pub use cli::{NftBulkTransport, NftElementTransport};
pub use json::NftJsonTransport;

use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Binding;
use crate::error::ImportError;
use crate::partition::Family;

/// nftables address family holding both sets
pub const NFT_FAMILY: &str = "inet";

/// A named set inside an nftables table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetTarget {
    pub table: String,
    pub set: String,
    pub family: Family,
}

impl SetTarget {
    pub fn new(table: impl Into<String>, set: impl Into<String>, family: Family) -> Self {
        Self {
            table: table.into(),
            set: set.into(),
            family,
        }
    }
}

impl fmt::Display for SetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", NFT_FAMILY, self.table, self.set)
    }
}

/// One element the firewall refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFailure {
    pub element: IpNet,
    pub reason: String,
}

/// Result of pushing one family's elements into its set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AllSucceeded(usize),
    PartiallyFailed {
        succeeded: usize,
        failed: Vec<ElementFailure>,
    },
    TotallyFailed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::AllSucceeded(_))
    }

    /// Number of elements known to be in the set afterwards
    pub fn succeeded(&self) -> usize {
        match self {
            Outcome::AllSucceeded(n) => *n,
            Outcome::PartiallyFailed { succeeded, .. } => *succeeded,
            Outcome::TotallyFailed(_) => 0,
        }
    }

    /// Fold per-element results into an outcome.
    ///
    /// If nothing succeeded the first failure becomes the overall reason.
    pub fn from_elements(succeeded: usize, failed: Vec<ElementFailure>) -> Self {
        if failed.is_empty() {
            return Outcome::AllSucceeded(succeeded);
        }
        if succeeded == 0 {
            let reason = format!("{}: {}", failed[0].element, failed[0].reason);
            return Outcome::TotallyFailed(reason);
        }
        Outcome::PartiallyFailed { succeeded, failed }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AllSucceeded(n) => write!(f, "added {} elements", n),
            Outcome::PartiallyFailed { succeeded, failed } => {
                write!(f, "added {} elements, {} failed", succeeded, failed.len())
            }
            Outcome::TotallyFailed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Something that can add network elements to a named set.
///
/// Failures are reported through [`Outcome`] rather than `Err`, so one
/// family failing never hides the result of the other.
#[async_trait]
pub trait FirewallTransport: Send + Sync {
    async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Create the transport for the configured binding
pub fn create_transport(binding: Binding, nft_binary: &str) -> Box<dyn FirewallTransport> {
    let executor = RealCommandExecutor::new();
    match binding {
        Binding::Json => Box::new(NftJsonTransport::new(executor, nft_binary)),
        Binding::CliBulk => Box::new(NftBulkTransport::new(executor, nft_binary)),
        Binding::CliElement => Box::new(NftElementTransport::new(executor, nft_binary)),
    }
}

/// Validate that an IP/CIDR string is safe for nftables script inclusion.
///
/// Only digits, dots, colons, slashes and hex letters are allowed.
pub(crate) fn is_safe_nft_element(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_digit() || c == '.' || c == ':' || c == '/' || ('a'..='f').contains(&c)
        })
}

/// Render elements for an nft statement, rejecting anything outside the
/// allowed character set.
pub(crate) fn render_elements(elements: &[IpNet]) -> Result<Vec<String>, ImportError> {
    elements
        .iter()
        .map(|net| {
            let s = net.to_string();
            if is_safe_nft_element(&s) {
                Ok(s)
            } else {
                Err(ImportError::UnsafeElement(s))
            }
        })
        .collect()
}

/// Run blocking nft work on the blocking pool so both families can proceed
/// concurrently. A panicking task comes back as an error string.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        debug!("nft task failed: {}", e);
        format!("nft task failed: {}", e)
    })
}

/// Warn when not running as root.
///
/// nft needs CAP_NET_ADMIN, which an unprivileged user may still hold, so
/// this never aborts. Returns whether the effective UID is 0.
pub fn check_privileges() -> bool {
    // SAFETY: geteuid() has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        warn!(
            "Not running as root (euid {}): nft may refuse changes without CAP_NET_ADMIN",
            euid
        );
        return false;
    }
    true
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    /// In-memory nftables: sets keyed by `(table, set)`, with `add` semantics
    #[derive(Default)]
    pub struct InMemoryTransport {
        pub sets: Mutex<HashMap<(String, String), BTreeSet<IpNet>>>,
        pub calls: Mutex<Vec<(SetTarget, usize)>>,
        /// Elements the store refuses, as if nft rejected them
        pub rejected: Vec<IpNet>,
    }

    impl InMemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rejecting(rejected: Vec<IpNet>) -> Self {
            Self {
                rejected,
                ..Self::default()
            }
        }

        pub fn contents(&self, table: &str, set: &str) -> BTreeSet<IpNet> {
            self.sets
                .lock()
                .unwrap()
                .get(&(table.to_string(), set.to_string()))
                .cloned()
                .unwrap_or_default()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FirewallTransport for InMemoryTransport {
        async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
            self.calls
                .lock()
                .unwrap()
                .push((target.clone(), elements.len()));

            let mut sets = self.sets.lock().unwrap();
            let set = sets
                .entry((target.table.clone(), target.set.clone()))
                .or_default();

            let mut succeeded = 0;
            let mut failed = Vec::new();
            for element in elements {
                if self.rejected.contains(element) {
                    failed.push(ElementFailure {
                        element: *element,
                        reason: "rejected".to_string(),
                    });
                } else {
                    set.insert(*element);
                    succeeded += 1;
                }
            }
            Outcome::from_elements(succeeded, failed)
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }
}
