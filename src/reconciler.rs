//! Push partitioned prefixes into the IPv4 and IPv6 sets.

use ipnet::IpNet;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ExitPolicy};
use crate::enforcer::{FirewallTransport, Outcome, SetTarget};
use crate::partition::{Family, PartitionedPrefixes};

/// Exit status for a strict run with reconciliation failures
pub const EXIT_RECONCILE_FAILED: u8 = 2;

/// Table and set names addressed by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNames {
    pub table: String,
    pub ipv4_set: String,
    pub ipv6_set: String,
}

impl SetNames {
    pub fn target(&self, family: Family) -> SetTarget {
        let set = match family {
            Family::V4 => &self.ipv4_set,
            Family::V6 => &self.ipv6_set,
        };
        SetTarget::new(self.table.clone(), set.clone(), family)
    }
}

impl From<&Config> for SetNames {
    fn from(config: &Config) -> Self {
        Self {
            table: config.table.clone(),
            ipv4_set: config.ipv4_set.clone(),
            ipv6_set: config.ipv6_set.clone(),
        }
    }
}

/// Per-family outcome of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    pub ipv4: Outcome,
    pub ipv6: Outcome,
}

impl ReconcileResult {
    pub fn outcome(&self, family: Family) -> &Outcome {
        match family {
            Family::V4 => &self.ipv4,
            Family::V6 => &self.ipv6,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.ipv4.is_success() || !self.ipv6.is_success()
    }

    /// Process exit status under `policy`
    pub fn exit_code(&self, policy: ExitPolicy) -> u8 {
        match policy {
            ExitPolicy::Strict if self.has_failures() => EXIT_RECONCILE_FAILED,
            _ => 0,
        }
    }
}

/// Adds prefixes to both sets through a [`FirewallTransport`]
pub struct SetReconciler {
    transport: Box<dyn FirewallTransport>,
}

impl SetReconciler {
    pub fn new(transport: Box<dyn FirewallTransport>) -> Self {
        Self { transport }
    }

    /// Add every network to the set of its family.
    ///
    /// Both families run concurrently and always run to completion; a failure
    /// in one never skips or masks the other. Elements already present are
    /// left alone, so repeating a run changes nothing.
    pub async fn reconcile(
        &self,
        prefixes: &PartitionedPrefixes,
        names: &SetNames,
    ) -> ReconcileResult {
        let ipv4 = prefixes.networks(Family::V4);
        let ipv6 = prefixes.networks(Family::V6);

        let (ipv4, ipv6) = tokio::join!(
            self.reconcile_family(names.target(Family::V4), ipv4),
            self.reconcile_family(names.target(Family::V6), ipv6),
        );

        ReconcileResult { ipv4, ipv6 }
    }

    async fn reconcile_family(&self, target: SetTarget, networks: Vec<IpNet>) -> Outcome {
        // Different spellings of one network would otherwise be sent twice
        let total = networks.len();
        let unique: Vec<IpNet> = networks
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.len() < total {
            debug!(
                "{}: dropped {} duplicate networks",
                target.family,
                total - unique.len()
            );
        }

        if unique.is_empty() {
            debug!("{}: no prefixes, skipping {}", target.family, target);
            return Outcome::AllSucceeded(0);
        }

        info!(
            "{}: adding {} prefixes to {} via {}",
            target.family,
            unique.len(),
            target,
            self.transport.name()
        );
        let outcome = self.transport.add_elements(&target, &unique).await;

        match &outcome {
            Outcome::AllSucceeded(n) => info!("{}: {} prefixes in {}", target.family, n, target),
            Outcome::PartiallyFailed { succeeded, failed } => {
                for failure in failed {
                    warn!(
                        "{}: could not add {}: {}",
                        target.family, failure.element, failure.reason
                    );
                }
                warn!(
                    "{}: {} added, {} failed in {}",
                    target.family,
                    succeeded,
                    failed.len(),
                    target
                );
            }
            Outcome::TotallyFailed(reason) => {
                error!("{}: failed to update {}: {}", target.family, target, reason)
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::mock::InMemoryTransport;
    use crate::enforcer::ElementFailure;
    use crate::partition::partition;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn names() -> SetNames {
        SetNames {
            table: "filter".to_string(),
            ipv4_set: "ipv4prefixes".to_string(),
            ipv6_set: "ipv6prefixes".to_string(),
        }
    }

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    /// Shares one in-memory store across reconciler instances
    struct SharedStore(Arc<InMemoryTransport>);

    #[async_trait]
    impl FirewallTransport for SharedStore {
        async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
            self.0.add_elements(target, elements).await
        }

        fn name(&self) -> &'static str {
            "shared"
        }
    }

    /// Fails every call for one family
    struct BrokenFamily(Family);

    #[async_trait]
    impl FirewallTransport for BrokenFamily {
        async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
            if target.family == self.0 {
                Outcome::TotallyFailed("Error: No such file or directory".to_string())
            } else {
                Outcome::AllSucceeded(elements.len())
            }
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_reconcile_reference_scenario() {
        let store = Arc::new(InMemoryTransport::new());
        let reconciler = SetReconciler::new(Box::new(SharedStore(Arc::clone(&store))));
        let prefixes = partition(["10.0.0.0/8", "2001:db8::/32"]).unwrap();

        let result = reconciler.reconcile(&prefixes, &names()).await;

        assert_eq!(result.ipv4, Outcome::AllSucceeded(1));
        assert_eq!(result.ipv6, Outcome::AllSucceeded(1));
        assert!(!result.has_failures());
        assert_eq!(store.call_count(), 2);
        assert_eq!(
            store.contents("filter", "ipv4prefixes"),
            BTreeSet::from([net("10.0.0.0/8")])
        );
        assert_eq!(
            store.contents("filter", "ipv6prefixes"),
            BTreeSet::from([net("2001:db8::/32")])
        );
    }

    #[tokio::test]
    async fn test_reconcile_twice_equals_once() {
        let prefixes = partition(["10.0.0.0/8", "192.0.2.0/24", "2001:db8::/32"]).unwrap();

        let once = Arc::new(InMemoryTransport::new());
        SetReconciler::new(Box::new(SharedStore(Arc::clone(&once))))
            .reconcile(&prefixes, &names())
            .await;

        let twice = Arc::new(InMemoryTransport::new());
        let reconciler = SetReconciler::new(Box::new(SharedStore(Arc::clone(&twice))));
        reconciler.reconcile(&prefixes, &names()).await;
        let second = reconciler.reconcile(&prefixes, &names()).await;

        assert!(!second.has_failures());
        for set in ["ipv4prefixes", "ipv6prefixes"] {
            assert_eq!(once.contents("filter", set), twice.contents("filter", set));
        }
    }

    #[tokio::test]
    async fn test_empty_family_skips_transport() {
        let store = Arc::new(InMemoryTransport::new());
        let reconciler = SetReconciler::new(Box::new(SharedStore(Arc::clone(&store))));
        let prefixes = partition(["10.0.0.0/8"]).unwrap();

        let result = reconciler.reconcile(&prefixes, &names()).await;

        assert_eq!(result.ipv6, Outcome::AllSucceeded(0));
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_in_one_family_does_not_affect_other() {
        let prefixes = partition(["10.0.0.0/8", "2001:db8::/32"]).unwrap();

        let result = SetReconciler::new(Box::new(BrokenFamily(Family::V4)))
            .reconcile(&prefixes, &names())
            .await;
        assert!(matches!(result.ipv4, Outcome::TotallyFailed(_)));
        assert_eq!(result.ipv6, Outcome::AllSucceeded(1));
        assert!(result.has_failures());

        let result = SetReconciler::new(Box::new(BrokenFamily(Family::V6)))
            .reconcile(&prefixes, &names())
            .await;
        assert_eq!(result.ipv4, Outcome::AllSucceeded(1));
        assert!(matches!(result.ipv6, Outcome::TotallyFailed(_)));
    }

    #[tokio::test]
    async fn test_partial_failure_reported() {
        let store = Arc::new(InMemoryTransport::rejecting(vec![net("192.0.2.0/24")]));
        let reconciler = SetReconciler::new(Box::new(SharedStore(Arc::clone(&store))));
        let prefixes = partition(["10.0.0.0/8", "192.0.2.0/24"]).unwrap();

        let result = reconciler.reconcile(&prefixes, &names()).await;

        assert_eq!(
            result.ipv4,
            Outcome::PartiallyFailed {
                succeeded: 1,
                failed: vec![ElementFailure {
                    element: net("192.0.2.0/24"),
                    reason: "rejected".to_string(),
                }],
            }
        );
        assert_eq!(store.contents("filter", "ipv4prefixes").len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_spellings_sent_once() {
        let store = Arc::new(InMemoryTransport::new());
        let reconciler = SetReconciler::new(Box::new(SharedStore(Arc::clone(&store))));
        let prefixes = partition(["2001:db8::/32", "2001:0db8::/32"]).unwrap();
        assert_eq!(prefixes.ipv6.len(), 2);

        let result = reconciler.reconcile(&prefixes, &names()).await;
        assert_eq!(result.ipv6, Outcome::AllSucceeded(1));
    }

    #[test]
    fn test_exit_code_policy() {
        let ok = ReconcileResult {
            ipv4: Outcome::AllSucceeded(3),
            ipv6: Outcome::AllSucceeded(0),
        };
        assert_eq!(ok.exit_code(ExitPolicy::Strict), 0);
        assert_eq!(ok.exit_code(ExitPolicy::Lenient), 0);

        let failed = ReconcileResult {
            ipv4: Outcome::AllSucceeded(3),
            ipv6: Outcome::TotallyFailed("boom".to_string()),
        };
        assert_eq!(failed.exit_code(ExitPolicy::Strict), EXIT_RECONCILE_FAILED);
        assert_eq!(failed.exit_code(ExitPolicy::Lenient), 0);
        assert!(matches!(failed.outcome(Family::V6), Outcome::TotallyFailed(_)));
    }

    #[test]
    fn test_set_names_from_config() {
        let config = Config {
            table: "fw".to_string(),
            ..Config::default()
        };
        let names = SetNames::from(&config);
        let target = names.target(Family::V6);
        assert_eq!(target.table, "fw");
        assert_eq!(target.set, "ipv6prefixes");
        assert_eq!(target.family, Family::V6);
    }
}
