//! Transports driving the `nft` command line.

use async_trait::async_trait;
use ipnet::IpNet;
use std::sync::Arc;
use tracing::debug;

use super::{
    is_safe_nft_element, render_elements, run_blocking, ElementFailure, FirewallTransport,
    Outcome, SetTarget, NFT_FAMILY,
};
use crate::cmd_abstraction::{args_to_strings, CommandExecutor};

/// Generate the `add element` statement for a whole family
pub(crate) fn generate_add_script(target: &SetTarget, elements: &[String]) -> String {
    format!(
        "add element {} {} {} {{ {} }}\n",
        NFT_FAMILY,
        target.table,
        target.set,
        elements.join(", ")
    )
}

/// Adds a whole family with one script fed to `nft -f -`.
///
/// Large sets go through stdin instead of argv, which the kernel caps per
/// argument.
pub struct NftBulkTransport<E> {
    executor: Arc<E>,
    nft_binary: String,
}

impl<E: CommandExecutor + 'static> NftBulkTransport<E> {
    pub fn new(executor: E, nft_binary: impl Into<String>) -> Self {
        Self {
            executor: Arc::new(executor),
            nft_binary: nft_binary.into(),
        }
    }
}

#[async_trait]
impl<E: CommandExecutor + 'static> FirewallTransport for NftBulkTransport<E> {
    async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
        if elements.is_empty() {
            return Outcome::AllSucceeded(0);
        }

        let rendered = match render_elements(elements) {
            Ok(rendered) => rendered,
            Err(e) => return Outcome::TotallyFailed(e.to_string()),
        };
        let script = generate_add_script(target, &rendered);
        debug!(
            "{} -f - ({} elements for {})",
            self.nft_binary,
            elements.len(),
            target
        );

        let executor = Arc::clone(&self.executor);
        let program = self.nft_binary.clone();
        let result = run_blocking(move || {
            executor.execute_with_stdin(&program, &args_to_strings(&["-f", "-"]), &script)
        })
        .await;

        match result {
            Ok(Ok(output)) if output.success => Outcome::AllSucceeded(elements.len()),
            Ok(Ok(output)) => Outcome::TotallyFailed(output.failure_reason()),
            Ok(Err(e)) => Outcome::TotallyFailed(format!("{:#}", e)),
            Err(reason) => Outcome::TotallyFailed(reason),
        }
    }

    fn name(&self) -> &'static str {
        "nft-cli-bulk"
    }
}

/// Adds one element per `nft add element` invocation, carrying on past
/// failures.
pub struct NftElementTransport<E> {
    executor: Arc<E>,
    nft_binary: String,
}

impl<E: CommandExecutor + 'static> NftElementTransport<E> {
    pub fn new(executor: E, nft_binary: impl Into<String>) -> Self {
        Self {
            executor: Arc::new(executor),
            nft_binary: nft_binary.into(),
        }
    }
}

/// Run one `nft add element` per network and fold the results
fn add_each<E: CommandExecutor>(
    executor: &E,
    nft_binary: &str,
    target: &SetTarget,
    elements: &[IpNet],
) -> Outcome {
    let mut succeeded = 0;
    let mut failed = Vec::new();

    for element in elements {
        let rendered = element.to_string();
        if !is_safe_nft_element(&rendered) {
            failed.push(ElementFailure {
                element: *element,
                reason: format!("unsafe element {:?}", rendered),
            });
            continue;
        }

        let args = args_to_strings(&[
            "add",
            "element",
            NFT_FAMILY,
            target.table.as_str(),
            target.set.as_str(),
            "{",
            rendered.as_str(),
            "}",
        ]);

        let reason = match executor.execute(nft_binary, &args) {
            Ok(output) if output.success => {
                succeeded += 1;
                continue;
            }
            Ok(output) => output.failure_reason(),
            Err(e) => format!("{:#}", e),
        };
        debug!("Failed to add {} to {}: {}", element, target, reason);
        failed.push(ElementFailure {
            element: *element,
            reason,
        });
    }

    Outcome::from_elements(succeeded, failed)
}

#[async_trait]
impl<E: CommandExecutor + 'static> FirewallTransport for NftElementTransport<E> {
    async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
        if elements.is_empty() {
            return Outcome::AllSucceeded(0);
        }
        debug!(
            "{} add element, one call each for {} elements of {}",
            self.nft_binary,
            elements.len(),
            target
        );

        let executor = Arc::clone(&self.executor);
        let program = self.nft_binary.clone();
        let target = target.clone();
        let elements = elements.to_vec();
        run_blocking(move || add_each(executor.as_ref(), &program, &target, &elements))
            .await
            .unwrap_or_else(Outcome::TotallyFailed)
    }

    fn name(&self) -> &'static str {
        "nft-cli-element"
    }
}
