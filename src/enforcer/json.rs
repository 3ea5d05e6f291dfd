//! Bulk transport over the nftables JSON API (`nft -j -f -`).

use async_trait::async_trait;
use ipnet::IpNet;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{render_elements, run_blocking, FirewallTransport, Outcome, SetTarget, NFT_FAMILY};
use crate::cmd_abstraction::{args_to_strings, CommandExecutor};
use crate::error::ImportError;

/// Adds a whole family in one JSON `add element` command
pub struct NftJsonTransport<E> {
    executor: Arc<E>,
    nft_binary: String,
}

impl<E: CommandExecutor + 'static> NftJsonTransport<E> {
    pub fn new(executor: E, nft_binary: impl Into<String>) -> Self {
        Self {
            executor: Arc::new(executor),
            nft_binary: nft_binary.into(),
        }
    }
}

/// Build the JSON ruleset document adding `elements` to `target`.
///
/// Interval sets take each network as a `prefix` object, including host
/// routes (`/32`, `/128`).
pub(crate) fn build_payload(target: &SetTarget, elements: &[IpNet]) -> Result<Value, ImportError> {
    render_elements(elements)?;

    let elem: Vec<Value> = elements
        .iter()
        .map(|net| {
            json!({
                "prefix": {
                    "addr": net.network().to_string(),
                    "len": net.prefix_len(),
                }
            })
        })
        .collect();

    Ok(json!({
        "nftables": [{
            "add": {
                "element": {
                    "family": NFT_FAMILY,
                    "table": target.table,
                    "name": target.set,
                    "elem": elem,
                }
            }
        }]
    }))
}

#[async_trait]
impl<E: CommandExecutor + 'static> FirewallTransport for NftJsonTransport<E> {
    async fn add_elements(&self, target: &SetTarget, elements: &[IpNet]) -> Outcome {
        if elements.is_empty() {
            return Outcome::AllSucceeded(0);
        }

        let payload = match build_payload(target, elements) {
            Ok(payload) => payload.to_string(),
            Err(e) => return Outcome::TotallyFailed(e.to_string()),
        };
        debug!(
            "{} -j -f - ({} elements for {}, {} bytes)",
            self.nft_binary,
            elements.len(),
            target,
            payload.len()
        );

        let executor = Arc::clone(&self.executor);
        let program = self.nft_binary.clone();
        let result = run_blocking(move || {
            executor.execute_with_stdin(&program, &args_to_strings(&["-j", "-f", "-"]), &payload)
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
        "nft-json"
    }
}
