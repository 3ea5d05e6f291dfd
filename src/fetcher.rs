//! HTTP fetcher for downloading the BGP routing table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::error::ImportError;
use crate::utils::format_bytes;
use crate::validation::validate_user_agent;

/// Public prefix-to-origin table published by bgp.tools
pub const DEFAULT_SOURCE_URL: &str = "https://bgp.tools/table.txt";

/// The full table is tens of megabytes; leave room for slow links
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Maximum accepted table size (256 MB)
/// The full table is tens of megabytes, so this leaves ample margin for growth
pub const DEFAULT_MAX_TABLE_SIZE: usize = 256 * 1024 * 1024;

/// Source of the raw routing table text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Download the table, identifying ourselves with `user_agent`.
    async fn fetch_table(&self, user_agent: &str) -> Result<String>;
}

/// HTTP client for fetching the routing table
pub struct Fetcher {
    client: Client,
    url: String,
    max_size: usize,
}

impl Fetcher {
    /// Create a fetcher for `url` with a request timeout and size limit
    pub fn new(url: impl Into<String>, timeout: Duration, max_size: usize) -> Result<Self> {
        let client = client_builder(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(client, url, max_size))
    }

    /// Create a fetcher around a preconfigured client
    pub fn with_client(client: Client, url: impl Into<String>, max_size: usize) -> Self {
        Self {
            client,
            url: url.into(),
            max_size,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Client settings shared by every fetcher.
///
/// Redirects are not followed: a 3xx is a non-200 status like any other,
/// and following one could leave the HTTPS source.
fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(15))
        .redirect(Policy::none())
}

// Note: Default is intentionally not implemented for Fetcher
// because new() can fail and we want explicit error handling.

#[async_trait]
impl TableSource for Fetcher {
    /// Single attempt, no retry: the next scheduled run acts as the retry.
    async fn fetch_table(&self, user_agent: &str) -> Result<String> {
        validate_user_agent(user_agent)?;
        debug!("GET {} (User-Agent: {})", self.url, user_agent);

        let mut response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;

        if response.status() != StatusCode::OK {
            return Err(ImportError::FetchStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            }
            .into());
        }

        // Check Content-Length header if available
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size as u64 {
                return Err(ImportError::TooLarge {
                    size: content_length,
                    max: self.max_size,
                }
                .into());
            }
        }

        // Servers may omit or understate Content-Length, so enforce while streaming
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read response body")?
        {
            if body.len() + chunk.len() > self.max_size {
                return Err(ImportError::TooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    max: self.max_size,
                }
                .into());
            }
            body.extend_from_slice(&chunk);
        }

        info!("Downloaded routing table ({})", format_bytes(body.len() as u64));

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
