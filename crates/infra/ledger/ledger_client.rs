use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error};

use crate::domain::value_objects::ledger::LedgerBlock;

/// Minimal ledger index client built on reqwest.
pub struct LedgerHttpClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LedgerErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

impl LedgerHttpClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ledger http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the block at `block_index`. `Ok(None)` means the ledger answered that no
    /// such block exists; every other failure is an error the caller may retry.
    pub async fn fetch_block(&self, block_index: u64) -> Result<Option<LedgerBlock>> {
        let url = format!("{}/blocks/{}", self.base_url, block_index);
        debug!(%url, block_index, "ledger: fetching block");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("ledger request failed for block {block_index}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(block_index, "ledger: block not found");
            return Ok(None);
        }

        let resp = Self::ensure_success(resp, block_index).await?;
        let block: LedgerBlock = resp
            .json()
            .await
            .with_context(|| format!("ledger returned a malformed block {block_index}"))?;

        Ok(Some(block))
    }

    async fn ensure_success(
        resp: reqwest::Response,
        block_index: u64,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let ledger_message = serde_json::from_str::<LedgerErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error.or(envelope.message));

        error!(
            status = %status,
            block_index,
            ledger_message = ?ledger_message,
            response_body = %body,
            "ledger api request failed"
        );

        anyhow::bail!(
            "ledger API request failed for block {} (status {})",
            block_index,
            status
        );
    }
}
