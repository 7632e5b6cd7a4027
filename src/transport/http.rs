//! HTTP transport: one JSON POST per procedure call

use super::Transport;
use crate::result::CallResult;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Procedure name used for the introspection handshake
pub const INTROSPECT_PROCEDURE: &str = "introspect";

pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    uri: String,
}

impl HttpTransport {
    pub fn new(uri: &str) -> Result<Self> {
        Self::with_client(uri, reqwest::Client::new())
    }

    pub fn with_client(uri: &str, client: reqwest::Client) -> Result<Self> {
        let base = Url::parse(uri).with_context(|| format!("Invalid HTTP uri: {}", uri))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("Not an HTTP uri: {}", uri));
        }

        Ok(Self {
            client,
            base,
            uri: uri.to_string(),
        })
    }

    /// Request URL for a procedure. The name is always a single path segment
    /// under the base path; it can never change the host, query or fragment.
    fn procedure_url(&self, procedure: &str) -> Result<Url> {
        if matches!(procedure, "" | "." | "..") {
            return Err(anyhow!("Invalid procedure name: {:?}", procedure));
        }

        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow!("Cannot build procedure URLs from {}", self.uri))?
            .pop_if_empty()
            .push(procedure);
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn introspect(&self) -> Result<CallResult> {
        self.call(INTROSPECT_PROCEDURE, json!({})).await
    }

    async fn call(&self, procedure: &str, arg: Value) -> Result<CallResult> {
        let url = self.procedure_url(procedure)?;
        let body = if arg.is_null() { json!({}) } else { arg };

        debug!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();

        // Servers answer failures with a result object too, so the status
        // alone does not decide the outcome.
        let value: Value = serde_json::from_str(&body_text).map_err(|_| {
            anyhow!(
                "Unexpected response from {}: {} - {}",
                url,
                status,
                body_text
            )
        })?;

        CallResult::from_value(value)
            .map_err(|e| anyhow!("Invalid result object from {} ({}): {}", url, status, e))
    }
}
