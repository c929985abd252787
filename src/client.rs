use crate::error::{Dumont4wpError, Result};
use crate::settings::ServerInfo;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Operations the admin page runs against a search server.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// True when the server answered its ping endpoint.
    async fn ping(&self, server: &ServerInfo) -> bool;
    async fn delete_all(&self, server: &ServerInfo) -> Result<()>;
    async fn optimize(&self, server: &ServerInfo) -> Result<()>;
    async fn add_documents(&self, server: &ServerInfo, docs: &[Value]) -> Result<()>;
}

/// Solr-style HTTP API client (`/admin/ping`, `/update`).
#[derive(Clone)]
pub struct HttpSearchClient {
    http_client: reqwest::Client,
}

impl HttpSearchClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Fails when the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    async fn post_update(&self, server: &ServerInfo, query: &str, body: &Value) -> Result<()> {
        let base = server.base_url();
        let url = format!("{}/update?{}", base, query);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Dumont4wpError::Backend {
                server: base.clone(),
                message: format!("Failed to send request: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Dumont4wpError::Backend {
                server: base,
                message: format!("returned {}: {}", status, text.trim()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for HttpSearchClient {
    async fn ping(&self, server: &ServerInfo) -> bool {
        let url = format!("{}/admin/ping?wt=json", server.base_url());
        match self.http_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!("Ping {} returned {}", url, response.status());
                false
            }
            Err(e) => {
                tracing::warn!("Ping {} failed: {}", url, e);
                false
            }
        }
    }

    async fn delete_all(&self, server: &ServerInfo) -> Result<()> {
        self.post_update(server, "commit=true", &json!({"delete": {"query": "*:*"}}))
            .await
    }

    async fn optimize(&self, server: &ServerInfo) -> Result<()> {
        self.post_update(server, "optimize=true&waitSearcher=false", &json!({}))
            .await
    }

    async fn add_documents(&self, server: &ServerInfo, docs: &[Value]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        self.post_update(server, "commit=true", &Value::Array(docs.to_vec()))
            .await
    }
}
