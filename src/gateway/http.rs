use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use transgate_core::schema::{ProofResult, Task};

use super::{Gateway, GatewayError, SdkConfig, TaskRequest};
use crate::config::ConnectorConfig;

#[derive(Debug, Deserialize)]
struct InfoEnvelope<T> {
    info: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ScanInfo {
    #[serde(default)]
    used: bool,
}

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    task_id: &'a str,
}

/// [`Gateway`] over HTTPS with reqwest.
pub struct HttpGateway {
    server_url: String,
    extension_probe_url: Option<String>,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &ConnectorConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(GatewayError::Http)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &ConnectorConfig, client: Client) -> Self {
        Self {
            server_url: config.server_url.trim_end_matches('/').to_string(),
            extension_probe_url: config.extension_probe_url.clone(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let raw = format!("{}{}", self.server_url, path);
        Url::parse(&raw).map_err(|_| GatewayError::InvalidUrl(raw))
    }
}

/// Task RPC addresses arrive without a scheme; https is implied.
fn task_rpc_url(task_rpc: &str) -> Result<Url, GatewayError> {
    let raw = if task_rpc.contains("://") {
        task_rpc.to_string()
    } else {
        format!("https://{}", task_rpc)
    };
    Url::parse(&raw).map_err(|_| GatewayError::InvalidUrl(raw))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(GatewayError::HttpStatus(status.as_u16(), text));
    }
    let bytes = response.bytes().await.map_err(GatewayError::Http)?;
    serde_json::from_slice(&bytes).map_err(GatewayError::InvalidJson)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn probe_extension(&self) -> bool {
        let Some(url) = &self.extension_probe_url else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("extension probe failed: {}", e);
                false
            }
        }
    }

    async fn fetch_config(&self, app_id: &str) -> Result<SdkConfig, GatewayError> {
        let mut url = self.endpoint("/sdk/config")?;
        url.query_pairs_mut().append_pair("app_id", app_id);
        let response = self.client.get(url).send().await.map_err(GatewayError::Http)?;
        read_json(response).await
    }

    async fn fetch_schema(&self, url: &str) -> Result<serde_json::Value, GatewayError> {
        let url = Url::parse(url).map_err(|_| GatewayError::InvalidUrl(url.to_string()))?;
        let response = self.client.get(url).send().await.map_err(GatewayError::Http)?;
        read_json(response).await
    }

    async fn allocate_task(&self, task_rpc: &str, request: &TaskRequest) -> Result<Task, GatewayError> {
        let mut url = task_rpc_url(task_rpc)?;
        url.query_pairs_mut().append_pair("token", &request.token);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(GatewayError::Http)?;
        read_json(response).await
    }

    async fn poll_result(&self, task_id: &str) -> Result<Option<ProofResult>, GatewayError> {
        let mut url = self.endpoint("/sdk/task/result")?;
        url.query_pairs_mut().append_pair("task_id", task_id);
        let response = self.client.get(url).send().await.map_err(GatewayError::Http)?;
        if !response.status().is_success() {
            // Not ready yet; the endpoint answers non-2xx until the proof lands.
            return Ok(None);
        }
        let envelope: InfoEnvelope<ProofResult> = read_json(response).await?;
        Ok(envelope.info)
    }

    async fn scan_status(&self, task_id: &str) -> Result<bool, GatewayError> {
        let url = self.endpoint("/sdk/task/scan")?;
        let response = self
            .client
            .post(url)
            .json(&ScanRequest { task_id })
            .send()
            .await
            .map_err(GatewayError::Http)?;
        let envelope: InfoEnvelope<ScanInfo> = read_json(response).await?;
        Ok(envelope.info.map(|i| i.used).unwrap_or(false))
    }

    fn gateway_name(&self) -> &str {
        "http"
    }
}
