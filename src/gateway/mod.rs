mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use transgate_core::codec::ChainType;
use transgate_core::schema::{ProofResult, Task};

/// App configuration returned by `/sdk/config`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub schemas: Vec<SchemaEntry>,
    pub task_rpc: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl SdkConfig {
    pub fn schema(&self, schema_id: &str) -> Option<&SchemaEntry> {
        self.schemas.iter().find(|s| s.schema_id == schema_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub schema_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

/// Body of the task allocation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub token: String,
    pub schema_id: String,
    pub app_id: String,
    pub chain_type: ChainType,
}

/// Everything the session controller needs from the network.
///
/// Implementations report failures as [`GatewayError`]; mapping them onto the
/// public taxonomy is the controller's job.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Whether the browser extension answers. Never fails; absence is `false`.
    async fn probe_extension(&self) -> bool;

    async fn fetch_config(&self, app_id: &str) -> Result<SdkConfig, GatewayError>;

    async fn fetch_schema(&self, url: &str) -> Result<serde_json::Value, GatewayError>;

    async fn allocate_task(&self, task_rpc: &str, request: &TaskRequest) -> Result<Task, GatewayError>;

    /// One poll of the result endpoint. `Ok(None)` means not ready yet.
    async fn poll_result(&self, task_id: &str) -> Result<Option<ProofResult>, GatewayError>;

    /// Whether a mobile device has already picked up the task.
    async fn scan_status(&self, task_id: &str) -> Result<bool, GatewayError>;

    fn gateway_name(&self) -> &str;
}

#[derive(Debug)]
pub enum GatewayError {
    Http(reqwest::Error),
    HttpStatus(u16, String),
    InvalidJson(serde_json::Error),
    InvalidUrl(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Http(e) => write!(f, "http: {}", e),
            GatewayError::HttpStatus(code, body) => write!(f, "http status {}: {}", code, body),
            GatewayError::InvalidJson(e) => write!(f, "invalid json: {}", e),
            GatewayError::InvalidUrl(url) => write!(f, "invalid url: {}", url),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lookup_by_schema_id() {
        let config: SdkConfig = serde_json::from_value(serde_json::json!({
            "schemas": [{"schema_id": "a"}, {"schema_id": "b", "schema_url": "https://s/b.json"}],
            "task_rpc": "rpc.example/task",
            "token": "tok"
        }))
        .unwrap();
        assert!(config.schema("a").unwrap().schema_url.is_none());
        assert_eq!(config.schema("b").unwrap().schema_url.as_deref(), Some("https://s/b.json"));
        assert!(config.schema("c").is_none());
        assert!(config.callback_url.is_none());
    }

    #[test]
    fn task_request_wire_shape() {
        let request = TaskRequest {
            token: "tok".to_string(),
            schema_id: "s".to_string(),
            app_id: "app".to_string(),
            chain_type: ChainType::Ton,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"token": "tok", "schema_id": "s", "app_id": "app", "chain_type": "ton"})
        );
    }
}
