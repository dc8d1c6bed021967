use std::time::Duration;

use transgate_core::verify::AllocatorSet;

const DEFAULT_SERVER_URL: &str = "https://api.zkpass.org";
const DEFAULT_DEV_SERVER_URL: &str = "https://api-dev.zkpass.org";
const DEFAULT_DEEP_LINK_URL: &str = "https://zkpass.org/transgate";

/// Polling ceiling for the deep-link and QR channels.
pub const MAX_POLL_ATTEMPTS: u32 = 300;
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// When true, the development server is used. Env: TRANSGATE_DEVELOP, default false.
pub fn develop_mode() -> bool {
    std::env::var("TRANSGATE_DEVELOP")
        .ok()
        .and_then(|s| match s.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(false)
}

/// Base URL of the TransGate server. Env: TRANSGATE_SERVER_URL.
pub fn server_url(develop: bool) -> String {
    std::env::var("TRANSGATE_SERVER_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            if develop {
                DEFAULT_DEV_SERVER_URL.to_string()
            } else {
                DEFAULT_SERVER_URL.to_string()
            }
        })
}

/// Where schema documents live when a config entry carries no URL.
/// Env: TRANSGATE_SCHEMA_BASE_URL, default `<server>/schema`.
pub fn schema_base_url(server: &str) -> String {
    std::env::var("TRANSGATE_SCHEMA_BASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{}/schema", server.trim_end_matches('/')))
}

/// Deep-link / QR base URL. Env: TRANSGATE_DEEP_LINK_URL.
pub fn deep_link_url() -> String {
    std::env::var("TRANSGATE_DEEP_LINK_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_DEEP_LINK_URL.to_string())
}

/// URL that answers 200 when the browser extension is reachable. Env: TRANSGATE_EXTENSION_PROBE_URL.
/// Unset means the extension is treated as absent.
pub fn extension_probe_url() -> Option<String> {
    std::env::var("TRANSGATE_EXTENSION_PROBE_URL")
        .ok()
        .filter(|s| !s.is_empty())
}

/// Env: TRANSGATE_POLL_INTERVAL_MS, default 1000.
pub fn poll_interval() -> Duration {
    std::env::var("TRANSGATE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(POLL_INTERVAL)
}

/// Env: TRANSGATE_MAX_POLL_ATTEMPTS, default 300.
pub fn max_poll_attempts() -> u32 {
    std::env::var("TRANSGATE_MAX_POLL_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(MAX_POLL_ATTEMPTS)
}

/// Env: TRANSGATE_HTTP_TIMEOUT_SECS, default 30.
pub fn http_timeout() -> Duration {
    std::env::var("TRANSGATE_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30))
}

/// Trusted allocators. Env overrides: TRANSGATE_EVM_ALLOCATOR, TRANSGATE_SOLANA_ALLOCATOR,
/// TRANSGATE_TON_ALLOCATOR. Solana and TON have no built-in identity.
pub fn allocators() -> AllocatorSet {
    let read = |name: &str| std::env::var(name).ok().filter(|s| !s.is_empty());
    let defaults = AllocatorSet::default();
    AllocatorSet {
        evm: read("TRANSGATE_EVM_ALLOCATOR").or(defaults.evm),
        solana: read("TRANSGATE_SOLANA_ALLOCATOR").or(defaults.solana),
        ton: read("TRANSGATE_TON_ALLOCATOR").or(defaults.ton),
    }
}

/// Everything a connector needs besides its collaborators.
#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    pub server_url: String,
    pub schema_base_url: String,
    pub deep_link_url: String,
    pub extension_probe_url: Option<String>,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub http_timeout: Duration,
    pub allocators: AllocatorSet,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            schema_base_url: format!("{}/schema", DEFAULT_SERVER_URL),
            deep_link_url: DEFAULT_DEEP_LINK_URL.to_string(),
            extension_probe_url: None,
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            http_timeout: Duration::from_secs(30),
            allocators: AllocatorSet::default(),
        }
    }
}

impl ConnectorConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(develop_mode())
    }

    /// Like [`from_env`](Self::from_env) but with develop mode forced by the caller.
    pub fn from_env_with(develop: bool) -> Self {
        let server_url = server_url(develop);
        Self {
            schema_base_url: schema_base_url(&server_url),
            server_url,
            deep_link_url: deep_link_url(),
            extension_probe_url: extension_probe_url(),
            poll_interval: poll_interval(),
            max_poll_attempts: max_poll_attempts(),
            http_timeout: http_timeout(),
            allocators: allocators(),
        }
    }

    /// Schema document URL for `schema_id` when the config entry has none.
    pub fn default_schema_url(&self, schema_id: &str) -> String {
        format!("{}/{}.json", self.schema_base_url.trim_end_matches('/'), schema_id)
    }
}
