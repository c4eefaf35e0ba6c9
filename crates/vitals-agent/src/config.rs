use serde::Deserialize;
use std::path::PathBuf;

/// How the dispatcher ships a snapshot: one batch `POST /updates/` (steady
/// state) or one `POST /update/` per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Batch,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    Grpc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Collector server address (`host:port`, scheme optional).
    pub server_address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Number of concurrent delivery workers.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    /// Snapshot queue capacity; a full queue blocks the collection loop.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub report_mode: ReportMode,
    #[serde(default)]
    pub transport: TransportKind,
    /// Shared secret for HMAC-SHA256 payload signing.
    #[serde(default)]
    pub key: Option<String>,
    /// Path to the server's RSA public key (PEM); enables payload encryption.
    #[serde(default)]
    pub crypto_key: Option<PathBuf>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_rate_limit() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    100
}

fn default_request_timeout() -> u64 {
    10
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Base URL for the HTTP transport.
    pub fn http_base(&self) -> String {
        let addr = self.server_address.trim();
        if addr.contains("://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{addr}")
        }
    }

    /// URI for the gRPC transport.
    pub fn grpc_endpoint(&self) -> String {
        let addr = self.server_address.trim();
        if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }

    /// `host:port` form, used for local-address discovery.
    pub fn host_port(&self) -> &str {
        let addr = self.server_address.trim();
        match addr.find("://") {
            Some(idx) => addr[idx + 3..].trim_end_matches('/'),
            None => addr,
        }
    }
}
