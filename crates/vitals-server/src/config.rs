use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_address")]
    pub http_address: String,
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    /// Seconds between file snapshots. 0 disables the periodic flush; the
    /// file backend then writes only once, at shutdown.
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
    /// Snapshot file for the file backend. An empty string selects the
    /// plain in-memory backend.
    #[serde(default = "default_file_storage_path")]
    pub file_storage_path: String,
    /// Replay the last snapshot on startup.
    #[serde(default = "default_restore")]
    pub restore: bool,
    /// SQLite database file. When set the relational backend is used and
    /// the snapshot settings are ignored.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Shared secret for HMAC-SHA256 payload verification.
    #[serde(default)]
    pub key: Option<String>,
    /// Path to the server's RSA private key (PEM); enables payload
    /// decryption.
    #[serde(default)]
    pub crypto_key: Option<PathBuf>,
    /// CIDR allowlist for agents. Requests whose `X-Real-IP` falls outside
    /// the subnet are rejected.
    #[serde(default)]
    pub trusted_subnet: Option<String>,
}

fn default_http_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_grpc_address() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_store_interval() -> u64 {
    5
}

fn default_file_storage_path() -> String {
    "/tmp/vitals-db.json".to_string()
}

fn default_restore() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_address, "0.0.0.0:8080");
        assert_eq!(config.grpc_address, "0.0.0.0:50051");
        assert_eq!(config.store_interval_secs, 5);
        assert_eq!(config.file_storage_path, "/tmp/vitals-db.json");
        assert!(config.restore);
        assert!(config.database_path.is_none());
        assert!(config.key.is_none());
        assert!(config.trusted_subnet.is_none());
    }

    #[test]
    fn explicit_values_parse() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_address = "127.0.0.1:9000"
            store_interval_secs = 0
            database_path = "/var/lib/vitals/metrics.db"
            key = "shared-secret"
            trusted_subnet = "10.0.0.0/8"
            "#,
        )
        .unwrap();
        assert_eq!(config.http_address, "127.0.0.1:9000");
        assert_eq!(config.store_interval_secs, 0);
        assert_eq!(
            config.database_path.as_deref(),
            Some(std::path::Path::new("/var/lib/vitals/metrics.db"))
        );
        assert_eq!(config.key.as_deref(), Some("shared-secret"));
        assert_eq!(config.trusted_subnet.as_deref(), Some("10.0.0.0/8"));
    }
}
