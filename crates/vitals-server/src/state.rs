use crate::config::ServerConfig;
use anyhow::Context;
use ipnetwork::IpNetwork;
use std::sync::Arc;
use vitals_common::seal::Decryptor;
use vitals_storage::Storage;

/// Shared handles for the HTTP handlers, the middleware stack, and the gRPC
/// service.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Shared HMAC secret; `None` disables signature verification.
    pub signing_key: Option<String>,
    /// RSA private key; `None` disables payload decryption.
    pub decryptor: Option<Arc<Decryptor>>,
    /// Agent allowlist; `None` accepts every source address.
    pub trusted_subnet: Option<IpNetwork>,
}

impl AppState {
    pub fn from_config(storage: Arc<dyn Storage>, config: &ServerConfig) -> anyhow::Result<Self> {
        let decryptor = match &config.crypto_key {
            Some(path) => Some(Arc::new(Decryptor::from_pem_file(path)?)),
            None => None,
        };
        let trusted_subnet = match &config.trusted_subnet {
            Some(cidr) => Some(
                cidr.parse::<IpNetwork>()
                    .with_context(|| format!("invalid trusted_subnet '{cidr}'"))?,
            ),
            None => None,
        };
        Ok(Self {
            storage,
            signing_key: config.key.clone(),
            decryptor,
            trusted_subnet,
        })
    }
}
