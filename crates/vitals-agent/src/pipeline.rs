use crate::config::AgentConfig;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::Write;
use vitals_common::seal::{self, Encryptor};

/// A payload ready for transmission. `body` has passed every enabled stage;
/// `signature` covers the pre-compression plaintext.
pub struct SealedPayload {
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

/// The ordered transform pipeline applied to every outgoing payload:
/// serialize → sign plaintext → gzip → optionally encrypt. Disabling a stage
/// never changes the relative order of the others.
pub struct Pipeline {
    signing_key: Option<String>,
    encryptor: Option<Encryptor>,
}

impl Pipeline {
    pub fn new(signing_key: Option<String>, encryptor: Option<Encryptor>) -> Self {
        Self {
            signing_key,
            encryptor,
        }
    }

    /// Builds the pipeline from config. An unreadable or malformed key file
    /// is a startup error, not a per-send one.
    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let encryptor = match &config.crypto_key {
            Some(path) => Some(Encryptor::from_pem_file(path)?),
            None => None,
        };
        Ok(Self::new(config.key.clone(), encryptor))
    }

    pub fn seal<T: Serialize>(&self, payload: &T) -> anyhow::Result<SealedPayload> {
        self.seal_bytes(&serde_json::to_vec(payload)?)
    }

    fn seal_bytes(&self, plain: &[u8]) -> anyhow::Result<SealedPayload> {
        let signature = match &self.signing_key {
            Some(key) => Some(seal::sign(plain, key)?),
            None => None,
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plain)?;
        let compressed = encoder.finish()?;

        let body = match &self.encryptor {
            Some(encryptor) => encryptor.encrypt(&compressed)?,
            None => compressed,
        };

        Ok(SealedPayload { body, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use vitals_common::metric::{Metric, Snapshot};

    fn gunzip(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(body).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn body_is_gzip_of_json() {
        let snapshot = Snapshot::new(vec![Metric::counter("PollCount", 1)]);
        let sealed = Pipeline::new(None, None).seal(&snapshot).unwrap();
        assert!(sealed.signature.is_none());
        let plain = gunzip(&sealed.body);
        let back: Snapshot = serde_json::from_slice(&plain).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn signature_covers_uncompressed_payload() {
        let snapshot = Snapshot::new(vec![Metric::gauge("RandomValue", 0.25)]);
        let sealed = Pipeline::new(Some("secret".into()), None)
            .seal(&snapshot)
            .unwrap();
        let signature = sealed.signature.unwrap();
        let plain = gunzip(&sealed.body);
        // The receiver verifies after decompression, against the plaintext.
        vitals_common::seal::verify(&plain, "secret", &signature).unwrap();
        assert!(vitals_common::seal::verify(&sealed.body, "secret", &signature).is_err());
    }

    #[test]
    fn encryption_wraps_compression() {
        use rsa::{RsaPrivateKey, RsaPublicKey};
        use vitals_common::seal::Decryptor;

        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let encryptor = Encryptor::from_key(RsaPublicKey::from(&private));
        let decryptor = Decryptor::from_key(private);

        let snapshot = Snapshot::new(vec![Metric::gauge("TotalMemory", 1024.0)]);
        let sealed = Pipeline::new(Some("k".into()), Some(encryptor))
            .seal(&snapshot)
            .unwrap();

        let compressed = decryptor.decrypt(&sealed.body).unwrap();
        let plain = gunzip(&compressed);
        let back: Snapshot = serde_json::from_slice(&plain).unwrap();
        assert_eq!(back, snapshot);
        vitals_common::seal::verify(&plain, "k", &sealed.signature.unwrap()).unwrap();
    }
}
