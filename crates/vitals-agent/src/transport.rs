use crate::config::{AgentConfig, ReportMode, TransportKind};
use crate::pipeline::{Pipeline, SealedPayload};
use anyhow::Context;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::Mutex;
use tonic::transport::Channel;
use vitals_common::metric::Snapshot;
use vitals_common::proto::metrics_client::MetricsClient;
use vitals_common::proto::UpdateBatchRequest;

/// One delivery attempt for a snapshot. A non-success status or transport
/// error is a retryable failure; the dispatcher owns the retry schedule.
pub enum Transport {
    Http(HttpTransport),
    Grpc(GrpcTransport),
}

impl Transport {
    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        Ok(match config.transport {
            TransportKind::Http => Transport::Http(HttpTransport::from_config(config)?),
            TransportKind::Grpc => Transport::Grpc(GrpcTransport::new(config.grpc_endpoint())),
        })
    }

    pub async fn deliver(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        match self {
            Transport::Http(http) => http.deliver(snapshot).await,
            Transport::Grpc(grpc) => grpc.deliver(snapshot).await,
        }
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    mode: ReportMode,
    pipeline: Pipeline,
    real_ip: Option<IpAddr>,
}

impl HttpTransport {
    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base: config.http_base(),
            mode: config.report_mode,
            pipeline: Pipeline::from_config(config)?,
            real_ip: local_outbound_ip(config.host_port()),
        })
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    async fn deliver(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        match self.mode {
            ReportMode::Batch => {
                let sealed = self.pipeline.seal(snapshot)?;
                self.post(&format!("{}/updates/", self.base), sealed).await
            }
            ReportMode::Single => {
                for metric in snapshot.metrics() {
                    let sealed = self.pipeline.seal(metric)?;
                    self.post(&format!("{}/update/", self.base), sealed).await?;
                }
                Ok(())
            }
        }
    }

    async fn post(&self, url: &str, sealed: SealedPayload) -> anyhow::Result<()> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CONTENT_ENCODING, "gzip")
            .header(reqwest::header::ACCEPT_ENCODING, "gzip")
            .body(sealed.body);
        if let Some(signature) = sealed.signature {
            request = request.header("HashSHA256", signature);
        }
        if let Some(ip) = self.real_ip {
            request = request.header("X-Real-IP", ip.to_string());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("unexpected status code: {}", response.status());
        }
        Ok(())
    }
}

pub struct GrpcTransport {
    endpoint: String,
    // Lazily connected; reset on failure so the next attempt reconnects.
    client: Mutex<Option<MetricsClient<Channel>>>,
}

impl GrpcTransport {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: Mutex::new(None),
        }
    }

    async fn deliver(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let request = UpdateBatchRequest {
            metrics: snapshot.metrics().iter().map(Into::into).collect(),
        };

        let mut guard = self.client.lock().await;
        let client = match guard.as_mut() {
            Some(client) => client,
            None => {
                let client = MetricsClient::connect(self.endpoint.clone())
                    .await
                    .with_context(|| format!("connecting to {}", self.endpoint))?;
                guard.insert(client)
            }
        };

        let result = client.update_batch(request).await;
        if let Err(status) = result {
            *guard = None;
            anyhow::bail!("batch rejected: {status}");
        }
        Ok(())
    }
}

/// Local address the OS would use to reach `server` (`host:port`). No packet
/// is sent; a connected UDP socket just resolves the route.
fn local_outbound_ip(server: &str) -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(server).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
