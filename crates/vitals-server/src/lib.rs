//! Collector server for the vitals telemetry pipeline.
//!
//! Metrics arrive over two surfaces backed by the same [`state::AppState`]:
//! an axum HTTP API ([`api`]) wrapped in the [`middleware`] stack
//! (decryption, gzip, signature verification, trusted-subnet allowlist) and
//! a tonic gRPC service ([`grpc`]).

pub mod api;
pub mod app;
pub mod config;
pub mod grpc;
pub mod logging;
pub mod middleware;
pub mod state;
