//! Shared types for the vitals telemetry pipeline.
//!
//! The agent and the collector server both depend on this crate for the
//! [`metric`] wire model, the [`seal`] payload signing/encryption helpers,
//! and the generated gRPC bindings in [`proto`].

pub mod metric;
pub mod seal;

pub mod proto {
    #![allow(clippy::pedantic)]
    #![allow(clippy::missing_errors_doc)]
    #![allow(clippy::doc_markdown)]
    #![allow(clippy::default_trait_access)]
    tonic::include_proto!("vitals");
}
