//! Agent-side delivery pipeline: bounded queue, rate-limited worker pool,
//! compress/sign/encrypt sealing, and retry with backoff.

pub mod config;
pub mod dispatcher;
pub mod pipeline;
pub mod transport;
