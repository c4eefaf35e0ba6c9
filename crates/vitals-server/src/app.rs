use crate::state::AppState;
use crate::{api, logging, middleware};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

/// Assembles the HTTP surface.
///
/// Layer order mirrors the agent's sealing pipeline in reverse: logging,
/// RSA decryption, gzip decompression, the trusted-subnet check, then
/// signature verification over the recovered plaintext.
pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/ping", get(api::ping))
        .route("/value/gauge/{name}", get(api::value_gauge))
        .route("/value/counter/{name}", get(api::value_counter))
        .route("/value/", post(api::value_json))
        .route("/update/gauge/{name}/{value}", post(api::update_gauge_path))
        .route(
            "/update/counter/{name}/{value}",
            post(api::update_counter_path),
        )
        .route("/update/", post(api::update_json))
        .route("/updates/", post(api::update_batch))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::verify_signature,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::trusted_subnet))
        .layer(RequestDecompressionLayer::new())
        .layer(from_fn_with_state(state.clone(), middleware::decrypt_payload))
        .layer(CompressionLayer::new())
        .layer(from_fn(logging::request_logging))
        .with_state(state)
}
