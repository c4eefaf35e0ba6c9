use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::IpAddr;

use crate::logging::TraceId;
use crate::state::AppState;

/// Header carrying the base64 HMAC-SHA256 of the uncompressed payload.
static HASH_HEADER: HeaderName = HeaderName::from_static("hashsha256");

/// Header carrying the agent's outbound IP address.
static REAL_IP_HEADER: HeaderName = HeaderName::from_static("x-real-ip");

/// Upper bound on a buffered request body.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

fn trace_id_of(req: &Request) -> String {
    req.extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

/// Decrypts the request body with the server's RSA private key.
///
/// Runs before gzip decompression: the agent encrypts the *compressed*
/// payload, so ciphertext is the outermost envelope. Passes through when no
/// key is configured or the body is empty.
pub async fn decrypt_payload(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(decryptor) = state.decryptor.clone() else {
        return next.run(req).await;
    };

    let trace_id = trace_id_of(&req);
    let (mut parts, body) = req.into_parts();
    let cipher = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, error = %e, "request body unreadable");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if cipher.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    match decryptor.decrypt(&cipher) {
        Ok(plain) => {
            // The stated length belongs to the ciphertext
            parts.headers.remove(header::CONTENT_LENGTH);
            next.run(Request::from_parts(parts, Body::from(plain))).await
        }
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, error = %e, "payload decryption failed");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Verifies the `HashSHA256` signature over the decompressed body.
///
/// Passes through when no key is configured or the request carries no
/// signature header; a present but wrong signature is rejected with 400.
pub async fn verify_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(key) = state.signing_key.clone() else {
        return next.run(req).await;
    };
    let Some(signature) = req
        .headers()
        .get(&HASH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return next.run(req).await;
    };

    let trace_id = trace_id_of(&req);
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, error = %e, "request body unreadable");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if let Err(e) = vitals_common::seal::verify(&bytes, &key, &signature) {
        tracing::warn!(trace_id = %trace_id, error = %e, "signature verification failed");
        return StatusCode::BAD_REQUEST.into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Rejects requests whose `X-Real-IP` falls outside the trusted subnet.
pub async fn trusted_subnet(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(subnet) = state.trusted_subnet else {
        return next.run(req).await;
    };

    let trace_id = trace_id_of(&req);
    let real_ip = req
        .headers()
        .get(&REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<IpAddr>().ok());

    match real_ip {
        Some(ip) if subnet.contains(ip) => next.run(req).await,
        Some(ip) => {
            tracing::warn!(trace_id = %trace_id, ip = %ip, subnet = %subnet,
                "source address outside trusted subnet");
            StatusCode::FORBIDDEN.into_response()
        }
        None => {
            tracing::warn!(trace_id = %trace_id,
                "missing or unparsable X-Real-IP header");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::middleware::from_fn_with_state;
    use axum::routing::post;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;
    use vitals_storage::memory::MemoryStorage;

    fn state_with_subnet(subnet: Option<&str>) -> AppState {
        AppState {
            storage: Arc::new(MemoryStorage::new()),
            signing_key: None,
            decryptor: None,
            trusted_subnet: subnet.map(|s| s.parse().unwrap()),
        }
    }

    async fn echo(body: String) -> String {
        body
    }

    fn subnet_app(state: AppState) -> Router {
        Router::new()
            .route("/echo", post(echo))
            .layer(from_fn_with_state(state.clone(), trusted_subnet))
            .with_state(state)
    }

    fn post_with_ip(ip: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/echo");
        if let Some(ip) = ip {
            builder = builder.header("X-Real-IP", ip);
        }
        builder.body(Body::from("hello")).unwrap()
    }

    #[tokio::test]
    async fn subnet_disabled_passes_through() {
        let app = subnet_app(state_with_subnet(None));
        let resp = app.oneshot(post_with_ip(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn inside_subnet_passes() {
        let app = subnet_app(state_with_subnet(Some("10.0.0.0/8")));
        let resp = app.oneshot(post_with_ip(Some("10.1.2.3"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn outside_subnet_is_forbidden() {
        let app = subnet_app(state_with_subnet(Some("10.0.0.0/8")));
        let resp = app
            .oneshot(post_with_ip(Some("192.168.1.1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_header_is_forbidden() {
        let app = subnet_app(state_with_subnet(Some("10.0.0.0/8")));
        let resp = app.oneshot(post_with_ip(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn verified_body_reaches_the_handler_intact() {
        let state = AppState {
            signing_key: Some("secret".to_string()),
            ..state_with_subnet(None)
        };
        let app = Router::new()
            .route("/echo", post(echo))
            .layer(from_fn_with_state(state.clone(), verify_signature))
            .with_state(state);

        let sig = vitals_common::seal::sign(b"payload", "secret").unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("HashSHA256", sig)
            .body(Body::from("payload"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"payload");
    }
}
