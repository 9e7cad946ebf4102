//! HTTP Middleware
//!
//! 传输层状态码日志。业务错误（errno != 0）在 `ApiError::into_response()` 中记录，
//! 这里只处理 axum 自身产生的 4xx / 5xx（如请求体超限、路由不存在）。

use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// 合成与截取可能很慢，超过此值的请求记一条 info
const SLOW_REQUEST_MS: u128 = 10_000;

/// 请求日志中间件
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(
            method = %method,
            uri = %uri,
            "Request body exceeds the configured server.max_body_bytes"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            "HTTP client error"
        );
    } else if elapsed_ms >= SLOW_REQUEST_MS {
        tracing::info!(method = %method, uri = %uri, elapsed_ms, "Slow request");
    }

    response
}
