//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::request_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;
use crate::config;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体大小上限，需覆盖最大上传文件加表单开销
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&config::ServerConfig::default())
    }
}

impl From<&config::ServerConfig> for ServerConfig {
    fn from(config: &config::ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn build_router(&self) -> Router {
        // UI 可能来自其他端口，下载音频时需读取文件名
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([CONTENT_TYPE])
            .expose_headers([CONTENT_DISPOSITION, CONTENT_LENGTH])
            .max_age(Duration::from_secs(3600));

        create_routes()
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(middleware::from_fn(request_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器，`shutdown_signal` 完成后停止接收新连接并等待进行中的请求
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            max_body_mb = self.config.max_body_bytes / (1024 * 1024),
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_follows_app_config() {
        let app = config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: 1024,
        };
        let server = ServerConfig::from(&app);
        assert_eq!(server.addr(), "127.0.0.1:8080");
        assert_eq!(server.max_body_bytes, 1024);
    }

    #[test]
    fn test_default_matches_app_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.port, config::ServerConfig::default().port);
        assert!(server.max_body_bytes > 100 * 1024 * 1024);
    }
}
