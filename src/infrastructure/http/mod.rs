//! HTTP Layer - RESTful API
//!
//! 引擎操作的薄绑定，供 UI 层调用

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::{AppState, UploadConfig};
