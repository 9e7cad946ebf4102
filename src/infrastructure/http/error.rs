//! HTTP Error Handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::error::{EngineError, ProcessErrorKind};

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    /// 稳定的错误分类，如 "not-found"、"process-error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>, kind: Option<&'static str>) -> Self {
        Self {
            errno,
            error: error.into(),
            kind,
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const UNPROCESSABLE: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
    pub const GATEWAY_TIMEOUT: i32 = 504;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(EngineError),
}

impl ApiError {
    fn errno(&self) -> i32 {
        match self {
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::Validation(_) | EngineError::EmptyInput => errno::BAD_REQUEST,
                EngineError::NotFound(_) => errno::NOT_FOUND,
                EngineError::AlreadyExists(_) => errno::CONFLICT,
                EngineError::Process { kind, .. } => match kind {
                    ProcessErrorKind::Unavailable => errno::SERVICE_UNAVAILABLE,
                    ProcessErrorKind::Timeout => errno::GATEWAY_TIMEOUT,
                    ProcessErrorKind::UnsupportedFormat | ProcessErrorKind::CorruptInput => {
                        errno::UNPROCESSABLE
                    }
                    ProcessErrorKind::Failed => errno::INTERNAL_ERROR,
                },
                EngineError::Model(_) => errno::SERVICE_UNAVAILABLE,
                EngineError::Io(_) => errno::INTERNAL_ERROR,
            },
        }
    }

    fn kind(&self) -> Option<&'static str> {
        match self {
            ApiError::BadRequest(_) => None,
            ApiError::Engine(EngineError::Process { kind, .. }) => Some(kind.as_str()),
            ApiError::Engine(e) => Some(e.kind()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.errno();
        let kind = self.kind();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Engine(e) => e.to_string(),
        };

        if code >= errno::INTERNAL_ERROR {
            tracing::error!(errno = code, kind = ?kind, error = %message, "Request failed");
        } else {
            tracing::warn!(errno = code, kind = ?kind, error = %message, "Request rejected");
        }

        (StatusCode::OK, Json(ErrorResponse::new(code, message, kind))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        let cases = [
            (EngineError::validation("bad"), errno::BAD_REQUEST),
            (EngineError::EmptyInput, errno::BAD_REQUEST),
            (EngineError::NotFound("x".into()), errno::NOT_FOUND),
            (EngineError::AlreadyExists("x".into()), errno::CONFLICT),
            (
                EngineError::process(ProcessErrorKind::Unavailable, "ffmpeg"),
                errno::SERVICE_UNAVAILABLE,
            ),
            (
                EngineError::process(ProcessErrorKind::Timeout, "slow"),
                errno::GATEWAY_TIMEOUT,
            ),
            (
                EngineError::process(ProcessErrorKind::CorruptInput, "moov"),
                errno::UNPROCESSABLE,
            ),
            (EngineError::Model("oom".into()), errno::SERVICE_UNAVAILABLE),
            (EngineError::io("disk full"), errno::INTERNAL_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).errno(), expected);
        }
    }

    #[test]
    fn test_process_errors_expose_sub_kind() {
        let err = ApiError::from(EngineError::process(ProcessErrorKind::Unavailable, "ffmpeg"));
        assert_eq!(err.kind(), Some("process-not-available"));
        assert_eq!(
            ApiError::from(EngineError::NotFound("x".into())).kind(),
            Some("not-found")
        );
    }
}
