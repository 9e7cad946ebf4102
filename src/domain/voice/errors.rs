//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("invalid voice name: {0}")]
    InvalidName(String),

    #[error("invalid trim range: {0}")]
    InvalidTrimRange(String),

    #[error("invalid voice profile: {0}")]
    InvalidProfile(String),
}
