//! Synthesis Adapters - 合成模型客户端与降级路径

mod http_model_client;
mod tone_fallback;

pub use http_model_client::{HttpSynthesisClient, HttpSynthesisClientConfig};
pub use tone_fallback::ToneFallback;
