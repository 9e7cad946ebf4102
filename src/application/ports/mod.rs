//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_codec;
mod media_transcoder;
mod synthesis_model;
mod voice_registry;

pub use audio_codec::{AudioCodecPort, CodecError};
pub use media_transcoder::{ExtractJob, MediaInfo, MediaTranscoderPort, TranscodeError};
pub use synthesis_model::{ModelError, ModelPermit, SynthesisModelPort, SynthesisRequest};
pub use voice_registry::{ReconcileReport, RegisterVoice, VoiceRegistryPort};
