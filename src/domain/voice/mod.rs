//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 音色名称规范（字符集、大小写折叠）
//! - Voice Profile 元数据及其不变量

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::{VoiceProfile, VoiceSource};
pub use errors::VoiceError;
pub use value_objects::{SourceType, TrimRange, VoiceName, MAX_NAME_LEN};
