//! Persistence Layer - 数据持久化
//!
//! JSON 元数据存储 + 文件系统音色注册表

mod profile_store;
mod voice_registry;

pub use profile_store::{JsonProfileStore, StoreError};
pub use voice_registry::{FileVoiceRegistry, RegistryConfig};
