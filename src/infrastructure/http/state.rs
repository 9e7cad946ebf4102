//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::{
    // Command handlers
    CreateVoiceFromVideoHandler, DeleteVoiceHandler, RegisterVoiceUploadHandler,
    // Query handlers
    CheckVoicesHandler, GetVoiceHandler, ListVoicesHandler,
    // Services
    MediaExtractionPipeline, RecordingLibrary, SynthesisDispatcher,
    // Ports
    VoiceRegistryPort,
};

/// 上传相关配置
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// 上传文件暂存目录（请求结束即删除）
    pub staging_dir: PathBuf,
    /// 截取预览输出目录
    pub output_dir: PathBuf,
    pub max_upload_bytes: u64,
}

/// 应用状态
pub struct AppState {
    // ========== Ports / Services ==========
    pub registry: Arc<dyn VoiceRegistryPort>,
    pub pipeline: Arc<MediaExtractionPipeline>,
    pub dispatcher: Arc<SynthesisDispatcher>,
    pub recordings: Arc<RecordingLibrary>,
    pub uploads: UploadConfig,

    // ========== Command Handlers ==========
    pub register_upload_handler: RegisterVoiceUploadHandler,
    pub create_from_video_handler: CreateVoiceFromVideoHandler,
    pub delete_voice_handler: DeleteVoiceHandler,

    // ========== Query Handlers ==========
    pub get_voice_handler: GetVoiceHandler,
    pub list_voices_handler: ListVoicesHandler,
    pub check_voices_handler: CheckVoicesHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        registry: Arc<dyn VoiceRegistryPort>,
        pipeline: Arc<MediaExtractionPipeline>,
        dispatcher: Arc<SynthesisDispatcher>,
        recordings: Arc<RecordingLibrary>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            // Command handlers
            register_upload_handler: RegisterVoiceUploadHandler::new(
                registry.clone(),
                pipeline.clone(),
            ),
            create_from_video_handler: CreateVoiceFromVideoHandler::new(
                registry.clone(),
                pipeline.clone(),
            ),
            delete_voice_handler: DeleteVoiceHandler::new(registry.clone()),

            // Query handlers
            get_voice_handler: GetVoiceHandler::new(registry.clone()),
            list_voices_handler: ListVoicesHandler::new(registry.clone()),
            check_voices_handler: CheckVoicesHandler::new(registry.clone()),

            registry,
            pipeline,
            dispatcher,
            recordings,
            uploads,
        }
    }
}
