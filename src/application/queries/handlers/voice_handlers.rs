//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::EngineError;
use crate::application::ports::{ReconcileReport, VoiceRegistryPort};
use crate::application::queries::{CheckVoices, GetVoice, ListVoices};
use crate::domain::voice::VoiceProfile;

/// GetVoice Handler
pub struct GetVoiceHandler {
    registry: Arc<dyn VoiceRegistryPort>,
}

impl GetVoiceHandler {
    pub fn new(registry: Arc<dyn VoiceRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetVoice) -> Result<VoiceProfile, EngineError> {
        self.registry
            .lookup(&query.name)
            .await
            .ok_or(EngineError::NotFound(query.name))
    }
}

/// ListVoices Handler
pub struct ListVoicesHandler {
    registry: Arc<dyn VoiceRegistryPort>,
}

impl ListVoicesHandler {
    pub fn new(registry: Arc<dyn VoiceRegistryPort>) -> Self {
        Self { registry }
    }

    /// 按名称排序
    pub async fn handle(&self, _query: ListVoices) -> Vec<VoiceProfile> {
        self.registry.profiles().await
    }
}

/// CheckVoices Handler
pub struct CheckVoicesHandler {
    registry: Arc<dyn VoiceRegistryPort>,
}

impl CheckVoicesHandler {
    pub fn new(registry: Arc<dyn VoiceRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, _query: CheckVoices) -> Result<ReconcileReport, EngineError> {
        self.registry.reconcile().await
    }
}
