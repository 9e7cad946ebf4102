//! Application Services - 引擎核心流程
//!
//! - extraction: 媒体截取流水线
//! - dispatcher: 合成调度
//! - recordings: 录音库

mod dispatcher;
mod extraction;
mod recordings;

pub use dispatcher::{DispatcherConfig, SynthesisDispatcher, SynthesisOutcome};
pub use extraction::{ExtractedClip, ExtractionConfig, MediaExtractionPipeline, TargetFormat};
pub use recordings::{RecordingLibrary, SavedRecording};
