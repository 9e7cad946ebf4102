//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod codec;
pub mod synthesis;
pub mod transcoder;

pub use codec::*;
pub use synthesis::*;
pub use transcoder::*;
