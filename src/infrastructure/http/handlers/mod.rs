//! HTTP Handlers

mod media;
mod ping;
mod recording;
mod synthesis;
mod upload;
mod voice;

pub use media::*;
pub use ping::*;
pub use recording::*;
pub use synthesis::*;
pub use voice::*;
