//! Codec Adapter - symphonia 编解码

mod wav_codec;

pub use wav_codec::WavCodec;
