//! Codec registry used to look up and open decoders for demuxed elementary streams.

use once_cell::sync::Lazy;
use symphonia::{core::codecs::CodecRegistry, default::register_enabled_codecs};

/// Default Symphonia [`CodecRegistry`], including every codec enabled in Symphonia.
pub static CODEC_REGISTRY: Lazy<CodecRegistry> = Lazy::new(|| {
    let mut registry = CodecRegistry::new();
    register_enabled_codecs(&mut registry);
    registry
});
