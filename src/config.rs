use crate::{
    codecs::CODEC_REGISTRY,
    context::DisposalThread,
    format::{FormatRegistry, FORMAT_REGISTRY},
    io::BufferSize,
};

use derivative::Derivative;
use symphonia_core::{
    codecs::{CodecRegistry, DecoderOptions},
    formats::FormatOptions,
};

/// Configuration for opening and decoding byte streams.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[non_exhaustive]
pub struct Config {
    /// Read-ahead policy for bridges created by [`decode`] and [`decode_as`].
    ///
    /// Defaults to [`BufferSize::Default`].
    ///
    /// [`decode`]: crate::decode
    /// [`decode_as`]: crate::decode_as
    pub io_buffer: BufferSize,

    #[derivative(Debug = "ignore")]
    /// Registry of the codecs which elementary streams may be decoded with.
    ///
    /// Streams whose codec has no entry here are left without a content slot.
    ///
    /// Defaults to [`CODEC_REGISTRY`].
    ///
    /// [`CODEC_REGISTRY`]: static@CODEC_REGISTRY
    pub codec_registry: &'static CodecRegistry,

    #[derivative(Debug = "ignore")]
    /// Registry of the container formats which streams are sniffed against.
    ///
    /// Defaults to [`FORMAT_REGISTRY`].
    ///
    /// [`FORMAT_REGISTRY`]: static@FORMAT_REGISTRY
    pub format_registry: &'static FormatRegistry,

    #[derivative(Debug = "ignore")]
    /// Options passed to every demuxer on open.
    pub format_options: FormatOptions,

    #[derivative(Debug = "ignore")]
    /// Options passed to every decoder on open.
    pub decoder_options: DecoderOptions,

    /// A thread which will run the teardown of contexts dropped without an explicit
    /// [`close`].
    ///
    /// If not set, dropped contexts release their resources on the dropping thread.
    ///
    /// [`close`]: crate::DecodeContext::close
    pub disposer: Option<DisposalThread>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_buffer: BufferSize::Default,
            codec_registry: &CODEC_REGISTRY,
            format_registry: &FORMAT_REGISTRY,
            format_options: FormatOptions::default(),
            decoder_options: DecoderOptions::default(),
            disposer: None,
        }
    }
}

impl Config {
    /// Sets this `Config`'s bridge read-ahead policy.
    #[must_use]
    pub fn io_buffer(mut self, io_buffer: BufferSize) -> Self {
        self.io_buffer = io_buffer;
        self
    }

    /// Sets this `Config`'s symphonia codec registry.
    #[must_use]
    pub fn codec_registry(mut self, codec_registry: &'static CodecRegistry) -> Self {
        self.codec_registry = codec_registry;
        self
    }

    /// Sets this `Config`'s container format registry.
    #[must_use]
    pub fn format_registry(mut self, format_registry: &'static FormatRegistry) -> Self {
        self.format_registry = format_registry;
        self
    }

    /// Sets this `Config`'s demuxer options.
    #[must_use]
    pub fn format_options(mut self, format_options: FormatOptions) -> Self {
        self.format_options = format_options;
        self
    }

    /// Sets this `Config`'s decoder options.
    #[must_use]
    pub fn decoder_options(mut self, decoder_options: DecoderOptions) -> Self {
        self.decoder_options = decoder_options;
        self
    }

    /// Sets this `Config`'s thread for disposing of dropped contexts.
    #[must_use]
    pub fn disposer(mut self, disposer: DisposalThread) -> Self {
        self.disposer = Some(disposer);
        self
    }
}
