#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! Codec-bridge turns blocking byte streams into typed, decoded audio frames.
//!
//! The library offers:
//!  * An [`IoBridge`], which takes exclusive ownership of a caller's [`ByteStream`] and
//!  exposes it to the demuxer's pull-based I/O, finishing the stream exactly once
//!  however decoding ends.
//!  * Container detection from a stream's leading bytes or filename, against a
//!  [`FormatRegistry`] of every container enabled in Symphonia.
//!  * A [`DecodeContext`], which classifies each elementary stream into a content slot,
//!  and produces one packed, interleaved frame at a time through a single reused buffer.
//!
//! ```no_run
//! use codec_bridge::{io::ReaderStream, Config};
//! use std::fs::File;
//!
//! let file = File::open("song.flac").unwrap();
//! let mut ctx = codec_bridge::decode(ReaderStream::new(file), Some("song.flac"), &Config::default())
//!     .unwrap();
//!
//! while let Some(index) = ctx.advance() {
//!     if let Some(frame) = ctx.frame(index) {
//!         println!("{} bytes from slot {}", frame.len(), index);
//!     }
//! }
//! ```
//!
//! ## Codec support
//! Codec-bridge supports all [codecs and formats provided by Symphonia] (pure-Rust). Extra
//! codecs may be added through a custom [`CodecRegistry`] in the [`Config`], and extra
//! containers through a custom [`FormatRegistry`].
//!
//! [codecs and formats provided by Symphonia]: https://github.com/pdeljanov/Symphonia#formats-demuxers
//! [`CodecRegistry`]: symphonia_core::codecs::CodecRegistry

#![warn(clippy::pedantic)]
#![allow(
    // Allowed as they are too pedantic
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
)]

pub mod codecs;
mod config;
pub mod constants;
pub mod content;
pub mod context;
pub mod error;
pub mod format;
pub mod io;
#[cfg(test)]
mod test_utils;

pub use crate::{
    config::Config,
    content::{AudioFormat, ContentDescriptor, ContentKind, MediaKind, SampleFormat},
    context::{DecodeContext, DecodeState, DisposalThread, EndReason},
    error::OpenError,
    format::{ContainerFormat, FormatRegistry},
    io::{BufferSize, ByteStream, IoBridge},
};

/// Opens `stream` for decoding, identifying its container from its leading bytes, or
/// from `filename`'s extension if those are inconclusive.
///
/// The stream is finished before any error is returned.
pub fn decode<S: ByteStream + 'static>(
    stream: S,
    filename: Option<&str>,
    config: &Config,
) -> Result<DecodeContext, OpenError> {
    let bridge = IoBridge::open(stream, config.io_buffer);
    format::probe::open_sniffed(bridge, filename, config)
}

/// Opens `stream` for decoding as the given container `format`.
///
/// The stream is finished before any error is returned.
pub fn decode_as<S: ByteStream + 'static>(
    stream: S,
    format: ContainerFormat,
    config: &Config,
) -> Result<DecodeContext, OpenError> {
    let bridge = IoBridge::open(stream, config.io_buffer);
    format::probe::open_known(bridge, format, config)
}
