//! Constants affecting bridge buffering and decode buffer sizing.

/// Default length of the read-ahead buffer placed between a [`ByteStream`] and the demuxer.
///
/// The demuxer's read-ahead ring must be a power of two strictly larger than its 32KiB
/// maximum block length, so this is also the smallest length a bridge will use.
///
/// [`ByteStream`]: crate::io::ByteStream
pub const DEFAULT_IO_BUFFER_LEN: usize = 64 * 1024;

/// Lower bound, in bytes, on the shared decode buffer of any [`DecodeContext`].
///
/// This is large enough to hold one second of 48kHz stereo 16-bit audio, which
/// comfortably bounds the output of a single packet for all common audio codecs.
///
/// [`DecodeContext`]: crate::DecodeContext
pub const MIN_FRAME_BUFFER_LEN: usize = 192_000;

/// Number of leading bytes sampled from a stream when sniffing its container format.
pub const PROBE_WINDOW_LEN: usize = 32;
