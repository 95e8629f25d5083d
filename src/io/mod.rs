//! Caller-facing byte streams, and the bridge which exposes them to the demuxer.
//!
//! A [`ByteStream`] is handed to an [`IoBridge`], which takes exclusive ownership of it for
//! the bridge's entire lifetime. The demuxer pulls bytes through the bridge on demand, and
//! the bridge promises to call [`ByteStream::finish`] exactly once when it is closed,
//! however decoding ended.

mod bridge;

pub use self::bridge::*;

use std::io::{Read, Result as IoResult};
use tracing::trace;

/// A blocking source of bytes which can be demuxed and decoded.
///
/// Implementors are driven from whichever thread calls into the owning
/// [`DecodeContext`], and may block for as long as needed in [`read`].
///
/// [`DecodeContext`]: crate::DecodeContext
/// [`read`]: ByteStream::read
pub trait ByteStream: Send {
    /// Reads up to `buf.len()` bytes into `buf`, returning how many were written.
    ///
    /// `Ok(0)` signals the end of the stream. Return values are passed straight through to
    /// the demuxer, which performs all buffering.
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize>;

    /// Notifies the stream that it will never be read again, and that it may release
    /// any resources it holds.
    ///
    /// This is called exactly once, whether decoding succeeded, failed to open, or
    /// was abandoned.
    fn finish(&mut self);

    /// Total length of the stream in bytes, if known.
    fn byte_len(&self) -> Option<u64> {
        None
    }
}

/// Adapts any [`Read`] implementor into a [`ByteStream`].
///
/// The inner reader is dropped when the stream is finished.
pub struct ReaderStream<R> {
    inner: Option<R>,
    len: Option<u64>,
}

impl<R: Read + Send> ReaderStream<R> {
    /// Wraps a reader of unknown length.
    pub fn new(reader: R) -> Self {
        Self {
            inner: Some(reader),
            len: None,
        }
    }

    /// Wraps a reader which is known to produce exactly `len` bytes.
    pub fn with_len(reader: R, len: u64) -> Self {
        Self {
            inner: Some(reader),
            len: Some(len),
        }
    }

    /// Returns whether the inner reader has been released by [`ByteStream::finish`].
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }
}

impl<R: Read + Send> ByteStream for ReaderStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match self.inner.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }

    fn finish(&mut self) {
        trace!("Releasing inner reader.");
        self.inner = None;
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}
