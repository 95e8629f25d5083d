use super::ByteStream;
use crate::constants::DEFAULT_IO_BUFFER_LEN;
use parking_lot::Mutex;
use std::{
    convert::TryFrom,
    fmt,
    io::{
        Cursor,
        Error as IoError,
        ErrorKind as IoErrorKind,
        Read,
        Result as IoResult,
        Seek,
        SeekFrom,
    },
    sync::Arc,
};
use symphonia_core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use tracing::{debug, trace, warn};

// Upper bound on caller-requested read-ahead, before rounding to a power of two.
const MAX_IO_BUFFER_LEN: usize = 1 << 30;

const PRELOAD_CHUNK_LEN: usize = 8 * 1024;

// Streams may report any length, so their hint only pre-sizes preloads up to this.
const MAX_PRELOAD_HINT: usize = 64 * 1024 * 1024;

/// Buffering policy for an [`IoBridge`], fixed when the bridge is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferSize {
    /// Pull bytes on demand through a read-ahead buffer of [`DEFAULT_IO_BUFFER_LEN`].
    Default,
    /// Pull bytes on demand through a read-ahead buffer of at least this many bytes.
    ///
    /// The length is rounded up to a power of two, and never falls below
    /// [`DEFAULT_IO_BUFFER_LEN`].
    Fixed(usize),
    /// Drain the whole stream into memory when the bridge is opened.
    ///
    /// The bridge then has no read buffer of its own, and the demuxer reads from
    /// (and may seek within) the preloaded bytes.
    Preloaded,
}

impl BufferSize {
    fn resolve(self) -> usize {
        match self {
            Self::Default => DEFAULT_IO_BUFFER_LEN,
            Self::Fixed(len) => len
                .clamp(DEFAULT_IO_BUFFER_LEN, MAX_IO_BUFFER_LEN)
                .next_power_of_two(),
            Self::Preloaded => 0,
        }
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self::Default
    }
}

/// Shared handle through which the demuxer-side reader resolves the caller's stream.
///
/// The stream lives here from bridge construction until the bridge is closed, after
/// which every read fails.
struct StreamToken {
    stream: Mutex<Option<Box<dyn ByteStream>>>,
}

impl StreamToken {
    fn read(&self, buf: &mut [u8]) -> IoResult<usize> {
        match self.stream.lock().as_mut() {
            Some(stream) => stream.read(buf),
            None => Err(IoError::new(
                IoErrorKind::BrokenPipe,
                "byte stream bridge has been closed",
            )),
        }
    }

    fn byte_len(&self) -> Option<u64> {
        self.stream.lock().as_ref().and_then(|s| s.byte_len())
    }

    /// Removes the stream and finishes it, returning whether this call did so.
    fn finish(&self) -> bool {
        // The lock must not be held while the stream runs its own cleanup.
        let stream = self.stream.lock().take();

        match stream {
            Some(mut stream) => {
                stream.finish();
                true
            },
            None => false,
        }
    }
}

impl Drop for StreamToken {
    fn drop(&mut self) {
        if self.finish() {
            debug!("Byte stream finished on release of last handle.");
        }
    }
}

/// Read trampoline handed to the demuxer.
///
/// Symphonia requires `Seek`, but a pulled stream is forward-only: only "tell"
/// requests (`SeekFrom::Current(0)`) are answered.
struct BridgeSource {
    token: Arc<StreamToken>,
    pos: u64,
}

impl Read for BridgeSource {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let n = self.token.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for BridgeSource {
    fn seek(&mut self, pos: SeekFrom) -> IoResult<u64> {
        match pos {
            SeekFrom::Current(0) => Ok(self.pos),
            _ => Err(IoError::new(
                IoErrorKind::Unsupported,
                "bridged byte streams are not seekable",
            )),
        }
    }
}

impl MediaSource for BridgeSource {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        self.token.byte_len()
    }
}

/// Exclusive owner of a [`ByteStream`], exposing it to the demuxer's pull-based I/O.
///
/// Closing the bridge (explicitly via [`close`], or by dropping it) finishes the stream
/// exactly once.
///
/// [`close`]: IoBridge::close
pub struct IoBridge {
    token: Option<Arc<StreamToken>>,
    buffer_len: usize,
    memory: Option<Arc<[u8]>>,
}

impl IoBridge {
    /// Takes ownership of `stream`, buffering it according to `size`.
    ///
    /// With [`BufferSize::Preloaded`], this blocks until the stream is exhausted.
    pub fn open<S: ByteStream + 'static>(stream: S, size: BufferSize) -> Self {
        Self::open_boxed(Box::new(stream), size)
    }

    /// Takes ownership of an already boxed `stream`, buffering it according to `size`.
    pub fn open_boxed(stream: Box<dyn ByteStream>, size: BufferSize) -> Self {
        let token = Arc::new(StreamToken {
            stream: Mutex::new(Some(stream)),
        });

        let memory = if size == BufferSize::Preloaded {
            Some(preload(&token))
        } else {
            None
        };

        let buffer_len = size.resolve();
        trace!("Opened stream bridge with {} byte read buffer.", buffer_len);

        Self {
            token: Some(token),
            buffer_len,
            memory,
        }
    }

    /// Length of this bridge's read buffer, in bytes.
    ///
    /// This is zero for [`BufferSize::Preloaded`] bridges.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Returns whether the underlying stream is still owned (and unfinished).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    /// Builds a demuxer-facing reader over this bridge, or `None` once closed.
    pub(crate) fn media_source_stream(&self) -> Option<MediaSourceStream> {
        let token = self.token.as_ref()?;

        let (source, buffer_len): (Box<dyn MediaSource>, usize) = match &self.memory {
            Some(memory) => (Box::new(Cursor::new(memory.clone())), DEFAULT_IO_BUFFER_LEN),
            None => (
                Box::new(BridgeSource {
                    token: token.clone(),
                    pos: 0,
                }),
                self.buffer_len,
            ),
        };

        Some(MediaSourceStream::new(
            source,
            MediaSourceStreamOptions { buffer_len },
        ))
    }

    /// Releases the read buffer, finishes the stream, and drops the stream handle.
    ///
    /// Calling this more than once has no further effect.
    pub fn close(&mut self) {
        self.memory = None;

        if let Some(token) = self.token.take() {
            if token.finish() {
                debug!("Byte stream finished.");
            }
        }
    }
}

impl Drop for IoBridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for IoBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoBridge")
            .field("buffer_len", &self.buffer_len)
            .field("open", &self.is_open())
            .field("preloaded", &self.memory.as_ref().map(|m| m.len()))
            .finish()
    }
}

fn preload(token: &StreamToken) -> Arc<[u8]> {
    let hint = token
        .byte_len()
        .and_then(|len| usize::try_from(len).ok())
        .map_or(0, |len| len.min(MAX_PRELOAD_HINT));
    let mut out = Vec::with_capacity(hint);
    let mut chunk = [0u8; PRELOAD_CHUNK_LEN];

    loop {
        match token.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == IoErrorKind::Interrupted => {},
            Err(e) => {
                warn!("Preload stopped after {} bytes: {}", out.len(), e);
                break;
            },
        }
    }

    trace!("Preloaded {} bytes.", out.len());
    out.into()
}
