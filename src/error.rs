//! Errors returned when a stream cannot be opened for decoding.

use std::{error::Error, fmt};
use symphonia_core::errors::Error as SymphError;

/// Reasons why a byte stream could not be turned into a [`DecodeContext`].
///
/// Every variant is returned only after all resources acquired during the attempt,
/// including the stream itself, have been released. In particular, the stream's
/// [`finish`] has been called exactly once by the time the caller sees this error.
///
/// [`DecodeContext`]: crate::DecodeContext
/// [`finish`]: crate::io::ByteStream::finish
#[non_exhaustive]
#[derive(Debug)]
pub enum OpenError {
    /// No registered container format matched the stream's leading bytes or filename.
    UnknownFormat,
    /// The bridge had already been closed before the open was attempted.
    BridgeClosed,
    /// The chosen demuxer refused the stream (format mismatch or corrupt header).
    Rejected {
        /// Short name of the container format which was tried.
        format: &'static str,
        /// Error reported by the demuxer.
        why: SymphError,
    },
    /// The demuxer accepted the stream, but could not resolve any elementary streams.
    NoStreams {
        /// Short name of the container format which was opened.
        format: &'static str,
    },
}

impl OpenError {
    /// Returns the short name of the container format involved, if one was chosen.
    #[must_use]
    pub fn format(&self) -> Option<&'static str> {
        match self {
            Self::Rejected { format, .. } | Self::NoStreams { format } => Some(format),
            _ => None,
        }
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to open stream for decoding -- ")?;
        match self {
            Self::UnknownFormat => f.write_str("no container format matched"),
            Self::BridgeClosed => f.write_str("stream bridge was already closed"),
            Self::Rejected { format, why } => write!(f, "{} demuxer rejected stream: {}", format, why),
            Self::NoStreams { format } => write!(f, "{} stream reported no elementary streams", format),
        }
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected { why, .. } => Some(why),
            _ => None,
        }
    }
}
