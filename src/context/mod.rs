//! The decode loop over an opened container, and the lifetime of everything it owns.

mod disposal;
mod pack;

pub use self::disposal::DisposalThread;

use crate::{
    content::{ContentDescriptor, ContentKind, Enumerated, StreamIndexMap},
    format::ContainerFormat,
    io::IoBridge,
};

use std::{fmt, io::ErrorKind as IoErrorKind};
use symphonia_core::{
    codecs::Decoder,
    errors::Error as SymphError,
    formats::{FormatReader, Packet},
};
use tracing::{debug, trace, warn};

/// Why a [`DecodeContext`] stopped producing frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The demuxer reached the end of the stream.
    Clean,
    /// The demuxer or byte stream failed.
    Error,
}

/// Progress of a [`DecodeContext`] through its stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeState {
    /// Opened, with no frames yet requested.
    Ready,
    /// At least one frame has been requested, and the stream has more to give.
    Decoding,
    /// The stream has ended. No further frames will be produced.
    Exhausted(EndReason),
    /// All resources have been released. No further frames will be produced.
    Disposed,
}

impl DecodeState {
    /// Returns whether frames may still be produced in this state.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::Decoding)
    }
}

/// Everything a context owns which must be released on teardown.
pub(crate) struct Resources {
    format: Box<dyn FormatReader>,
    decoders: Vec<Box<dyn Decoder>>,
    stream_map: StreamIndexMap,
    buffer: Vec<u8>,
    packet: Option<Packet>,
    bridge: IoBridge,
}

impl Resources {
    /// Releases every resource in order, finishing the byte stream last.
    pub(crate) fn release(self) {
        let Self {
            format,
            decoders,
            stream_map,
            buffer,
            packet,
            mut bridge,
        } = self;

        drop(format);
        drop(decoders);
        drop(stream_map);
        drop(buffer);
        drop(packet);

        bridge.close();
    }
}

/// An opened container, producing decoded frames one at a time.
///
/// Frames are written into a single buffer owned by the context, so each frame must be
/// consumed (via [`frame`]) before the next call to [`advance`].
///
/// Resources are released exactly once, by whichever of [`close`] or drop comes first.
///
/// [`frame`]: DecodeContext::frame
/// [`advance`]: DecodeContext::advance
/// [`close`]: DecodeContext::close
pub struct DecodeContext {
    resources: Option<Resources>,
    content: Vec<ContentDescriptor>,
    container: ContainerFormat,
    state: DecodeState,
    last_slot: Option<usize>,
    disposer: Option<DisposalThread>,
}

impl DecodeContext {
    pub(crate) fn new(
        bridge: IoBridge,
        container: ContainerFormat,
        format: Box<dyn FormatReader>,
        enumerated: Enumerated,
        disposer: Option<DisposalThread>,
    ) -> Self {
        let Enumerated {
            content,
            stream_map,
            decoders,
            buffer_len,
        } = enumerated;

        Self {
            resources: Some(Resources {
                format,
                decoders,
                stream_map,
                buffer: vec![0u8; buffer_len],
                packet: None,
                bridge,
            }),
            content,
            container,
            state: DecodeState::Ready,
            last_slot: None,
            disposer,
        }
    }

    /// Pulls packets from the container until one yields a frame, returning the index of
    /// the content slot it belongs to.
    ///
    /// Packets for undecodable streams, and packets which fail to decode, are skipped.
    /// Packets for an [`ignore`]d slot are returned without being decoded.
    ///
    /// Returns `None` once the stream is exhausted or the context has been closed, and
    /// on every call thereafter.
    ///
    /// [`ignore`]: ContentDescriptor::ignore
    pub fn advance(&mut self) -> Option<usize> {
        if let Some(slot) = self.last_slot.take() {
            if let Some(desc) = self.content.get_mut(slot) {
                desc.data = None;
            }
        }

        if !self.state.is_live() {
            return None;
        }

        let res = self.resources.as_mut()?;
        res.packet = None;
        self.state = DecodeState::Decoding;

        loop {
            let packet = match res.format.next_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    let reason = match &e {
                        SymphError::IoError(io) if io.kind() == IoErrorKind::UnexpectedEof =>
                            EndReason::Clean,
                        _ => EndReason::Error,
                    };

                    debug!("Stream ended ({:?}): {}", reason, e);
                    self.state = DecodeState::Exhausted(reason);
                    return None;
                },
            };

            let slot = match res.stream_map.slot(packet.track_id()) {
                Some(slot) => slot,
                None => {
                    trace!("Skipping packet for undecodable track {}.", packet.track_id());
                    continue;
                },
            };

            let desc = &mut self.content[slot];

            if desc.ignore {
                res.packet = Some(packet);
                self.last_slot = Some(slot);
                return Some(slot);
            }

            let sample_format = match desc.kind {
                ContentKind::Audio(audio) => audio.sample_format,
            };

            let decoded = match res.decoders[slot].decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!("Skipping packet which failed to decode: {}", e);
                    continue;
                },
            };

            let len = match pack::pack(&decoded, sample_format, &mut res.buffer) {
                Some(len) => len,
                None => {
                    warn!(
                        "Skipping decoded frame larger than {} byte buffer.",
                        res.buffer.len()
                    );
                    continue;
                },
            };

            desc.data = Some(0..len);
            res.packet = Some(packet);
            self.last_slot = Some(slot);
            return Some(slot);
        }
    }

    /// Packed bytes of the most recent frame for content slot `index`.
    ///
    /// This is `None` if `index` was not returned by the latest call to [`advance`], or if
    /// that slot is ignored.
    ///
    /// [`advance`]: DecodeContext::advance
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        let range = self.content.get(index)?.data.clone()?;
        self.resources.as_ref()?.buffer.get(range)
    }

    /// Descriptors of every decodable stream, indexed by content slot.
    #[must_use]
    pub fn content(&self) -> &[ContentDescriptor] {
        &self.content
    }

    /// Mutable access to one content slot, e.g. to set [`ignore`].
    ///
    /// [`ignore`]: ContentDescriptor::ignore
    pub fn content_mut(&mut self, index: usize) -> Option<&mut ContentDescriptor> {
        self.content.get_mut(index)
    }

    /// Number of content slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns whether the container held no decodable streams.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Routing from demuxer tracks to content slots, or `None` once closed.
    #[must_use]
    pub fn stream_map(&self) -> Option<&StreamIndexMap> {
        self.resources.as_ref().map(|res| &res.stream_map)
    }

    /// Current progress through the stream.
    #[must_use]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// The packet behind the frame most recently returned by [`advance`].
    ///
    /// [`advance`]: DecodeContext::advance
    #[must_use]
    pub fn current_packet(&self) -> Option<&Packet> {
        self.resources.as_ref()?.packet.as_ref()
    }

    /// Length of the shared frame buffer, in bytes. Zero once closed.
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.resources.as_ref().map_or(0, |res| res.buffer.len())
    }

    /// The container format this stream was opened as.
    #[must_use]
    pub fn container(&self) -> &ContainerFormat {
        &self.container
    }

    /// Releases every resource held by this context, finishing its byte stream.
    ///
    /// This runs on the calling thread, even if a [`DisposalThread`] was configured.
    /// Calling this more than once, or dropping the context afterwards, has no further
    /// effect.
    pub fn close(&mut self) {
        self.teardown(false);
    }

    fn teardown(&mut self, offload: bool) {
        if self.state == DecodeState::Disposed {
            return;
        }

        self.state = DecodeState::Disposed;
        self.last_slot = None;
        for desc in &mut self.content {
            desc.data = None;
        }

        if let Some(res) = self.resources.take() {
            match (&self.disposer, offload) {
                (Some(disposer), true) => disposer.dispose(res),
                _ => res.release(),
            }
        }

        trace!("Decode context disposed.");
    }
}

impl Drop for DecodeContext {
    fn drop(&mut self) {
        self.teardown(true);
    }
}

impl fmt::Debug for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("container", &self.container.short_name)
            .field("state", &self.state)
            .field("content", &self.content)
            .field("buffer_capacity", &self.buffer_capacity())
            .finish()
    }
}
