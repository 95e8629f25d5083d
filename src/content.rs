//! Content slots: the decodable elementary streams found in a container, and how
//! demuxed packets are routed to them.

use crate::constants::MIN_FRAME_BUFFER_LEN;

use std::ops::Range;
use symphonia_core::{
    codecs::{CodecParameters, CodecRegistry, Decoder, DecoderOptions},
    formats::{FormatReader, Track},
    sample::SampleFormat as SymphSampleFormat,
};
use tracing::{debug, trace};

/// Broad classification of an elementary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// A stream of audio samples which can be decoded.
    Audio,
    /// Any stream which cannot be decoded to a content slot.
    Unsupported,
}

/// Layout of each sample in a packed output frame.
///
/// Samples are always written in native byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit.
    S32,
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

impl SampleFormat {
    /// Width of one sample of this format, in bytes.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn from_params(params: &CodecParameters) -> Self {
        match params.sample_format {
            Some(SymphSampleFormat::U8) => Self::U8,
            Some(SymphSampleFormat::U16 | SymphSampleFormat::S8 | SymphSampleFormat::S16) =>
                Self::S16,
            Some(
                SymphSampleFormat::U24
                | SymphSampleFormat::U32
                | SymphSampleFormat::S24
                | SymphSampleFormat::S32,
            ) => Self::S32,
            Some(SymphSampleFormat::F32) => Self::F32,
            Some(SymphSampleFormat::F64) => Self::F64,
            None => match params.bits_per_sample {
                Some(bits) if bits <= 8 => Self::U8,
                Some(bits) if bits <= 16 => Self::S16,
                Some(bits) if bits <= 32 => Self::S32,
                _ => Self::F32,
            },
        }
    }
}

/// Format of the frames produced by an audio content slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// Layout of each packed sample.
    pub sample_format: SampleFormat,
    /// Frames per second.
    pub sample_rate: u32,
    /// Number of interleaved channels in each frame.
    pub channels: usize,
}

/// Kind-specific description of a content slot.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Decoded audio.
    Audio(AudioFormat),
}

impl ContentKind {
    /// Broad classification of this content.
    #[must_use]
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::Audio(_) => MediaKind::Audio,
        }
    }
}

/// One decodable elementary stream within an opened container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// What this slot produces.
    pub kind: ContentKind,
    /// When set, packets for this slot are handed out without being decoded, and no
    /// frame data is produced for them.
    pub ignore: bool,
    track_id: u32,
    pub(crate) data: Option<Range<usize>>,
}

impl ContentDescriptor {
    /// Demuxer track which feeds this slot.
    #[must_use]
    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    /// Returns whether this slot currently holds a decoded frame.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Routes each demuxer track to its content slot, in native track order.
///
/// Tracks which could not be decoded map to no slot. The map's length is the number of
/// tracks reported when the container was opened, and never changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamIndexMap {
    entries: Vec<(u32, Option<usize>)>,
}

impl StreamIndexMap {
    /// Content slot fed by `track_id`, if that track is known and decodable.
    #[must_use]
    pub fn slot(&self, track_id: u32) -> Option<usize> {
        self.entries
            .iter()
            .find(|(id, _)| *id == track_id)
            .and_then(|(_, slot)| *slot)
    }

    /// Classification of `track_id`, or `None` if the container reported no such track.
    #[must_use]
    pub fn kind(&self, track_id: u32) -> Option<MediaKind> {
        self.entries
            .iter()
            .find(|(id, _)| *id == track_id)
            .map(|(_, slot)| match slot {
                Some(_) => MediaKind::Audio,
                None => MediaKind::Unsupported,
            })
    }

    /// Iterates over `(track_id, slot)` pairs in native track order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<usize>)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of tracks in the container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the container held no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything learned from walking a container's tracks.
pub(crate) struct Enumerated {
    pub content: Vec<ContentDescriptor>,
    pub stream_map: StreamIndexMap,
    /// One decoder per content slot.
    pub decoders: Vec<Box<dyn Decoder>>,
    pub buffer_len: usize,
}

/// Opens a decoder for every track of `format` which `codecs` can handle, and
/// classifies each into a content slot.
pub(crate) fn enumerate(
    format: &dyn FormatReader,
    codecs: &CodecRegistry,
    options: &DecoderOptions,
) -> Enumerated {
    let mut out = Enumerated {
        content: vec![],
        stream_map: StreamIndexMap::default(),
        decoders: vec![],
        buffer_len: MIN_FRAME_BUFFER_LEN,
    };

    for track in format.tracks() {
        let slot = open_track(track, codecs, options).map(|(audio, decoder, need)| {
            out.content.push(ContentDescriptor {
                kind: ContentKind::Audio(audio),
                ignore: false,
                track_id: track.id,
                data: None,
            });
            out.decoders.push(decoder);
            out.buffer_len = out.buffer_len.max(need);

            out.content.len() - 1
        });

        out.stream_map.entries.push((track.id, slot));
    }

    out
}

fn open_track(
    track: &Track,
    codecs: &CodecRegistry,
    options: &DecoderOptions,
) -> Option<(AudioFormat, Box<dyn Decoder>, usize)> {
    if codecs.get_codec(track.codec_params.codec).is_none() {
        trace!("Track {}: no decoder registered for codec.", track.id);
        return None;
    }

    let decoder = match codecs.make(&track.codec_params, options) {
        Ok(decoder) => decoder,
        Err(e) => {
            debug!("Track {}: decoder failed to open: {}", track.id, e);
            return None;
        },
    };

    let negotiated = decoder.codec_params();
    let sample_rate = negotiated
        .sample_rate
        .or(track.codec_params.sample_rate);
    let channels = negotiated
        .channels
        .or(track.codec_params.channels)
        .map(|c| c.count())
        .filter(|&n| n > 0);

    let (sample_rate, channels) = match (sample_rate, channels) {
        (Some(rate), Some(channels)) => (rate, channels),
        _ => {
            trace!("Track {}: not an audio stream.", track.id);
            return None;
        },
    };

    let format = AudioFormat {
        sample_format: SampleFormat::from_params(negotiated),
        sample_rate,
        channels,
    };

    let max_frames = negotiated
        .max_frames_per_packet
        .or(track.codec_params.max_frames_per_packet)
        .unwrap_or(0);
    let need = (max_frames as usize)
        .saturating_mul(channels)
        .saturating_mul(format.sample_format.bytes_per_sample());

    Some((format, decoder, need))
}
