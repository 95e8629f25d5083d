#![allow(missing_docs)]

use crate::{
    context::DecodeContext,
    format::{probe, register_default_formats, ContainerFormat, FormatRegistry, Marker},
    io::{BufferSize, ByteStream, IoBridge},
    Config,
};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use once_cell::sync::Lazy;
use std::{
    io::{Cursor, Read, Result as IoResult},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use symphonia::default::register_enabled_codecs;
use symphonia_core::{
    audio::{AsAudioBufferRef, AudioBuffer, AudioBufferRef, Channels, Signal, SignalSpec},
    codecs::{
        decl_codec_type,
        CodecDescriptor,
        CodecParameters,
        CodecRegistry,
        CodecType,
        Decoder,
        DecoderOptions,
        FinalizeResult,
    },
    errors::{self as symph_err, Result as SymphResult, SeekErrorKind},
    formats::prelude::*,
    io::{MediaSourceStream, ReadBytes},
    meta::{Metadata as SymphMetadata, MetadataLog},
    sample::SampleFormat as SymphSampleFormat,
};

/// Counters shared between a [`CountingStream`] and the test observing it.
#[derive(Clone, Debug, Default)]
pub struct StreamStats {
    reads: Arc<AtomicUsize>,
    finishes: Arc<AtomicUsize>,
}

impl StreamStats {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn finishes(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }
}

/// In-memory byte stream which records how it is driven.
pub struct CountingStream {
    data: Cursor<Vec<u8>>,
    len: Option<u64>,
    stats: StreamStats,
}

impl CountingStream {
    pub fn new(data: Vec<u8>) -> (Self, StreamStats) {
        let stats = StreamStats::default();
        let stream = Self {
            data: Cursor::new(data),
            len: None,
            stats: stats.clone(),
        };

        (stream, stats)
    }

    /// Reports `len` as the stream's length, whatever its real contents.
    pub fn with_len(data: Vec<u8>, len: u64) -> (Self, StreamStats) {
        let (mut stream, stats) = Self::new(data);
        stream.len = Some(len);
        (stream, stats)
    }
}

impl ByteStream for CountingStream {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        self.data.read(buf)
    }

    fn finish(&mut self) {
        self.stats.finishes.fetch_add(1, Ordering::SeqCst);
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

pub const FIXTURE_FORMAT: &str = "tstc";
pub const FIXTURE_MAGIC: &[u8] = b"TSTC";
const FIXTURE_MARKERS: &[Marker] = &[Marker::start(FIXTURE_MAGIC)];

/// Interleaved little-endian `i16` samples.
pub const CODEC_TYPE_FIXTURE_PCM: CodecType = decl_codec_type(b"tpcm");
/// Opaque data which no registry can turn into audio.
pub const CODEC_TYPE_FIXTURE_DATA: CodecType = decl_codec_type(b"tdat");

/// Track declaration for a fixture container.
#[derive(Clone, Copy, Debug)]
pub struct FixtureTrack {
    codec: [u8; 4],
    sample_rate: u32,
    channels: u8,
    max_frames: u32,
}

impl FixtureTrack {
    pub fn pcm(sample_rate: u32, channels: u8) -> Self {
        Self {
            codec: *b"tpcm",
            sample_rate,
            channels,
            max_frames: 1024,
        }
    }

    pub fn data() -> Self {
        Self {
            codec: *b"tdat",
            sample_rate: 0,
            channels: 0,
            max_frames: 0,
        }
    }

    /// A track whose codec has no registered decoder.
    pub fn video() -> Self {
        Self {
            codec: *b"tvid",
            sample_rate: 0,
            channels: 0,
            max_frames: 0,
        }
    }

    pub fn max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames;
        self
    }
}

/// Builds a fixture container.
///
/// Layout (all integers little-endian):
/// * the magic `b"TSTC"`, then a `u8` track count,
/// * per track: a 4-byte codec tag, `u32` sample rate (0 if none), `u8` channel count
///   (0 if none), `u32` max frames per packet (0 if unknown),
/// * then packets until the end of the stream: `u8` track id, `u32` length, payload.
pub fn fixture_bytes(tracks: &[FixtureTrack], packets: &[(u8, &[u8])]) -> Vec<u8> {
    let mut out = FIXTURE_MAGIC.to_vec();

    out.push(tracks.len() as u8);
    for track in tracks {
        out.extend_from_slice(&track.codec);
        out.write_u32::<LittleEndian>(track.sample_rate).unwrap();
        out.push(track.channels);
        out.write_u32::<LittleEndian>(track.max_frames).unwrap();
    }

    for (track_id, payload) in packets {
        out.push(*track_id);
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.extend_from_slice(payload);
    }

    out
}

pub fn pcm_payload(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.write_i16::<LittleEndian>(*sample).unwrap();
    }
    out
}

/// Builds a canonical 16-bit PCM WAVE file.
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.write_u32::<LittleEndian>(36 + data_len).unwrap();
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.write_u32::<LittleEndian>(16).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(channels).unwrap();
    out.write_u32::<LittleEndian>(sample_rate).unwrap();
    out.write_u32::<LittleEndian>(sample_rate * u32::from(block_align))
        .unwrap();
    out.write_u16::<LittleEndian>(block_align).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();

    out.extend_from_slice(b"data");
    out.write_u32::<LittleEndian>(data_len).unwrap();
    out.extend_from_slice(&pcm_payload(samples));

    out
}

/// Demuxer for the fixture container described on [`fixture_bytes`].
pub struct FixtureReader {
    source: MediaSourceStream,
    tracks: Vec<Track>,
    meta: MetadataLog,
    count: u64,
}

impl FormatReader for FixtureReader {
    fn try_new(mut source: MediaSourceStream, _options: &FormatOptions) -> SymphResult<Self> {
        if source.read_quad_bytes()? != *b"TSTC" {
            return symph_err::decode_error("tstc: missing magic");
        }

        let n_tracks = source.read_u8()?;
        let mut tracks = Vec::with_capacity(n_tracks.into());

        for id in 0..u32::from(n_tracks) {
            let codec = decl_codec_type(&source.read_quad_bytes()?);
            let sample_rate = source.read_u32()?;
            let channels = source.read_u8()?;
            let max_frames = source.read_u32()?;

            let mut params = CodecParameters::new();
            params.for_codec(codec);

            if sample_rate != 0 {
                params.with_sample_rate(sample_rate);
            }
            if channels != 0 {
                params.with_channels(Channels::from_bits_truncate((1 << channels) - 1));
            }
            if max_frames != 0 {
                params.with_max_frames_per_packet(u64::from(max_frames));
            }
            if codec == CODEC_TYPE_FIXTURE_PCM {
                params
                    .with_sample_format(SymphSampleFormat::S16)
                    .with_bits_per_sample(16);
            }

            tracks.push(Track::new(id, params));
        }

        Ok(Self {
            source,
            tracks,
            meta: MetadataLog::default(),
            count: 0,
        })
    }

    fn cues(&self) -> &[Cue] {
        &[]
    }

    fn metadata(&mut self) -> SymphMetadata<'_> {
        self.meta.metadata()
    }

    fn seek(&mut self, _mode: SeekMode, _to: SeekTo) -> SymphResult<SeekedTo> {
        symph_err::seek_error(SeekErrorKind::Unseekable)
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn next_packet(&mut self) -> SymphResult<Packet> {
        let track_id = u32::from(self.source.read_u8()?);
        let len = self.source.read_u32()? as usize;
        let data = self.source.read_boxed_slice_exact(len)?;

        let ts = self.count;
        self.count += 1;

        Ok(Packet::new_from_boxed_slice(track_id, ts, 1, data))
    }

    fn into_inner(self: Box<Self>) -> MediaSourceStream {
        self.source
    }
}

/// Decoder for [`CODEC_TYPE_FIXTURE_PCM`], failing on any packet which does not hold a
/// whole number of frames.
pub struct FixturePcmDecoder {
    params: CodecParameters,
    spec: SignalSpec,
    buf: AudioBuffer<i16>,
}

impl Decoder for FixturePcmDecoder {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> SymphResult<Self> {
        let (rate, channels) = match (params.sample_rate, params.channels) {
            (Some(rate), Some(channels)) => (rate, channels),
            _ => return symph_err::unsupported_error("tpcm: rate and channels required"),
        };

        let spec = SignalSpec::new(rate, channels);
        let frames = params.max_frames_per_packet.unwrap_or(1024);

        Ok(Self {
            params: params.clone(),
            spec,
            buf: AudioBuffer::new(frames, spec),
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[symphonia_core::support_codec!(
            CODEC_TYPE_FIXTURE_PCM,
            "tpcm",
            "Fixture interleaved i16 PCM"
        )]
    }

    fn reset(&mut self) {}

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> SymphResult<AudioBufferRef<'_>> {
        let data = packet.buf();
        let channels = self.spec.channels.count();

        if data.len() % (2 * channels) != 0 {
            return symph_err::decode_error("tpcm: partial frame");
        }

        let frames = data.len() / (2 * channels);
        if self.buf.capacity() < frames {
            self.buf = AudioBuffer::new(frames as u64, self.spec);
        }

        self.buf.clear();
        self.buf.render_reserved(Some(frames));

        for ch in 0..channels {
            for (frame, sample) in self.buf.chan_mut(ch).iter_mut().enumerate() {
                let pos = (frame * channels + ch) * 2;
                *sample = LittleEndian::read_i16(&data[pos..pos + 2]);
            }
        }

        Ok(self.buf.as_audio_buffer_ref())
    }

    fn finalize(&mut self) -> FinalizeResult {
        FinalizeResult::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

/// Decoder for [`CODEC_TYPE_FIXTURE_DATA`], which opens but produces no audio.
pub struct FixtureDataDecoder {
    params: CodecParameters,
    buf: AudioBuffer<u8>,
}

impl Decoder for FixtureDataDecoder {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> SymphResult<Self> {
        Ok(Self {
            params: params.clone(),
            buf: AudioBuffer::unused(),
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[symphonia_core::support_codec!(
            CODEC_TYPE_FIXTURE_DATA,
            "tdat",
            "Fixture opaque data"
        )]
    }

    fn reset(&mut self) {}

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, _packet: &Packet) -> SymphResult<AudioBufferRef<'_>> {
        panic!("data streams must never reach a decoder");
    }

    fn finalize(&mut self) -> FinalizeResult {
        FinalizeResult::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}

pub static TEST_CODECS: Lazy<CodecRegistry> = Lazy::new(|| {
    let mut registry = CodecRegistry::new();
    register_enabled_codecs(&mut registry);
    registry.register_all::<FixturePcmDecoder>();
    registry.register_all::<FixtureDataDecoder>();
    registry
});

pub static TEST_FORMATS: Lazy<FormatRegistry> = Lazy::new(|| {
    let mut registry = FormatRegistry::new();
    register_default_formats(&mut registry);
    registry.register(ContainerFormat::new::<FixtureReader>(
        FIXTURE_FORMAT,
        "Test fixture container",
        &["tstc"],
        FIXTURE_MARKERS,
    ));
    registry
});

/// Default config, extended with the fixture container and codecs.
pub fn test_config() -> Config {
    Config::default()
        .codec_registry(&TEST_CODECS)
        .format_registry(&TEST_FORMATS)
}

/// Opens a demuxer directly over fixture bytes, without a bridge.
pub fn fixture_reader(tracks: &[FixtureTrack], packets: &[(u8, &[u8])]) -> Box<dyn FormatReader> {
    let bytes = fixture_bytes(tracks, packets);
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    Box::new(FixtureReader::try_new(source, &FormatOptions::default()).unwrap())
}

pub fn open_fixture(
    tracks: &[FixtureTrack],
    packets: &[(u8, &[u8])],
) -> (DecodeContext, StreamStats) {
    open_fixture_with(tracks, packets, &test_config())
}

pub fn open_fixture_with(
    tracks: &[FixtureTrack],
    packets: &[(u8, &[u8])],
    config: &Config,
) -> (DecodeContext, StreamStats) {
    let (stream, stats) = CountingStream::new(fixture_bytes(tracks, packets));
    let bridge = IoBridge::open(stream, BufferSize::Default);

    let ctx = probe::open_sniffed(bridge, None, config).unwrap();
    (ctx, stats)
}
