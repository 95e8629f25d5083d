//! Container format descriptors, and the registry used to sniff them from a stream.
//!
//! Each [`ContainerFormat`] couples the identity the host registers a container under
//! (short name, extensions, leading-byte markers) with the demuxer constructor that opens
//! it. The default [`FORMAT_REGISTRY`] covers every container enabled in Symphonia.

pub mod probe;

use once_cell::sync::Lazy;
use std::fmt;
use symphonia::default::formats::{
    AdtsReader,
    FlacReader,
    IsoMp4Reader,
    MkvReader,
    MpaReader,
    OggReader,
    WavReader,
};
use symphonia_core::{
    errors::Result as SymphResult,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
};

/// Constructor which opens a demuxer over a wrapped byte stream.
pub type Instantiate = fn(MediaSourceStream, &FormatOptions) -> SymphResult<Box<dyn FormatReader>>;

fn instantiate<R: FormatReader + 'static>(
    source: MediaSourceStream,
    options: &FormatOptions,
) -> SymphResult<Box<dyn FormatReader>> {
    Ok(Box::new(R::try_new(source, options)?))
}

/// A byte sequence expected at a fixed offset from the start of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    offset: usize,
    bytes: &'static [u8],
}

impl Marker {
    /// A marker expected at the very start of a stream.
    #[must_use]
    pub const fn start(bytes: &'static [u8]) -> Self {
        Self { offset: 0, bytes }
    }

    /// A marker expected `offset` bytes into a stream.
    #[must_use]
    pub const fn at(offset: usize, bytes: &'static [u8]) -> Self {
        Self { offset, bytes }
    }

    /// Returns whether `window`, taken from the start of a stream, holds this marker.
    #[must_use]
    pub fn matches(&self, window: &[u8]) -> bool {
        window.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes)
    }
}

/// A container format the bridge can open a demuxer against.
#[derive(Clone, Copy)]
pub struct ContainerFormat {
    /// Short, unique name of this format (e.g., `"wav"`).
    pub short_name: &'static str,
    /// Human-readable description of this format.
    pub long_name: &'static str,
    /// Filename extensions commonly used by this format, without the leading dot.
    pub extensions: &'static [&'static str],
    /// Leading-byte markers, any one of which identifies this format.
    pub markers: &'static [Marker],
    instantiate: Instantiate,
}

impl ContainerFormat {
    /// Describes a container which is demuxed by the Symphonia reader `R`.
    #[must_use]
    pub fn new<R: FormatReader + 'static>(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
        markers: &'static [Marker],
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
            markers,
            instantiate: instantiate::<R>,
        }
    }

    /// Returns whether any of this format's markers appear in `window`.
    #[must_use]
    pub fn matches_bytes(&self, window: &[u8]) -> bool {
        self.markers.iter().any(|m| m.matches(window))
    }

    /// Returns whether `extension` (case-insensitive, without a leading dot) belongs to
    /// this format.
    #[must_use]
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    pub(crate) fn open(
        &self,
        source: MediaSourceStream,
        options: &FormatOptions,
    ) -> SymphResult<Box<dyn FormatReader>> {
        (self.instantiate)(source, options)
    }
}

impl PartialEq for ContainerFormat {
    fn eq(&self, other: &Self) -> bool {
        self.short_name == other.short_name
    }
}

impl Eq for ContainerFormat {}

impl fmt::Debug for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerFormat")
            .field("short_name", &self.short_name)
            .field("long_name", &self.long_name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// An ordered set of container formats which streams are matched against.
#[derive(Clone, Debug, Default)]
pub struct FormatRegistry {
    formats: Vec<ContainerFormat>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a format to this registry.
    ///
    /// A format registered under an existing short name replaces the older entry.
    pub fn register(&mut self, format: ContainerFormat) -> &mut Self {
        match self
            .formats
            .iter_mut()
            .find(|f| f.short_name == format.short_name)
        {
            Some(slot) => *slot = format,
            None => self.formats.push(format),
        }

        self
    }

    /// Iterates over all registered formats, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ContainerFormat> + '_ {
        self.formats.iter()
    }

    /// Number of registered formats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns whether no formats are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Finds a format by its short name (case-insensitive).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ContainerFormat> {
        self.formats
            .iter()
            .find(|f| f.short_name.eq_ignore_ascii_case(name))
    }

    /// Finds the first format which claims a filename extension.
    #[must_use]
    pub fn by_extension(&self, extension: &str) -> Option<&ContainerFormat> {
        self.formats
            .iter()
            .find(|f| f.matches_extension(extension))
    }

    /// Chooses a format for a stream beginning with `window`.
    ///
    /// Formats whose markers appear in `window` are preferred, and among those, one which
    /// also claims `extension`. If no marker matches, the extension alone decides.
    #[must_use]
    pub fn sniff(&self, window: &[u8], extension: Option<&str>) -> Option<&ContainerFormat> {
        let mut marked = self.formats.iter().filter(|f| f.matches_bytes(window));

        let first_marked = marked.next();
        let hinted_marked = extension.and_then(|ext| {
            first_marked
                .into_iter()
                .chain(marked)
                .find(|f| f.matches_extension(ext))
        });

        hinted_marked
            .or(first_marked)
            .or_else(|| extension.and_then(|ext| self.by_extension(ext)))
    }
}

const WAV_MARKERS: &[Marker] = &[Marker::start(b"RIFF")];
const OGG_MARKERS: &[Marker] = &[Marker::start(b"OggS")];
const FLAC_MARKERS: &[Marker] = &[Marker::start(b"fLaC")];
const MKV_MARKERS: &[Marker] = &[Marker::start(&[0x1a, 0x45, 0xdf, 0xa3])];
const MP4_MARKERS: &[Marker] = &[Marker::at(4, b"ftyp")];
// MPEG-4 then MPEG-2 sync words, each without and with a CRC.
const ADTS_MARKERS: &[Marker] = &[
    Marker::start(&[0xff, 0xf1]),
    Marker::start(&[0xff, 0xf0]),
    Marker::start(&[0xff, 0xf9]),
    Marker::start(&[0xff, 0xf8]),
];
// ID3v2 tags, then frame syncs for MPEG-1 and MPEG-2 layers II and III, and for
// MPEG-2.5 layer III.
const MPA_MARKERS: &[Marker] = &[
    Marker::start(b"ID3"),
    Marker::start(&[0xff, 0xfb]),
    Marker::start(&[0xff, 0xfa]),
    Marker::start(&[0xff, 0xfd]),
    Marker::start(&[0xff, 0xfc]),
    Marker::start(&[0xff, 0xf3]),
    Marker::start(&[0xff, 0xf2]),
    Marker::start(&[0xff, 0xf5]),
    Marker::start(&[0xff, 0xf4]),
    Marker::start(&[0xff, 0xe3]),
    Marker::start(&[0xff, 0xe2]),
];

/// Adds every container format enabled in Symphonia to `registry`.
pub fn register_default_formats(registry: &mut FormatRegistry) {
    registry
        .register(ContainerFormat::new::<WavReader>(
            "wav",
            "Waveform Audio File Format",
            &["wav", "wave"],
            WAV_MARKERS,
        ))
        .register(ContainerFormat::new::<OggReader>(
            "ogg",
            "Ogg",
            &["ogg", "oga", "ogx", "opus", "spx"],
            OGG_MARKERS,
        ))
        .register(ContainerFormat::new::<FlacReader>(
            "flac",
            "Free Lossless Audio Codec",
            &["flac"],
            FLAC_MARKERS,
        ))
        .register(ContainerFormat::new::<MkvReader>(
            "matroska",
            "Matroska / WebM",
            &["mkv", "mka", "webm"],
            MKV_MARKERS,
        ))
        .register(ContainerFormat::new::<IsoMp4Reader>(
            "isomp4",
            "ISO Base Media File Format (MP4, M4A, MOV)",
            &["mp4", "m4a", "m4b", "m4p", "mov", "3gp"],
            MP4_MARKERS,
        ))
        .register(ContainerFormat::new::<AdtsReader>(
            "adts",
            "Audio Data Transport Stream (AAC)",
            &["aac"],
            ADTS_MARKERS,
        ))
        .register(ContainerFormat::new::<MpaReader>(
            "mpa",
            "MPEG Audio (MP1, MP2, MP3)",
            &["mp3", "mp2", "mp1", "mpa"],
            MPA_MARKERS,
        ));
}

/// Default registry of container formats, covering all formats enabled in Symphonia.
pub static FORMAT_REGISTRY: Lazy<FormatRegistry> = Lazy::new(|| {
    let mut registry = FormatRegistry::new();
    register_default_formats(&mut registry);
    registry
});
