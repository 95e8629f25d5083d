//! Opening a demuxer over a bridged stream, either against a known container format or
//! after sniffing the stream's leading bytes.

use super::ContainerFormat;
use crate::{
    constants::PROBE_WINDOW_LEN,
    content,
    context::DecodeContext,
    error::OpenError,
    io::IoBridge,
    Config,
};

use std::path::Path;
use symphonia_core::io::{MediaSourceStream, ReadBytes, SeekBuffered};
use tracing::{debug, info, instrument};

/// Opens `bridge` as a stream of the given container `format`.
///
/// On failure, the bridge is closed (finishing its stream) before the error is returned.
#[instrument(skip(bridge, format, config), fields(format = format.short_name))]
pub fn open_known(
    mut bridge: IoBridge,
    format: ContainerFormat,
    config: &Config,
) -> Result<DecodeContext, OpenError> {
    let source = match bridge.media_source_stream() {
        Some(source) => source,
        None => return Err(fail(&mut bridge, OpenError::BridgeClosed)),
    };

    open_stream(bridge, source, format, config)
}

/// Opens `bridge` as whichever registered container its leading bytes (or, failing
/// that, `filename`'s extension) identify.
///
/// On failure, the bridge is closed (finishing its stream) before the error is returned.
#[instrument(skip(bridge, config))]
pub fn open_sniffed(
    mut bridge: IoBridge,
    filename: Option<&str>,
    config: &Config,
) -> Result<DecodeContext, OpenError> {
    let mut source = match bridge.media_source_stream() {
        Some(source) => source,
        None => return Err(fail(&mut bridge, OpenError::BridgeClosed)),
    };

    let mut window = [0u8; PROBE_WINDOW_LEN];
    let filled = peek_window(&mut source, &mut window);

    let extension = filename
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str());

    let format = match config.format_registry.sniff(&window[..filled], extension) {
        Some(format) => *format,
        None => {
            drop(source);
            return Err(fail(&mut bridge, OpenError::UnknownFormat));
        },
    };

    debug!(
        "Sniffed container {} from {} leading bytes.",
        format.short_name, filled
    );

    open_stream(bridge, source, format, config)
}

/// Fills `window` from the start of `source` as far as possible, then rewinds `source`
/// so that the sampled bytes are read again by the demuxer.
fn peek_window(source: &mut MediaSourceStream, window: &mut [u8]) -> usize {
    let mut filled = 0;

    while filled < window.len() {
        match source.read_buf(&mut window[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }

    source.seek_buffered_rel(-(filled as isize));

    filled
}

fn open_stream(
    mut bridge: IoBridge,
    source: MediaSourceStream,
    format: ContainerFormat,
    config: &Config,
) -> Result<DecodeContext, OpenError> {
    let reader = match format.open(source, &config.format_options) {
        Ok(reader) => reader,
        Err(why) => {
            return Err(fail(
                &mut bridge,
                OpenError::Rejected {
                    format: format.short_name,
                    why,
                },
            ))
        },
    };

    if reader.tracks().is_empty() {
        drop(reader);
        return Err(fail(
            &mut bridge,
            OpenError::NoStreams {
                format: format.short_name,
            },
        ));
    }

    let enumerated = content::enumerate(
        reader.as_ref(),
        config.codec_registry,
        &config.decoder_options,
    );

    info!(
        "Opened {} stream: {} of {} elementary streams decodable.",
        format.short_name,
        enumerated.content.len(),
        enumerated.stream_map.len(),
    );

    Ok(DecodeContext::new(
        bridge,
        format,
        reader,
        enumerated,
        config.disposer.clone(),
    ))
}

fn fail(bridge: &mut IoBridge, err: OpenError) -> OpenError {
    debug!("{}", err);
    bridge.close();
    err
}
