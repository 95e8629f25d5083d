//! Packing of decoded sample planes into interleaved, native-endian output frames.

use crate::content::SampleFormat;

use byteorder::{ByteOrder, NativeEndian};
use symphonia_core::{
    audio::{AudioBuffer, AudioBufferRef, Signal},
    conv::FromSample,
    sample::Sample,
};

trait PackedSample: Copy {
    const WIDTH: usize;

    fn pack(self, out: &mut [u8]);
}

impl PackedSample for u8 {
    const WIDTH: usize = 1;

    fn pack(self, out: &mut [u8]) {
        out[0] = self;
    }
}

impl PackedSample for i16 {
    const WIDTH: usize = 2;

    fn pack(self, out: &mut [u8]) {
        NativeEndian::write_i16(out, self);
    }
}

impl PackedSample for i32 {
    const WIDTH: usize = 4;

    fn pack(self, out: &mut [u8]) {
        NativeEndian::write_i32(out, self);
    }
}

impl PackedSample for f32 {
    const WIDTH: usize = 4;

    fn pack(self, out: &mut [u8]) {
        NativeEndian::write_f32(out, self);
    }
}

impl PackedSample for f64 {
    const WIDTH: usize = 8;

    fn pack(self, out: &mut [u8]) {
        NativeEndian::write_f64(out, self);
    }
}

fn interleave_into<S, T>(buf: &AudioBuffer<S>, out: &mut [u8]) -> Option<usize>
where
    S: Sample,
    T: PackedSample + FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    let len = frames.checked_mul(channels)?.checked_mul(T::WIDTH)?;

    let out = out.get_mut(..len)?;
    if len == 0 {
        return Some(0);
    }

    for (ch, plane) in (0..channels).map(|ch| (ch, buf.chan(ch))) {
        for (frame, sample) in plane.iter().take(frames).enumerate() {
            let pos = (frame * channels + ch) * T::WIDTH;
            T::from_sample(*sample).pack(&mut out[pos..pos + T::WIDTH]);
        }
    }

    Some(len)
}

/// Writes `decoded` into `out` as interleaved samples of `format`.
///
/// Returns the number of bytes written, or `None` if the frame does not fit in `out`.
pub(crate) fn pack(decoded: &AudioBufferRef<'_>, format: SampleFormat, out: &mut [u8]) -> Option<usize> {
    macro_rules! to_format {
        ($buf:expr) => {
            match format {
                SampleFormat::U8 => interleave_into::<_, u8>($buf, out),
                SampleFormat::S16 => interleave_into::<_, i16>($buf, out),
                SampleFormat::S32 => interleave_into::<_, i32>($buf, out),
                SampleFormat::F32 => interleave_into::<_, f32>($buf, out),
                SampleFormat::F64 => interleave_into::<_, f64>($buf, out),
            }
        };
    }

    match decoded {
        AudioBufferRef::U8(buf) => to_format!(&**buf),
        AudioBufferRef::U16(buf) => to_format!(&**buf),
        AudioBufferRef::U24(buf) => to_format!(&**buf),
        AudioBufferRef::U32(buf) => to_format!(&**buf),
        AudioBufferRef::S8(buf) => to_format!(&**buf),
        AudioBufferRef::S16(buf) => to_format!(&**buf),
        AudioBufferRef::S24(buf) => to_format!(&**buf),
        AudioBufferRef::S32(buf) => to_format!(&**buf),
        AudioBufferRef::F32(buf) => to_format!(&**buf),
        AudioBufferRef::F64(buf) => to_format!(&**buf),
    }
}
