//! Stereo 16-bit frame type and sample helpers.

use crate::dsp::resampler::FRAC_BITS;

/// One stereo sample pair.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Digital silence.
    pub const SILENCE: Frame = Frame { left: 0, right: 0 };

    /// Create a frame from its two channel samples.
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Create a frame carrying the same sample on both channels.
    pub const fn mono(sample: i16) -> Self {
        Self {
            left: sample,
            right: sample,
        }
    }

    /// Linearly interpolate toward `next` by a 16.16 fixed-point fraction.
    ///
    /// `frac` is expected in `[0, FRAC_ONE)`; the result always lies between
    /// `self` and `next` on each channel.
    #[inline]
    pub fn lerp(self, next: Frame, frac: u32) -> Frame {
        Frame {
            left: lerp_s16(self.left, next.left, frac),
            right: lerp_s16(self.right, next.right, frac),
        }
    }
}

impl From<(i16, i16)> for Frame {
    fn from((left, right): (i16, i16)) -> Self {
        Self { left, right }
    }
}

impl From<[i16; 2]> for Frame {
    fn from([left, right]: [i16; 2]) -> Self {
        Self { left, right }
    }
}

#[inline]
fn lerp_s16(a: i16, b: i16, frac: u32) -> i16 {
    // The channel delta spans 17 bits, so the product needs more than 32.
    let diff = i64::from(b) - i64::from(a);
    let step = (diff * i64::from(frac)) >> FRAC_BITS;
    (i64::from(a) + step) as i16
}

/// Group interleaved `L R L R ...` samples into frames.
///
/// A trailing unpaired sample is ignored.
pub fn frames_from_interleaved(samples: &[i16]) -> Vec<Frame> {
    samples
        .chunks_exact(2)
        .map(|pair| Frame::from([pair[0], pair[1]]))
        .collect()
}

/// Write frames into an interleaved sample slice.
///
/// Returns the number of frames copied, bounded by `out.len() / 2`.
pub fn write_interleaved(frames: &[Frame], out: &mut [i16]) -> usize {
    let mut written = 0;
    for (frame, pair) in frames.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = frame.left;
        pair[1] = frame.right;
        written += 1;
    }
    written
}

/// Convert a signed 16-bit sample to `f32` in `[-1.0, 1.0)`.
pub fn convert_signed_16bit_to_f32(sample: i16) -> f32 {
    sample as f32 / 2f32.powi(15)
}
