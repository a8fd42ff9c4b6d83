//! Linear-interpolation sample-rate converter with persisted fixed-point phase.
//!
//! Phase is kept in 16.16 fixed point and carried across calls, so feeding a
//! stream in arbitrary chunks produces exactly the same output as feeding it
//! in one call. Output stops as soon as the writer reports it is full, leaving
//! the phase and previous frame untouched for the next call to resume from.

use log::warn;

use crate::audio::buffer::RingBuffer;
use crate::audio::frame::Frame;

/// Fractional bits of the fixed-point phase.
pub const FRAC_BITS: u32 = 16;
/// `1.0` in 16.16 fixed point.
pub const FRAC_ONE: u32 = 1 << FRAC_BITS;

// Keeps `frac_pos + 2 * step` inside `u32`.
const MAX_FRAC_STEP: u32 = 1 << 29;

/// Counts reported by one resampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleResult {
    pub frames_written: usize,
    pub frames_consumed: usize,
}

/// Destination for resampled frames.
pub trait FrameWriter {
    /// Store one frame, or return `false` without storing when out of room.
    fn try_write(&mut self, frame: Frame) -> bool;
}

impl FrameWriter for RingBuffer {
    #[inline]
    fn try_write(&mut self, frame: Frame) -> bool {
        if self.is_full() {
            return false;
        }
        self.write(frame);
        true
    }
}

impl FrameWriter for Vec<Frame> {
    #[inline]
    fn try_write(&mut self, frame: Frame) -> bool {
        self.push(frame);
        true
    }
}

/// Writer that accepts and discards everything; used to count output.
struct Discard;

impl FrameWriter for Discard {
    #[inline]
    fn try_write(&mut self, _frame: Frame) -> bool {
        true
    }
}

/// Stateful stereo rate converter.
///
/// `frac_pos` stays below [`FRAC_ONE`] only while a call is interpolating.
/// When downsampling, a call can end with the phase at or past a whole input
/// frame, and the next call steps over that many input frames before writing.
/// The carry is kept instead of folded into the previous frame, so the output
/// does not depend on how the input was split into calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    input_rate: u32,
    output_rate: u32,
    frac_step: u32,
    frac_pos: u32,
    prev_frame: Frame,
    has_prev: bool,
}

impl Default for Resampler {
    /// A 1:1 converter with no rates configured.
    fn default() -> Self {
        Self {
            input_rate: 0,
            output_rate: 0,
            frac_step: FRAC_ONE,
            frac_pos: 0,
            prev_frame: Frame::SILENCE,
            has_prev: false,
        }
    }
}

impl Resampler {
    /// Create a converter from `input_rate` to `output_rate`.
    ///
    /// A zero rate on either side falls back to a 1:1 step.
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        let frac_step = if input_rate == 0 || output_rate == 0 {
            warn!(
                "degenerate resampler rates {} -> {}; passing audio through",
                input_rate, output_rate
            );
            FRAC_ONE
        } else {
            let step = (u64::from(input_rate) << FRAC_BITS) / u64::from(output_rate);
            step.clamp(1, u64::from(MAX_FRAC_STEP)) as u32
        };

        Self {
            input_rate,
            output_rate,
            frac_step,
            frac_pos: 0,
            prev_frame: Frame::SILENCE,
            has_prev: false,
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Base input advance per output frame, in 16.16 fixed point.
    pub fn frac_step(&self) -> u32 {
        self.frac_step
    }

    /// Current phase between the previous and next input frame.
    ///
    /// Below [`FRAC_ONE`] while interpolating. When downsampling, the value
    /// left after a call may exceed it; the excess is a whole input frame the
    /// next call will step over without output.
    pub fn frac_pos(&self) -> u32 {
        self.frac_pos
    }

    pub fn has_prev(&self) -> bool {
        self.has_prev
    }

    /// Forget the phase and previous frame after a content discontinuity.
    pub fn reset(&mut self) {
        self.frac_pos = 0;
        self.prev_frame = Frame::SILENCE;
        self.has_prev = false;
    }

    /// Resample `frames` into `out` at the nominal ratio scaled by
    /// `speed_adjust`.
    ///
    /// A speed above `1.0` consumes input faster and produces fewer frames.
    /// The effective step is clamped to half and double the nominal step.
    /// When `out` fills up, the call stops and reports what it consumed; the
    /// remaining input must be submitted again.
    pub fn resample<W: FrameWriter + ?Sized>(
        &mut self,
        out: &mut W,
        frames: &[Frame],
        speed_adjust: f32,
    ) -> ResampleResult {
        let mut result = ResampleResult::default();
        if frames.is_empty() {
            return result;
        }

        let step = self.adjusted_step(speed_adjust);
        let mut frac_pos = self.frac_pos;
        let mut prev = self.prev_frame;
        let mut has_prev = self.has_prev;

        'input: for &curr in frames {
            if !has_prev {
                prev = curr;
                has_prev = true;
                result.frames_consumed += 1;
                continue;
            }

            while frac_pos < FRAC_ONE {
                if !out.try_write(prev.lerp(curr, frac_pos)) {
                    break 'input;
                }
                result.frames_written += 1;
                frac_pos += step;
            }

            frac_pos -= FRAC_ONE;
            prev = curr;
            result.frames_consumed += 1;
        }

        self.frac_pos = frac_pos;
        self.prev_frame = prev;
        self.has_prev = has_prev;
        result
    }

    /// Count what [`Resampler::resample`] would produce without writing or
    /// changing state.
    pub fn dry_run(&self, frames: &[Frame], speed_adjust: f32) -> ResampleResult {
        let mut probe = *self;
        probe.resample(&mut Discard, frames, speed_adjust)
    }

    /// Approximate output frames for `input_frames` at `speed_adjust`.
    ///
    /// Returns `input_frames` unchanged when the input rate or speed is not
    /// positive.
    pub fn estimate_output(&self, input_frames: usize, speed_adjust: f32) -> usize {
        if self.input_rate == 0 || !(speed_adjust > 0.0) {
            return input_frames;
        }
        let ratio = f64::from(self.output_rate) / f64::from(self.input_rate);
        (input_frames as f64 * ratio / f64::from(speed_adjust) + 0.5) as usize
    }

    fn adjusted_step(&self, speed_adjust: f32) -> u32 {
        let min_step = (self.frac_step >> 1).max(1);
        let max_step = self.frac_step << 1;
        let scaled = f64::from(self.frac_step) * f64::from(speed_adjust);
        if scaled.is_nan() {
            return self.frac_step;
        }
        (scaled as u32).clamp(min_step, max_step)
    }
}

/// Return `true` when the two rates differ and conversion is required.
pub fn is_needed(rate_in: u32, rate_out: u32) -> bool {
    rate_in != rate_out
}
