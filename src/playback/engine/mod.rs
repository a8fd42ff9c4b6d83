//! Playback engine: ring buffer, resampler and rate control behind one lock.
//!
//! The producer side is [`PlaybackEngine`], owned by the host's main loop.
//! The consumer side is [`PullHandle`], handed to the audio sink at init and
//! driven from the device thread. Both sides share a single mutex over the
//! cursors, backing store and resampler state so that occupancy and the
//! resampler's full check always see one consistent snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::audio::buffer::RingBuffer;
use crate::audio::frame::Frame;
use crate::dsp::rate_control::RateController;
use crate::dsp::resampler::Resampler;
use crate::error::EngineError;
use crate::playback::sink::{AudioSink, SinkSpec};

mod state;

pub use state::{EngineMetrics, EngineSettings, EngineState};

// Frames staged per lock when pulling into an interleaved slice.
const PULL_CHUNK_FRAMES: usize = 256;

struct EngineCore {
    ring: RingBuffer,
    resampler: Resampler,
    /// Bumped whenever buffered content is discarded.
    generation: u64,
    paused: bool,
    metrics: EngineMetrics,
}

struct EngineShared {
    core: Mutex<EngineCore>,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            core: Mutex::new(EngineCore {
                ring: RingBuffer::empty(),
                resampler: Resampler::default(),
                generation: 0,
                paused: true,
                metrics: EngineMetrics::default(),
            }),
        }
    }

    // The consumer runs under a real-time deadline and must never panic on
    // a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer-side engine owned by the host.
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
    sink: Box<dyn AudioSink>,
    settings: EngineSettings,
    rate_control: RateController,
    state: EngineState,
    input_rate: u32,
    output_rate: u32,
    frame_rate: f64,
    sink_spec: Option<SinkSpec>,
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("state", &self.state)
            .field("input_rate", &self.input_rate)
            .field("output_rate", &self.output_rate)
            .field("frame_rate", &self.frame_rate)
            .field("sink_spec", &self.sink_spec)
            .field("settings", &self.settings)
            .finish()
    }
}

impl PlaybackEngine {
    /// Create an uninitialized engine that will play through `sink`.
    pub fn new(sink: impl AudioSink + 'static, settings: EngineSettings) -> Self {
        let settings = settings.sanitized();
        debug!("engine settings: {:?}", settings);
        Self {
            shared: Arc::new(EngineShared::new()),
            sink: Box::new(sink),
            rate_control: settings.rate_control,
            settings,
            state: EngineState::Uninitialized,
            input_rate: 0,
            output_rate: 0,
            frame_rate: 0.0,
            sink_spec: None,
        }
    }

    /// Open the sink, build the resampler for the granted rate and size the
    /// ring buffer.
    ///
    /// `frame_rate` is the cadence at which the host calls [`Self::ingest`].
    /// When the sink opens but the buffer cannot be allocated, the engine is
    /// still `Ready` and silent, and the allocation error is returned; a later
    /// [`Self::resize`] can recover.
    pub fn init(
        &mut self,
        input_rate: u32,
        requested_output_rate: u32,
        frame_rate: f64,
    ) -> Result<(), EngineError> {
        match self.state {
            EngineState::Uninitialized => {}
            EngineState::Shutdown => return Err(EngineError::Shutdown),
            _ => {
                return Err(EngineError::InvalidConfig(
                    "engine is already initialized".to_string(),
                ))
            }
        }
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "frame rate must be positive, got {}",
                frame_rate
            )));
        }

        let requested = SinkSpec {
            sample_rate: self.settings.pick_sample_rate(requested_output_rate),
            channels: 2,
            callback_frames: self.settings.callback_frames,
        };
        let handle = PullHandle::new(self.shared.clone());
        let granted = match self.sink.open(requested, handle) {
            Ok(granted) => granted,
            Err(err) => {
                error!("audio sink open error: {}", err);
                return Err(err);
            }
        };
        if granted.channels != 2 {
            warn!(
                "sink granted {} channels; engine output stays stereo",
                granted.channels
            );
        }

        self.input_rate = input_rate;
        self.output_rate = granted.sample_rate;
        self.frame_rate = frame_rate;
        self.sink_spec = Some(granted);
        self.shared.lock().resampler = Resampler::new(input_rate, granted.sample_rate);
        self.state = EngineState::Ready;

        let sized = self.rebuild_buffer();

        self.shared.lock().paused = false;
        self.sink.pause(false);

        info!(
            "sample rate: {} (req) {} (rec) [callback {} frames], buffer {} frames",
            input_rate,
            granted.sample_rate,
            granted.callback_frames,
            self.capacity()
        );
        sized
    }

    /// Re-derive the buffer size from the current rates and settings and
    /// replace the buffer.
    ///
    /// This is a hard reset: buffered frames are discarded and both cursors
    /// rewind. On failure the previous buffer stays in place.
    pub fn resize(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Uninitialized => Err(EngineError::InvalidConfig(
                "engine is not initialized".to_string(),
            )),
            EngineState::Shutdown => Err(EngineError::Shutdown),
            EngineState::Ready | EngineState::Resized => {
                self.rebuild_buffer()?;
                self.state = EngineState::Resized;
                Ok(())
            }
        }
    }

    fn rebuild_buffer(&mut self) -> Result<(), EngineError> {
        let frames = self.frame_capacity();
        if frames < 2 {
            warn!(
                "rejecting resize to {} frames ({}s at {} Hz / {} fps)",
                frames, self.settings.buffer_seconds, self.input_rate, self.frame_rate
            );
            return Err(EngineError::InvalidConfig(format!(
                "buffer of {} frames is too small",
                frames
            )));
        }

        let reuse = self.shared.lock().ring.capacity() == frames;
        let fresh = if reuse {
            None
        } else {
            match RingBuffer::try_with_capacity(frames) {
                Ok(ring) => Some(ring),
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            }
        };

        let mut core = self.shared.lock();
        match fresh {
            Some(ring) => core.ring = ring,
            None => core.ring.clear(),
        }
        core.generation += 1;
        core.metrics.resizes += 1;
        drop(core);

        info!("ring buffer resized to {} frames", frames);
        Ok(())
    }

    /// Frames the buffer should hold for the current settings.
    ///
    /// Sized against the submission cadence: one `ingest` per driving frame.
    pub fn frame_capacity(&self) -> usize {
        let rate = if self.input_rate > 0 {
            self.input_rate
        } else {
            self.output_rate
        };
        if !(self.frame_rate > 0.0) {
            return 0;
        }
        (f64::from(self.settings.buffer_seconds) * f64::from(rate) / self.frame_rate) as usize
    }

    /// Configure the buffer length used by the next [`Self::resize`].
    pub fn set_buffer_seconds(&mut self, seconds: f32) {
        self.settings.buffer_seconds = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
    }

    /// Configure the driving frame rate used by the next [`Self::resize`].
    ///
    /// Non-positive rates are ignored.
    pub fn set_frame_rate(&mut self, frame_rate: f64) {
        if frame_rate.is_finite() && frame_rate > 0.0 {
            self.frame_rate = frame_rate;
        } else {
            warn!("ignoring frame rate {}", frame_rate);
        }
    }

    /// Drop the resampler phase after a seek or content switch.
    ///
    /// Buffered output is left for the consumer to drain.
    pub fn reset(&mut self) {
        self.shared.lock().resampler.reset();
        debug!("resampler reset");
    }

    /// Pause or resume the consumer. While paused, pulls emit silence and the
    /// buffer is not drained.
    pub fn pause(&mut self, paused: bool) {
        if !self.state.is_running() {
            return;
        }
        self.shared.lock().paused = paused;
        self.sink.pause(paused);
    }

    /// Resample `frames` into the buffer and return how many were consumed.
    ///
    /// When the estimated output does not fit, waits up to the configured
    /// retry budget, releasing the lock during each sleep so the consumer can
    /// drain. Whatever still does not fit is left unconsumed, with the
    /// resampler positioned to continue from the first unconsumed frame.
    pub fn ingest(&mut self, frames: &[Frame]) -> usize {
        if !self.state.is_running() || frames.is_empty() {
            return 0;
        }

        let mut core = self.shared.lock();
        if core.ring.capacity() == 0 {
            return 0;
        }

        let speed = self.rate_control.compute_adjustment(core.ring.fill_fraction());
        let estimated = core.resampler.estimate_output(frames.len(), speed);

        let mut tries = 0;
        while core.ring.free() < estimated && tries < self.settings.max_wait_retries {
            tries += 1;
            drop(core);
            thread::sleep(Duration::from_millis(self.settings.wait_retry_ms));
            core = self.shared.lock();
        }

        let EngineCore {
            ring,
            resampler,
            metrics,
            ..
        } = &mut *core;
        let result = resampler.resample(ring, frames, speed);

        metrics.wait_retries += u64::from(tries);
        metrics.frames_ingested += result.frames_consumed as u64;
        metrics.frames_written += result.frames_written as u64;
        let curtailed = result.frames_consumed < frames.len();
        if curtailed {
            metrics.curtailed_ingests += 1;
        }
        drop(core);

        if curtailed {
            debug!(
                "ingest curtailed: consumed {}/{} frames after {} waits",
                result.frames_consumed,
                frames.len(),
                tries
            );
        }
        result.frames_consumed
    }

    /// Ingest interleaved `L R L R ...` samples; returns frames consumed.
    pub fn ingest_interleaved(&mut self, samples: &[i16]) -> usize {
        let frames = crate::audio::frame::frames_from_interleaved(samples);
        self.ingest(&frames)
    }

    /// Buffer fill as a whole percentage in `0..=100`.
    pub fn buffer_occupancy(&self) -> u32 {
        self.probe().occupancy()
    }

    pub fn metrics(&self) -> EngineMetrics {
        self.shared.lock().metrics
    }

    /// Read-only view of the shared state for monitoring threads.
    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            shared: self.shared.clone(),
        }
    }

    /// Pause the consumer, close the sink and release the buffer.
    ///
    /// Terminal: the engine ignores further ingests. Both sides must be
    /// quiescent before calling this.
    pub fn quit(&mut self) {
        match self.state {
            EngineState::Shutdown => return,
            EngineState::Uninitialized => {
                self.state = EngineState::Shutdown;
                return;
            }
            EngineState::Ready | EngineState::Resized => {}
        }

        self.shared.lock().paused = true;
        self.sink.pause(true);
        self.sink.close();

        let mut core = self.shared.lock();
        core.ring = RingBuffer::empty();
        core.generation += 1;
        drop(core);

        self.state = EngineState::Shutdown;
        info!("audio engine shut down");
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Rate granted by the sink.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn sink_spec(&self) -> Option<SinkSpec> {
        self.sink_spec
    }

    /// Current ring buffer capacity in frames.
    pub fn capacity(&self) -> usize {
        self.shared.lock().ring.capacity()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Consumer-side handle driven by the audio device callback.
///
/// Owns the "last frame read" used to cover underruns; nothing on the
/// producer side can reach it.
pub struct PullHandle {
    shared: Arc<EngineShared>,
    last_frame: Option<Frame>,
    generation: u64,
}

impl std::fmt::Debug for PullHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullHandle")
            .field("last_frame", &self.last_frame)
            .field("generation", &self.generation)
            .finish()
    }
}

impl PullHandle {
    fn new(shared: Arc<EngineShared>) -> Self {
        Self {
            shared,
            last_frame: None,
            generation: 0,
        }
    }

    /// Fill `out` completely and return how many frames came from the buffer.
    ///
    /// Once the buffer runs dry, the remainder repeats the last frame read,
    /// or is silence if nothing has been read since the buffer was created.
    /// Never blocks beyond the engine lock and never fails.
    pub fn pull(&mut self, out: &mut [Frame]) -> usize {
        self.fill(out.len(), |index, frame| out[index] = frame)
    }

    /// Interleaved variant of [`Self::pull`]; a trailing odd sample is zeroed.
    pub fn pull_interleaved(&mut self, out: &mut [i16]) -> usize {
        let mut read = 0;
        for chunk in out.chunks_mut(PULL_CHUNK_FRAMES * 2) {
            let frames = chunk.len() / 2;
            read += self.fill(frames, |index, frame| {
                chunk[index * 2] = frame.left;
                chunk[index * 2 + 1] = frame.right;
            });
            if chunk.len() % 2 == 1 {
                chunk[chunk.len() - 1] = 0;
            }
        }
        read
    }

    /// Unread frames currently buffered.
    pub fn buffered_frames(&self) -> usize {
        self.shared.lock().ring.len()
    }

    /// Last frame drained from the buffer, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame
    }

    fn fill(&mut self, count: usize, mut put: impl FnMut(usize, Frame)) -> usize {
        if count == 0 {
            return 0;
        }

        let mut core = self.shared.lock();
        if core.paused {
            drop(core);
            for index in 0..count {
                put(index, Frame::SILENCE);
            }
            return 0;
        }
        if core.generation != self.generation {
            self.generation = core.generation;
            self.last_frame = None;
        }

        let mut read = 0;
        while read < count {
            match core.ring.read_one() {
                Some(frame) => {
                    put(read, frame);
                    self.last_frame = Some(frame);
                    read += 1;
                }
                None => break,
            }
        }

        let missing = (count - read) as u64;
        core.metrics.frames_pulled += read as u64;
        if missing > 0 {
            core.metrics.underrun_events += 1;
            if self.last_frame.is_some() {
                core.metrics.repeated_frames += missing;
            } else {
                core.metrics.silent_frames += missing;
            }
        }
        drop(core);

        let filler = self.last_frame.unwrap_or(Frame::SILENCE);
        for index in read..count {
            put(index, filler);
        }
        read
    }
}

/// Shared read-only view of engine state for monitoring.
#[derive(Clone)]
pub struct EngineProbe {
    shared: Arc<EngineShared>,
}

impl EngineProbe {
    /// Buffer fill as a whole percentage in `0..=100`.
    pub fn occupancy(&self) -> u32 {
        let fill = self.shared.lock().ring.fill_fraction();
        (fill * 100.0) as u32
    }

    pub fn metrics(&self) -> EngineMetrics {
        self.shared.lock().metrics
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::sink::CallbackSink;

    fn ramp(count: usize) -> Vec<Frame> {
        (0..count).map(|i| Frame::mono(i as i16 + 1)).collect()
    }

    // Passthrough-friendly settings: no speed nudging, no sleeping.
    fn steady_settings() -> EngineSettings {
        EngineSettings {
            max_wait_retries: 2,
            wait_retry_ms: 0,
            rate_control: RateController::new(0.3, 0.7, 0.0),
            ..EngineSettings::default()
        }
    }

    fn start(
        settings: EngineSettings,
        input_rate: u32,
        output_rate: u32,
    ) -> (PlaybackEngine, PullHandle) {
        let (sink, handles) = CallbackSink::new();
        let mut engine = PlaybackEngine::new(sink, settings);
        engine
            .init(input_rate, output_rate, 60.0)
            .expect("init engine");
        let handle = handles.try_recv().expect("pull handle sent on open");
        (engine, handle)
    }

    fn drain(handle: &mut PullHandle, count: usize) -> Vec<Frame> {
        let mut out = vec![Frame::SILENCE; count];
        let read = handle.pull(&mut out);
        out.truncate(read);
        out
    }

    #[test]
    fn init_sizes_buffer_from_driving_cadence() {
        let (engine, _handle) = start(EngineSettings::default(), 44_100, 48_000);
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.output_rate(), 48_000);
        assert_eq!(engine.capacity(), 3_675);
        assert_eq!(engine.buffer_occupancy(), 0);
        assert_eq!(engine.metrics().resizes, 1);
    }

    #[test]
    fn granted_rate_wins_over_request() {
        let (sink, handles) = CallbackSink::with_granted_rate(44_100);
        let mut engine = PlaybackEngine::new(sink, EngineSettings::default());
        engine.init(32_000, 48_000, 60.0).expect("init engine");
        assert!(handles.try_recv().is_ok());
        assert_eq!(engine.output_rate(), 44_100);
        assert_eq!(engine.sink_spec().map(|spec| spec.sample_rate), Some(44_100));
    }

    #[test]
    fn request_is_capped_at_max_output_rate() {
        let (engine, _handle) = start(EngineSettings::default(), 44_100, 96_000);
        assert_eq!(engine.output_rate(), 48_000);
    }

    #[test]
    fn ingest_then_pull_preserves_order() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        let input = ramp(800);
        assert_eq!(engine.ingest(&input), 800);
        assert_eq!(handle.buffered_frames(), 799);

        let pulled = drain(&mut handle, 799);
        assert_eq!(pulled, input[..799].to_vec());
        assert_eq!(handle.last_frame(), Some(input[798]));
    }

    #[test]
    fn underrun_repeats_last_frame() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        let input = ramp(5);
        engine.ingest(&input);

        let mut out = vec![Frame::SILENCE; 10];
        assert_eq!(handle.pull(&mut out), 4);
        assert_eq!(out[..4].to_vec(), input[..4].to_vec());
        assert!(out[4..].iter().all(|frame| *frame == input[3]));

        let mut out = vec![Frame::SILENCE; 6];
        assert_eq!(handle.pull(&mut out), 0);
        assert!(out.iter().all(|frame| *frame == input[3]));

        let metrics = engine.metrics();
        assert_eq!(metrics.underrun_events, 2);
        assert_eq!(metrics.repeated_frames, 12);
        assert_eq!(metrics.silent_frames, 0);
        assert_eq!(metrics.frames_pulled, 4);
    }

    #[test]
    fn silence_before_anything_was_read() {
        let (engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        let mut out = vec![Frame::mono(9); 16];
        assert_eq!(handle.pull(&mut out), 0);
        assert!(out.iter().all(|frame| *frame == Frame::SILENCE));
        assert_eq!(engine.metrics().silent_frames, 16);
    }

    #[test]
    fn occupancy_reports_whole_percent() {
        let (mut engine, _handle) = start(steady_settings(), 48_000, 48_000);
        assert_eq!(engine.capacity(), 4_000);
        engine.ingest(&ramp(2_001));
        assert_eq!(engine.buffer_occupancy(), 50);
    }

    #[test]
    fn full_buffer_curtails_ingest_and_resumes_seamlessly() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        engine.set_buffer_seconds(0.125);
        engine.resize().expect("resize");
        assert_eq!(engine.capacity(), 100);

        let input = ramp(300);
        let consumed = engine.ingest(&input);
        assert_eq!(consumed, 100);
        let metrics = engine.metrics();
        assert_eq!(metrics.curtailed_ingests, 1);
        assert_eq!(metrics.wait_retries, 2);

        let mut played = drain(&mut handle, 99);
        let rest = engine.ingest(&input[consumed..]);
        assert_eq!(rest, 99);
        played.extend(drain(&mut handle, 99));

        assert_eq!(played, input[..198].to_vec());
    }

    #[test]
    fn resize_is_a_hard_reset() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(50));
        drain(&mut handle, 10);
        assert!(handle.last_frame().is_some());

        engine.set_buffer_seconds(2.0);
        engine.resize().expect("resize");
        assert_eq!(engine.state(), EngineState::Resized);
        assert_eq!(engine.capacity(), 1_600);
        assert_eq!(engine.buffer_occupancy(), 0);

        let mut out = vec![Frame::mono(3); 4];
        assert_eq!(handle.pull(&mut out), 0);
        assert!(out.iter().all(|frame| *frame == Frame::SILENCE));
        assert_eq!(handle.last_frame(), None);
        assert_eq!(engine.metrics().resizes, 2);
    }

    #[test]
    fn resize_to_same_size_still_discards_content() {
        let (mut engine, handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(100));
        engine.resize().expect("resize");
        assert_eq!(engine.capacity(), 4_000);
        assert_eq!(handle.buffered_frames(), 0);
    }

    #[test]
    fn rejected_resize_keeps_previous_buffer() {
        let (mut engine, handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(100));
        engine.set_buffer_seconds(0.0);

        let err = engine.resize().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.capacity(), 4_000);
        assert_eq!(handle.buffered_frames(), 99);
    }

    #[test]
    fn failed_allocation_keeps_previous_buffer() {
        let (mut engine, handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(100));
        engine.set_buffer_seconds(f32::MAX);

        let err = engine.resize().unwrap_err();
        assert!(matches!(err, EngineError::Allocation { .. }));
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.capacity(), 4_000);
        assert_eq!(handle.buffered_frames(), 99);
        assert_eq!(engine.metrics().resizes, 1);

        engine.set_buffer_seconds(1.0);
        engine.resize().expect("resize after failed allocation");
        assert_eq!(engine.state(), EngineState::Resized);
        assert_eq!(engine.capacity(), 800);
        assert_eq!(handle.buffered_frames(), 0);
    }

    #[test]
    fn pause_emits_silence_without_draining() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(20));
        engine.pause(true);
        assert!(engine.probe().is_paused());

        let mut out = vec![Frame::mono(5); 8];
        assert_eq!(handle.pull(&mut out), 0);
        assert!(out.iter().all(|frame| *frame == Frame::SILENCE));
        assert_eq!(handle.buffered_frames(), 19);

        engine.pause(false);
        assert_eq!(drain(&mut handle, 8), ramp(8));
    }

    #[test]
    fn reset_restarts_resampler_bootstrap() {
        let (mut engine, _handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(10));
        let written = engine.metrics().frames_written;

        engine.reset();
        assert_eq!(engine.ingest(&[Frame::mono(42)]), 1);
        assert_eq!(engine.metrics().frames_written, written);
    }

    #[test]
    fn rate_control_slows_down_when_buffer_is_low() {
        let (mut engine, _handle) = start(EngineSettings::default(), 48_000, 48_000);
        engine.ingest(&ramp(800));
        assert!(engine.metrics().frames_written > 799);
    }

    #[test]
    fn quit_releases_buffer_and_is_terminal() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest(&ramp(100));
        engine.quit();

        assert_eq!(engine.state(), EngineState::Shutdown);
        assert_eq!(engine.capacity(), 0);
        assert_eq!(engine.ingest(&ramp(10)), 0);
        assert!(matches!(engine.resize(), Err(EngineError::Shutdown)));
        assert!(matches!(
            engine.init(48_000, 48_000, 60.0),
            Err(EngineError::Shutdown)
        ));

        let mut out = vec![Frame::mono(1); 4];
        assert_eq!(handle.pull(&mut out), 0);
        assert!(out.iter().all(|frame| *frame == Frame::SILENCE));

        engine.quit();
        assert_eq!(engine.state(), EngineState::Shutdown);
    }

    #[test]
    fn ingest_before_init_is_ignored() {
        let (sink, _handles) = CallbackSink::new();
        let mut engine = PlaybackEngine::new(sink, EngineSettings::default());
        assert_eq!(engine.ingest(&ramp(10)), 0);
        assert!(engine.resize().is_err());
    }

    #[test]
    fn invalid_frame_rate_is_rejected() {
        let (sink, _handles) = CallbackSink::new();
        let mut engine = PlaybackEngine::new(sink, EngineSettings::default());
        let err = engine.init(44_100, 48_000, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn sink_open_failure_leaves_engine_uninitialized() {
        let (sink, handles) = CallbackSink::new();
        drop(handles);
        let mut engine = PlaybackEngine::new(sink, EngineSettings::default());
        let err = engine.init(44_100, 48_000, 60.0).unwrap_err();
        assert!(matches!(err, EngineError::SinkOpen(_)));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn zero_input_rate_falls_back_to_passthrough() {
        let (mut engine, mut handle) = start(steady_settings(), 0, 48_000);
        assert_eq!(engine.capacity(), 4_000);
        let input = ramp(10);
        assert_eq!(engine.ingest(&input), 10);
        assert_eq!(drain(&mut handle, 9), input[..9].to_vec());
    }

    #[test]
    fn interleaved_pull_zeroes_trailing_sample() {
        let (mut engine, mut handle) = start(steady_settings(), 48_000, 48_000);
        engine.ingest_interleaved(&[1, 2, 3, 4, 5, 6]);

        let mut out = [7_i16; 5];
        assert_eq!(handle.pull_interleaved(&mut out), 2);
        assert_eq!(out, [1, 2, 3, 4, 0]);
    }
}
