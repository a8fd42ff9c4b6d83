//! # Handheld Audio
//!
//! Real-time sample-rate conversion and playback buffering for a handheld
//! gaming audio path. A game or emulation loop submits stereo 16-bit frames at
//! its own cadence through [`playback::engine::PlaybackEngine::ingest`], and the
//! hardware audio callback drains them at a fixed rate through
//! [`playback::engine::PullHandle::pull`].
//!
//! Rate mismatches are absorbed by a linear-interpolation resampler whose speed
//! is nudged by a buffer-fill feedback controller.

pub mod audio;
pub mod diagnostics;
pub mod dsp;
pub mod error;
pub mod playback;

pub use audio::buffer::RingBuffer;
pub use audio::frame::Frame;
pub use diagnostics::reporter::{Report, Reporter};
pub use dsp::rate_control::RateController;
pub use dsp::resampler::{ResampleResult, Resampler};
pub use error::EngineError;
pub use playback::engine::{
    EngineMetrics, EngineProbe, EngineSettings, EngineState, PlaybackEngine, PullHandle,
};
#[cfg(feature = "playback")]
pub use playback::rodio_sink::RodioSink;
pub use playback::sink::{AudioSink, CallbackSink, SinkSpec};
