//! Producer/consumer playback engine and its output sinks.

pub mod engine;
#[cfg(feature = "playback")]
pub mod rodio_sink;
pub mod sink;
pub mod source;
