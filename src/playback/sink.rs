//! Audio output collaborators the engine negotiates with.

use std::sync::mpsc::{channel, Receiver, Sender};

use log::debug;

use crate::error::EngineError;
use crate::playback::engine::PullHandle;

/// Output format requested from, or granted by, a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub callback_frames: u32,
}

/// Device side of the engine.
///
/// A sink is opened once with the consumer [`PullHandle`]; from then on it
/// calls [`PullHandle::pull`] from its own thread whenever the device needs
/// audio. The returned spec may differ from the request and the engine adapts
/// to it.
pub trait AudioSink {
    fn open(&mut self, requested: SinkSpec, source: PullHandle) -> Result<SinkSpec, EngineError>;
    fn pause(&mut self, paused: bool);
    fn close(&mut self);
}

/// Sink for hosts that own the audio callback themselves.
///
/// On open, the [`PullHandle`] is sent through the channel returned by
/// [`CallbackSink::new`], and the host drives it from its callback thread.
#[derive(Debug)]
pub struct CallbackSink {
    granted_rate: Option<u32>,
    handles: Sender<PullHandle>,
    paused: bool,
}

impl CallbackSink {
    /// Create a sink that grants whatever rate is requested.
    pub fn new() -> (Self, Receiver<PullHandle>) {
        let (handles, receiver) = channel();
        (
            Self {
                granted_rate: None,
                handles,
                paused: true,
            },
            receiver,
        )
    }

    /// Create a sink that always grants `sample_rate`, like a device with a
    /// fixed hardware rate.
    pub fn with_granted_rate(sample_rate: u32) -> (Self, Receiver<PullHandle>) {
        let (mut sink, receiver) = Self::new();
        sink.granted_rate = Some(sample_rate);
        (sink, receiver)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl AudioSink for CallbackSink {
    fn open(&mut self, requested: SinkSpec, source: PullHandle) -> Result<SinkSpec, EngineError> {
        self.handles
            .send(source)
            .map_err(|_| EngineError::SinkOpen("callback receiver dropped".to_string()))?;
        Ok(SinkSpec {
            sample_rate: self.granted_rate.unwrap_or(requested.sample_rate),
            channels: 2,
            callback_frames: requested.callback_frames,
        })
    }

    fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn close(&mut self) {
        debug!("callback sink closed");
        self.paused = true;
    }
}
