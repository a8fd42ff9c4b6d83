//! Default output device through `rodio`.

use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::EngineError;
use crate::playback::engine::PullHandle;
use crate::playback::sink::{AudioSink, SinkSpec};
use crate::playback::source::EngineSource;

const OUTPUT_STREAM_OPEN_RETRIES: u32 = 3;
const OUTPUT_STREAM_OPEN_RETRY_MS: u64 = 50;

/// Sink playing through the system's default output device.
#[derive(Default)]
pub struct RodioSink {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl RodioSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_stream(requested: &SinkSpec) -> Result<OutputStream, EngineError> {
        let mut last_error = String::new();
        for attempt in 1..=OUTPUT_STREAM_OPEN_RETRIES {
            let opened = OutputStreamBuilder::from_default_device().and_then(|builder| {
                builder
                    .with_sample_rate(requested.sample_rate)
                    .open_stream_or_fallback()
            });
            match opened {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    warn!(
                        "open output stream attempt {}/{} failed: {}",
                        attempt, OUTPUT_STREAM_OPEN_RETRIES, err
                    );
                    last_error = err.to_string();
                    thread::sleep(Duration::from_millis(OUTPUT_STREAM_OPEN_RETRY_MS));
                }
            }
        }
        error!(
            "failed to open default output stream after {} attempts",
            OUTPUT_STREAM_OPEN_RETRIES
        );
        Err(EngineError::SinkOpen(last_error))
    }
}

impl AudioSink for RodioSink {
    fn open(&mut self, requested: SinkSpec, source: PullHandle) -> Result<SinkSpec, EngineError> {
        let stream = Self::open_stream(&requested)?;
        let sample_rate = stream.config().sample_rate();

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.append(EngineSource::new(
            source,
            sample_rate,
            requested.callback_frames as usize,
        ));

        info!(
            "output stream open: {} Hz requested, {} Hz granted",
            requested.sample_rate, sample_rate
        );
        self.sink = Some(sink);
        self.stream = Some(stream);

        Ok(SinkSpec {
            sample_rate,
            channels: 2,
            callback_frames: requested.callback_frames,
        })
    }

    fn pause(&mut self, paused: bool) {
        if let Some(sink) = self.sink.as_ref() {
            if paused {
                sink.pause();
            } else {
                sink.play();
            }
        }
    }

    fn close(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.stream = None;
    }
}
