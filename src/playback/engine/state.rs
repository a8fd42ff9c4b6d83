use serde::{Deserialize, Serialize};

use crate::dsp::rate_control::RateController;
use crate::error::EngineError;

const DEFAULT_BUFFER_SECONDS: f32 = 5.0;
const DEFAULT_MAX_OUTPUT_RATE: u32 = 48_000;
const DEFAULT_CALLBACK_FRAMES: u32 = 512;
const DEFAULT_MAX_WAIT_RETRIES: u32 = 10;
const DEFAULT_WAIT_RETRY_MS: u64 = 1;

/// Discrete lifecycle of a [`super::PlaybackEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Resized,
    Shutdown,
}

impl EngineState {
    /// Return `true` while the engine accepts audio.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Ready | Self::Resized)
    }
}

/// Tunables for buffer sizing, sink negotiation and ingest backpressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Buffer length, scaled by the input rate over the driving frame rate.
    pub buffer_seconds: f32,
    /// Highest rate ever requested from the sink.
    pub max_output_rate: u32,
    /// Requested hardware callback size in frames.
    pub callback_frames: u32,
    /// Sleeps `ingest` may take waiting for space before writing what fits.
    pub max_wait_retries: u32,
    pub wait_retry_ms: u64,
    pub rate_control: RateController,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            max_output_rate: DEFAULT_MAX_OUTPUT_RATE,
            callback_frames: DEFAULT_CALLBACK_FRAMES,
            max_wait_retries: DEFAULT_MAX_WAIT_RETRIES,
            wait_retry_ms: DEFAULT_WAIT_RETRY_MS,
            rate_control: RateController::default(),
        }
    }
}

impl EngineSettings {
    /// Parse settings from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Return a copy with every field forced into its valid range.
    pub fn sanitized(self) -> Self {
        let buffer_seconds = if self.buffer_seconds.is_finite() {
            self.buffer_seconds.max(0.0)
        } else {
            DEFAULT_BUFFER_SECONDS
        };
        Self {
            buffer_seconds,
            max_output_rate: if self.max_output_rate == 0 {
                DEFAULT_MAX_OUTPUT_RATE
            } else {
                self.max_output_rate
            },
            callback_frames: self.callback_frames.max(1),
            max_wait_retries: self.max_wait_retries,
            wait_retry_ms: self.wait_retry_ms,
            rate_control: self.rate_control.sanitized(),
        }
    }

    /// Rate to request from the sink for a wanted output rate.
    ///
    /// The request is capped at `max_output_rate`; a zero request asks for
    /// the maximum.
    pub fn pick_sample_rate(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.max_output_rate
        } else {
            requested.min(self.max_output_rate)
        }
    }
}

/// Counters accumulated by the producer and consumer since init.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineMetrics {
    /// Pulls that ran out of buffered frames.
    pub underrun_events: u64,
    /// Frames filled by repeating the last frame read.
    pub repeated_frames: u64,
    /// Frames filled with silence because nothing had been read yet.
    pub silent_frames: u64,
    /// Frames drained from the ring buffer.
    pub frames_pulled: u64,
    /// Input frames consumed by `ingest`.
    pub frames_ingested: u64,
    /// Resampled frames written into the ring buffer.
    pub frames_written: u64,
    pub wait_retries: u64,
    /// `ingest` calls that consumed less than they were given.
    pub curtailed_ingests: u64,
    pub resizes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_handheld_profile() {
        let settings = EngineSettings::default();
        assert_eq!(settings.buffer_seconds, 5.0);
        assert_eq!(settings.max_output_rate, 48_000);
        assert_eq!(settings.callback_frames, 512);
        assert_eq!(settings.max_wait_retries, 10);
        assert_eq!(settings.wait_retry_ms, 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{"buffer_seconds":2.5,"rate_control":{"max_adjust":0.01}}"#;
        let settings = EngineSettings::from_json(json).expect("parse settings");
        assert_eq!(settings.buffer_seconds, 2.5);
        assert_eq!(settings.max_output_rate, 48_000);
        assert_eq!(settings.rate_control.max_adjust, 0.01);
        assert_eq!(settings.rate_control.deadband_low, 0.30);
    }

    #[test]
    fn invalid_values_are_sanitized() {
        let json = r#"{"buffer_seconds":-1.0,"max_output_rate":0,"callback_frames":0}"#;
        let settings = EngineSettings::from_json(json).expect("parse settings");
        assert_eq!(settings.buffer_seconds, 0.0);
        assert_eq!(settings.max_output_rate, 48_000);
        assert_eq!(settings.callback_frames, 1);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = EngineSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn sample_rate_request_is_capped() {
        let settings = EngineSettings::default();
        assert_eq!(settings.pick_sample_rate(44_100), 44_100);
        assert_eq!(settings.pick_sample_rate(96_000), 48_000);
        assert_eq!(settings.pick_sample_rate(0), 48_000);
    }
}
