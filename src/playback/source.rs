//! `rodio` source that drains a [`PullHandle`].

use std::time::Duration;

use rodio::Source;

use crate::audio::frame::convert_signed_16bit_to_f32;
use crate::playback::engine::PullHandle;

/// Endless stereo source fed by the engine's consumer side.
///
/// Frames are pulled in blocks of `block_frames`, the same granularity a
/// hardware callback would request, and handed out one sample at a time.
#[derive(Debug)]
pub struct EngineSource {
    handle: PullHandle,
    sample_rate: u32,
    block: Vec<i16>,
    position: usize,
}

impl EngineSource {
    pub fn new(handle: PullHandle, sample_rate: u32, block_frames: usize) -> Self {
        let block = vec![0; block_frames.max(1) * 2];
        let position = block.len();
        Self {
            handle,
            sample_rate,
            block,
            position,
        }
    }
}

impl Iterator for EngineSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.block.len() {
            self.handle.pull_interleaved(&mut self.block);
            self.position = 0;
        }
        let sample = self.block[self.position];
        self.position += 1;
        Some(convert_signed_16bit_to_f32(sample))
    }
}

impl Source for EngineSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
