//! Buffer-fill feedback for the resampler speed.
//!
//! Purely proportional: the multiplier depends only on the current fill
//! fraction and carries no state between calls.

use serde::{Deserialize, Serialize};

const DEFAULT_DEADBAND_LOW: f32 = 0.30;
const DEFAULT_DEADBAND_HIGH: f32 = 0.70;
const DEFAULT_MAX_ADJUST: f32 = 0.02;
const MAX_ADJUST_LIMIT: f32 = 0.5;

/// Maps ring-buffer occupancy to a resampling speed multiplier.
///
/// Inside `[deadband_low, deadband_high]` the multiplier is `1.0`. Below the
/// deadband it falls linearly to `1.0 - max_adjust` at an empty buffer;
/// above it, it rises linearly to `1.0 + max_adjust` at a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateController {
    pub deadband_low: f32,
    pub deadband_high: f32,
    pub max_adjust: f32,
}

impl Default for RateController {
    fn default() -> Self {
        Self {
            deadband_low: DEFAULT_DEADBAND_LOW,
            deadband_high: DEFAULT_DEADBAND_HIGH,
            max_adjust: DEFAULT_MAX_ADJUST,
        }
    }
}

impl RateController {
    /// Create a controller, sanitizing the deadband and adjustment bound.
    pub fn new(deadband_low: f32, deadband_high: f32, max_adjust: f32) -> Self {
        Self {
            deadband_low,
            deadband_high,
            max_adjust,
        }
        .sanitized()
    }

    /// Return a copy with finite, ordered bounds inside `[0, 1]`.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let low = finite_or(self.deadband_low, defaults.deadband_low).clamp(0.0, 1.0);
        let high = finite_or(self.deadband_high, defaults.deadband_high).clamp(0.0, 1.0);
        let (deadband_low, deadband_high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            deadband_low,
            deadband_high,
            max_adjust: finite_or(self.max_adjust, defaults.max_adjust)
                .clamp(0.0, MAX_ADJUST_LIMIT),
        }
    }

    /// Speed multiplier for the given fill fraction.
    ///
    /// Fractions outside `[0, 1]` are clamped; a non-finite fraction yields
    /// `1.0`.
    pub fn compute_adjustment(&self, fill_fraction: f32) -> f32 {
        if !fill_fraction.is_finite() {
            return 1.0;
        }
        let fill = fill_fraction.clamp(0.0, 1.0);

        if fill < self.deadband_low {
            let urgency = (self.deadband_low - fill) / self.deadband_low;
            1.0 - urgency * self.max_adjust
        } else if fill > self.deadband_high {
            let urgency = (fill - self.deadband_high) / (1.0 - self.deadband_high);
            1.0 + urgency * self.max_adjust
        } else {
            1.0
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
