//! Rate conversion and rate control.

pub mod rate_control;
pub mod resampler;
