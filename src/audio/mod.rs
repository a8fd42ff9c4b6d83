//! Frame types and the shared playback ring buffer.

pub mod buffer;
pub mod frame;
