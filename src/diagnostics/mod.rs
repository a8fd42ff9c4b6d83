//! Monitoring helpers built on the engine probe.

pub mod reporter;
