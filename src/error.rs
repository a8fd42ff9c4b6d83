use std::fmt::{Display, Formatter};

/// Error type for engine lifecycle, sink negotiation and settings parsing.
#[derive(Debug)]
pub enum EngineError {
    SinkOpen(String),
    Allocation { frames: usize },
    InvalidConfig(String),
    Config(String),
    Shutdown,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinkOpen(err) => write!(f, "failed to open audio sink: {}", err),
            Self::Allocation { frames } => {
                write!(f, "failed to allocate ring buffer of {} frames", frames)
            }
            Self::InvalidConfig(err) => write!(f, "invalid engine configuration: {}", err),
            Self::Config(err) => write!(f, "settings error: {}", err),
            Self::Shutdown => write!(f, "engine has been shut down"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
