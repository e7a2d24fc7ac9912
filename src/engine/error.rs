use thiserror::Error;

use crate::audio::DeviceError;

/// Fatal session errors. None of them are retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Format or buffer setup failed before any audio was produced.
    #[error("Output device negotiation failed")]
    Negotiation(#[source] DeviceError),

    /// Acquire, release, occupancy or transport control failed mid-session.
    #[error("Audio transport failed")]
    Transport(#[source] DeviceError),
}

impl EngineError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Negotiation(_) => 2,
            EngineError::Transport(_) => 3,
        }
    }

    pub fn device_error(&self) -> &DeviceError {
        match self {
            EngineError::Negotiation(e) | EngineError::Transport(e) => e,
        }
    }
}
