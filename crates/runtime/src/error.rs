use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// `send` was called while another turn is still in flight.
    #[error("session busy: a request is already in flight")]
    SessionBusy,

    /// The session hit a non-recoverable transport failure earlier.
    #[error("session closed")]
    SessionClosed,

    #[error("transport error: {0}")]
    Transport(#[from] ModelError),

    #[error("tool exchange exceeded {0} rounds without a final reply")]
    ToolRoundsExceeded(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
