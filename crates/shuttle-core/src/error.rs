use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ERROR_CANCEL, ERROR_NO_TRACK_2, ERROR_NOT_DETECTED, ERROR_TIMEOUT, ERROR_UNKNOWN,
};

/// Caller-visible failure of a reader action.
///
/// Every variant is delivered exactly once through the request's reply
/// channel; none of them is ever raised past that point.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderError {
    /// No reader on the jack, or the handshake failed.
    #[error("Reader not detected")]
    NotDetected,

    /// The swipe window elapsed (reported by the driver as a garbage capture).
    #[error("Swipe timed out")]
    Timeout,

    /// The swipe decoded but contained no usable track 2.
    #[error("No track 2 in swipe data")]
    NoTrack2,

    /// The caller aborted the swipe.
    #[error("Swipe cancelled")]
    Cancel,

    /// Internal encoding fault. Should be unreachable.
    #[error("Unknown reader error")]
    Unknown,
}

impl ReaderError {
    /// Wire code sent to the host bridge.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotDetected => ERROR_NOT_DETECTED,
            Self::Timeout => ERROR_TIMEOUT,
            Self::NoTrack2 => ERROR_NO_TRACK_2,
            Self::Cancel => ERROR_CANCEL,
            Self::Unknown => ERROR_UNKNOWN,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid card number: {0}")]
    InvalidCardNumber(String),

    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
