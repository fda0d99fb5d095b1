//! Events and commands exchanged with the reader driver.
//!
//! The driver reports everything asynchronously through [`ReaderEvent`].
//! Which events actually arrive is quirky:
//!
//! - [`ReaderEvent::Timeout`] is only ever raised for a failed handshake.
//!   A swipe that times out arrives as [`ReaderEvent::CardData`] with a
//!   nonzero status flag instead.
//! - [`ReaderEvent::Connected`] is never raised unless listening was
//!   registered *after* the connection profile was applied.
//! - [`ReaderEvent::Disconnected`] always arrives, including after the
//!   caller unregisters listening.

use shuttle_core::constants::{ACK, MIN_SERIAL_RESPONSE_LEN};
use std::fmt;

/// Command sent to the reader over the audio link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DriverCommand {
    /// Query the reader's serial number.
    ///
    /// The Shuttle has no "enable" command, so this doubles as the
    /// liveness probe before arming a swipe.
    GetSerialNumber,

    /// Query the firmware version.
    GetVersion,

    /// Command code this crate does not name.
    Other(u16),
}

impl fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetSerialNumber => write!(f, "GetSerialNumber"),
            Self::GetVersion => write!(f, "GetVersion"),
            Self::Other(code) => write!(f, "Command({code})"),
        }
    }
}

/// Permission prompt raised by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UserGrant {
    /// Power up the reader through the audio channel.
    PowerUpReader,

    /// Download and apply a new XML device profile.
    UpdateXml,

    /// Overwrite the local XML device profile.
    OverwriteXml,

    /// Send device diagnostics to the vendor.
    ReportToVendor,

    /// Prompt type this crate does not name.
    Other(i32),
}

impl UserGrant {
    /// Answer the driver's permission prompt.
    ///
    /// Profile updates and vendor reporting are refused. Every other prompt
    /// is allowed.
    pub fn is_permitted(&self) -> bool {
        !matches!(self, Self::UpdateXml | Self::ReportToVendor)
    }
}

/// Asynchronous notification from the reader driver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReaderEvent {
    /// Driver is about to attempt a handshake. Informational.
    ToConnect,

    /// Handshake succeeded.
    Connected,

    /// Reader unplugged, listening stopped, or a handshake was interrupted.
    Disconnected,

    /// Handshake failed.
    Timeout { message: String },

    /// Response to a [`DriverCommand`].
    CommandResult {
        command: DriverCommand,
        response: Vec<u8>,
    },

    /// Swipe captured. `flags == 0` for a clean capture.
    CardData { flags: u8, data: Vec<u8> },

    /// Reader armed; the user may swipe now.
    ToSwipeCard,
}

impl ReaderEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToConnect => "to_connect",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Timeout { .. } => "timeout",
            Self::CommandResult { .. } => "command_result",
            Self::CardData { .. } => "card_data",
            Self::ToSwipeCard => "to_swipe_card",
        }
    }

    /// Whether this is an acknowledged serial number response.
    ///
    /// The response must be longer than [`MIN_SERIAL_RESPONSE_LEN`] bytes
    /// and start with [`ACK`].
    pub fn is_serial_ack(&self) -> bool {
        match self {
            Self::CommandResult {
                command: DriverCommand::GetSerialNumber,
                response,
            } => response.len() > MIN_SERIAL_RESPONSE_LEN && response[0] == ACK,
            _ => false,
        }
    }
}
