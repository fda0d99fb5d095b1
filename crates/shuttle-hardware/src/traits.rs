//! Reader driver trait definitions.
//!
//! The vendor driver is split in two: a [`ReaderDriver`] factory that
//! allocates connections, and the [`ReaderConnection`] it returns. The
//! protocol core owns at most one connection at a time and drops it
//! (after [`release`](ReaderConnection::release)) on every error path.
//!
//! Operations are synchronous and fire-and-forget. Their outcome is
//! reported later through the [`EventSink`] the connection was opened with.

use crate::error::Result;
use crate::sink::EventSink;
use shuttle_protocol::{ConnectionProfile, DriverCommand};

/// Factory for reader connections.
pub trait ReaderDriver: Send + 'static {
    /// Connection type produced by this driver.
    type Connection: ReaderConnection;

    /// Allocate a fresh connection that reports through `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot allocate a connection.
    fn open(&self, sink: EventSink) -> Result<Self::Connection>;
}

/// One live connection to the reader.
///
/// Call order matters and is not enforced here:
///
/// 1. [`connect_with_profile`](Self::connect_with_profile). This also
///    makes a best-effort handshake attempt as a side effect.
/// 2. [`register_listen`](Self::register_listen). Registering before the
///    profile is applied means no connected event is ever delivered.
/// 3. Commands, swipe control.
/// 4. [`unregister_listen`](Self::unregister_listen) and
///    [`release`](Self::release).
pub trait ReaderConnection: Send + 'static {
    /// Apply the connection profile.
    fn connect_with_profile(&mut self, profile: &ConnectionProfile) -> Result<()>;

    /// Start delivering events to the sink.
    fn register_listen(&mut self) -> Result<()>;

    /// Stop delivering events. The driver answers with a disconnected event.
    fn unregister_listen(&mut self) -> Result<()>;

    /// Send a command to the reader.
    fn send_command(&mut self, command: DriverCommand) -> Result<()>;

    /// Set the swipe timeout in seconds.
    ///
    /// The driver always enforces 30 seconds regardless of this value.
    fn set_swipe_timeout(&mut self, seconds: u16) -> Result<()>;

    /// Begin capturing a swipe.
    fn start_swipe(&mut self) -> Result<()>;

    /// Abort a swipe capture.
    ///
    /// # Errors
    ///
    /// May return [`HardwareError::DriverFault`](crate::HardwareError::DriverFault)
    /// when no capture is running.
    fn stop_swipe(&mut self) -> Result<()>;

    /// Stop the record thread and free driver resources.
    ///
    /// # Errors
    ///
    /// May return [`HardwareError::DriverFault`](crate::HardwareError::DriverFault)
    /// whether or not the record thread is running.
    fn release(&mut self) -> Result<()>;
}
