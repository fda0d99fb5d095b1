//! Reader session: the one logical connection to the reader.
//!
//! The session owns at most one driver connection. If a handshake ever
//! fails, the driver can end up in a state it never recovers from short of
//! restarting the process. So a connection is never reused across
//! detection attempts: [`create`](ReaderSession::create) always destroys
//! the previous one first, and every error path ends in
//! [`destroy`](ReaderSession::destroy).
//!
//! # Lifecycle
//!
//! 1. `create` opens a connection bound to a new generation
//! 2. `configure_and_connect` applies the profile (and starts a handshake)
//! 3. `start_listening` registers for events; the handshake result follows
//! 4. `send_probe` / `arm_swipe` once the reader is detected
//! 5. `cancel_swipe` or `destroy`
//!
//! Driver operations never block. Their results arrive later as events
//! stamped with the session's generation.

use shuttle_hardware::{
    EventSink, Generation, HardwareError, ReaderConnection, ReaderDriver, Result, SessionEvent,
};
use shuttle_protocol::{ConnectionProfile, DriverCommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owner of the live reader connection.
pub struct ReaderSession<D: ReaderDriver> {
    /// Driver used to open connections.
    driver: D,

    /// Live connection (None if absent).
    connection: Option<D::Connection>,

    /// Channel every connection reports into.
    events: mpsc::UnboundedSender<SessionEvent>,

    /// Generation of the most recently created connection.
    generation: Generation,

    /// Handshake confirmed on the live connection.
    detected: bool,

    /// Listening registered on the live connection.
    listening: bool,
}

impl<D: ReaderDriver> ReaderSession<D> {
    /// Create a session with no connection.
    pub fn new(driver: D, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            driver,
            connection: None,
            events,
            generation: 0,
            detected: false,
            listening: false,
        }
    }

    /// Open a fresh connection, destroying any existing one first.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot allocate a connection. The
    /// session is left without a connection.
    pub fn create(&mut self) -> Result<()> {
        self.destroy();

        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events.clone());
        let connection = self.driver.open(sink)?;
        self.connection = Some(connection);

        info!("Opened reader connection (generation {})", self.generation);
        Ok(())
    }

    /// Apply the connection profile.
    ///
    /// The driver also attempts a handshake as a side effect, but cannot
    /// report its result until listening is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is open or the driver rejects the
    /// profile.
    pub fn configure_and_connect(&mut self, profile: &ConnectionProfile) -> Result<()> {
        debug!("Applying connection profile: {:?}", profile);
        self.connection_mut()?.connect_with_profile(profile)
    }

    /// Register for driver events.
    ///
    /// Must follow [`configure_and_connect`](Self::configure_and_connect);
    /// registering first means no connected event is ever delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is open or registration fails.
    pub fn start_listening(&mut self) -> Result<()> {
        self.connection_mut()?.register_listen()?;
        self.listening = true;
        debug!("Listening for reader events");
        Ok(())
    }

    /// Send the serial number query used as the pre-swipe handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not detected or the command
    /// cannot be sent.
    pub fn send_probe(&mut self) -> Result<()> {
        if !self.detected {
            return Err(HardwareError::NotDetected);
        }
        self.connection_mut()?
            .send_command(DriverCommand::GetSerialNumber)
    }

    /// Ask the reader to start capturing a swipe.
    ///
    /// The driver enforces a 30 second window whatever `timeout_secs` says.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not detected or the driver fails.
    pub fn arm_swipe(&mut self, timeout_secs: u16) -> Result<()> {
        if !self.detected {
            return Err(HardwareError::NotDetected);
        }

        let connection = self.connection_mut()?;
        connection.set_swipe_timeout(timeout_secs)?;
        connection.start_swipe()?;

        info!("Swipe armed (requested timeout {}s)", timeout_secs);
        Ok(())
    }

    /// Abort a swipe and stop listening. Keeps the connection.
    ///
    /// The driver answers the unregistration with a disconnected event.
    /// Driver faults are logged and swallowed.
    pub fn cancel_swipe(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            debug!("Cancel requested with no reader connection");
            return;
        };

        match connection.stop_swipe() {
            Ok(()) => {}
            Err(e) if e.is_driver_fault() => {
                warn!("Ignoring driver fault while stopping swipe: {}", e);
            }
            Err(e) => warn!("Failed to stop swipe: {}", e),
        }

        if let Err(e) = connection.unregister_listen() {
            warn!("Failed to unregister listening: {}", e);
        }
        self.listening = false;
    }

    /// Stop listening and release the connection.
    ///
    /// Idempotent; a no-op without a connection. Driver faults are logged
    /// and swallowed.
    pub fn destroy(&mut self) {
        self.detected = false;
        self.listening = false;

        let Some(mut connection) = self.connection.take() else {
            return;
        };

        // Harmless when not listening.
        if let Err(e) = connection.unregister_listen() {
            warn!("Failed to unregister listening: {}", e);
        }

        // Stops the record thread. May fault whether or not it is running.
        match connection.release() {
            Ok(()) => {}
            Err(e) if e.is_driver_fault() => {
                warn!("Ignoring driver fault while releasing reader: {}", e);
            }
            Err(e) => warn!("Failed to release reader: {}", e),
        }

        info!(
            "Destroyed reader connection (generation {})",
            self.generation
        );
    }

    /// Record a successful handshake.
    pub fn mark_detected(&mut self) {
        self.detected = true;
    }

    /// Whether a handshake has succeeded on the live connection.
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Whether listening is registered on the live connection.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether a connection is open.
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Generation of the most recently created connection.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether events from `generation` belong to the live connection.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.connection.is_some() && generation == self.generation
    }

    fn connection_mut(&mut self) -> Result<&mut D::Connection> {
        self.connection
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected("no reader connection"))
    }
}

impl<D: ReaderDriver> Drop for ReaderSession<D> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            debug!("ReaderSession dropped with a live connection - destroying");
            self.destroy();
        }
    }
}
