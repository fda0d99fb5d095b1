//! Request coordination.
//!
//! [`ShuttleReader`] is the caller-facing entry point. Requests return
//! immediately with a [`Replies`] stream; results arrive once the driver
//! reports back through the event pump.
//!
//! # Architecture
//!
//! ```text
//!  caller ──detect/get_swipe/cancel──► ┌──────────────────────────┐
//!                                      │ Mutex<ReaderCore>        │
//!  driver ──SessionEvent──► pump task ─►│  ReaderSession           │
//!                                      │  PendingOutcome ──Reply──┼──► Replies
//!                                      └──────────────────────────┘
//! ```

use crate::{
    config::ReaderConfig,
    handler::ReaderCore,
    outcome::{Replies, Reply, ReplySender, reply_channel},
    session::ReaderSession,
};
use parking_lot::Mutex;
use shuttle_core::{Action, ReaderError, Result, Status};
use shuttle_hardware::{HeadsetMonitor, ReaderDriver, SessionEvent, event_channel};
use shuttle_protocol::ConnectionProfile;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

impl<D: ReaderDriver> ReaderCore<D> {
    /// Detect the reader.
    ///
    /// Resolves immediately when already detected, or when nothing with a
    /// microphone line is plugged in. Otherwise opens a fresh connection
    /// and waits for the handshake result.
    pub fn detect(&mut self, tx: ReplySender, plugged: bool) {
        self.pending.install(tx);

        if self.session.is_detected() {
            debug!("{}: already detected", self.config.name);
            self.succeed(Status::Detected);
        } else if plugged {
            if let Err(e) = self.connect() {
                warn!("{}: failed to connect reader: {}", self.config.name, e);
                self.fail(ReaderError::NotDetected);
            }
        } else {
            debug!("{}: no headset plugged", self.config.name);
            self.fail(ReaderError::NotDetected);
        }
    }

    /// Start a swipe.
    ///
    /// Sends the serial number probe; the acknowledgement arms the swipe.
    pub fn get_swipe(&mut self, tx: ReplySender) {
        self.pending.install(tx);

        if !self.session.is_detected() {
            debug!("{}: swipe requested before detection", self.config.name);
            self.fail(ReaderError::NotDetected);
            return;
        }

        if let Err(e) = self.session.send_probe() {
            warn!("{}: failed to probe reader: {}", self.config.name, e);
            self.fail(ReaderError::NotDetected);
        }
    }

    /// Cancel the swipe in progress.
    ///
    /// The request being cancelled gets `Cancel` right away and the
    /// session is kept. `tx` is resolved by the disconnected event that
    /// follows. Returns `false`, dropping `tx`, when no reader is detected.
    pub fn cancel_swipe(&mut self, tx: ReplySender) -> bool {
        if !self.session.is_detected() {
            debug!("{}: cancel ignored, no reader detected", self.config.name);
            return false;
        }

        // Order matters: resolve old, install new, then cancel.
        self.pending.resolve(Reply::Error(ReaderError::Cancel));
        self.pending.install(tx);
        self.session.cancel_swipe();

        info!("{}: swipe cancelled", self.config.name);
        true
    }

    fn connect(&mut self) -> shuttle_hardware::Result<()> {
        self.session.create()?;
        self.session
            .configure_and_connect(ConnectionProfile::shuttle())?;
        self.session.start_listening()
    }
}

/// Caller-facing reader.
///
/// Must be created inside a tokio runtime: the event pump runs as a
/// spawned task. Dropping the reader stops the pump.
///
/// # Examples
///
/// ```
/// use shuttle_core::Status;
/// use shuttle_hardware::{HeadsetMonitor, PlugEvent, mock::MockDriver};
/// use shuttle_reader::{Reply, ShuttleReader};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (driver, handle) = MockDriver::new();
/// let headset = HeadsetMonitor::new();
/// headset.on_plug_event(PlugEvent::plugged_with_microphone());
///
/// let reader = ShuttleReader::new(driver, headset);
/// let replies = reader.detect();
/// handle.connected().unwrap();
///
/// assert_eq!(replies.outcome().await, Some(Reply::Status(Status::Detected)));
/// assert!(reader.is_detected());
/// # }
/// ```
pub struct ShuttleReader<D: ReaderDriver> {
    core: Arc<Mutex<ReaderCore<D>>>,
    headset: HeadsetMonitor,
    pump: JoinHandle<()>,
}

impl<D: ReaderDriver> ShuttleReader<D> {
    /// Create a reader with the default configuration.
    pub fn new(driver: D, headset: HeadsetMonitor) -> Self {
        Self::build(driver, headset, ReaderConfig::default())
    }

    /// Create a reader with a custom configuration.
    ///
    /// # Errors
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_config(driver: D, headset: HeadsetMonitor, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(driver, headset, config))
    }

    fn build(driver: D, headset: HeadsetMonitor, config: ReaderConfig) -> Self {
        let (tx, rx) = event_channel();
        let session = ReaderSession::new(driver, tx);
        let core = Arc::new(Mutex::new(ReaderCore::new(session, config)));

        let pump = tokio::spawn(run_event_pump(Arc::clone(&core), rx));

        Self {
            core,
            headset,
            pump,
        }
    }

    /// Detect the reader.
    pub fn detect(&self) -> Replies {
        let (tx, replies) = reply_channel();
        let plugged = self.headset.is_plugged();
        self.core.lock().detect(tx, plugged);
        replies
    }

    /// Read a card. Yields `SwipeNow` once the reader is armed, then the
    /// terminal reply.
    pub fn get_swipe(&self) -> Replies {
        let (tx, replies) = reply_channel();
        self.core.lock().get_swipe(tx);
        replies
    }

    /// Cancel the swipe in progress.
    ///
    /// Without a detected reader nothing happens and the returned stream
    /// ends without a reply.
    pub fn cancel_swipe(&self) -> Replies {
        let (tx, replies) = reply_channel();
        self.core.lock().cancel_swipe(tx);
        replies
    }

    /// Run an action.
    pub fn dispatch(&self, action: Action) -> Replies {
        debug!("Dispatching {}", action);
        match action {
            Action::DetectReader => self.detect(),
            Action::GetSwipe => self.get_swipe(),
            Action::CancelSwipe => self.cancel_swipe(),
        }
    }

    /// Run an action by name as the host bridge sends it.
    ///
    /// Returns `None` if the name is not a known action.
    pub fn execute(&self, action: &str) -> Option<Replies> {
        match action.parse::<Action>() {
            Ok(action) => Some(self.dispatch(action)),
            Err(e) => {
                debug!("Not handled: {}", e);
                None
            }
        }
    }

    /// Whether a handshake has succeeded on the live connection.
    pub fn is_detected(&self) -> bool {
        self.core.lock().session().is_detected()
    }

    /// Whether a request is waiting for its terminal reply.
    pub fn is_pending(&self) -> bool {
        self.core.lock().is_pending()
    }

    /// Whether a reader connection is open.
    pub fn has_connection(&self) -> bool {
        self.core.lock().session().has_connection()
    }

    /// Headset monitor the reader consults before detection.
    pub fn headset(&self) -> &HeadsetMonitor {
        &self.headset
    }

    /// Destroy the session and stop the event pump.
    ///
    /// A pending request is dropped without a reply.
    pub async fn shutdown(mut self) {
        self.core.lock().teardown();
        self.pump.abort();
        let _ = (&mut self.pump).await;
        info!("Reader shut down");
    }
}

impl<D: ReaderDriver> Drop for ShuttleReader<D> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn run_event_pump<D: ReaderDriver>(
    core: Arc<Mutex<ReaderCore<D>>>,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) {
    while let Some(event) = rx.recv().await {
        core.lock().handle(event);
    }
    debug!("Event pump stopped");
}
