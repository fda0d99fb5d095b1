//! Protocol event handling.
//!
//! [`ReaderCore`] is the state shared between caller requests and the
//! driver's callback context: the session and the pending outcome. Every
//! driver event is applied to it here; the request side lives in
//! `coordinator`.

use crate::{
    config::ReaderConfig,
    outcome::{PendingOutcome, Reply},
    session::ReaderSession,
};
use shuttle_core::{ReaderError, Status, constants::CARD_DATA_OK};
use shuttle_hardware::{ReaderDriver, SessionEvent};
use shuttle_protocol::{ReaderEvent, TrackParser};
use tracing::{debug, error, info, warn};

/// Session plus pending outcome, always accessed under one lock.
pub struct ReaderCore<D: ReaderDriver> {
    pub(crate) session: ReaderSession<D>,
    pub(crate) pending: PendingOutcome,
    pub(crate) config: ReaderConfig,
}

impl<D: ReaderDriver> ReaderCore<D> {
    /// Create a core with no connection and nothing pending.
    pub fn new(session: ReaderSession<D>, config: ReaderConfig) -> Self {
        Self {
            session,
            pending: PendingOutcome::new(),
            config,
        }
    }

    /// The reader session.
    pub fn session(&self) -> &ReaderSession<D> {
        &self.session
    }

    /// Whether a request is waiting for its terminal reply.
    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Apply one driver event.
    ///
    /// Events stamped with a generation other than the live connection's
    /// are dropped.
    pub fn handle(&mut self, event: SessionEvent) {
        let SessionEvent { generation, event } = event;

        if !self.session.is_current(generation) {
            debug!(
                "{}: dropping {} from stale connection (generation {}, current {})",
                self.config.name,
                event.name(),
                generation,
                self.session.generation()
            );
            return;
        }

        debug!("{}: reader event {}", self.config.name, event.name());

        match event {
            ReaderEvent::ToConnect => {}
            ReaderEvent::Connected => self.on_connected(),
            ReaderEvent::Disconnected => {
                info!("{}: reader disconnected", self.config.name);
                self.fail(ReaderError::NotDetected);
            }
            ReaderEvent::Timeout { message } => {
                info!("{}: handshake timed out: {}", self.config.name, message);
                self.fail(ReaderError::NotDetected);
            }
            ReaderEvent::CardData { flags, data } => self.on_card_data(flags, &data),
            ReaderEvent::ToSwipeCard => {
                self.pending.notify(Status::SwipeNow);
            }
            event @ ReaderEvent::CommandResult { .. } => self.on_command_result(&event),
            other => debug!("{}: ignoring event {}", self.config.name, other.name()),
        }
    }

    /// Resolve the pending outcome with a terminal status. Keeps the session.
    pub(crate) fn succeed(&mut self, status: Status) {
        self.pending.resolve(Reply::Status(status));
    }

    /// Resolve the pending outcome with an error and destroy the session.
    pub(crate) fn fail(&mut self, error: ReaderError) {
        self.pending.resolve(Reply::Error(error));
        self.session.destroy();
    }

    /// Drop the pending outcome and destroy the session.
    pub(crate) fn teardown(&mut self) {
        if self.pending.abandon() {
            debug!("{}: dropping pending outcome", self.config.name);
        }
        self.session.destroy();
    }

    fn on_connected(&mut self) {
        info!("{}: reader detected", self.config.name);
        self.session.mark_detected();
        self.succeed(Status::Detected);
    }

    fn on_command_result(&mut self, event: &ReaderEvent) {
        if !event.is_serial_ack() {
            if let ReaderEvent::CommandResult { command, response } = event {
                warn!(
                    "{}: unexpected command result for {} ({} bytes)",
                    self.config.name,
                    command,
                    response.len()
                );
            }
            return;
        }

        debug!("{}: serial number acknowledged", self.config.name);
        if let Err(e) = self.session.arm_swipe(self.config.swipe_timeout_secs) {
            warn!("{}: failed to arm swipe: {}", self.config.name, e);
            self.fail(ReaderError::NotDetected);
        }
    }

    fn on_card_data(&mut self, flags: u8, data: &[u8]) {
        if flags != CARD_DATA_OK {
            // A timed out swipe arrives as garbage data with a status flag set.
            debug!(
                "{}: swipe status {:#04x}, treating as timeout",
                self.config.name, flags
            );
            self.fail(ReaderError::Timeout);
            return;
        }

        let raw = String::from_utf8_lossy(data).into_owned();
        debug!(
            "{}: swipe captured ({} bytes)",
            self.config.name,
            data.len()
        );

        let Some(track) = TrackParser::parse_str(&raw) else {
            info!("{}: no track 2 in swipe", self.config.name);
            self.fail(ReaderError::NoTrack2);
            return;
        };

        match track.into_swipe(raw) {
            Ok(swipe) => {
                info!("{}: read card {}", self.config.name, swipe.masked_card());
                self.pending.resolve(Reply::Swipe(swipe));
                self.session.destroy();
            }
            Err(e) => {
                error!("{}: failed to encode swipe: {}", self.config.name, e);
                self.fail(ReaderError::Unknown);
            }
        }
    }
}
