//! Event sink handed to the reader driver.
//!
//! The driver runs its callbacks on its own context. Each callback is
//! forwarded into an unbounded channel so the driver never waits on the
//! protocol core, and every event is stamped with the generation of the
//! connection that produced it. The core drops events whose generation no
//! longer matches its live connection.
//!
//! ```text
//! ┌───────────────┐  emit()   ┌──────────────┐  recv()  ┌──────────────┐
//! │ Driver        │──────────►│ SessionEvent │─────────►│ Event pump   │
//! │ callbacks     │           │ channel      │          │ (core)       │
//! └───────────────┘           └──────────────┘          └──────────────┘
//! ```

use shuttle_protocol::{ReaderEvent, UserGrant};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Connection generation number. Increases with every opened connection.
pub type Generation = u64;

/// A driver event tagged with the connection that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Generation of the emitting connection.
    pub generation: Generation,

    /// The event itself.
    pub event: ReaderEvent,
}

/// Create the channel that carries driver events to the protocol core.
pub fn event_channel() -> (
    mpsc::UnboundedSender<SessionEvent>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    mpsc::unbounded_channel()
}

/// Callback target bound to one reader connection.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    /// Bind a sink for the connection with the given generation.
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the connection this sink belongs to.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Forward a driver event. Never blocks.
    ///
    /// Returns `false` if the protocol core is gone.
    pub fn emit(&self, event: ReaderEvent) -> bool {
        trace!(
            "Driver event {} (generation {})",
            event.name(),
            self.generation
        );

        let delivered = self
            .tx
            .send(SessionEvent {
                generation: self.generation,
                event,
            })
            .is_ok();

        if !delivered {
            debug!("Event pump closed, dropping driver event");
        }
        delivered
    }

    /// Answer a driver permission prompt synchronously.
    pub fn user_grant(&self, grant: UserGrant) -> bool {
        let permitted = grant.is_permitted();
        debug!("User grant {:?} -> {}", grant, permitted);
        permitted
    }
}
