//! Reader driver abstraction layer for the Shuttle audio-jack card reader.
//!
//! This crate defines the interface between the reader protocol core and
//! the vendor driver that talks to the reader over the headset jack, plus
//! the collaborators that live next to it: the event sink the driver
//! reports through, and the headset plug monitor.
//!
//! # Design Philosophy
//!
//! - **Fire-and-forget**: Every driver operation only *starts* something.
//!   Results arrive later as [`ReaderEvent`]s on the driver's own callback
//!   context, so the traits are synchronous and never block.
//! - **Disposable connections**: A [`ReaderConnection`] is opened per
//!   detection attempt and released on every exit path. The driver can
//!   wedge after a failed handshake, and a fresh connection is the only
//!   reliable recovery.
//! - **Error-aware**: All operations return [`Result<T>`][error::Result].
//!   The driver is known to raise spurious faults on already-idle
//!   operations; these surface as [`HardwareError::DriverFault`] so the
//!   caller can decide to swallow them.
//!
//! # Driver Traits
//!
//! ```no_run
//! use shuttle_hardware::{EventSink, ReaderConnection, ReaderDriver, Result};
//! use shuttle_protocol::{ConnectionProfile, DriverCommand};
//!
//! fn probe<D: ReaderDriver>(driver: &D, sink: EventSink) -> Result<D::Connection> {
//!     let mut connection = driver.open(sink)?;
//!     connection.connect_with_profile(ConnectionProfile::shuttle())?;
//!     connection.register_listen()?;
//!     Ok(connection)
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`mock::MockDriver`] records every call and lets tests inject driver
//! events, so the protocol core can be exercised without a reader.
//!
//! [`ReaderEvent`]: shuttle_protocol::ReaderEvent

pub mod error;
pub mod headset;
pub mod mock;
pub mod sink;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use headset::{HeadsetMonitor, PlugEvent};
pub use sink::{EventSink, Generation, SessionEvent, event_channel};
pub use traits::{ReaderConnection, ReaderDriver};
