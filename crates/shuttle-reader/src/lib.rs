//! Shuttle Reader
//!
//! Drives an audio-jack magnetic stripe reader through its handshake and
//! swipe protocol.
//!
//! The reader driver is entirely callback driven. This crate turns those
//! callbacks into a state machine with a single pending outcome: each
//! caller request ([`ShuttleReader::detect`], [`ShuttleReader::get_swipe`],
//! [`ShuttleReader::cancel_swipe`]) returns a [`Replies`] stream that the
//! event handler resolves at most once.
//!
//! # Components
//!
//! - [`ReaderSession`]: owns the driver connection; destroyed on every
//!   error path and before every new connection
//! - [`ReaderCore`]: session plus pending outcome; applies driver events
//! - [`ShuttleReader`]: caller-facing requests and the event pump task
//! - [`PendingOutcome`]: the single in-flight completion slot

pub mod config;
pub mod coordinator;
pub mod handler;
pub mod outcome;
pub mod session;

pub use config::ReaderConfig;
pub use coordinator::ShuttleReader;
pub use handler::ReaderCore;
pub use outcome::{PendingOutcome, Replies, Reply, ReplySender, reply_channel};
pub use session::ReaderSession;
