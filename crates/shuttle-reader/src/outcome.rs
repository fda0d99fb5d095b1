//! Caller-facing replies and the single pending outcome slot.
//!
//! Every external request gets its own reply channel. The sending half is
//! parked in the [`PendingOutcome`] slot until the event handler resolves
//! it; the caller holds the receiving half as [`Replies`].
//!
//! A request produces at most one terminal reply. `get-swipe` may first
//! produce a non-terminal [`Status::SwipeNow`] progress reply, which
//! leaves the slot occupied.
//!
//! ```text
//!  caller                       slot                      event handler
//!  ──────                       ────                      ─────────────
//!  detect() ──install(tx)──►  [ tx ]
//!                             [ tx ]  ◄──notify(SwipeNow)── to_swipe_card
//!  replies.next() ◄─────────  [    ]  ◄──resolve(reply)──── connected
//! ```

use serde_json::{Value, json};
use shuttle_core::{CardSwipe, ReaderError, Status};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Reply delivered to the caller of a reader action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status code. Terminal unless it is [`Status::SwipeNow`].
    Status(Status),

    /// Card data from a successful swipe. Terminal.
    Swipe(CardSwipe),

    /// Failure. Terminal.
    Error(ReaderError),
}

impl Reply {
    /// Whether this reply ends the request.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Reply::Status(Status::SwipeNow))
    }

    /// Whether this reply reports success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Reply::Error(_))
    }

    /// The error carried by this reply, if any.
    pub fn error(&self) -> Option<ReaderError> {
        match self {
            Reply::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// JSON value forwarded to the host bridge.
    ///
    /// Status and error codes become JSON strings; card data becomes a
    /// `{"card", "exp", "raw"}` object.
    pub fn to_json(&self) -> Value {
        match self {
            Reply::Status(status) => Value::String(status.code().to_string()),
            Reply::Error(error) => Value::String(error.code().to_string()),
            Reply::Swipe(swipe) => json!({
                "card": swipe.card(),
                "exp": swipe.exp(),
                "raw": swipe.raw(),
            }),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(status) => f.write_str(status.code()),
            Reply::Error(error) => f.write_str(error.code()),
            Reply::Swipe(swipe) => write!(f, "card {}", swipe.masked_card()),
        }
    }
}

/// Sending half of a request's reply channel.
pub type ReplySender = mpsc::UnboundedSender<Reply>;

/// Create a reply channel for one request.
pub fn reply_channel() -> (ReplySender, Replies) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Replies { rx })
}

/// Receiving half of a request's reply channel.
///
/// The stream ends (`None`) after the terminal reply has been read, or
/// without any reply if the request was dropped: an unrecognised or
/// no-op action, a request superseded before it resolved, or a reader
/// shut down while the request was pending.
#[derive(Debug)]
pub struct Replies {
    rx: mpsc::UnboundedReceiver<Reply>,
}

impl Replies {
    /// Receive the next reply, progress or terminal.
    pub async fn next(&mut self) -> Option<Reply> {
        self.rx.recv().await
    }

    /// Receive the terminal reply, skipping progress replies.
    pub async fn outcome(mut self) -> Option<Reply> {
        while let Some(reply) = self.rx.recv().await {
            if reply.is_terminal() {
                return Some(reply);
            }
        }
        None
    }

    /// Receive a reply that has already been delivered, without waiting.
    pub fn try_next(&mut self) -> Option<Reply> {
        self.rx.try_recv().ok()
    }
}

/// The single in-flight completion slot.
#[derive(Debug, Default)]
pub struct PendingOutcome {
    slot: Option<ReplySender>,
}

impl PendingOutcome {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a new request's reply sender.
    ///
    /// An unresolved previous request is dropped without a reply; its
    /// caller sees the stream end.
    pub fn install(&mut self, tx: ReplySender) {
        if self.slot.replace(tx).is_some() {
            warn!("Pending outcome replaced before it was resolved");
        }
    }

    /// Deliver a terminal reply and clear the slot.
    ///
    /// Returns `false` if the slot was empty. That indicates a protocol or
    /// timing anomaly; it is logged and otherwise ignored.
    pub fn resolve(&mut self, reply: Reply) -> bool {
        debug_assert!(reply.is_terminal(), "progress replies must use notify");

        match self.slot.take() {
            Some(tx) => {
                debug!("Resolving pending outcome with {}", reply);
                if tx.send(reply).is_err() {
                    debug!("Caller dropped its reply channel");
                }
                true
            }
            None => {
                warn!("{} not delivered - no pending outcome", reply);
                false
            }
        }
    }

    /// Deliver a non-terminal progress reply, keeping the slot occupied.
    pub fn notify(&self, status: Status) -> bool {
        match &self.slot {
            Some(tx) => {
                debug!("Notifying pending outcome with {}", status);
                if tx.send(Reply::Status(status)).is_err() {
                    debug!("Caller dropped its reply channel");
                }
                true
            }
            None => {
                warn!("{} not delivered - no pending outcome", status);
                false
            }
        }
    }

    /// Drop the parked sender without replying.
    ///
    /// Returns `true` if a request was pending.
    pub fn abandon(&mut self) -> bool {
        self.slot.take().is_some()
    }

    /// Whether a request is waiting for its terminal reply.
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe() -> CardSwipe {
        CardSwipe::new("4111111111111111", "1225", ";4111111111111111=2512?").unwrap()
    }

    #[test]
    fn test_resolve_once() {
        let (tx, mut replies) = reply_channel();
        let mut pending = PendingOutcome::new();
        pending.install(tx);
        assert!(pending.is_pending());

        assert!(pending.resolve(Reply::Status(Status::Detected)));
        assert!(!pending.is_pending());
        assert!(!pending.resolve(Reply::Error(ReaderError::NotDetected)));

        assert_eq!(replies.try_next(), Some(Reply::Status(Status::Detected)));
        assert_eq!(replies.try_next(), None);
    }

    #[test]
    fn test_resolve_empty_is_not_fatal() {
        let mut pending = PendingOutcome::new();
        assert!(!pending.resolve(Reply::Error(ReaderError::Timeout)));
        assert!(!pending.notify(Status::SwipeNow));
    }

    #[test]
    fn test_notify_keeps_slot() {
        let (tx, mut replies) = reply_channel();
        let mut pending = PendingOutcome::new();
        pending.install(tx);

        assert!(pending.notify(Status::SwipeNow));
        assert!(pending.is_pending());
        assert!(pending.resolve(Reply::Swipe(swipe())));

        assert_eq!(replies.try_next(), Some(Reply::Status(Status::SwipeNow)));
        assert_eq!(replies.try_next(), Some(Reply::Swipe(swipe())));
    }

    #[test]
    fn test_install_replaces_and_drops_old() {
        let (old_tx, mut old) = reply_channel();
        let (new_tx, mut new) = reply_channel();
        let mut pending = PendingOutcome::new();

        pending.install(old_tx);
        pending.install(new_tx);
        pending.resolve(Reply::Error(ReaderError::Cancel));

        assert_eq!(old.try_next(), None);
        assert_eq!(new.try_next(), Some(Reply::Error(ReaderError::Cancel)));
    }

    #[test]
    fn test_resolve_after_caller_dropped() {
        let (tx, replies) = reply_channel();
        drop(replies);

        let mut pending = PendingOutcome::new();
        pending.install(tx);
        assert!(pending.resolve(Reply::Status(Status::Detected)));
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_abandon() {
        let (tx, _replies) = reply_channel();
        let mut pending = PendingOutcome::new();
        pending.install(tx);

        assert!(pending.abandon());
        assert!(!pending.abandon());
    }

    #[tokio::test]
    async fn test_outcome_skips_progress() {
        let (tx, replies) = reply_channel();
        let mut pending = PendingOutcome::new();
        pending.install(tx);

        pending.notify(Status::SwipeNow);
        pending.resolve(Reply::Error(ReaderError::Timeout));

        assert_eq!(
            replies.outcome().await,
            Some(Reply::Error(ReaderError::Timeout))
        );
    }

    #[tokio::test]
    async fn test_outcome_ends_when_dropped() {
        let (tx, replies) = reply_channel();
        let mut pending = PendingOutcome::new();
        pending.install(tx);
        pending.abandon();

        assert_eq!(replies.outcome().await, None);
    }

    #[test]
    fn test_reply_json() {
        assert_eq!(
            Reply::Status(Status::Detected).to_json(),
            json!("RESULT_DETECTED")
        );
        assert_eq!(
            Reply::Error(ReaderError::NoTrack2).to_json(),
            json!("ERROR_NO_TRACK_2")
        );
        assert_eq!(
            Reply::Swipe(swipe()).to_json(),
            json!({
                "card": "4111111111111111",
                "exp": "1225",
                "raw": ";4111111111111111=2512?",
            })
        );
    }

    #[test]
    fn test_reply_classification() {
        assert!(!Reply::Status(Status::SwipeNow).is_terminal());
        assert!(Reply::Status(Status::Detected).is_terminal());
        assert!(Reply::Swipe(swipe()).is_success());
        assert!(!Reply::Error(ReaderError::Cancel).is_success());
        assert_eq!(
            Reply::Error(ReaderError::Cancel).error(),
            Some(ReaderError::Cancel)
        );
        assert_eq!(Reply::Swipe(swipe()).to_string(), "card ************1111");
    }
}
