//! Headset jack plug monitoring.
//!
//! The operating system reports headset plug and unplug events on its own
//! notification context. The reader is only ever probed when something
//! with a microphone line is plugged in; without one it cannot be the
//! reader. The flag is a plain last-write-wins value with no debouncing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Headset plug notification from the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugEvent {
    /// Something is plugged into the jack.
    pub plugged: bool,

    /// The plugged device has a microphone line.
    pub has_microphone: bool,
}

impl PlugEvent {
    /// Device with a microphone line plugged in.
    pub fn plugged_with_microphone() -> Self {
        Self {
            plugged: true,
            has_microphone: true,
        }
    }

    /// Jack emptied.
    pub fn unplugged() -> Self {
        Self {
            plugged: false,
            has_microphone: false,
        }
    }
}

/// Shared headset-plugged flag.
///
/// Clones share the same flag. Only the plug notification source should
/// call [`on_plug_event`](Self::on_plug_event); the protocol core only reads.
#[derive(Debug, Clone, Default)]
pub struct HeadsetMonitor {
    plugged: Arc<AtomicBool>,
}

impl HeadsetMonitor {
    /// Create a monitor with nothing plugged in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a plug notification.
    pub fn on_plug_event(&self, event: PlugEvent) {
        let plugged = event.plugged && event.has_microphone;
        self.plugged.store(plugged, Ordering::SeqCst);
        debug!(
            "Headset plug event {:?}, headset plugged = {}",
            event, plugged
        );
    }

    /// Whether a device with a microphone line is plugged in.
    pub fn is_plugged(&self) -> bool {
        self.plugged.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_starts_unplugged() {
        assert!(!HeadsetMonitor::new().is_plugged());
    }

    #[rstest]
    #[case(true, true, true)]
    #[case(true, false, false)] // headphones without microphone
    #[case(false, true, false)]
    #[case(false, false, false)]
    fn test_plug_event(
        #[case] plugged: bool,
        #[case] has_microphone: bool,
        #[case] expected: bool,
    ) {
        let monitor = HeadsetMonitor::new();
        monitor.on_plug_event(PlugEvent::plugged_with_microphone());
        monitor.on_plug_event(PlugEvent {
            plugged,
            has_microphone,
        });
        assert_eq!(monitor.is_plugged(), expected);
    }

    #[test]
    fn test_clones_share_flag() {
        let monitor = HeadsetMonitor::new();
        let reader_side = monitor.clone();

        monitor.on_plug_event(PlugEvent::plugged_with_microphone());
        assert!(reader_side.is_plugged());

        monitor.on_plug_event(PlugEvent::unplugged());
        assert!(!reader_side.is_plugged());
    }

    #[test]
    fn test_visible_across_threads() {
        let monitor = HeadsetMonitor::new();
        let os_side = monitor.clone();

        std::thread::spawn(move || {
            os_side.on_plug_event(PlugEvent::plugged_with_microphone());
        })
        .join()
        .unwrap();

        assert!(monitor.is_plugged());
    }
}
