//! Mock reader driver implementation for testing and development.
//!
//! This module provides a simulated reader driver that records every call
//! made to it and lets a test play the driver's callback context by
//! injecting events.

use crate::{
    HardwareError, Result,
    sink::EventSink,
    traits::{ReaderConnection, ReaderDriver},
};
use parking_lot::Mutex;
use shuttle_core::constants::ACK;
use shuttle_protocol::{ConnectionProfile, DriverCommand, ReaderEvent, UserGrant};
use std::sync::Arc;

/// A call made to the mock driver or one of its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Open,
    ConnectWithProfile,
    RegisterListen,
    UnregisterListen,
    SendCommand(DriverCommand),
    SetSwipeTimeout(u16),
    StartSwipe,
    StopSwipe,
    Release,
}

#[derive(Debug, Default)]
struct MockState {
    /// Every call in order.
    calls: Vec<DriverCall>,

    /// Sinks of every opened connection, oldest first.
    sinks: Vec<EventSink>,

    /// Last profile applied.
    profile: Option<ConnectionProfile>,

    fail_open: bool,
    fail_connect: bool,
    fail_send_command: bool,
    fail_set_swipe_timeout: bool,
    fail_start_swipe: bool,
    fault_on_stop_swipe: bool,
    fault_on_release: bool,
}

/// Mock reader driver for testing and development.
///
/// # Examples
///
/// ```
/// use shuttle_hardware::mock::{DriverCall, MockDriver};
/// use shuttle_hardware::{EventSink, ReaderConnection, ReaderDriver, event_channel};
/// use shuttle_protocol::ReaderEvent;
///
/// let (driver, handle) = MockDriver::new();
/// let (tx, mut rx) = event_channel();
///
/// let mut connection = driver.open(EventSink::new(1, tx)).unwrap();
/// connection.register_listen().unwrap();
///
/// handle.connected().unwrap();
/// assert_eq!(rx.try_recv().unwrap().event, ReaderEvent::Connected);
/// assert_eq!(handle.calls(), vec![DriverCall::Open, DriverCall::RegisterListen]);
/// ```
#[derive(Debug)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create a new mock driver.
    ///
    /// Returns a tuple of (MockDriver, MockDriverHandle) where the handle
    /// inspects calls and injects driver events.
    pub fn new() -> (Self, MockDriverHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        let driver = Self {
            state: Arc::clone(&state),
        };
        let handle = MockDriverHandle { state };

        (driver, handle)
    }
}

impl ReaderDriver for MockDriver {
    type Connection = MockConnection;

    fn open(&self, sink: EventSink) -> Result<MockConnection> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Open);

        if state.fail_open {
            return Err(HardwareError::initialization_failed(
                "mock driver configured to fail open",
            ));
        }

        state.sinks.push(sink);

        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }
}

/// Connection produced by [`MockDriver`].
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn record(&self, call: DriverCall) {
        self.state.lock().calls.push(call);
    }
}

impl ReaderConnection for MockConnection {
    fn connect_with_profile(&mut self, profile: &ConnectionProfile) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::ConnectWithProfile);
        if state.fail_connect {
            return Err(HardwareError::configuration(
                "mock driver rejected the connection profile",
            ));
        }
        state.profile = Some(*profile);
        Ok(())
    }

    fn register_listen(&mut self) -> Result<()> {
        self.record(DriverCall::RegisterListen);
        Ok(())
    }

    fn unregister_listen(&mut self) -> Result<()> {
        self.record(DriverCall::UnregisterListen);
        Ok(())
    }

    fn send_command(&mut self, command: DriverCommand) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::SendCommand(command));
        if state.fail_send_command {
            return Err(HardwareError::communication(format!(
                "mock driver failed to send {command}"
            )));
        }
        Ok(())
    }

    fn set_swipe_timeout(&mut self, seconds: u16) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::SetSwipeTimeout(seconds));
        if state.fail_set_swipe_timeout {
            return Err(HardwareError::communication(
                "mock driver failed to set swipe timeout",
            ));
        }
        Ok(())
    }

    fn start_swipe(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::StartSwipe);
        if state.fail_start_swipe {
            return Err(HardwareError::communication(
                "mock driver failed to start swipe",
            ));
        }
        Ok(())
    }

    fn stop_swipe(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::StopSwipe);
        if state.fault_on_stop_swipe {
            return Err(HardwareError::driver_fault("stop_swipe"));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Release);
        if state.fault_on_release {
            return Err(HardwareError::driver_fault("release"));
        }
        Ok(())
    }
}

/// Handle for controlling a mock reader driver.
///
/// Clones share the same driver state.
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDriverHandle {
    /// Emit an event from the most recently opened connection.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection was ever opened, or if the
    /// receiving side has been dropped.
    pub fn emit(&self, event: ReaderEvent) -> Result<()> {
        let sink = self
            .state
            .lock()
            .sinks
            .last()
            .cloned()
            .ok_or_else(|| HardwareError::disconnected("no reader connection opened"))?;

        Self::deliver(&sink, event)
    }

    /// Emit an event from the `index`-th opened connection (0-based).
    ///
    /// Used to simulate late callbacks from a connection that has since
    /// been released.
    ///
    /// # Errors
    ///
    /// Returns an error if no such connection exists or the receiving side
    /// has been dropped.
    pub fn emit_from(&self, index: usize, event: ReaderEvent) -> Result<()> {
        let sink = self
            .state
            .lock()
            .sinks
            .get(index)
            .cloned()
            .ok_or_else(|| HardwareError::disconnected(format!("no connection #{index}")))?;

        Self::deliver(&sink, event)
    }

    fn deliver(sink: &EventSink, event: ReaderEvent) -> Result<()> {
        if sink.emit(event) {
            Ok(())
        } else {
            Err(HardwareError::disconnected("event pump closed"))
        }
    }

    /// Simulate a successful handshake.
    pub fn connected(&self) -> Result<()> {
        self.emit(ReaderEvent::Connected)
    }

    /// Simulate the reader going away.
    pub fn disconnected(&self) -> Result<()> {
        self.emit(ReaderEvent::Disconnected)
    }

    /// Simulate a failed handshake.
    pub fn handshake_timeout(&self) -> Result<()> {
        self.emit(ReaderEvent::Timeout {
            message: "handshake timed out".to_string(),
        })
    }

    /// Simulate an acknowledged serial number response.
    pub fn serial_number_ack(&self) -> Result<()> {
        self.emit(ReaderEvent::CommandResult {
            command: DriverCommand::GetSerialNumber,
            response: vec![ACK, b'S', b'N', b'0', b'0', b'1'],
        })
    }

    /// Simulate the reader being armed for a swipe.
    pub fn swipe_armed(&self) -> Result<()> {
        self.emit(ReaderEvent::ToSwipeCard)
    }

    /// Simulate a captured swipe.
    pub fn card_data(&self, flags: u8, data: &[u8]) -> Result<()> {
        self.emit(ReaderEvent::CardData {
            flags,
            data: data.to_vec(),
        })
    }

    /// Ask the most recent connection's sink to answer a permission prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection was ever opened.
    pub fn user_grant(&self, grant: UserGrant) -> Result<bool> {
        let state = self.state.lock();
        let sink = state
            .sinks
            .last()
            .ok_or_else(|| HardwareError::disconnected("no reader connection opened"))?;
        Ok(sink.user_grant(grant))
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of times `call` was made.
    pub fn call_count(&self, call: &DriverCall) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Number of connections opened so far.
    pub fn open_count(&self) -> usize {
        self.call_count(&DriverCall::Open)
    }

    /// Last profile applied to any connection.
    pub fn last_profile(&self) -> Option<ConnectionProfile> {
        self.state.lock().profile
    }

    /// Make subsequent `open` calls fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make `connect_with_profile` reject the profile.
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Make `send_command` fail.
    pub fn set_fail_send_command(&self, fail: bool) {
        self.state.lock().fail_send_command = fail;
    }

    /// Make `set_swipe_timeout` fail.
    pub fn set_fail_set_swipe_timeout(&self, fail: bool) {
        self.state.lock().fail_set_swipe_timeout = fail;
    }

    /// Make `start_swipe` fail.
    pub fn set_fail_start_swipe(&self, fail: bool) {
        self.state.lock().fail_start_swipe = fail;
    }

    /// Make `stop_swipe` raise the driver fault.
    pub fn set_fault_on_stop_swipe(&self, fault: bool) {
        self.state.lock().fault_on_stop_swipe = fault;
    }

    /// Make `release` raise the driver fault.
    pub fn set_fault_on_release(&self, fault: bool) {
        self.state.lock().fault_on_release = fault;
    }
}
