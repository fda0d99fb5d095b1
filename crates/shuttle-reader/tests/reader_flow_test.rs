//! Integration tests for the reader protocol
//!
//! These tests drive a ShuttleReader through complete detect/swipe/cancel
//! cycles against the mock driver, playing the driver's callback context
//! through the mock handle.

use rstest::rstest;
use shuttle_core::{ReaderError, Status};
use shuttle_hardware::mock::{DriverCall, MockDriver, MockDriverHandle};
use shuttle_hardware::{HeadsetMonitor, PlugEvent};
use shuttle_protocol::{DriverCommand, ReaderEvent, UserGrant};
use shuttle_reader::{ReaderConfig, Replies, Reply, ShuttleReader};
use std::time::Duration;
use tokio::time::timeout;

const TRACK2: &[u8] = b";4111111111111111=25121010000000000000?";

fn plugged_reader() -> (ShuttleReader<MockDriver>, MockDriverHandle) {
    let (driver, handle) = MockDriver::new();
    let headset = HeadsetMonitor::new();
    headset.on_plug_event(PlugEvent::plugged_with_microphone());
    (ShuttleReader::new(driver, headset), handle)
}

async fn next(replies: &mut Replies) -> Option<Reply> {
    timeout(Duration::from_secs(1), replies.next())
        .await
        .expect("timed out waiting for reply")
}

async fn detected_reader() -> (ShuttleReader<MockDriver>, MockDriverHandle) {
    let (reader, handle) = plugged_reader();
    let mut replies = reader.detect();
    handle.connected().unwrap();
    assert_eq!(
        next(&mut replies).await,
        Some(Reply::Status(Status::Detected))
    );
    (reader, handle)
}

/// Test the full detect then swipe cycle
#[tokio::test]
async fn test_full_swipe_scenario() {
    let (reader, handle) = plugged_reader();

    let mut detect = reader.detect();
    handle.connected().unwrap();
    assert_eq!(
        next(&mut detect).await,
        Some(Reply::Status(Status::Detected))
    );
    assert_eq!(next(&mut detect).await, None);
    assert!(reader.is_detected());

    let mut swipe = reader.get_swipe();
    assert!(
        handle
            .calls()
            .contains(&DriverCall::SendCommand(DriverCommand::GetSerialNumber))
    );

    handle.serial_number_ack().unwrap();
    handle.swipe_armed().unwrap();
    assert_eq!(
        next(&mut swipe).await,
        Some(Reply::Status(Status::SwipeNow))
    );
    assert!(
        handle
            .calls()
            .ends_with(&[DriverCall::SetSwipeTimeout(60), DriverCall::StartSwipe])
    );

    handle.card_data(0, TRACK2).unwrap();
    match next(&mut swipe).await {
        Some(Reply::Swipe(card)) => {
            assert_eq!(card.card(), "4111111111111111");
            assert_eq!(card.exp(), "1225");
            assert_eq!(card.raw(), std::str::from_utf8(TRACK2).unwrap());
        }
        other => panic!("expected swipe, got {:?}", other),
    }
    assert_eq!(next(&mut swipe).await, None);

    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
}

/// Test that a failed handshake destroys the session
#[tokio::test]
async fn test_handshake_timeout() {
    let (reader, handle) = plugged_reader();

    let replies = reader.detect();
    handle.handshake_timeout().unwrap();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(!reader.has_connection());
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
}

/// Test detection with nothing plugged into the jack
#[tokio::test]
async fn test_detect_unplugged() {
    let (driver, handle) = MockDriver::new();
    let headset = HeadsetMonitor::new();
    headset.on_plug_event(PlugEvent {
        plugged: true,
        has_microphone: false,
    });
    let reader = ShuttleReader::new(driver, headset);

    let replies = reader.detect();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert_eq!(handle.open_count(), 0);
}

/// Test that detection follows plug events
#[tokio::test]
async fn test_detect_after_plug() {
    let (driver, handle) = MockDriver::new();
    let headset = HeadsetMonitor::new();
    let reader = ShuttleReader::new(driver, headset.clone());

    let replies = reader.detect();
    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );

    headset.on_plug_event(PlugEvent::plugged_with_microphone());
    assert!(reader.headset().is_plugged());

    let replies = reader.detect();
    handle.connected().unwrap();
    assert_eq!(
        replies.outcome().await,
        Some(Reply::Status(Status::Detected))
    );
    assert_eq!(handle.open_count(), 1);
}

/// Test that an already detected reader is not touched again
#[tokio::test]
async fn test_detect_when_already_detected() {
    let (reader, handle) = detected_reader().await;
    handle.clear_calls();

    let replies = reader.detect();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Status(Status::Detected))
    );
    assert!(handle.calls().is_empty());
}

/// Test swipe requests before detection
#[tokio::test]
async fn test_swipe_before_detection() {
    let (reader, handle) = plugged_reader();

    let replies = reader.get_swipe();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(handle.calls().is_empty());
}

/// Test that a flagged capture is always a timeout
#[tokio::test]
async fn test_swipe_timeout() {
    let (reader, handle) = detected_reader().await;

    let replies = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle.swipe_armed().unwrap();
    handle.card_data(0x01, TRACK2).unwrap();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::Timeout))
    );
    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
}

/// Test the reply for each kind of capture
#[rstest]
#[case(0x00, TRACK2, None)]
#[case(0x00, b";4111=2512?", Some(ReaderError::NoTrack2))]
#[case(0x00, b"", Some(ReaderError::NoTrack2))]
#[case(0x01, TRACK2, Some(ReaderError::Timeout))]
#[case(0x80, b"", Some(ReaderError::Timeout))]
#[case(0xff, &[0xff, 0xfe, 0x00], Some(ReaderError::Timeout))]
#[tokio::test]
async fn test_capture_outcome(
    #[case] flags: u8,
    #[case] data: &[u8],
    #[case] expected: Option<ReaderError>,
) {
    let (reader, handle) = detected_reader().await;

    let replies = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle.card_data(flags, data).unwrap();

    let reply = replies.outcome().await.unwrap();
    assert_eq!(reply.error(), expected);
    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
}

/// Test that the reader is dropped when the serial number query cannot be sent
#[tokio::test]
async fn test_serial_query_failure() {
    let (reader, handle) = detected_reader().await;
    handle.set_fail_send_command(true);

    let replies = reader.get_swipe();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
}

/// Test that the reader is dropped when arming the swipe fails
#[rstest]
#[case::set_timeout(true, false)]
#[case::start(false, true)]
#[tokio::test]
async fn test_arm_failure(#[case] fail_timeout: bool, #[case] fail_start: bool) {
    let (reader, handle) = detected_reader().await;
    handle.set_fail_set_swipe_timeout(fail_timeout);
    handle.set_fail_start_swipe(fail_start);

    let replies = reader.get_swipe();
    handle.serial_number_ack().unwrap();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
    assert_eq!(
        handle.call_count(&DriverCall::StartSwipe),
        usize::from(fail_start)
    );
}

/// Test detection when the driver rejects the connection profile
#[tokio::test]
async fn test_detect_profile_rejected() {
    let (reader, handle) = plugged_reader();
    handle.set_fail_connect(true);

    let replies = reader.detect();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(!reader.has_connection());
    assert_eq!(handle.call_count(&DriverCall::RegisterListen), 0);
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
}

/// Test a clean capture with only track 1 data
#[tokio::test]
async fn test_swipe_without_track2() {
    let (reader, handle) = detected_reader().await;

    let replies = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle
        .card_data(0, b"%B4111111111111111^DOE/JOHN^2512101000?")
        .unwrap();

    assert_eq!(
        replies.outcome().await,
        Some(Reply::Error(ReaderError::NoTrack2))
    );
    assert!(!reader.has_connection());
}

/// Test the cancel ordering and the disconnect that follows
#[tokio::test]
async fn test_cancel_pending_swipe() {
    let (reader, handle) = detected_reader().await;

    let mut swipe = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle.swipe_armed().unwrap();
    assert_eq!(
        next(&mut swipe).await,
        Some(Reply::Status(Status::SwipeNow))
    );
    handle.clear_calls();

    let mut cancel = reader.cancel_swipe();

    assert_eq!(
        next(&mut swipe).await,
        Some(Reply::Error(ReaderError::Cancel))
    );
    assert_eq!(next(&mut swipe).await, None);
    assert_eq!(cancel.try_next(), None);
    assert!(reader.is_pending());
    assert!(reader.has_connection());
    assert_eq!(
        handle.calls(),
        vec![DriverCall::StopSwipe, DriverCall::UnregisterListen]
    );

    handle.disconnected().unwrap();

    assert_eq!(
        next(&mut cancel).await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert!(!reader.is_detected());
    assert!(!reader.has_connection());
}

/// Test that a driver fault while aborting the swipe is swallowed
#[tokio::test]
async fn test_cancel_tolerates_driver_fault() {
    let (reader, handle) = detected_reader().await;
    handle.set_fault_on_stop_swipe(true);
    handle.set_fault_on_release(true);

    let swipe = reader.get_swipe();
    let cancel = reader.cancel_swipe();

    assert_eq!(
        swipe.outcome().await,
        Some(Reply::Error(ReaderError::Cancel))
    );
    assert_eq!(handle.call_count(&DriverCall::UnregisterListen), 1);

    handle.disconnected().unwrap();
    assert_eq!(
        cancel.outcome().await,
        Some(Reply::Error(ReaderError::NotDetected))
    );
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
}

/// Test cancel with no reader detected
#[tokio::test]
async fn test_cancel_without_detection() {
    let (reader, handle) = plugged_reader();

    let replies = reader.cancel_swipe();

    assert_eq!(replies.outcome().await, None);
    assert!(handle.calls().is_empty());
    assert!(!reader.is_pending());
}

/// Test that late events from a released connection are ignored
#[tokio::test]
async fn test_stale_events_ignored() {
    let (reader, handle) = detected_reader().await;

    let replies = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle.card_data(0, TRACK2).unwrap();
    assert!(matches!(replies.outcome().await, Some(Reply::Swipe(_))));

    let mut detect = reader.detect();
    assert_eq!(handle.open_count(), 2);

    // The first connection answers its unregistration late.
    handle.emit_from(0, ReaderEvent::Disconnected).unwrap();
    handle.connected().unwrap();

    assert_eq!(
        next(&mut detect).await,
        Some(Reply::Status(Status::Detected))
    );
    assert!(reader.is_detected());
}

/// Test that a new detection replaces a handshake still in flight
#[tokio::test]
async fn test_detect_restarts_handshake() {
    let (reader, handle) = plugged_reader();

    let mut first = reader.detect();
    let second = reader.detect();

    assert_eq!(handle.open_count(), 2);
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
    assert_eq!(next(&mut first).await, None);

    handle.emit_from(0, ReaderEvent::Connected).unwrap();
    handle.connected().unwrap();

    assert_eq!(
        second.outcome().await,
        Some(Reply::Status(Status::Detected))
    );
}

/// Test dispatch by the action names the host bridge sends
#[tokio::test]
async fn test_execute_by_name() {
    let (reader, handle) = plugged_reader();

    assert!(reader.execute("ACTION_FOO").is_none());
    assert!(reader.execute("").is_none());

    let replies = reader.execute("ACTION_DETECT_READER").unwrap();
    handle.connected().unwrap();
    let reply = replies.outcome().await.unwrap();
    assert_eq!(reply.to_json(), serde_json::json!("RESULT_DETECTED"));

    let mut replies = reader.execute("ACTION_GET_SWIPE").unwrap();
    handle.serial_number_ack().unwrap();
    handle.swipe_armed().unwrap();
    let progress = next(&mut replies).await.unwrap();
    assert_eq!(progress.to_json(), serde_json::json!("RESULT_SWIPE_NOW"));

    let cancelled = replies;
    let cancel = reader.execute("ACTION_CANCEL_SWIPE").unwrap();
    assert_eq!(
        cancelled.outcome().await.unwrap().to_json(),
        serde_json::json!("ERROR_CANCEL")
    );

    handle.disconnected().unwrap();
    assert_eq!(
        cancel.outcome().await.unwrap().to_json(),
        serde_json::json!("ERROR_NOT_DETECTED")
    );
}

/// Test that the driver's permission prompts follow the grant policy
#[tokio::test]
async fn test_user_grant_policy() {
    let (reader, handle) = plugged_reader();
    let _replies = reader.detect();

    assert!(!handle.user_grant(UserGrant::UpdateXml).unwrap());
    assert!(!handle.user_grant(UserGrant::ReportToVendor).unwrap());
    assert!(handle.user_grant(UserGrant::PowerUpReader).unwrap());
    assert!(handle.user_grant(UserGrant::OverwriteXml).unwrap());
}

/// Test a custom swipe timeout reaches the driver
#[tokio::test]
async fn test_custom_swipe_timeout() {
    let (driver, handle) = MockDriver::new();
    let headset = HeadsetMonitor::new();
    headset.on_plug_event(PlugEvent::plugged_with_microphone());
    let config = ReaderConfig {
        swipe_timeout_secs: 20,
        ..Default::default()
    };
    let reader = ShuttleReader::with_config(driver, headset, config).unwrap();

    let replies = reader.detect();
    handle.connected().unwrap();
    replies.outcome().await.unwrap();

    let mut swipe = reader.get_swipe();
    handle.serial_number_ack().unwrap();
    handle.swipe_armed().unwrap();
    next(&mut swipe).await.unwrap();

    assert_eq!(handle.call_count(&DriverCall::SetSwipeTimeout(20)), 1);
}

/// Test shutdown with a request still pending
#[tokio::test]
async fn test_shutdown_drops_pending() {
    let (reader, handle) = detected_reader().await;

    let replies = reader.get_swipe();
    reader.shutdown().await;

    assert_eq!(replies.outcome().await, None);
    assert_eq!(handle.call_count(&DriverCall::Release), 1);
    assert!(handle.connected().is_err());
}
