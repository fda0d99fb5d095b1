//! Core constants for the Shuttle reader protocol.
//!
//! This module collects the action names, result codes, and protocol
//! values shared by every crate in the workspace. The string codes are
//! the exact identifiers exchanged with the host bridge, so they must not
//! be changed.
//!
//! # Action Names
//!
//! | Constant | Value |
//! |----------|-------|
//! | `ACTION_DETECT_READER` | `ACTION_DETECT_READER` |
//! | `ACTION_GET_SWIPE` | `ACTION_GET_SWIPE` |
//! | `ACTION_CANCEL_SWIPE` | `ACTION_CANCEL_SWIPE` |
//!
//! # Usage
//!
//! ```
//! use shuttle_core::constants::*;
//!
//! assert_eq!(ACK, 0x06);
//! assert!(EFFECTIVE_SWIPE_TIMEOUT_SECS < DEFAULT_SWIPE_TIMEOUT_SECS);
//! ```

// ============================================================================
// Action Names
// ============================================================================

/// Probe for the reader on the audio jack.
pub const ACTION_DETECT_READER: &str = "ACTION_DETECT_READER";

/// Arm the reader and wait for a card swipe.
pub const ACTION_GET_SWIPE: &str = "ACTION_GET_SWIPE";

/// Abort an in-progress swipe.
pub const ACTION_CANCEL_SWIPE: &str = "ACTION_CANCEL_SWIPE";

// ============================================================================
// Result Codes
// ============================================================================

/// Reader handshake succeeded.
pub const RESULT_DETECTED: &str = "RESULT_DETECTED";

/// Reader is armed; the user may swipe now. Non-terminal.
pub const RESULT_SWIPE_NOW: &str = "RESULT_SWIPE_NOW";

/// No reader present, or the handshake failed.
pub const ERROR_NOT_DETECTED: &str = "ERROR_NOT_DETECTED";

/// Swipe window elapsed.
pub const ERROR_TIMEOUT: &str = "ERROR_TIMEOUT";

/// Swipe decoded but carried no track 2.
pub const ERROR_NO_TRACK_2: &str = "ERROR_NO_TRACK_2";

/// Internal encoding fault.
pub const ERROR_UNKNOWN: &str = "ERROR_UNKNOWN";

/// Swipe aborted by the caller.
pub const ERROR_CANCEL: &str = "ERROR_CANCEL";

// ============================================================================
// Protocol Values
// ============================================================================

/// Acknowledge byte leading a successful command response.
pub const ACK: u8 = 0x06;

/// Serial number responses must be longer than this to count as a handshake.
pub const MIN_SERIAL_RESPONSE_LEN: usize = 3;

/// Swipe timeout requested from the driver, in seconds.
pub const DEFAULT_SWIPE_TIMEOUT_SECS: u16 = 60;

/// Swipe timeout the driver actually enforces, in seconds.
///
/// The driver ignores the requested value and always uses 30 seconds.
/// This is an upstream limitation; nothing in this workspace retries
/// around it.
pub const EFFECTIVE_SWIPE_TIMEOUT_SECS: u16 = 30;

/// Card data status flag for a clean capture.
pub const CARD_DATA_OK: u8 = 0;

// ============================================================================
// Track 2 Limits
// ============================================================================

/// Shortest primary account number accepted from track 2.
pub const MIN_PAN_LENGTH: usize = 12;

/// Longest primary account number accepted from track 2 (ISO/IEC 7813).
pub const MAX_PAN_LENGTH: usize = 19;

/// Track 2 field separator.
pub const TRACK2_SEPARATOR: char = '=';

/// Expiration length, both `YYMM` on the stripe and `MMYY` in results.
pub const EXPIRATION_LENGTH: usize = 4;
