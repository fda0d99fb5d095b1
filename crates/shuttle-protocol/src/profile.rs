//! Audio link connection profile.
//!
//! The reader talks to the phone over the headset jack by modulating audio.
//! Before a handshake the driver must be told how to sample and threshold
//! that signal. Autoconfiguration through the vendor's XML files is
//! unreliable, so a single known-good profile (`template_9600_1`) is sent
//! on every connection attempt. Every device on which autoconfiguration
//! works at all ends up with these values.
//!
//! The last four fields are not in the vendor's configuration files. Their
//! expected values were recovered by instrumenting the vendor demo app.

use serde::Serialize;

/// Tuning parameters sent to the driver once per connection attempt.
///
/// Field names follow the driver's parameter names where they are
/// meaningful; `outer_*`/`inner_*` are the driver's `_Low`/`_High` and
/// `__Low`/`__High` signal windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionProfile {
    pub direction_output_wave: i16,
    pub input_frequency: u32,
    pub output_frequency: u32,
    pub record_buffer_size: u32,
    pub record_read_buffer_size: u32,
    pub wave_direction: i32,
    pub outer_low: i16,
    pub outer_high: i16,
    pub inner_low: i16,
    pub inner_high: i16,
    pub high_threshold: i16,
    pub low_threshold: i16,
    pub device_amplitude_base: i32,
    pub min: i16,
    pub max: i16,
    pub baud_rate: u32,
    pub preamble_factor: i16,
    pub shuttle_channel: u8,
    pub force_headset_plug: i16,
    pub use_voice_recognition: bool,
    pub volume_level_adjust: i16,
}

/// The `template_9600_1` profile.
pub const TEMPLATE_9600_1: ConnectionProfile = ConnectionProfile {
    direction_output_wave: 1,
    input_frequency: 48_000,
    output_frequency: 48_000,
    record_buffer_size: 8_192,
    record_read_buffer_size: 163_840,
    wave_direction: 1,
    outer_low: -10_000,
    outer_high: 10_000,
    inner_low: -2_000,
    inner_high: 2_000,
    high_threshold: 4_000,
    low_threshold: -4_000,
    device_amplitude_base: 25_000,
    min: 2,
    max: 8,
    baud_rate: 9_600,
    preamble_factor: 2,
    shuttle_channel: 48,
    force_headset_plug: 0,
    use_voice_recognition: true,
    volume_level_adjust: 0,
};

impl ConnectionProfile {
    /// The only profile used with the Shuttle reader.
    pub const fn shuttle() -> &'static ConnectionProfile {
        &TEMPLATE_9600_1
    }
}
