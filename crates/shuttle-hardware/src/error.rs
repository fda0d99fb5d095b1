//! Error types for reader driver operations.
//!
//! This module defines the errors a reader driver can raise. None of them
//! reach the caller of a reader action directly; the protocol core logs
//! them and maps the outcome onto the caller-visible taxonomy.

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during reader driver operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The driver faulted on an operation that had nothing to act on.
    ///
    /// The vendor driver raises a null-pointer fault when asked to stop an
    /// idle swipe or release an already-stopped record thread. These are
    /// harmless and expected.
    #[error("Driver fault in {operation}")]
    DriverFault { operation: String },

    /// No reader connection is open, or the event pump has gone away.
    #[error("Reader disconnected: {device}")]
    Disconnected { device: String },

    /// The driver could not allocate a reader connection.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// The driver rejected the connection profile.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// The audio link failed while sending a command.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// The operation requires a detected reader.
    #[error("Reader not detected")]
    NotDetected,
}

impl HardwareError {
    /// Create a new driver fault error.
    pub fn driver_fault(operation: impl Into<String>) -> Self {
        Self::DriverFault {
            operation: operation.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Whether this is the driver's spurious fault on an idle operation.
    pub fn is_driver_fault(&self) -> bool {
        matches!(self, Self::DriverFault { .. })
    }
}
