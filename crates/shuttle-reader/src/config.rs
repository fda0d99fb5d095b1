use serde::{Deserialize, Serialize};
use shuttle_core::{Error, Result, constants::DEFAULT_SWIPE_TIMEOUT_SECS};

/// Reader configuration.
///
/// The connection profile is fixed and not part of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Reader name used in logs.
    pub name: String,

    /// Swipe timeout requested when arming. The driver caps the effective
    /// window at 30 seconds.
    pub swipe_timeout_secs: u16,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            name: "IDTech Shuttle".to_string(),
            swipe_timeout_secs: DEFAULT_SWIPE_TIMEOUT_SECS,
        }
    }
}

impl ReaderConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `Error::Config` for an empty name or a zero swipe timeout.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("reader name must not be empty".to_string()));
        }
        if self.swipe_timeout_secs == 0 {
            return Err(Error::Config(
                "swipe timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
