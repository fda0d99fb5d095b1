use crate::{
    Result,
    constants::{
        ACTION_CANCEL_SWIPE, ACTION_DETECT_READER, ACTION_GET_SWIPE, EXPIRATION_LENGTH,
        MAX_PAN_LENGTH, MIN_PAN_LENGTH, RESULT_DETECTED, RESULT_SWIPE_NOW,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// External action requested by the host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    DetectReader,
    GetSwipe,
    CancelSwipe,
}

impl Action {
    /// Action name as sent by the host bridge.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::DetectReader => ACTION_DETECT_READER,
            Action::GetSwipe => ACTION_GET_SWIPE,
            Action::CancelSwipe => ACTION_CANCEL_SWIPE,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ACTION_DETECT_READER => Ok(Action::DetectReader),
            ACTION_GET_SWIPE => Ok(Action::GetSwipe),
            ACTION_CANCEL_SWIPE => Ok(Action::CancelSwipe),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// Successful status code delivered to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Reader handshake completed. Terminal.
    Detected,

    /// Reader armed for a swipe. Never terminal.
    SwipeNow,
}

impl Status {
    /// Wire code sent to the host bridge.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Status::Detected => RESULT_DETECTED,
            Status::SwipeNow => RESULT_SWIPE_NOW,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Card fields extracted from a successful swipe.
///
/// Serializes to the `{"card", "exp", "raw"}` object the host bridge
/// forwards to its caller.
///
/// # Security
/// `Debug` and [`masked_card`](CardSwipe::masked_card) never expose more
/// than the last four digits of the card number. Log through those only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSwipe {
    card: String,
    exp: String,
    raw: String,
}

impl CardSwipe {
    /// Create card swipe data with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardNumber` if the card number is not 12-19
    /// ASCII digits, or `Error::InvalidExpiration` if the expiration is not
    /// `MMYY` with a month of 01-12.
    pub fn new(card: &str, exp: &str, raw: impl Into<String>) -> Result<Self> {
        let len = card.len();
        if !(MIN_PAN_LENGTH..=MAX_PAN_LENGTH).contains(&len)
            || !card.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::InvalidCardNumber(format!(
                "Card number must be {MIN_PAN_LENGTH}-{MAX_PAN_LENGTH} digits, got {len} chars"
            )));
        }

        if exp.len() != EXPIRATION_LENGTH || !exp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidExpiration(format!(
                "Expiration must be {EXPIRATION_LENGTH} digits (MMYY), got {exp:?}"
            )));
        }

        let month: u8 = exp[..2]
            .parse()
            .map_err(|_| Error::InvalidExpiration(exp.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidExpiration(format!(
                "Expiration month must be 01-12, got {month:02}"
            )));
        }

        Ok(CardSwipe {
            card: card.to_string(),
            exp: exp.to_string(),
            raw: raw.into(),
        })
    }

    /// Primary account number.
    #[must_use]
    pub fn card(&self) -> &str {
        &self.card
    }

    /// Expiration in `MMYY` order.
    #[must_use]
    pub fn exp(&self) -> &str {
        &self.exp
    }

    /// Raw decoded track data as received from the reader.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Card number with everything but the last four digits masked.
    #[must_use]
    pub fn masked_card(&self) -> String {
        let hidden = self.card.chars().count().saturating_sub(4);
        self.card
            .chars()
            .enumerate()
            .map(|(i, c)| if i < hidden { '*' } else { c })
            .collect()
    }
}

impl fmt::Debug for CardSwipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSwipe")
            .field("card", &self.masked_card())
            .field("exp", &self.exp)
            .finish_non_exhaustive()
    }
}
