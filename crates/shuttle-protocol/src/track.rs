//! Magnetic stripe track 2 parser.
//!
//! The reader delivers whatever it decoded from the stripe as one byte
//! string, usually track 1 followed by track 2:
//!
//! ```text
//! %B4111111111111111^DOE/JOHN^25121011000000000000?;4111111111111111=25121011000000000000?
//! ^------------------ track 1 -----------------------^------------- track 2 ------------^
//! ```
//!
//! Only track 2 is used. Its primary account number (PAN) is a run of
//! 12-19 digits followed by the `=` separator and the expiration in
//! `YYMM` order. Track 1 uses `^` separators and never matches.
//!
//! # Examples
//!
//! ```
//! use shuttle_protocol::TrackParser;
//!
//! let track = TrackParser::parse(b";4111111111111111=25121011000000000000?").unwrap();
//! assert_eq!(track.card(), "4111111111111111");
//! assert_eq!(track.exp(), "1225"); // MMYY
//!
//! assert!(TrackParser::parse(b"%B4111111111111111^DOE/JOHN^2512?").is_none());
//! ```

use shuttle_core::{
    CardSwipe, Result,
    constants::{EXPIRATION_LENGTH, MAX_PAN_LENGTH, MIN_PAN_LENGTH, TRACK2_SEPARATOR},
};
use std::fmt;

/// Card fields found in track 2.
#[derive(Clone, PartialEq, Eq)]
pub struct Track2 {
    card: String,
    exp: String,
}

impl Track2 {
    /// Primary account number.
    pub fn card(&self) -> &str {
        &self.card
    }

    /// Expiration in `MMYY` order.
    pub fn exp(&self) -> &str {
        &self.exp
    }

    /// Combine with the raw payload into the caller-facing swipe result.
    ///
    /// # Errors
    /// Returns an error if the fields fail [`CardSwipe`] validation, which
    /// the parser rules out for anything it returns.
    pub fn into_swipe(self, raw: impl Into<String>) -> Result<CardSwipe> {
        CardSwipe::new(&self.card, &self.exp, raw)
    }
}

impl fmt::Debug for Track2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = &self.card[self.card.len().saturating_sub(4)..];
        f.debug_struct("Track2")
            .field("card", &format_args!("...{last4}"))
            .field("exp", &self.exp)
            .finish()
    }
}

/// Parser for raw swipe payloads.
pub struct TrackParser;

impl TrackParser {
    /// Parse a raw swipe payload.
    ///
    /// Bytes that are not valid UTF-8 are replaced before matching, so a
    /// noisy track 1 does not hide a clean track 2.
    ///
    /// Returns `None` if no track 2 PAN with a valid expiration is present.
    pub fn parse(raw: &[u8]) -> Option<Track2> {
        Self::parse_str(&String::from_utf8_lossy(raw))
    }

    /// Parse an already decoded swipe payload.
    ///
    /// The first separator preceded by a PAN of acceptable length and
    /// followed by a `YYMM` expiration with month 01-12 wins.
    pub fn parse_str(text: &str) -> Option<Track2> {
        let bytes = text.as_bytes();

        for (sep, _) in text.match_indices(TRACK2_SEPARATOR) {
            let start = bytes[..sep]
                .iter()
                .rposition(|b| !b.is_ascii_digit())
                .map_or(0, |p| p + 1);

            let pan_len = sep - start;
            if !(MIN_PAN_LENGTH..=MAX_PAN_LENGTH).contains(&pan_len) {
                continue;
            }

            let exp_start = sep + 1;
            let exp_end = exp_start + EXPIRATION_LENGTH;
            let Some(exp) = bytes.get(exp_start..exp_end) else {
                continue;
            };
            if !exp.iter().all(u8::is_ascii_digit) {
                continue;
            }

            // All-digit ranges are ASCII, so these slices sit on char boundaries.
            let yy = &text[exp_start..exp_start + 2];
            let mm = &text[exp_start + 2..exp_end];
            if !matches!(mm.parse::<u8>(), Ok(1..=12)) {
                continue;
            }

            return Some(Track2 {
                card: text[start..sep].to_string(),
                exp: format!("{mm}{yy}"),
            });
        }

        None
    }
}
