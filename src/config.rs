//! Round settings
//!
//! [`Settings`] gathers the tunables of the round lifecycle. Every field
//! has a default matching the classic game (four clue ticks, eight-second
//! escalation unit, one-second lead-in, easy questions), so an empty JSON
//! object is a valid configuration.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{round::*, timing::*},
    question::Difficulty,
};

/// Validates that a duration falls within specified bounds, in seconds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Tunables for rounds across all chats
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Number of clue ticks before a round times out
    #[garde(range(min = MIN_REPLY_MAX, max = MAX_REPLY_MAX))]
    pub reply_max: usize,
    /// Unit multiplied by the reply count to get the delay before the next tick
    #[garde(custom(validate_duration::<MIN_TICK_UNIT, MAX_TICK_UNIT>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub tick_unit: Duration,
    /// Delay between starting a round and asking its question
    #[garde(custom(validate_duration::<MIN_FIRST_TICK_DELAY, MAX_FIRST_TICK_DELAY>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub first_tick_delay: Duration,
    /// Difficulty requested from the trivia provider
    #[garde(skip)]
    pub difficulty: Difficulty,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reply_max: DEFAULT_REPLY_MAX,
            tick_unit: Duration::from_secs(DEFAULT_TICK_UNIT),
            first_tick_delay: Duration::from_secs(DEFAULT_FIRST_TICK_DELAY),
            difficulty: Difficulty::default(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Error, Debug)]
pub enum Error {
    /// The settings document is not valid JSON for [`Settings`]
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    /// The settings parsed but fall outside their allowed bounds
    #[error("invalid settings: {0}")]
    Invalid(#[from] garde::Report),
}

impl Settings {
    /// Parses and validates settings from a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON and [`Error::Invalid`]
    /// when a value is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Delay before the tick that follows `reply_count` sent clues
    pub fn tick_delay(&self, reply_count: usize) -> Duration {
        self.tick_unit * u32::try_from(reply_count).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.reply_max, 4);
        assert_eq!(settings.tick_unit, Duration::from_secs(8));
        assert_eq!(settings.first_tick_delay, Duration::from_secs(1));
        assert_eq!(settings.difficulty, Difficulty::Easy);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_document() {
        let settings =
            Settings::from_json(r#"{"reply_max": 6, "tick_unit": 3, "difficulty": "hard"}"#)
                .unwrap();
        assert_eq!(settings.reply_max, 6);
        assert_eq!(settings.tick_unit, Duration::from_secs(3));
        assert_eq!(settings.first_tick_delay, Duration::from_secs(1));
        assert_eq!(settings.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        assert!(matches!(
            Settings::from_json(r#"{"reply_max": 0}"#),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"tick_unit": 600}"#),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            Settings::from_json("reply_max = 4"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_tick_delay_scales_with_reply_count() {
        let settings = Settings::default();
        assert_eq!(settings.tick_delay(1), Duration::from_secs(8));
        assert_eq!(settings.tick_delay(3), Duration::from_secs(24));
    }
}
