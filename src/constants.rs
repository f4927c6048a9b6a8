//! Configuration constants for the trivia round system
//!
//! This module contains the defaults and bounds used throughout the
//! round lifecycle, so that the timing and escalation rules are defined
//! in one place.

/// Round escalation constants
pub mod round {
    /// Default number of clue ticks before a round times out
    pub const DEFAULT_REPLY_MAX: usize = 4;
    /// Minimum configurable number of clue ticks
    pub const MIN_REPLY_MAX: usize = 1;
    /// Maximum configurable number of clue ticks
    pub const MAX_REPLY_MAX: usize = 10;
}

/// Timing constants, in seconds
pub mod timing {
    /// Default unit multiplied by the reply count to get the next tick delay
    pub const DEFAULT_TICK_UNIT: u64 = 8;
    /// Minimum tick unit
    pub const MIN_TICK_UNIT: u64 = 1;
    /// Maximum tick unit
    pub const MAX_TICK_UNIT: u64 = 60;
    /// Default delay between starting a round and asking its question
    pub const DEFAULT_FIRST_TICK_DELAY: u64 = 1;
    /// Minimum first tick delay
    pub const MIN_FIRST_TICK_DELAY: u64 = 0;
    /// Maximum first tick delay
    pub const MAX_FIRST_TICK_DELAY: u64 = 30;
}

/// Clue rendering constants
pub mod clue {
    /// Character shown in place of an unrevealed letter
    pub const MASK: char = '_';

    /// FNV-1a 64-bit offset basis, used to derive reveal seeds
    pub const SEED_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime
    pub const SEED_PRIME: u64 = 0x0100_0000_01b3;
}

/// Trivia provider constants
pub mod provider {
    /// Endpoint of the Open Trivia Database question API
    pub const OPEN_TDB_URL: &str = "https://opentdb.com/api.php";
    /// Response code the Open Trivia Database uses for success
    pub const OPEN_TDB_SUCCESS: u8 = 0;
}
