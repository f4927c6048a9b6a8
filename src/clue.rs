//! Progressive reveal of an answer
//!
//! A [`Clue`] starts as one underscore per letter with spaces kept as
//! spaces. At tick `n` exactly `floor(T * n / (reply_max + 1))` letters are
//! shown, where `T` is the number of letters. Positions are drawn from the
//! still-hidden letters using a seeded generator, so a given seed always
//! reveals letters in the same order.

use itertools::Itertools;

use crate::{
    chat::ChatId,
    constants::clue::{MASK, SEED_OFFSET, SEED_PRIME},
};

/// Derives the reveal seed for one round from its chat and answer
///
/// FNV-1a over the little-endian chat id followed by the answer's UTF-8
/// bytes, so the seed is the same on every platform and toolchain.
pub fn seed_for(chat_id: ChatId, answer: &str) -> u64 {
    chat_id
        .get()
        .to_le_bytes()
        .iter()
        .chain(answer.as_bytes())
        .fold(SEED_OFFSET, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(SEED_PRIME))
}

/// The partially revealed form of an answer
#[derive(Debug, Clone)]
pub struct Clue {
    answer: Vec<char>,
    mask: Vec<char>,
    /// Letter positions not yet revealed
    hidden: Vec<usize>,
    letter_count: usize,
    reply_max: usize,
    rng: fastrand::Rng,
}

impl Clue {
    /// Creates a fully masked clue for the answer
    pub fn new(answer: &str, reply_max: usize, seed: u64) -> Self {
        let answer = answer.chars().collect_vec();
        let mask = answer
            .iter()
            .map(|&c| if c == ' ' { ' ' } else { MASK })
            .collect_vec();
        let hidden = answer.iter().positions(|&c| c != ' ').collect_vec();

        Self {
            letter_count: hidden.len(),
            answer,
            mask,
            hidden,
            reply_max,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Number of letters (non-space characters) in the answer
    pub fn letter_count(&self) -> usize {
        self.letter_count
    }

    /// Number of letters currently shown
    pub fn revealed_count(&self) -> usize {
        self.letter_count - self.hidden.len()
    }

    /// How many letters should be shown after `tick` ticks
    pub fn target(&self, tick: usize) -> usize {
        (self.letter_count * tick / (self.reply_max + 1)).min(self.letter_count)
    }

    /// Reveals letters until the count for `tick` is reached
    ///
    /// Never hides letters again, so calling it with an earlier or the same
    /// tick leaves the clue unchanged.
    pub fn reveal_to(&mut self, tick: usize) {
        let target = self.target(tick);
        while self.revealed_count() < target {
            let pick = self.rng.usize(..self.hidden.len());
            let position = self.hidden.swap_remove(pick);
            self.mask[position] = self.answer[position];
        }
    }

    /// The clue as displayed to players
    pub fn render(&self) -> String {
        self.mask.iter().collect()
    }
}
