//! State of one trivia round
//!
//! A [`Round`] owns everything about a single question/answer cycle in a
//! chat: the question, the clue, how many clue ticks have elapsed and the
//! phase. It leaves `Asking` exactly once, through one of the resolving
//! transitions ([`Round::evaluate_guess`], [`Round::time_out`],
//! [`Round::stop`]). Side effects such as sending messages or scheduling
//! the next tick are left to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use crate::{
    answer::Matcher,
    chat::{ChatId, RoundId},
    clue::{Clue, seed_for},
    config::Settings,
    question::Question,
};

/// Phase of a round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting guesses and ticking
    #[default]
    Asking,
    /// Someone guessed the answer
    Won,
    /// All clue ticks elapsed without a correct guess
    TimedOut,
    /// Stopped by a command or because the chat became unreachable
    Stopped,
}

/// What a clue tick produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Question and clue as shown to the chat
    pub text: String,
    /// Number of ticks elapsed, including this one
    pub reply_count: usize,
    /// Whether this was the last tick before the round times out
    pub exhausted: bool,
}

/// One question/answer cycle in a chat
#[derive(Debug, Clone)]
pub struct Round {
    id: RoundId,
    chat_id: ChatId,
    question: Question,
    phase: Phase,
    reply_count: usize,
    reply_max: usize,
    clue: Clue,
    matcher: Matcher,
    started_at: SystemTime,
}

impl Round {
    /// Starts a round for a freshly fetched question
    pub fn start(chat_id: ChatId, question: Question, settings: &Settings) -> Self {
        let seed = seed_for(chat_id, question.answer());
        Self {
            id: RoundId::new(),
            chat_id,
            clue: Clue::new(question.answer(), settings.reply_max, seed),
            matcher: Matcher::new(&question),
            question,
            phase: Phase::Asking,
            reply_count: 0,
            reply_max: settings.reply_max,
            started_at: SystemTime::now(),
        }
    }

    /// Unique id of this round
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Chat this round belongs to
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// The question being asked
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the round still accepts guesses and ticks
    pub fn in_game(&self) -> bool {
        self.phase == Phase::Asking
    }

    /// Whether `id` names this round and it is still asking
    pub fn is_live(&self, id: RoundId) -> bool {
        self.id == id && self.in_game()
    }

    /// Number of clue ticks elapsed
    pub fn reply_count(&self) -> usize {
        self.reply_count
    }

    /// Number of clue ticks before the round times out
    pub fn reply_max(&self) -> usize {
        self.reply_max
    }

    /// Time since the round started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed().unwrap_or_default()
    }

    /// The clue at the current tick count
    pub fn clue(&self) -> String {
        self.clue.render()
    }

    /// Moves from `before` to `after`, returning whether the move happened
    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            self.phase = after;
            true
        } else {
            false
        }
    }

    /// Renders the question with the clue for the current tick, then counts the tick
    ///
    /// The text is sent as HTML, so both parts are escaped. Returns `None`
    /// once the round has been resolved.
    pub fn advance_tick(&mut self) -> Option<Tick> {
        if !self.in_game() {
            return None;
        }

        self.clue.reveal_to(self.reply_count);
        let text = format!(
            "❓: {}\n\n{}",
            html_escape::encode_text(&self.question.display_text()),
            html_escape::encode_text(&self.clue.render())
        );
        self.reply_count += 1;

        Some(Tick {
            text,
            reply_count: self.reply_count,
            exhausted: self.reply_count >= self.reply_max,
        })
    }

    /// Checks a guess, resolving the round as won when it matches
    pub fn evaluate_guess(&mut self, guess: &str) -> bool {
        self.in_game()
            && self.matcher.matches(&guess.to_lowercase())
            && self.change_phase(Phase::Asking, Phase::Won)
    }

    /// Resolves the round as timed out, returning whether it was still asking
    pub fn time_out(&mut self) -> bool {
        self.change_phase(Phase::Asking, Phase::TimedOut)
    }

    /// Stops the round, returning whether it was still asking
    pub fn stop(&mut self) -> bool {
        self.change_phase(Phase::Asking, Phase::Stopped)
    }

    /// Announcement made when nobody guessed the answer
    pub fn timeout_text(&self) -> String {
        format!(
            "❌ Nobody guessed it!\n\nQuestion: *{}*\nAnswer: *{}*",
            self.question.display_text(),
            self.question.answer()
        )
    }

    /// Announcement made when `winner` guessed the answer
    pub fn winner_text(&self, winner: &str) -> String {
        format!(
            "✅ *{winner}* nailed it! The answer is *{}*",
            self.question.announced_answer()
        )
    }
}
