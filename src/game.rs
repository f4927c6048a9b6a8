//! Round progression for a single chat
//!
//! [`ChatGame`] drives the timed escalation of a chat's rounds: ask the
//! question, reveal more of the answer on every tick, time out after the
//! last tick, and start the next round whenever one resolves. Delays are
//! expressed as one-shot [`AlarmMessage`]s handed to a scheduling closure;
//! every alarm carries the id of the round it was scheduled for and is
//! ignored unless that round is still live, which is how stopped or
//! replaced rounds cancel their pending alarms.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

use crate::{
    chat::{Author, ChatId, MessageId, RoundId},
    config::Settings,
    provider::{self, TriviaProvider},
    round::Round,
    session::{DeliveryError, Format, Messenger, OutgoingMessage},
};

/// Messages scheduled to fire after a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Send the question with the next clue
    Tick {
        /// Round the alarm belongs to
        round: RoundId,
    },
    /// Reveal the answer and move on to a new round
    TimeOut {
        /// Round the alarm belongs to
        round: RoundId,
    },
}

/// Errors surfaced by chat game transitions
///
/// Round state has already been updated when one of these is returned;
/// they only inform the caller, which logs them.
#[derive(Error, Debug)]
pub enum Error {
    /// No question could be fetched, so the chat is left without a round
    #[error("failed to fetch a question: {0}")]
    Provider(#[from] provider::Error),
    /// The chat cannot be messaged, so its round was stopped
    #[error("chat is unreachable: {0}")]
    Unreachable(DeliveryError),
}

/// Round lifecycle of one chat
#[derive(Debug, Clone)]
pub struct ChatGame {
    chat_id: ChatId,
    settings: Settings,
    round: Option<Round>,
}

impl ChatGame {
    /// Creates a chat with no round
    pub fn new(chat_id: ChatId, settings: Settings) -> Self {
        Self {
            chat_id,
            settings,
            round: None,
        }
    }

    /// The chat this game belongs to
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// The current round, live or resolved
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Whether a round is accepting guesses
    pub fn in_game(&self) -> bool {
        self.round.as_ref().is_some_and(Round::in_game)
    }

    /// Sends a message, stopping the round if the chat turned out to be unreachable
    ///
    /// Transient failures are logged and otherwise treated as delivered.
    fn announce<M: Messenger>(
        &mut self,
        messenger: &M,
        message: &OutgoingMessage,
    ) -> Result<(), Error> {
        match messenger.send_message(message) {
            Ok(()) => Ok(()),
            Err(DeliveryError::Forbidden) => {
                if let Some(round) = &mut self.round {
                    round.stop();
                }
                tracing::info!(chat = %self.chat_id, "chat is unreachable, round stopped");
                Err(Error::Unreachable(DeliveryError::Forbidden))
            }
            Err(e @ DeliveryError::Transient(_)) => {
                tracing::warn!(chat = %self.chat_id, error = %e, "failed to deliver message");
                Ok(())
            }
        }
    }

    fn message(&self, text: impl Into<String>, format: Format) -> OutgoingMessage {
        OutgoingMessage::new(self.chat_id, text, format)
    }

    /// Fetches a question and replaces the current round with a fresh one
    ///
    /// The first tick is scheduled after the configured lead-in. If the
    /// fetch fails the chat is left without a round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] when no question could be fetched.
    pub fn start_round<P: TriviaProvider, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        mut schedule_message: S,
    ) -> Result<RoundId, Error> {
        let question = match provider.fetch_question(self.settings.difficulty) {
            Ok(question) => question,
            Err(e) => {
                self.round = None;
                return Err(e.into());
            }
        };

        let round = Round::start(self.chat_id, question, &self.settings);
        let id = round.id();
        tracing::info!(
            chat = %self.chat_id,
            round = %id,
            question = round.question().text(),
            answer = round.question().answer(),
            "round started"
        );
        self.round = Some(round);

        schedule_message(AlarmMessage::Tick { round: id }, self.settings.first_tick_delay);
        Ok(id)
    }

    /// Handles `/new`: starts a round unless one is already running
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the chat cannot be messaged and
    /// [`Error::Provider`] if no question could be fetched.
    pub fn new_game<P: TriviaProvider, M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        messenger: &M,
        schedule_message: S,
        message_id: MessageId,
    ) -> Result<(), Error> {
        if self.in_game() {
            let reply = self
                .message("Already in a game", Format::Markdown)
                .replying_to(message_id);
            return self.announce(messenger, &reply);
        }

        let reply = self
            .message("Let's start!", Format::Plain)
            .replying_to(message_id);
        self.announce(messenger, &reply)?;
        self.start_round(provider, schedule_message)?;
        Ok(())
    }

    /// Handles `/stop`: ends the live round, if any
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the stop notice cannot be delivered.
    pub fn stop<M: Messenger>(&mut self, messenger: &M) -> Result<(), Error> {
        if !self.stop_round() {
            return Ok(());
        }
        let notice = self.message("🛑 Stopped", Format::Markdown);
        self.announce(messenger, &notice)
    }

    /// Handles `/next`: ends the live round, if any, and starts a fresh one
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the chat cannot be messaged and
    /// [`Error::Provider`] if no question could be fetched.
    pub fn next<P: TriviaProvider, M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        messenger: &M,
        schedule_message: S,
    ) -> Result<(), Error> {
        if self.stop_round() {
            let notice = self.message("Next Question!!!", Format::Markdown);
            self.announce(messenger, &notice)?;
        }
        self.start_round(provider, schedule_message)?;
        Ok(())
    }

    /// Stops and discards the live round, returning whether there was one
    fn stop_round(&mut self) -> bool {
        let stopped = self.round.as_mut().is_some_and(Round::stop);
        if stopped {
            if let Some(round) = self.round.take() {
                tracing::info!(chat = %self.chat_id, round = %round.id(), "round stopped");
            }
        }
        stopped
    }

    /// Handles a free-text message as a guess
    ///
    /// Messages from bots, and messages arriving while no round is live, are
    /// ignored. A wrong guess changes nothing; a correct one announces the
    /// winner and starts the next round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the chat cannot be messaged and
    /// [`Error::Provider`] if the next question could not be fetched.
    pub fn receive_guess<P: TriviaProvider, M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        messenger: &M,
        schedule_message: S,
        author: &Author,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), Error> {
        if author.is_bot {
            return Ok(());
        }
        let Some(round) = &mut self.round else {
            return Ok(());
        };
        if !round.in_game() {
            return Ok(());
        }

        let valid = round.evaluate_guess(text);
        tracing::debug!(
            chat = %self.chat_id,
            round = %round.id(),
            reply_count = round.reply_count(),
            guess = text,
            valid,
            "guess received"
        );
        if !valid {
            return Ok(());
        }

        tracing::info!(
            chat = %self.chat_id,
            round = %round.id(),
            winner = author.first_name,
            elapsed = ?round.elapsed(),
            "round won"
        );
        let text = round.winner_text(&author.first_name);
        let announcement = self
            .message(text, Format::Markdown)
            .replying_to(message_id);
        self.announce(messenger, &announcement)?;
        self.start_round(provider, schedule_message)?;
        Ok(())
    }

    /// Handles a scheduled alarm
    ///
    /// Alarms for a round that is no longer live do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the chat cannot be messaged and
    /// [`Error::Provider`] if the next question could not be fetched.
    pub fn receive_alarm<P: TriviaProvider, M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        messenger: &M,
        schedule_message: S,
        message: AlarmMessage,
    ) -> Result<(), Error> {
        match message {
            AlarmMessage::Tick { round } => self.tick(messenger, schedule_message, round),
            AlarmMessage::TimeOut { round } => {
                self.time_out(provider, messenger, schedule_message, round)
            }
        }
    }

    fn live_round(&mut self, id: RoundId) -> Option<&mut Round> {
        self.round.as_mut().filter(|round| round.is_live(id))
    }

    fn tick<M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        messenger: &M,
        mut schedule_message: S,
        id: RoundId,
    ) -> Result<(), Error> {
        let chat_id = self.chat_id;
        let Some(round) = self.live_round(id) else {
            tracing::debug!(chat = %chat_id, round = %id, "stale tick ignored");
            return Ok(());
        };
        let Some(tick) = round.advance_tick() else {
            return Ok(());
        };
        tracing::debug!(
            chat = %chat_id,
            round = %id,
            reply_count = tick.reply_count,
            clue = round.clue(),
            "clue tick"
        );

        let clue = self.message(tick.text, Format::Html);
        self.announce(messenger, &clue)?;

        let next = if tick.exhausted {
            AlarmMessage::TimeOut { round: id }
        } else {
            AlarmMessage::Tick { round: id }
        };
        schedule_message(next, self.settings.tick_delay(tick.reply_count));
        Ok(())
    }

    fn time_out<P: TriviaProvider, M: Messenger, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        provider: &P,
        messenger: &M,
        schedule_message: S,
        id: RoundId,
    ) -> Result<(), Error> {
        let chat_id = self.chat_id;
        let Some(round) = self.live_round(id) else {
            tracing::debug!(chat = %chat_id, round = %id, "stale time out ignored");
            return Ok(());
        };
        round.time_out();
        tracing::info!(chat = %chat_id, round = %id, "round timed out");

        let text = round.timeout_text();
        let announcement = self.message(text, Format::Markdown);
        self.announce(messenger, &announcement)?;
        self.start_round(provider, schedule_message)?;
        Ok(())
    }
}
