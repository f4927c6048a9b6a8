//! # Trivia Rounds
//!
//! This library provides the game logic for a chat trivia bot. Each chat
//! plays one round at a time: a question is fetched, asked, and followed by
//! clue ticks that progressively reveal the answer until somebody guesses
//! it or the round times out, at which point the next round starts.
//!
//! The messaging transport, the trivia source and the timer are supplied by
//! the embedding application through the [`session::Messenger`],
//! [`provider::TriviaProvider`] and [`router::Scheduler`] traits.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]

pub mod answer;
pub mod chat;
pub mod clue;
pub mod config;
pub mod constants;
pub mod game;
pub mod provider;
pub mod question;
pub mod round;
pub mod router;
pub mod session;

pub use chat::{Author, ChatId, MessageId, RoundId};
pub use config::Settings;
pub use game::{AlarmMessage, ChatGame};
pub use question::{Difficulty, Question, QuestionKind};
pub use round::Round;
pub use router::{Bot, Command, IncomingMessage, Registry, Scheduler};
