//! Trivia questions as fetched from a provider
//!
//! A [`Question`] is immutable for the life of a round. Validation rejects
//! payloads whose answer would sanitize to nothing, since such an answer
//! could never be guessed.

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::answer::sanitize;

/// The shape of a trivia question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// A question with several candidate answers
    #[default]
    Multiple,
    /// A true/false question
    Boolean,
}

/// How hard the requested question should be
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Easy questions
    #[default]
    #[display("easy")]
    Easy,
    /// Medium questions
    #[display("medium")]
    Medium,
    /// Hard questions
    #[display("hard")]
    Hard,
}

/// A single trivia question with its canonical answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text as received
    #[garde(length(min = 1))]
    text: String,
    /// Whether this is a multiple choice or a true/false question
    #[garde(skip)]
    kind: QuestionKind,
    /// The canonical answer
    #[garde(custom(validate_answer))]
    answer: String,
}

/// Rejects answers that contain nothing matchable
#[allow(clippy::ptr_arg)]
fn validate_answer(val: &String, _ctx: &()) -> garde::Result {
    if sanitize(val).is_empty() {
        Err(garde::Error::new("answer has no word characters"))
    } else {
        Ok(())
    }
}

impl Question {
    /// Creates a question without validating it
    pub fn new(text: impl Into<String>, kind: QuestionKind, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            answer: answer.into(),
        }
    }

    /// The question text as received from the provider
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The question kind
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// The canonical answer
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Text shown to players
    ///
    /// True/false questions arrive as statements; their final character is
    /// swapped for a question mark.
    pub fn display_text(&self) -> String {
        match self.kind {
            QuestionKind::Multiple => self.text.clone(),
            QuestionKind::Boolean => {
                let mut chars = self.text.chars();
                chars.next_back();
                format!("{}?", chars.as_str())
            }
        }
    }

    /// The answer as announced to the winner
    ///
    /// Boolean answers carry the accepted yes/no alternative.
    pub fn announced_answer(&self) -> String {
        match (self.kind, self.answer.as_str()) {
            (QuestionKind::Boolean, "True") => format!("{}/yes", self.answer),
            (QuestionKind::Boolean, _) => format!("{}/no", self.answer),
            (QuestionKind::Multiple, _) => self.answer.clone(),
        }
    }
}
