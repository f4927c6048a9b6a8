//! Free-text guess matching
//!
//! Both the canonical answer and each guess are sanitized (everything but
//! word characters and spaces is dropped, then the result is trimmed). A
//! guess is correct when the sanitized answer occurs anywhere inside the
//! sanitized guess, ignoring case. True/false questions additionally accept
//! "yes" for `True` and "no" for `False`.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::question::{Question, QuestionKind};

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w ]").expect("literal pattern is valid"));

/// Strips everything except word characters and spaces, then trims
pub fn sanitize(input: &str) -> String {
    NON_WORD.replace_all(input, "").trim().to_string()
}

/// Alternative token accepted for a true/false answer
fn boolean_alternative(answer: &str) -> Option<&'static str> {
    match answer {
        "True" => Some("yes"),
        "False" => Some("no"),
        _ => None,
    }
}

/// A compiled matcher for one question's answer
#[derive(Debug, Clone)]
pub struct Matcher {
    /// `None` when the answer sanitizes to nothing, in which case no guess matches
    pattern: Option<Regex>,
}

impl Matcher {
    /// Builds the matcher for a question
    pub fn new(question: &Question) -> Self {
        let answer = sanitize(question.answer());
        if answer.is_empty() {
            tracing::warn!(answer = question.answer(), "answer has nothing to match against");
            return Self { pattern: None };
        }

        let mut pattern = regex::escape(&answer);
        if question.kind() == QuestionKind::Boolean {
            if let Some(alternative) = boolean_alternative(question.answer()) {
                pattern.push('|');
                pattern.push_str(alternative);
            }
        }

        let pattern = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(error = %e, "failed to compile answer pattern");
                None
            }
        };

        Self { pattern }
    }

    /// Decides whether a free-text guess matches the answer
    pub fn matches(&self, guess: &str) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        let guess = sanitize(guess);
        !guess.is_empty() && pattern.is_match(&guess)
    }
}
