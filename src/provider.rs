//! Trivia question sources
//!
//! [`TriviaProvider`] is the seam rounds use to obtain a question.
//! [`OpenTdb`] implements it against the Open Trivia Database, requesting
//! percent-encoded payloads so that answers arrive without HTML entities.

use std::time::Duration;

use garde::Validate;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    constants::provider::{OPEN_TDB_SUCCESS, OPEN_TDB_URL},
    question::{Difficulty, Question, QuestionKind},
};

/// Errors that can occur while fetching a question
#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP request could not be completed
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with a non-success response code
    #[error("provider returned response code {0}")]
    Status(u8),
    /// The body was not the expected JSON
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field was not valid percent-encoded UTF-8
    #[error("malformed field encoding: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    /// The response contained no question
    #[error("response contained no question")]
    Empty,
    /// The question failed validation
    #[error("invalid question: {0}")]
    Invalid(#[from] garde::Report),
}

/// Trait for fetching trivia questions
pub trait TriviaProvider {
    /// Fetches a single question of the given difficulty
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] on network failure or when the payload cannot be
    /// turned into a valid [`Question`].
    fn fetch_question(&self, difficulty: Difficulty) -> Result<Question, Error>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<ApiQuestion>,
}

#[derive(Debug, Deserialize)]
struct ApiQuestion {
    #[serde(rename = "type")]
    kind: QuestionKind,
    question: String,
    correct_answer: String,
}

/// Turns an Open Trivia Database response body into a question
///
/// # Errors
///
/// Returns an [`Error`] when the body is malformed, reports failure, holds
/// no question, or holds a question that fails validation.
pub fn parse_open_tdb(body: &str) -> Result<Question, Error> {
    let response: ApiResponse = serde_json::from_str(body)?;
    if response.response_code != OPEN_TDB_SUCCESS {
        return Err(Error::Status(response.response_code));
    }

    let api_question = response.results.into_iter().next().ok_or(Error::Empty)?;
    let question = Question::new(
        urlencoding::decode(&api_question.question)?,
        api_question.kind,
        urlencoding::decode(&api_question.correct_answer)?,
    );
    question.validate()?;

    Ok(question)
}

/// Client for the Open Trivia Database
#[derive(Debug, Clone)]
pub struct OpenTdb {
    client: reqwest::blocking::Client,
    url: String,
}

impl OpenTdb {
    /// Creates a client for the public endpoint
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Self::with_url(OPEN_TDB_URL, timeout)
    }

    /// Creates a client for a custom endpoint
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the HTTP client cannot be built.
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: reqwest::blocking::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

impl TriviaProvider for OpenTdb {
    fn fetch_question(&self, difficulty: Difficulty) -> Result<Question, Error> {
        let difficulty = difficulty.to_string();
        let body = self
            .client
            .get(&self.url)
            .query(&[
                ("amount", "1"),
                ("difficulty", difficulty.as_str()),
                ("encode", "url3986"),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        let question = parse_open_tdb(&body)?;
        tracing::debug!(question = question.text(), answer = question.answer(), "fetched question");
        Ok(question)
    }
}
