//! Error types for collaborator adapters and note-assist workflows.

use scribe_core::PrivacyError;
use thiserror::Error;

/// Errors from an HTTP collaborator (chat model, transcription server).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Workflow errors surfaced to the caller.
///
/// A hallucinated transcript and a malformed model reply are not errors:
/// the first is a result flag, the second is recovered with a fallback.
#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Empty audio file")]
    EmptyAudio,

    #[error("Scrub failed: {0}")]
    Scrub(#[from] PrivacyError),

    #[error("Chat model error: {0}")]
    Chat(#[source] ClientError),

    #[error("Transcription error: {0}")]
    Transcription(#[source] ClientError),
}

pub type ScribeResult<T> = Result<T, ScribeError>;
