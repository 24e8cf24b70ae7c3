//! Collaborator adapters and PHI-safe note-assist workflows.
//!
//! This crate connects the core pipeline to the outside world: a Presidio
//! sidecar for PII detection, a Whisper-compatible transcription server, and
//! an OpenAI-compatible chat endpoint. [`ScribeAssistant`] ties them together
//! so the chat model only ever sees scrubbed text.

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod presidio;
pub mod prompts;
pub mod responses;
pub mod transcription;

mod http;

pub use assistant::{
    ChatRequest, FocusedRequest, GhostWriteRequest, ResolveRequest, ScribeAssistant, SectionRequest,
};
pub use chat::{ChatMessage, ChatModel, ChatOptions, OpenAiChatClient, OpenAiChatConfig, Role};
pub use config::{ConfigError, ScribeConfig};
pub use error::{ClientError, ClientResult, ScribeError, ScribeResult};
pub use presidio::{PresidioClient, PresidioConfig};
pub use prompts::{SectionTemplate, Verbosity};
pub use responses::{Citation, FocusedAnalysis, NoteSection, SuggestionResolution};
pub use transcription::{Transcriber, WhisperClient, WhisperConfig};
