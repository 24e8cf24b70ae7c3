//! PHI-safe note-assist workflows.
//!
//! Every workflow follows the same shape:
//!
//! 1. Scrub each outgoing field through one [`ScrubSession`]
//! 2. Call the chat model with tokens only
//! 3. Parse the *scrubbed* reply, then restore tokens in every string leaf
//!
//! A scrub failure aborts the request before anything is sent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use scribe_core::fingerprint::fingerprint;
use scribe_core::{Scrubber, ScrubSession, SubstitutionMap, TranscriptPipeline, TranscriptResult};

use crate::chat::{ChatMessage, ChatModel, ChatOptions, Role};
use crate::error::{ScribeError, ScribeResult};
use crate::prompts::{
    make_chat_system_prompt, make_focused_prompt, make_ghost_write_prompt, make_resolve_prompt,
    make_section_prompt, Prompt, SectionTemplate, SuggestionContext, Verbosity, DEFAULT_NOTE_TYPE,
    DEFAULT_SPECIALTY,
};
use crate::responses::{
    parse_focused, parse_reply, parse_resolution, parse_sections, FocusedAnalysis, NoteSection,
    SuggestionResolution,
};
use crate::transcription::Transcriber;

pub const SECTION_TEMPERATURE: f64 = 0.3;
pub const FOCUSED_TEMPERATURE: f64 = 0.4;
pub const GHOST_WRITE_TEMPERATURE: f64 = 0.5;
pub const RESOLVE_TEMPERATURE: f64 = 0.2;
pub const CHAT_TEMPERATURE: f64 = 0.5;

/// Section name used when the reply cannot be split into sections.
pub const FALLBACK_SECTION: &str = "Assessment";
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

fn default_specialty() -> String {
    DEFAULT_SPECIALTY.to_string()
}

fn default_note_type() -> String {
    DEFAULT_NOTE_TYPE.to_string()
}

/// Generate note sections from a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequest {
    pub transcript: String,
    pub sections: Vec<SectionTemplate>,
    #[serde(default = "default_note_type")]
    pub note_type: String,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default = "default_specialty")]
    pub specialty: String,
}

/// Analyze one note section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedRequest {
    pub section_name: String,
    pub content: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default = "default_specialty")]
    pub specialty: String,
}

/// Rewrite a chat answer as note text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostWriteRequest {
    pub chat_answer: String,
    pub destination_section: String,
    #[serde(default)]
    pub existing_content: String,
    #[serde(default = "default_note_type")]
    pub note_type: String,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default = "default_specialty")]
    pub specialty: String,
}

/// Resolve a focused-analysis suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub suggestion: String,
    pub section_name: String,
    #[serde(default)]
    pub existing_content: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default = "default_note_type")]
    pub note_type: String,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default = "default_specialty")]
    pub specialty: String,
}

/// Free-form clinical chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_specialty")]
    pub specialty: String,
}

/// Coordinates transcription, scrubbing, and the chat model.
///
/// Holds no per-request state; share one instance across requests.
#[derive(Clone)]
pub struct ScribeAssistant {
    scrubber: Scrubber,
    chat: Arc<dyn ChatModel>,
    transcriber: Arc<dyn Transcriber>,
    pipeline: TranscriptPipeline,
}

impl ScribeAssistant {
    pub fn new(scrubber: Scrubber, chat: Arc<dyn ChatModel>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            scrubber,
            chat,
            transcriber,
            pipeline: TranscriptPipeline::new(),
        }
    }

    /// Replace the post-processing pipeline.
    pub fn with_pipeline(mut self, pipeline: TranscriptPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn pipeline(&self) -> &TranscriptPipeline {
        &self.pipeline
    }

    /// Transcribe audio and post-process the transcript.
    ///
    /// A hallucinated transcript is returned with `is_hallucination` set.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), bytes = audio.len()))]
    pub async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> ScribeResult<TranscriptResult> {
        if audio.is_empty() {
            return Err(ScribeError::EmptyAudio);
        }

        let raw = self
            .transcriber
            .transcribe(audio, language)
            .await
            .map_err(ScribeError::Transcription)?;

        let result = self.pipeline.process(&raw);
        if result.is_hallucination {
            warn!(transcript = %fingerprint(&raw), "recording looks like non-clinical audio");
        }
        Ok(result)
    }

    /// Generate structured note sections from a transcript.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), sections = request.sections.len()))]
    pub async fn generate_sections(&self, request: &SectionRequest) -> ScribeResult<Vec<NoteSection>> {
        let mut session = self.scrubber.session();
        let transcript = session.scrub(&request.transcript).await?;

        let prompt = make_section_prompt(&transcript, &request.sections, request.verbosity, &request.specialty);
        let (raw, mapping) = self.complete(session, &prompt, SECTION_TEMPERATURE).await?;

        let sections = match parse_reply(&raw).and_then(|v| parse_sections(mapping.reinject_value(v))) {
            Ok(sections) => sections,
            Err(err) => {
                warn!(error = %err, "section reply not structured, using fallback section");
                vec![NoteSection {
                    name: FALLBACK_SECTION.to_string(),
                    content: mapping.reinject(&raw),
                    confidence: FALLBACK_CONFIDENCE,
                }]
            }
        };

        info!(sections = sections.len(), "sections generated");
        Ok(sections)
    }

    /// Expert analysis of one section, with citations and suggestions.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn focused_analysis(&self, request: &FocusedRequest) -> ScribeResult<FocusedAnalysis> {
        let mut session = self.scrubber.session();
        let content = session.scrub(&request.content).await?;
        let transcript = session.scrub_optional(Some(request.transcript.as_str())).await?;

        let prompt = make_focused_prompt(&request.section_name, &content, &transcript, &request.specialty);
        let (raw, mapping) = self.complete(session, &prompt, FOCUSED_TEMPERATURE).await?;

        let analysis = parse_reply(&raw)
            .and_then(|v| parse_focused(mapping.reinject_value(v)))
            .unwrap_or_else(|err| {
                warn!(error = %err, "focused reply not structured, returning plain analysis");
                FocusedAnalysis::from_text(mapping.reinject(&raw))
            });

        info!(
            citations = analysis.citations.len(),
            suggestions = analysis.suggestions.len(),
            "focused analysis complete"
        );
        Ok(analysis)
    }

    /// Turn a chat answer into note text for `destination_section`.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn ghost_write(&self, request: &GhostWriteRequest) -> ScribeResult<String> {
        let mut session = self.scrubber.session();
        let answer = session.scrub(&request.chat_answer).await?;
        let existing = session.scrub_optional(Some(request.existing_content.as_str())).await?;

        let prompt = make_ghost_write_prompt(
            &answer,
            &request.destination_section,
            &existing,
            &request.note_type,
            request.verbosity,
            &request.specialty,
        );
        let (raw, mapping) = self.complete(session, &prompt, GHOST_WRITE_TEMPERATURE).await?;

        Ok(mapping.reinject(&raw))
    }

    /// Resolve a suggestion into note text, or a question with options.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn resolve_suggestion(&self, request: &ResolveRequest) -> ScribeResult<SuggestionResolution> {
        let mut session = self.scrubber.session();
        let suggestion = session.scrub(&request.suggestion).await?;
        let existing = session.scrub_optional(Some(request.existing_content.as_str())).await?;
        let transcript = session.scrub_optional(Some(request.transcript.as_str())).await?;

        let prompt = make_resolve_prompt(&SuggestionContext {
            suggestion: &suggestion,
            section_name: &request.section_name,
            existing_content: &existing,
            transcript: &transcript,
            note_type: &request.note_type,
            verbosity: request.verbosity,
            specialty: &request.specialty,
        });
        let (raw, mapping) = self.complete(session, &prompt, RESOLVE_TEMPERATURE).await?;

        let resolution = parse_reply(&raw)
            .and_then(|v| parse_resolution(mapping.reinject_value(v)))
            .unwrap_or_else(|err| {
                warn!(error = %err, "resolution reply not structured, treating as note text");
                SuggestionResolution::Ready {
                    note_text: mapping.reinject(&raw),
                }
            });
        Ok(resolution)
    }

    /// Clinical chat. System-role turns are dropped; the system prompt is built here.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), turns = request.messages.len()))]
    pub async fn chat(&self, request: &ChatRequest) -> ScribeResult<String> {
        let mut session = self.scrubber.session();
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in request.messages.iter().filter(|m| m.role != Role::System) {
            messages.push(ChatMessage {
                role: message.role,
                content: session.scrub(&message.content).await?,
            });
        }

        let system = make_chat_system_prompt(&request.specialty);
        let mapping = session.into_mapping();
        let raw = self
            .chat
            .chat(&system, &messages, &ChatOptions::with_temperature(CHAT_TEMPERATURE))
            .await
            .map_err(ScribeError::Chat)?;

        Ok(mapping.reinject(&raw))
    }

    /// Send a single-turn prompt; returns the raw reply and the session mapping.
    async fn complete(
        &self,
        session: ScrubSession<'_>,
        prompt: &Prompt,
        temperature: f64,
    ) -> ScribeResult<(String, SubstitutionMap)> {
        let mapping = session.into_mapping();
        info!(tokens = mapping.len(), temperature, "calling chat model");

        let raw = self
            .chat
            .chat(
                &prompt.system,
                &[ChatMessage::user(prompt.user.as_str())],
                &ChatOptions::with_temperature(temperature),
            )
            .await
            .map_err(ScribeError::Chat)?;

        Ok((raw, mapping))
    }
}
