//! Prompts for the note-assist workflows.
//!
//! Every builder receives text that has already been scrubbed; prompts ask the
//! model to carry privacy tokens through unchanged.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SPECIALTY: &str = "hospital_medicine";
pub const DEFAULT_NOTE_TYPE: &str = "progress_note";

/// Character caps on context excerpts.
pub const FOCUSED_TRANSCRIPT_EXCERPT: usize = 500;
pub const GHOST_WRITE_EXISTING_EXCERPT: usize = 300;
pub const RESOLVE_EXISTING_EXCERPT: usize = 400;
pub const RESOLVE_TRANSCRIPT_EXCERPT: usize = 800;

/// Steers the model toward ICD-10-CM preferred terminology.
pub const ICD10_INSTRUCTION: &str = concat!(
    "Use ICD-10-CM preferred terminology throughout. Examples: ",
    "'essential (primary) hypertension' not 'high blood pressure'; ",
    "'Type 2 diabetes mellitus' not 'diabetes' or 'diabetic'; ",
    "specify systolic/diastolic and acute/chronic/acute-on-chronic for heart failure; ",
    "'COPD with acute exacerbation' or 'COPD without acute exacerbation' not 'COPD' alone; ",
    "'sequelae of CVA with [deficit]' not 'history of stroke' when deficits persist. ",
    "Avoid 'history of [condition]' for conditions still actively managed."
);

/// Asks the model to leave scrub tokens intact so they can be restored.
pub const TOKEN_PRESERVATION_INSTRUCTION: &str = concat!(
    "\nText may contain privacy-protection tokens in [TOKEN_N] format ",
    "(e.g., [PERSON_0], [DATE_0], [MRN_0]). ",
    "Preserve these tokens exactly as written; do not rephrase, remove, ",
    "or modify any [BRACKET_N] token."
);

/// Output register for generated note text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Verbosity {
    Brief,
    #[default]
    Standard,
    Detailed,
}

impl Verbosity {
    /// Parse a verbosity name; anything unrecognized is `Standard`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "brief" => Verbosity::Brief,
            "detailed" => Verbosity::Detailed,
            _ => Verbosity::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Brief => "brief",
            Verbosity::Standard => "standard",
            Verbosity::Detailed => "detailed",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Verbosity::Brief => concat!(
                "Write in clinical shorthand using standard medical abbreviations. ",
                "Use sentence fragments; do NOT write complete sentences. ",
                "Style example: \"D/C CTX; start meropenem 1g IV q8h, renally adj. ",
                "ID consult placed.\""
            ),
            Verbosity::Standard => concat!(
                "Write 1-2 concise clinical sentences. ",
                "Use medical abbreviations where natural (e.g., IV, q8h, D/C, s/p)."
            ),
            Verbosity::Detailed => concat!(
                "Write in complete clinical prose with full sentences. ",
                "Include clinical reasoning and context where relevant."
            ),
        }
    }
}

impl From<String> for Verbosity {
    fn from(name: String) -> Self {
        Verbosity::from_name(&name)
    }
}

/// A note section to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTemplate {
    pub name: String,
    /// Optional guidance shown next to the section name
    #[serde(default)]
    pub prompt_hint: String,
}

impl SectionTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_hint: String::new(),
        }
    }
}

/// System and user prompt for one chat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// First `max_chars` characters of `text`, never ending inside a `[TOKEN_N]`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    let end = match text.char_indices().nth(max_chars) {
        Some((end, _)) => end,
        None => return text,
    };
    let head = &text[..end];
    match head.rfind('[') {
        Some(open) if is_token_prefix(&head[open + 1..]) => &text[..open],
        _ => head,
    }
}

/// Inside of an unclosed token: category letters, underscore, index digits.
fn is_token_prefix(inner: &str) -> bool {
    inner
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn shared_instructions() -> String {
    format!("{}{}", ICD10_INSTRUCTION, TOKEN_PRESERVATION_INSTRUCTION)
}

/// Transcript + section templates → structured section JSON.
pub fn make_section_prompt(
    transcript: &str,
    sections: &[SectionTemplate],
    verbosity: Verbosity,
    specialty: &str,
) -> Prompt {
    let section_list = sections
        .iter()
        .map(|s| {
            if s.prompt_hint.is_empty() {
                format!("- {}", s.name)
            } else {
                format!("- {} ({})", s.name, s.prompt_hint)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let system = format!(
        "You are a clinical documentation AI assistant for a {specialty} physician.\n\
         Generate structured note content for each section listed below, based ONLY on the transcript provided.\n\
         Write in first-person plural physician voice (\"We assessed...\", \"The patient was...\", \"Our plan includes...\").\n\
         Be clinically precise. Do not fabricate findings not present in the transcript.\n\
         If a section cannot be completed from the transcript, write: \"Insufficient information captured.\"\n\
         Return ONLY valid JSON, no markdown fences, no extra text.\n\
         {}\n{}",
        verbosity.instruction(),
        shared_instructions(),
    );

    let user = format!(
        "Transcript:\n\"{transcript}\"\n\n\
         Generate content for these sections:\n{section_list}\n\n\
         Return JSON with this exact structure:\n\
         {{\n  \"sections\": [\n    {{ \"name\": \"Section Name\", \"content\": \"Section text here\", \"confidence\": 0.0 }}\n  ]\n}}\n\
         Confidence is 0.0-1.0: 1.0 = fully supported by transcript, 0.0 = not in transcript at all."
    );

    Prompt { system, user }
}

/// Deep analysis of one note section.
pub fn make_focused_prompt(section_name: &str, content: &str, transcript: &str, specialty: &str) -> Prompt {
    let transcript_part = if transcript.is_empty() {
        String::new()
    } else {
        format!(
            "\nTranscript excerpt: \"{}\"",
            excerpt(transcript, FOCUSED_TRANSCRIPT_EXCERPT)
        )
    };

    let system = format!(
        "You are a senior {specialty} physician AI providing expert clinical analysis.\n\
         Analyze the provided note section and return structured JSON only, no markdown, no extra text.\n\
         {}",
        shared_instructions(),
    );

    let user = format!(
        "Analyze this note section and provide deep clinical insight.\n\n\
         Section: {section_name}\n\
         Content: \"{content}\"{transcript_part}\n\
         Specialty: {specialty}\n\n\
         Return JSON:\n\
         {{\n  \"analysis\": \"Expanded clinical reasoning and context for this section\",\n  \
         \"citations\": [\n    {{ \"guideline\": \"Guideline name\", \"year\": \"2024\", \"recommendation\": \"Specific recommendation text\" }}\n  ],\n  \
         \"suggestions\": [\"Clinically relevant item the note may be missing\"],\n  \
         \"confidence_breakdown\": \"Which claims are well-supported vs inferred\"\n}}\n\n\
         For ICU sections, cite: Surviving Sepsis Campaign, ARDS Network, PADIS guidelines, AHA/ACC, NCS.\n\
         For general medicine: ACC/AHA, IDSA, UpToDate-style evidence summaries.\n\
         Keep each field concise. Suggestions should be actionable one-liners."
    );

    Prompt { system, user }
}

/// Turn a chat answer into note text for a destination section.
pub fn make_ghost_write_prompt(
    answer: &str,
    destination_section: &str,
    existing_content: &str,
    note_type: &str,
    verbosity: Verbosity,
    specialty: &str,
) -> Prompt {
    let existing_part = if existing_content.is_empty() {
        String::new()
    } else {
        format!(
            "\nExisting section content (match this style):\n\"{}\"",
            excerpt(existing_content, GHOST_WRITE_EXISTING_EXCERPT)
        )
    };

    let system = format!(
        "You are a clinical documentation AI. Convert clinical information into physician note text.\n\
         Output ONLY the note text: no explanation, no JSON, no markdown, no preamble.\n\
         Never include notes about transcription quality, source artifacts, uncertainty about the source material, or any meta-commentary.\n\
         Never include caveats, disclaimers, or any text that would not appear verbatim in a physician's clinical note.\n\
         {}",
        shared_instructions(),
    );

    let user = format!(
        "Convert the following clinical information into note text for the \"{destination_section}\" section.\n\
         {}\n\
         Match the style of the existing section content if provided.\n\n\
         Clinical information:\n\"{answer}\"\n\n\
         Note type: {note_type}\n\
         Specialty: {specialty}{existing_part}\n\n\
         Output ONLY the note text. Nothing else.",
        verbosity.instruction(),
    );

    Prompt { system, user }
}

/// Context for resolving a focused-analysis suggestion.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    pub suggestion: &'a str,
    pub section_name: &'a str,
    pub existing_content: &'a str,
    pub transcript: &'a str,
    pub note_type: &'a str,
    pub verbosity: Verbosity,
    pub specialty: &'a str,
}

/// Resolve a suggestion into note text, or a clarifying question.
pub fn make_resolve_prompt(ctx: &SuggestionContext<'_>) -> Prompt {
    let existing_part = if ctx.existing_content.is_empty() {
        String::new()
    } else {
        format!(
            "\nExisting content:\n\"{}\"",
            excerpt(ctx.existing_content, RESOLVE_EXISTING_EXCERPT)
        )
    };
    let transcript_part = if ctx.transcript.is_empty() {
        String::new()
    } else {
        format!(
            "\nTranscript:\n\"{}\"",
            excerpt(ctx.transcript, RESOLVE_TRANSCRIPT_EXCERPT)
        )
    };

    let system = format!(
        "You are a clinical documentation AI for a {} physician. \
         Your job is to convert a documentation suggestion into actual physician note text.\n\n\
         First, search the provided transcript and existing section content for the clinical detail referenced in the suggestion.\n\
         - If the detail is present or unambiguously inferable, write the note text and return ready=true.\n\
         - If a clinically critical detail is genuinely absent, return ready=false with a single focused clinical question and exactly 3 options.\n\n\
         Rules for options when ready=false:\n\
         - Provide exactly 3 options: the most clinically common and specific answers.\n\
         - Options must be real clinical values (e.g. \"Left MCA\", \"HFrEF\", \"EF 35%\"), not vague placeholders.\n\
         - Do NOT include escape options like \"Not yet determined\", \"Unknown\", or \"Other\".\n\n\
         Rules for note text when ready=true:\n{}\n\
         Never include notes about transcription quality, source artifacts, or meta-commentary.\n\
         Never include the suggestion text itself, caveats, or guidance.\n\n\
         Return ONLY valid JSON. No markdown fences. No extra text.\n\
         {}",
        ctx.specialty,
        ctx.verbosity.instruction(),
        shared_instructions(),
    );

    let user = format!(
        "Suggestion to resolve: \"{}\"\n\n\
         Section: {}\n\
         Note type: {}\n\
         Specialty: {}{}{}\n\n\
         Return one of these two JSON shapes:\n\
         {{ \"ready\": true, \"noteText\": \"...\" }}\n\
         {{ \"ready\": false, \"question\": \"...\", \"options\": [\"<value>\", \"<value>\", \"<value>\"] }}",
        ctx.suggestion, ctx.section_name, ctx.note_type, ctx.specialty, existing_part, transcript_part,
    );

    Prompt { system, user }
}

/// System prompt for free-form clinical chat.
pub fn make_chat_system_prompt(specialty: &str) -> String {
    format!(
        "You are a clinical documentation AI assistant for a {specialty} physician. \
         Help with clinical note writing, summarisation, and documentation questions. \
         Be concise and clinically precise.\n{}",
        shared_instructions(),
    )
}
