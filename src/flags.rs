use serde::{Deserialize, Serialize};

use crate::detector::Verdict;

pub const SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// The scorer considered the passage likely AI-generated.
    AiGenerated,
    /// A large paste the student confirmed; the scorer found nothing.
    Paste,
}

impl FlagType {
    pub fn label(&self) -> &'static str {
        match self {
            FlagType::AiGenerated => "AI",
            FlagType::Paste => "vložení",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDetectionFlag {
    #[serde(rename = "type")]
    pub kind: FlagType,
    pub confidence: f64,
    pub text_snippet: String,
    pub details: String,
    pub detected_at: String,
}

impl AiDetectionFlag {
    pub fn from_verdict(text: &str, verdict: &Verdict) -> Self {
        Self {
            kind: FlagType::AiGenerated,
            confidence: verdict.confidence,
            text_snippet: snippet(text),
            details: verdict.details(),
            detected_at: iso_now(),
        }
    }

    pub fn large_paste(text: &str, confidence: f64, source: Option<&str>) -> Self {
        let details = match source.map(str::trim).filter(|s| !s.is_empty()) {
            Some(src) => format!("Vložený text ({} slov), uvedený zdroj: {src}", word_count(text)),
            None => format!("Vložený text ({} slov) bez uvedení zdroje", word_count(text)),
        };
        Self {
            kind: FlagType::Paste,
            confidence,
            text_snippet: snippet(text),
            details,
            detected_at: iso_now(),
        }
    }
}

/// What the student sees before a large paste lands in the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteWarning {
    pub pasted_text: String,
    pub word_count: usize,
}

impl PasteWarning {
    pub fn new(pasted_text: &str) -> Self {
        Self {
            pasted_text: pasted_text.to_string(),
            word_count: word_count(pasted_text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "source")]
pub enum PasteDecision {
    ConfirmWithSource(String),
    ConfirmWithoutSource,
    Cancel,
}

/// First `SNIPPET_CHARS` characters, never splitting a character.
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn iso_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
