use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::detector::{analyze, Verdict};
use crate::flags::{iso_now, AiDetectionFlag, PasteDecision, PasteWarning};
use crate::settings::{PasteGuardConfig, Settings};
use crate::submissions::{
    load_or_create_draft, save_submission, StoreError, Submission, SubmissionStatus,
};

/// Put between an existing draft and newly pasted text.
pub const PASTE_SEPARATOR: &str = "\n";

#[derive(Debug, Error)]
pub enum PasteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("assignment {0} is already graded and cannot be edited")]
    Graded(String),
    #[error("no decision for the paste warning: {0}")]
    Decision(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PasteOutcome {
    NothingAdded,
    Cancelled,
    Saved {
        path: PathBuf,
        flags_recorded: usize,
        flags_failed: usize,
    },
}

/// Result of comparing two versions of a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct PasteCheck {
    pub added: String,
    pub verdict: Verdict,
    pub needs_warning: bool,
    pub flag: Option<AiDetectionFlag>,
}

impl PasteCheck {
    pub fn warning(&self) -> PasteWarning {
        PasteWarning::new(&self.added)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteResolution {
    pub content: String,
    pub accepted: bool,
    pub flags: Vec<AiDetectionFlag>,
}

/// Text inserted into `current` relative to `previous`: whatever lies between
/// their common prefix and common suffix.
pub fn added_text<'a>(previous: &str, current: &'a str) -> Option<&'a str> {
    let prefix = common_prefix_len(previous, current);
    let prev_rest = &previous[prefix..];
    let cur_rest = &current[prefix..];
    let suffix = common_suffix_len(prev_rest, cur_rest);
    let added = &cur_rest[..cur_rest.len() - suffix];
    if added.is_empty() {
        None
    } else {
        Some(added)
    }
}

// Byte length of the common prefix; always on a char boundary in both strings.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(ca, cb)| ca == cb)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

pub fn check_addition(previous: &str, current: &str, cfg: &PasteGuardConfig) -> Option<PasteCheck> {
    let added = added_text(previous, current)?;
    let verdict = analyze(added);
    let needs_warning =
        cfg.warn_on_paste && added.chars().count() >= cfg.paste_warning_min_chars;
    let flag = verdict
        .is_likely_ai
        .then(|| AiDetectionFlag::from_verdict(added, &verdict));

    debug!(
        added_chars = added.chars().count(),
        confidence = verdict.confidence,
        needs_warning,
        "checked draft addition"
    );

    Some(PasteCheck {
        added: added.to_string(),
        verdict,
        needs_warning,
        flag,
    })
}

/// Apply the student's answer to a paste warning.
///
/// A cancelled paste keeps `previous` untouched and records nothing.
pub fn resolve_paste(
    previous: &str,
    current: &str,
    check: PasteCheck,
    decision: &PasteDecision,
    cfg: &PasteGuardConfig,
) -> PasteResolution {
    let source = match decision {
        PasteDecision::Cancel => {
            return PasteResolution {
                content: previous.to_string(),
                accepted: false,
                flags: Vec::new(),
            }
        }
        PasteDecision::ConfirmWithSource(src) => Some(src.as_str()),
        PasteDecision::ConfirmWithoutSource => None,
    };

    let mut flags = Vec::new();
    match check.flag {
        Some(mut flag) => {
            if let Some(src) = source.map(str::trim).filter(|s| !s.is_empty()) {
                flag.details = format!("{}; uvedený zdroj: {src}", flag.details);
            }
            flags.push(flag);
        }
        None if check.needs_warning && cfg.record_large_pastes => {
            flags.push(AiDetectionFlag::large_paste(
                &check.added,
                check.verdict.confidence,
                source,
            ));
        }
        None => {}
    }

    PasteResolution {
        content: current.to_string(),
        accepted: true,
        flags,
    }
}

/// Add `pasted` to the current student's draft for `assignment_id`.
///
/// The separator belongs to the old content, so the scorer sees `pasted`
/// exactly as given. `decide` is only asked when a warning is due and no
/// `source` was supplied. The draft is saved before any flag is recorded;
/// a flag that cannot be recorded is logged and counted, never returned as
/// an error.
pub fn paste_into_draft<D, R>(
    base: &Path,
    settings: &Settings,
    assignment_id: &str,
    pasted: &str,
    source: Option<String>,
    decide: D,
    mut record_flag: R,
) -> Result<PasteOutcome, PasteError>
where
    D: FnOnce(&PasteCheck) -> io::Result<PasteDecision>,
    R: FnMut(&Submission, AiDetectionFlag) -> Result<Submission, StoreError>,
{
    let mut draft = load_or_create_draft(base, settings, assignment_id)?;
    if draft.status == SubmissionStatus::Graded {
        return Err(PasteError::Graded(assignment_id.to_string()));
    }

    let previous = if draft.content.is_empty() {
        String::new()
    } else {
        format!("{}{PASTE_SEPARATOR}", draft.content)
    };
    let current = format!("{previous}{pasted}");

    let Some(check) = check_addition(&previous, &current, &settings.paste_guard) else {
        return Ok(PasteOutcome::NothingAdded);
    };

    let decision = match source {
        Some(src) => PasteDecision::ConfirmWithSource(src),
        None if check.needs_warning => decide(&check).map_err(PasteError::Decision)?,
        None => PasteDecision::ConfirmWithoutSource,
    };

    let resolution = resolve_paste(&previous, &current, check, &decision, &settings.paste_guard);
    if !resolution.accepted {
        return Ok(PasteOutcome::Cancelled);
    }

    draft.content = resolution.content;
    draft.updated_at = iso_now();
    let path = save_submission(base, &draft)?;

    let mut flags_recorded = 0;
    let mut flags_failed = 0;
    for flag in resolution.flags {
        let confidence = flag.confidence;
        match record_flag(&draft, flag) {
            Ok(_) => {
                flags_recorded += 1;
                info!(assignment_id, confidence, "recorded detection flag");
            }
            Err(e) => {
                flags_failed += 1;
                warn!(error = %e, "could not record detection flag");
            }
        }
    }

    Ok(PasteOutcome::Saved {
        path,
        flags_recorded,
        flags_failed,
    })
}
