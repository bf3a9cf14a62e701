use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::flags::{iso_now, AiDetectionFlag};
use crate::settings::Settings;

pub const SUBMISSION_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid submission JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no submission for assignment {assignment_id} by student {student_id}")]
    NotFound {
        assignment_id: String,
        student_id: String,
    },
    #[error("cannot {action} a submission that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SubmissionStatus,
    },
    #[error("score {score} is outside 0..={max_score}")]
    InvalidScore { score: i32, max_score: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Graded,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Graded => "graded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub version: String,
    pub class_id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub student_name: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub flags: Vec<AiDetectionFlag>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub max_score: Option<i32>,
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

impl Submission {
    pub fn new_draft(settings: &Settings, assignment_id: &str) -> Self {
        let now = iso_now();
        Self {
            version: SUBMISSION_VERSION.to_string(),
            class_id: or_placeholder(&settings.student.class_id, "class"),
            assignment_id: assignment_id.to_string(),
            student_id: student_key(settings),
            student_name: or_placeholder(&settings.student.student_name, "Student"),
            status: SubmissionStatus::Draft,
            content: String::new(),
            flags: Vec::new(),
            score: None,
            max_score: None,
            feedback: None,
            created_at: now.clone(),
            updated_at: now,
            submitted_at: None,
        }
    }

    pub fn highest_flag_confidence(&self) -> Option<f64> {
        self.flags.iter().map(|f| f.confidence).reduce(f64::max)
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

pub fn submissions_dir(base: &Path) -> PathBuf {
    base.join("submissions")
}

pub fn submission_path(base: &Path, assignment_id: &str, student_id: &str) -> PathBuf {
    submissions_dir(base).join(format!(
        "submission_{}_{}.json",
        file_safe(assignment_id),
        file_safe(student_id)
    ))
}

// Percent-encodes every byte outside `[A-Za-z0-9-]`. The output never holds
// `_`, so the separator in `submission_path` keeps distinct ids apart.
fn file_safe(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn read_submission(path: &Path) -> Result<Submission, StoreError> {
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_submission(
    base: &Path,
    assignment_id: &str,
    student_id: &str,
) -> Result<Submission, StoreError> {
    let path = submission_path(base, assignment_id, student_id);
    if !path.exists() {
        return Err(StoreError::NotFound {
            assignment_id: assignment_id.to_string(),
            student_id: student_id.to_string(),
        });
    }
    let submission = read_submission(&path)?;
    if submission.assignment_id != assignment_id || submission.student_id != student_id {
        warn!(
            path = %path.display(),
            stored_assignment = %submission.assignment_id,
            stored_student = %submission.student_id,
            "submission file belongs to someone else"
        );
        return Err(StoreError::NotFound {
            assignment_id: assignment_id.to_string(),
            student_id: student_id.to_string(),
        });
    }
    Ok(submission)
}

pub fn save_submission(base: &Path, submission: &Submission) -> Result<PathBuf, StoreError> {
    let dir = submissions_dir(base);
    fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
        path: dir.clone(),
        source,
    })?;
    let path = submission_path(base, &submission.assignment_id, &submission.student_id);
    let json = serde_json::to_string_pretty(submission).map_err(|source| StoreError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Id the current student's files are stored under.
pub fn student_key(settings: &Settings) -> String {
    or_placeholder(&settings.student.student_id, "student-id")
}

/// The current student's submission for `assignment_id`, or a fresh draft.
pub fn load_or_create_draft(
    base: &Path,
    settings: &Settings,
    assignment_id: &str,
) -> Result<Submission, StoreError> {
    let student_id = student_key(settings);
    match load_submission(base, assignment_id, &student_id) {
        Ok(existing) => Ok(existing),
        Err(StoreError::NotFound { .. }) => Ok(Submission::new_draft(settings, assignment_id)),
        Err(e) => Err(e),
    }
}

pub fn append_flag(
    base: &Path,
    assignment_id: &str,
    student_id: &str,
    flag: AiDetectionFlag,
) -> Result<Submission, StoreError> {
    let mut submission = load_submission(base, assignment_id, student_id)?;
    submission.flags.push(flag);
    submission.updated_at = iso_now();
    save_submission(base, &submission)?;
    Ok(submission)
}

pub fn submit(base: &Path, assignment_id: &str, student_id: &str) -> Result<Submission, StoreError> {
    let mut submission = load_submission(base, assignment_id, student_id)?;
    if submission.status == SubmissionStatus::Graded {
        return Err(StoreError::InvalidTransition {
            action: "submit",
            status: submission.status,
        });
    }
    let now = iso_now();
    submission.status = SubmissionStatus::Submitted;
    submission.submitted_at = Some(now.clone());
    submission.updated_at = now;
    save_submission(base, &submission)?;
    info!(assignment_id, student_id, flags = submission.flags.len(), "submission handed in");
    Ok(submission)
}

pub fn grade(
    base: &Path,
    assignment_id: &str,
    student_id: &str,
    score: i32,
    max_score: i32,
    feedback: Option<String>,
) -> Result<Submission, StoreError> {
    if score < 0 || max_score <= 0 || score > max_score {
        return Err(StoreError::InvalidScore { score, max_score });
    }
    let mut submission = load_submission(base, assignment_id, student_id)?;
    if submission.status == SubmissionStatus::Draft {
        return Err(StoreError::InvalidTransition {
            action: "grade",
            status: submission.status,
        });
    }
    submission.status = SubmissionStatus::Graded;
    submission.score = Some(score);
    submission.max_score = Some(max_score);
    submission.feedback = feedback;
    submission.updated_at = iso_now();
    save_submission(base, &submission)?;
    info!(assignment_id, student_id, score, max_score, "submission graded");
    Ok(submission)
}

/// Every readable submission under `<base>/submissions`. Broken files are
/// logged and skipped.
pub fn load_all_submissions(base: &Path) -> Result<Vec<Submission>, StoreError> {
    let dir = submissions_dir(base);
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }

    let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
        path: dir.clone(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        match read_submission(&path) {
            Ok(sub) => out.push(sub),
            Err(e) => warn!(error = %e, "skipping submission file"),
        }
    }

    out.sort_by(|a, b| {
        a.assignment_id
            .cmp(&b.assignment_id)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    Ok(out)
}
