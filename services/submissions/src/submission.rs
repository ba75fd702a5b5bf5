use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Contest category a submission is entered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "Paper Presentation")]
    PaperPresentation,
    #[serde(rename = "Web Designing")]
    WebDesigning,
    #[serde(rename = "Reels & Photography")]
    ReelsAndPhotography,
    #[serde(rename = "Code Debugging")]
    CodeDebugging,
}

const DOCUMENT_TYPES: &[&str] = &[".pdf", ".ppt", ".pptx", ".doc", ".docx", ".txt", ".zip"];
const MEDIA_TYPES: &[&str] = &["image/*", "video/*"];

/// Per-category submission rules
///
/// The single source for file caps, repository requirements and accepted
/// upload types. Entries in `accepted_file_types` are either extensions
/// (`.pdf`) or MIME patterns (`image/*`, `application/zip`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRules {
    pub max_files: usize,
    pub requires_repository_url: bool,
    pub accepted_file_types: &'static [&'static str],
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::PaperPresentation,
        EventType::WebDesigning,
        EventType::ReelsAndPhotography,
        EventType::CodeDebugging,
    ];

    /// Human readable label, as stored and shown on the form
    pub fn label(&self) -> &'static str {
        match self {
            EventType::PaperPresentation => "Paper Presentation",
            EventType::WebDesigning => "Web Designing",
            EventType::ReelsAndPhotography => "Reels & Photography",
            EventType::CodeDebugging => "Code Debugging",
        }
    }

    /// URL-safe name used by the admin dashboard routes
    pub fn slug(&self) -> &'static str {
        match self {
            EventType::PaperPresentation => "paper-presentation",
            EventType::WebDesigning => "web-designing",
            EventType::ReelsAndPhotography => "reels-photography",
            EventType::CodeDebugging => "code-debugging",
        }
    }

    pub fn rules(&self) -> CategoryRules {
        match self {
            EventType::PaperPresentation | EventType::CodeDebugging => CategoryRules {
                max_files: 1,
                requires_repository_url: false,
                accepted_file_types: DOCUMENT_TYPES,
            },
            EventType::ReelsAndPhotography => CategoryRules {
                max_files: 2,
                requires_repository_url: false,
                accepted_file_types: MEDIA_TYPES,
            },
            EventType::WebDesigning => CategoryRules {
                max_files: 0,
                requires_repository_url: true,
                accepted_file_types: &[],
            },
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    /// Accepts either the label or the slug, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        EventType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(needle) || t.slug().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

impl CategoryRules {
    /// Check a file against the accepted types, by MIME pattern or extension
    pub fn accepts(&self, file_name: &str, content_type: &str) -> bool {
        let content_type = content_type.to_ascii_lowercase();
        let extension = file_extension(file_name).map(|e| format!(".{e}"));

        self.accepted_file_types.iter().any(|accepted| {
            if accepted.starts_with('.') {
                extension.as_deref() == Some(*accepted)
            } else if let Some(family) = accepted.strip_suffix("/*") {
                content_type
                    .split_once('/')
                    .map(|(major, _)| major == family)
                    .unwrap_or(false)
            } else {
                content_type == *accepted
            }
        })
    }
}

/// Review state of a submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A participant's entry, hydrated with its files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub full_name: String,
    pub college_name: String,
    /// Study year as typed on the form
    pub year: Option<String>,
    pub branch: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub event_type: EventType,
    pub project_title: String,
    pub git_repository_url: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<AttachedFile>,
}

/// Uploaded artifact belonging to exactly one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lowercased extension without the dot
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Derive a content type from the file extension
pub fn content_type_for(file_name: &str) -> String {
    let ext = file_extension(file_name).unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
    .to_string()
}
