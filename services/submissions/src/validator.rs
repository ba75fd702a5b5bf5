use crate::submission::{content_type_for, EventType};
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

/// Form fields and file parts as received, before any checks
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    pub full_name: String,
    pub college_name: String,
    pub year: Option<String>,
    pub branch: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub event_type: String,
    pub project_title: String,
    pub git_repository_url: Option<String>,
    pub files: Vec<IncomingFile>,
}

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    /// Declared content type, or one derived from the extension
    pub fn resolved_content_type(&self) -> String {
        match self.content_type.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => content_type_for(&self.file_name),
        }
    }
}

/// A submission that passed validation, trimmed and typed
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub full_name: String,
    pub college_name: String,
    pub year: Option<String>,
    pub branch: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub event_type: EventType,
    pub project_title: String,
    pub git_repository_url: Option<String>,
    pub files: Vec<IncomingFile>,
}

/// User-correctable problems with a submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    #[error("Git repository URL is required for Web Designing submissions")]
    MissingRepositoryUrl,

    #[error("File upload is required for this event type")]
    NoFilesProvided,

    #[error("Too many files for {event_type}: {count} provided, at most {max} allowed")]
    TooManyFiles {
        event_type: EventType,
        count: usize,
        max: usize,
    },

    #[error("File \"{file_name}\" is not an accepted file type for {event_type}")]
    UnsupportedFileType {
        event_type: EventType,
        file_name: String,
    },

    #[error("File \"{file_name}\" exceeds the maximum size of {max_bytes} bytes")]
    FileTooLarge { file_name: String, max_bytes: usize },
}

impl ValidationError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "MISSING_FIELD",
            ValidationError::InvalidEventType(_) => "INVALID_EVENT_TYPE",
            ValidationError::MissingRepositoryUrl => "MISSING_REPOSITORY_URL",
            ValidationError::NoFilesProvided => "NO_FILES_PROVIDED",
            ValidationError::TooManyFiles { .. } => "TOO_MANY_FILES",
            ValidationError::UnsupportedFileType { .. } => "UNSUPPORTED_FILE_TYPE",
            ValidationError::FileTooLarge { .. } => "FILE_TOO_LARGE",
        }
    }
}

/// Checks required fields and category rules; never touches storage
#[derive(Debug, Clone)]
pub struct SubmissionValidator {
    max_file_size_bytes: usize,
}

impl SubmissionValidator {
    pub fn new(max_file_size_bytes: usize) -> Self {
        Self {
            max_file_size_bytes,
        }
    }

    pub fn validate(&self, raw: RawSubmission) -> Result<ValidSubmission, ValidationError> {
        let full_name = required("fullName", &raw.full_name)?;
        let college_name = required("collegeName", &raw.college_name)?;
        let branch = required("branch", &raw.branch)?;
        let contact_email = required("contactEmail", &raw.contact_email)?;
        let contact_phone = required("contactPhone", &raw.contact_phone)?;
        let event_type = required("eventType", &raw.event_type)?;
        let project_title = required("projectTitle", &raw.project_title)?;

        let event_type: EventType = event_type
            .parse()
            .map_err(|_| ValidationError::InvalidEventType(event_type))?;
        let rules = event_type.rules();

        let git_repository_url = optional(raw.git_repository_url.as_deref());
        let year = optional(raw.year.as_deref());

        let (git_repository_url, files) = if rules.requires_repository_url {
            let url = git_repository_url.ok_or(ValidationError::MissingRepositoryUrl)?;
            if !raw.files.is_empty() {
                warn!(
                    event_type = %event_type,
                    ignored = raw.files.len(),
                    "Ignoring file parts sent with a repository-only submission"
                );
            }
            (Some(url), Vec::new())
        } else {
            self.check_files(event_type, &raw.files)?;
            (None, raw.files)
        };

        Ok(ValidSubmission {
            full_name,
            college_name,
            year,
            branch,
            contact_email,
            contact_phone,
            event_type,
            project_title,
            git_repository_url,
            files,
        })
    }

    fn check_files(
        &self,
        event_type: EventType,
        files: &[IncomingFile],
    ) -> Result<(), ValidationError> {
        let rules = event_type.rules();

        if files.is_empty() {
            return Err(ValidationError::NoFilesProvided);
        }

        if files.len() > rules.max_files {
            return Err(ValidationError::TooManyFiles {
                event_type,
                count: files.len(),
                max: rules.max_files,
            });
        }

        for file in files {
            if file.data.len() > self.max_file_size_bytes {
                return Err(ValidationError::FileTooLarge {
                    file_name: file.file_name.clone(),
                    max_bytes: self.max_file_size_bytes,
                });
            }

            if !rules.accepts(&file.file_name, &file.resolved_content_type()) {
                return Err(ValidationError::UnsupportedFileType {
                    event_type,
                    file_name: file.file_name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            data: Bytes::from_static(b"payload"),
        }
    }

    fn raw(event_type: &str) -> RawSubmission {
        RawSubmission {
            full_name: " Asha Rao ".to_string(),
            college_name: "Govt. Engineering College".to_string(),
            year: Some("3rd".to_string()),
            branch: "CSE".to_string(),
            contact_email: "asha@example.org".to_string(),
            contact_phone: "+91 9000000000".to_string(),
            event_type: event_type.to_string(),
            project_title: "Edge inference".to_string(),
            git_repository_url: None,
            files: vec![],
        }
    }

    #[test]
    fn test_valid_paper_presentation_is_trimmed() {
        let validator = SubmissionValidator::new(1024);
        let mut input = raw("Paper Presentation");
        input.files = vec![file("paper.pdf", "application/pdf")];

        let valid = validator.validate(input).unwrap();
        assert_eq!(valid.full_name, "Asha Rao");
        assert_eq!(valid.event_type, EventType::PaperPresentation);
        assert_eq!(valid.files.len(), 1);
        assert!(valid.git_repository_url.is_none());
    }

    #[test]
    fn test_missing_field_reports_form_name() {
        let validator = SubmissionValidator::new(1024);
        let mut input = raw("Paper Presentation");
        input.contact_phone = "   ".to_string();

        assert_eq!(
            validator.validate(input).unwrap_err(),
            ValidationError::MissingField("contactPhone")
        );
    }

    #[test]
    fn test_empty_event_type_is_missing_not_invalid() {
        let validator = SubmissionValidator::new(1024);
        assert_eq!(
            validator.validate(raw("")).unwrap_err(),
            ValidationError::MissingField("eventType")
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let validator = SubmissionValidator::new(1024);
        assert!(matches!(
            validator.validate(raw("Quiz")),
            Err(ValidationError::InvalidEventType(t)) if t == "Quiz"
        ));
    }

    #[test]
    fn test_web_designing_requires_repository_url() {
        let validator = SubmissionValidator::new(1024);
        assert_eq!(
            validator.validate(raw("Web Designing")).unwrap_err(),
            ValidationError::MissingRepositoryUrl
        );

        let mut input = raw("Web Designing");
        input.git_repository_url = Some("https://github.com/asha/site".to_string());
        input.files = vec![file("stray.pdf", "application/pdf")];
        let valid = validator.validate(input).unwrap();
        assert_eq!(
            valid.git_repository_url.as_deref(),
            Some("https://github.com/asha/site")
        );
        assert!(valid.files.is_empty());
    }

    #[test]
    fn test_repository_url_dropped_for_other_categories() {
        let validator = SubmissionValidator::new(1024);
        let mut input = raw("Code Debugging");
        input.git_repository_url = Some("https://github.com/asha/fix".to_string());
        input.files = vec![file("fix.zip", "application/zip")];

        assert!(validator.validate(input).unwrap().git_repository_url.is_none());
    }

    #[test]
    fn test_no_files_provided() {
        let validator = SubmissionValidator::new(1024);
        assert_eq!(
            validator.validate(raw("Code Debugging")).unwrap_err(),
            ValidationError::NoFilesProvided
        );
    }

    #[test]
    fn test_file_cap_per_category() {
        let validator = SubmissionValidator::new(1024);

        let mut reels = raw("Reels & Photography");
        reels.files = vec![file("a.jpg", "image/jpeg"), file("b.mp4", "video/mp4")];
        assert!(validator.validate(reels.clone()).is_ok());

        reels.files.push(file("c.png", "image/png"));
        assert!(matches!(
            validator.validate(reels),
            Err(ValidationError::TooManyFiles { count: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_unsupported_file_type() {
        let validator = SubmissionValidator::new(1024);
        let mut input = raw("Paper Presentation");
        input.files = vec![file("selfie.jpg", "image/jpeg")];

        assert!(matches!(
            validator.validate(input),
            Err(ValidationError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn test_file_too_large() {
        let validator = SubmissionValidator::new(3);
        let mut input = raw("Paper Presentation");
        input.files = vec![file("paper.pdf", "application/pdf")];

        assert!(matches!(
            validator.validate(input),
            Err(ValidationError::FileTooLarge { max_bytes: 3, .. })
        ));
    }

    #[test]
    fn test_resolved_content_type_falls_back_to_extension() {
        let f = IncomingFile {
            file_name: "clip.mov".to_string(),
            content_type: None,
            data: Bytes::new(),
        };
        assert_eq!(f.resolved_content_type(), "video/quicktime");
    }
}
