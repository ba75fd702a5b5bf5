use crate::blob_store::{object_key, BlobError, BlobStore};
use crate::config::UploadConfig;
use crate::record_store::{RecordStore, StoreError};
use crate::submission::{AttachedFile, Submission, SubmissionStatus};
use crate::validator::{IncomingFile, RawSubmission, SubmissionValidator, ValidSubmission, ValidationError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// A file slot that did not end up attached to the submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    /// 1-based position of the file part in the request
    pub slot: usize,
    pub file_name: String,
    pub error: String,
}

/// Result of a stored submission
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub submission: Submission,
    pub failed_uploads: Vec<FailedUpload>,
}

impl IngestionOutcome {
    /// True when every file part was stored
    pub fn is_complete(&self) -> bool {
        self.failed_uploads.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to store submission: {0}")]
    Storage(#[from] StoreError),

    /// Every required file failed; the submission row was removed again
    #[error("all {} file uploads failed", .failures.len())]
    UploadFailed { failures: Vec<FailedUpload> },

    /// Every required file failed and the submission row is still stored without files
    #[error("all {} file uploads failed and submission {submission_id} could not be removed: {source}", .failures.len())]
    RollbackFailed {
        submission_id: Uuid,
        failures: Vec<FailedUpload>,
        source: StoreError,
    },

    #[error("submission {0} could not be read back after insert")]
    Vanished(Uuid),
}

/// Orchestrates validation, blob uploads and record writes for one submission
pub struct IngestionService {
    validator: SubmissionValidator,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    upload_timeout: Duration,
    upload_concurrency: usize,
}

impl IngestionService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        uploads: &UploadConfig,
    ) -> Self {
        Self {
            validator: SubmissionValidator::new(uploads.max_file_size_bytes),
            records,
            blobs,
            upload_timeout: uploads.timeout(),
            upload_concurrency: uploads.concurrency.max(1),
        }
    }

    /// Validate and persist one submission with its files
    ///
    /// Validation failures return before any write. A failed submission
    /// insert aborts before uploading. Individual file failures are reported
    /// in the outcome instead of failing the whole submission, unless no
    /// required file made it, in which case the submission row is deleted.
    #[instrument(skip(self, raw), fields(event_type = %raw.event_type))]
    pub async fn submit(&self, raw: RawSubmission) -> Result<IngestionOutcome, IngestionError> {
        let valid = self.validator.validate(raw).map_err(|e| {
            debug!(error = %e, "Submission rejected by validation");
            e
        })?;

        let (submission, files) = new_submission(valid);
        let submission_id = submission.id;

        self.records.insert_submission(&submission).await?;
        metrics::counter!("submissions.created").increment(1);

        info!(
            submission_id = %submission_id,
            event_type = %submission.event_type,
            file_count = files.len(),
            "Submission stored"
        );

        let attempted = files.len();
        let mut failures = Vec::new();
        let mut attached = 0usize;

        for result in self.upload_files(submission_id, files).await {
            match result {
                Ok((slot, file, key)) => match self.records.insert_file(&file).await {
                    Ok(()) => attached += 1,
                    Err(e) => {
                        error!(error = %e, key = %key, "Failed to record uploaded file");
                        self.discard_blob(&key).await;
                        failures.push(FailedUpload {
                            slot,
                            file_name: file.file_name,
                            error: e.to_string(),
                        });
                    }
                },
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            metrics::counter!("submissions.uploads.failed").increment(failures.len() as u64);
        }

        if attempted > 0 && attached == 0 {
            warn!(submission_id = %submission_id, "No file could be stored, removing submission");
            if let Err(source) = self.records.delete_submission(submission_id).await {
                metrics::counter!("submissions.rollback.failed").increment(1);
                error!(submission_id = %submission_id, error = %source, "Failed to remove submission without files");
                return Err(IngestionError::RollbackFailed {
                    submission_id,
                    failures,
                    source,
                });
            }
            return Err(IngestionError::UploadFailed { failures });
        }

        let submission = self
            .records
            .get_submission(submission_id)
            .await?
            .ok_or(IngestionError::Vanished(submission_id))?;

        Ok(IngestionOutcome {
            submission,
            failed_uploads: failures,
        })
    }

    /// Upload all files, keeping results in slot order
    async fn upload_files(
        &self,
        submission_id: Uuid,
        files: Vec<IncomingFile>,
    ) -> Vec<Result<(usize, AttachedFile, String), FailedUpload>> {
        stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| self.upload_one(submission_id, index + 1, file))
            .buffered(self.upload_concurrency)
            .collect()
            .await
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    async fn upload_one(
        &self,
        submission_id: Uuid,
        slot: usize,
        file: IncomingFile,
    ) -> Result<(usize, AttachedFile, String), FailedUpload> {
        let uploaded_at = Utc::now();
        let key = object_key(submission_id, slot, uploaded_at, &file.file_name);
        let content_type = file.resolved_content_type();
        let file_size = file.data.len() as i64;

        let put = self.blobs.put(&key, file.data, &content_type);
        let result = match tokio::time::timeout(self.upload_timeout, put).await {
            Ok(result) => result,
            Err(_) => Err(BlobError::Timeout(self.upload_timeout)),
        };

        match result {
            Ok(file_url) => {
                metrics::counter!("submissions.files.uploaded").increment(1);
                let attached = AttachedFile {
                    id: Uuid::new_v4(),
                    submission_id,
                    file_name: file.file_name,
                    file_type: content_type,
                    file_size,
                    file_url,
                    uploaded_at,
                };
                Ok((slot, attached, key))
            }
            Err(e) => {
                warn!(slot = slot, key = %key, error = %e, "File upload failed");
                Err(FailedUpload {
                    slot,
                    file_name: file.file_name,
                    error: e.to_string(),
                })
            }
        }
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key).await {
            warn!(key = %key, error = %e, "Failed to delete orphaned upload");
        }
    }
}

fn new_submission(valid: ValidSubmission) -> (Submission, Vec<IncomingFile>) {
    let submission = Submission {
        id: Uuid::new_v4(),
        full_name: valid.full_name,
        college_name: valid.college_name,
        year: valid.year,
        branch: valid.branch,
        contact_email: valid.contact_email,
        contact_phone: valid.contact_phone,
        event_type: valid.event_type,
        project_title: valid.project_title,
        git_repository_url: valid.git_repository_url,
        status: SubmissionStatus::Pending,
        submitted_at: Utc::now(),
        files: Vec::new(),
    };
    (submission, valid.files)
}
