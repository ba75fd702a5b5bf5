use crate::record_store::{RecordStore, StoreError};
use crate::submission::SubmissionStatus;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Invalid status: {0}. Expected one of pending, approved, rejected")]
    InvalidStatus(String),

    #[error("submission {0} not found")]
    NotFound(Uuid),

    #[error("failed to update status: {0}")]
    Storage(#[from] StoreError),
}

/// Moves submissions between review states
pub struct StatusUpdater {
    records: Arc<dyn RecordStore>,
}

impl StatusUpdater {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Overwrite the review status; the value is checked before any write
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: Uuid, new_status: &str) -> Result<SubmissionStatus, StatusError> {
        let status: SubmissionStatus = new_status
            .parse()
            .map_err(|_| StatusError::InvalidStatus(new_status.to_string()))?;

        if !self.records.update_status(id, status).await? {
            return Err(StatusError::NotFound(id));
        }

        metrics::counter!("submissions.status.updated").increment(1);
        info!(submission_id = %id, status = %status, "Submission status updated");

        Ok(status)
    }
}
