use crate::record_store::{RecordStore, StoreError, SubmissionQuery};
use crate::submission::{EventType, Submission, SubmissionStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("submission {0} not found")]
    NotFound(Uuid),

    #[error("failed to query submissions: {0}")]
    Storage(#[from] StoreError),
}

/// Aggregate counts for the admin dashboard
///
/// Both maps carry every category and status, zero when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStats {
    pub total: i64,
    pub by_event_type: BTreeMap<EventType, i64>,
    pub by_status: BTreeMap<SubmissionStatus, i64>,
}

/// Read side: filtered listings and statistics
pub struct QueryService {
    records: Arc<dyn RecordStore>,
}

impl QueryService {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Submissions matching every given filter, newest first, with files
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        event_type: Option<EventType>,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, QueryError> {
        let query = SubmissionQuery { event_type, status };
        Ok(self.records.list_submissions(&query).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Submission, QueryError> {
        self.records
            .get_submission(id)
            .await?
            .ok_or(QueryError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<SubmissionStats, QueryError> {
        let total = self.records.count_submissions().await?;

        let mut by_event_type: BTreeMap<EventType, i64> =
            EventType::ALL.into_iter().map(|t| (t, 0)).collect();
        // Rows stored under legacy spellings come back as separate groups
        for (event_type, count) in self.records.count_by_event_type().await? {
            *by_event_type.entry(event_type).or_insert(0) += count;
        }

        let mut by_status: BTreeMap<SubmissionStatus, i64> =
            SubmissionStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for (status, count) in self.records.count_by_status().await? {
            *by_status.entry(status).or_insert(0) += count;
        }

        Ok(SubmissionStats {
            total,
            by_event_type,
            by_status,
        })
    }
}
