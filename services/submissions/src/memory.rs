//! Process-local stores for running without PostgreSQL or S3.
//!
//! Contents are lost on restart. Used by the `memory` storage backend and by
//! the service and router tests.

use crate::blob_store::{public_url, BlobError, BlobStore};
use crate::record_store::{RecordStore, StoreError, SubmissionQuery};
use crate::submission::{AttachedFile, EventType, Submission, SubmissionStatus};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    submissions: HashMap<Uuid, Submission>,
    files: Vec<AttachedFile>,
}

/// Record store over in-process tables
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn hydrate(&self, submission: &Submission) -> Submission {
        let mut hydrated = submission.clone();
        hydrated.files = self
            .files
            .iter()
            .filter(|f| f.submission_id == submission.id)
            .cloned()
            .collect();
        hydrated
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let mut row = submission.clone();
        row.files.clear();
        tables.submissions.insert(row.id, row);
        Ok(())
    }

    async fn insert_file(&self, file: &AttachedFile) -> Result<(), StoreError> {
        self.tables.write().await.files.push(file.clone());
        Ok(())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.get(&id).map(|s| tables.hydrate(s)))
    }

    async fn list_submissions(
        &self,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| query.matches(s))
            .map(|s| tables.hydrate(s))
            .collect();

        matching.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matching)
    }

    async fn count_submissions(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.submissions.len() as i64)
    }

    async fn count_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<EventType, i64> = BTreeMap::new();
        for submission in tables.submissions.values() {
            *counts.entry(submission.event_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_by_status(&self) -> Result<Vec<(SubmissionStatus, i64)>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<SubmissionStatus, i64> = BTreeMap::new();
        for submission in tables.submissions.values() {
            *counts.entry(submission.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.submissions.get_mut(&id) {
            Some(submission) => {
                submission.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_submission(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.submissions.remove(&id);
        tables.files.retain(|f| f.submission_id != id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Blob store keeping objects in a map
pub struct InMemoryBlobStore {
    public_url_prefix: String,
    objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new(public_url_prefix: impl Into<String>) -> Self {
        Self {
            public_url_prefix: public_url_prefix.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String, BlobError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(public_url(&self.public_url_prefix, key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn submission(event_type: EventType, minutes_ago: i64) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            full_name: "Meera".to_string(),
            college_name: "PSG".to_string(),
            year: Some("2nd".to_string()),
            branch: "IT".to_string(),
            contact_email: "meera@example.org".to_string(),
            contact_phone: "999".to_string(),
            event_type,
            project_title: "Title".to_string(),
            git_repository_url: None,
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now() - Duration::minutes(minutes_ago),
            files: vec![],
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_hydrates_files() {
        let store = InMemoryRecordStore::new();
        let older = submission(EventType::PaperPresentation, 10);
        let newer = submission(EventType::CodeDebugging, 1);
        store.insert_submission(&older).await.unwrap();
        store.insert_submission(&newer).await.unwrap();
        store
            .insert_file(&AttachedFile {
                id: Uuid::new_v4(),
                submission_id: older.id,
                file_name: "paper.pdf".to_string(),
                file_type: "application/pdf".to_string(),
                file_size: 3,
                file_url: "https://files.test/paper.pdf".to_string(),
                uploaded_at: Utc::now(),
            })
            .await
            .unwrap();

        let listed = store
            .list_submissions(&SubmissionQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].files.len(), 1);
        assert!(listed[0].files.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_files() {
        let store = InMemoryRecordStore::new();
        let s = submission(EventType::PaperPresentation, 0);
        store.insert_submission(&s).await.unwrap();
        store.delete_submission(s.id).await.unwrap();

        assert!(store.get_submission(s.id).await.unwrap().is_none());
        assert_eq!(store.count_submissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let store = InMemoryRecordStore::new();
        assert!(!store
            .update_status(Uuid::new_v4(), SubmissionStatus::Approved)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_blob_put_returns_public_url() {
        let blobs = InMemoryBlobStore::new("https://files.test/");
        let url = blobs
            .put("submissions/x/1-a.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap();

        assert_eq!(url, "https://files.test/submissions/x/1-a.pdf");
        assert_eq!(blobs.object_count().await, 1);
        assert_eq!(
            blobs.get("submissions/x/1-a.pdf").await,
            Some(Bytes::from_static(b"pdf"))
        );
    }
}
