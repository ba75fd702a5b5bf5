use crate::config::DatabaseConfig;
use crate::submission::{AttachedFile, EventType, Submission, SubmissionStatus};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Errors from the structured record backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row {id} is malformed: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Filters for listing submissions; `None` means no filter on that column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub event_type: Option<EventType>,
    pub status: Option<SubmissionStatus>,
}

impl SubmissionQuery {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.event_type.map_or(true, |t| submission.event_type == t)
            && self.status.map_or(true, |s| submission.status == s)
    }
}

/// Persistence for submissions and their attached files
///
/// Listing returns submissions newest first, each hydrated with its files.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a submission row; attached files are inserted separately
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    async fn insert_file(&self, file: &AttachedFile) -> Result<(), StoreError>;

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    async fn list_submissions(&self, query: &SubmissionQuery)
        -> Result<Vec<Submission>, StoreError>;

    async fn count_submissions(&self) -> Result<i64, StoreError>;

    async fn count_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError>;

    async fn count_by_status(&self) -> Result<Vec<(SubmissionStatus, i64)>, StoreError>;

    /// Returns false when no submission has the id
    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> Result<bool, StoreError>;

    /// Remove a submission together with its file rows
    async fn delete_submission(&self, id: Uuid) -> Result<(), StoreError>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Submission row as stored; category and status are text columns
#[derive(Debug, Clone, FromRow)]
struct SubmissionRow {
    id: Uuid,
    full_name: String,
    college_name: String,
    year: Option<String>,
    branch: String,
    contact_email: String,
    contact_phone: String,
    event_type: String,
    project_title: String,
    git_repository_url: Option<String>,
    status: String,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct FileRow {
    id: Uuid,
    submission_id: Uuid,
    file_name: String,
    file_type: String,
    file_size: i64,
    file_url: String,
    uploaded_at: DateTime<Utc>,
}

impl SubmissionRow {
    /// The one place stored rows become the canonical shape
    fn into_submission(self, files: Vec<AttachedFile>) -> Result<Submission, StoreError> {
        let event_type = self.event_type.parse::<EventType>().map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: format!("{e}"),
        })?;
        let status = self.status.parse::<SubmissionStatus>().map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: format!("{e}"),
        })?;

        Ok(Submission {
            id: self.id,
            full_name: self.full_name,
            college_name: self.college_name,
            year: self.year,
            branch: self.branch,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            event_type,
            project_title: self.project_title,
            git_repository_url: self.git_repository_url,
            status,
            submitted_at: self.submitted_at,
            files,
        })
    }
}

impl From<FileRow> for AttachedFile {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            submission_id: row.submission_id,
            file_name: row.file_name,
            file_type: row.file_type,
            file_size: row.file_size,
            file_url: row.file_url,
            uploaded_at: row.uploaded_at,
        }
    }
}

const SUBMISSION_COLUMNS: &str = r#"
    id, full_name, college_name, year, branch, contact_email, contact_phone,
    event_type, project_title, git_repository_url, status, submitted_at
"#;

/// PostgreSQL-backed record store
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new record store with connection pool
    pub async fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations, including the legacy file column fold
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Load files for a set of submissions, grouped by owner
    async fn files_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<AttachedFile>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, submission_id, file_name, file_type, file_size, file_url, uploaded_at
            FROM submission_files
            WHERE submission_id = ANY($1)
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<AttachedFile>> = HashMap::new();
        for row in rows {
            grouped.entry(row.submission_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, submission), fields(submission_id = %submission.id))]
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, full_name, college_name, year, branch,
                contact_email, contact_phone, event_type, project_title,
                git_repository_url, status, submitted_at
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9,
                $10, $11, $12
            )
            "#,
        )
        .bind(submission.id)
        .bind(&submission.full_name)
        .bind(&submission.college_name)
        .bind(&submission.year)
        .bind(&submission.branch)
        .bind(&submission.contact_email)
        .bind(&submission.contact_phone)
        .bind(submission.event_type.label())
        .bind(&submission.project_title)
        .bind(&submission.git_repository_url)
        .bind(submission.status.as_str())
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await?;

        debug!("Submission row inserted");
        Ok(())
    }

    #[instrument(skip(self, file), fields(submission_id = %file.submission_id, file_id = %file.id))]
    async fn insert_file(&self, file: &AttachedFile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO submission_files (
                id, submission_id, file_name, file_type, file_size, file_url, uploaded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(file.id)
        .bind(file.submission_id)
        .bind(&file.file_name)
        .bind(&file.file_type)
        .bind(file.file_size)
        .bind(&file.file_url)
        .bind(file.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        let row = sqlx::query_as::<_, SubmissionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let files = self.files_for(&[id]).await?.remove(&id).unwrap_or_default();
        row.into_submission(files).map(Some)
    }

    #[instrument(skip(self))]
    async fn list_submissions(
        &self,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM submissions
            WHERE ($1::text IS NULL OR event_type = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY submitted_at DESC, id DESC
            "#
        );

        let rows = sqlx::query_as::<_, SubmissionRow>(&sql)
            .bind(query.event_type.map(|t| t.label()))
            .bind(query.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut files = self.files_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let owned = files.remove(&row.id).unwrap_or_default();
                row.into_submission(owned)
            })
            .collect()
    }

    async fn count_submissions(&self) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn count_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT event_type, COUNT(*) FROM submissions GROUP BY event_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(label, count)| match label.parse::<EventType>() {
                Ok(t) => Some((t, count)),
                Err(e) => {
                    warn!(error = %e, "Skipping unknown event type in stats");
                    None
                }
            })
            .collect())
    }

    async fn count_by_status(&self) -> Result<Vec<(SubmissionStatus, i64)>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM submissions GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| status.parse::<SubmissionStatus>().ok().map(|s| (s, count)))
            .collect())
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE submissions SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_submission(&self, id: Uuid) -> Result<(), StoreError> {
        // submission_files rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
