//! Contest Submission Service
//!
//! Intake and review backend for a college technical-contest. Participants
//! submit a multipart form with their details and category-specific files;
//! organizers review, filter, and approve or reject entries.
//!
//! ## Features
//!
//! - **Category Rules**: Each event type decides whether files or a
//!   repository URL are required, how many files and which types
//! - **Concurrent Uploads**: Files of one submission go to object storage in
//!   parallel, bounded and timed out per file, with per-slot failure reporting
//! - **Relational Records**: Submissions and their files in PostgreSQL,
//!   listed newest first with optional category/status filters
//! - **Review Workflow**: Status transitions and aggregate statistics behind
//!   argon2-verified admin credentials
//!
//! ## Architecture
//!
//! ```text
//!  Participant form            Object storage            PostgreSQL
//! ┌──────────────┐           ┌──────────────┐          ┌──────────────┐
//! │ POST /submit │           │ submissions/ │          │ submissions  │
//! │ (multipart)  │           │   {id}/      │          │ submission_  │
//! └──────────────┘           │ {ts}-{n}-name│          │   files      │
//!        │                   └──────────────┘          └──────────────┘
//!        ▼                          ▲                         ▲
//! ┌──────────────┐           ┌──────────────┐                 │
//! │ Validator    │           │ Blob Store   │                 │
//! └──────────────┘           └──────────────┘                 │
//!        │                          ▲                         │
//!        ▼                          │                         │
//! ┌──────────────┐                  │                         │
//! │ Ingestion    │──────────────────┘                         │
//! │ Service      │           ┌──────────────┐                 │
//! └──────────────┘──────────▶│ Record Store │─────────────────┘
//!                            └──────────────┘
//!                                   ▲
//!                            ┌──────────────┐
//!                            │ Query/Status │
//!                            │ (admin API)  │
//!                            └──────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod ingestion;
pub mod memory;
pub mod query;
pub mod record_store;
pub mod status;
pub mod submission;
pub mod validator;

pub use api::{create_router, AppState};
pub use auth::{hash_password, AdminAuth};
pub use blob_store::{BlobError, BlobStore, S3BlobStore};
pub use config::{Config, StorageBackend};
pub use ingestion::{FailedUpload, IngestionError, IngestionOutcome, IngestionService};
pub use memory::{InMemoryBlobStore, InMemoryRecordStore};
pub use query::{QueryError, QueryService, SubmissionStats};
pub use record_store::{PgRecordStore, RecordStore, StoreError, SubmissionQuery};
pub use status::{StatusError, StatusUpdater};
pub use submission::{AttachedFile, EventType, Submission, SubmissionStatus};
pub use validator::{RawSubmission, SubmissionValidator, ValidationError};
