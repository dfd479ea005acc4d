pub(crate) mod rest;
pub(crate) mod types;

use async_trait::async_trait;
use thiserror::Error;

use self::types::{QuestionDoc, StudentRecord, SubmissionDoc};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Read-only source of question definitions, ordered by creation time.
#[async_trait]
pub(crate) trait QuestionStore: Send + Sync {
    async fn list_ordered(&self) -> Result<Vec<QuestionDoc>, StoreError>;
}

/// Student approval records: looked up to gate exam entry, updated once when
/// a session finishes.
#[async_trait]
pub(crate) trait ApprovalStore: Send + Sync {
    async fn find_student(
        &self,
        name: &str,
        register_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError>;

    async fn mark_completed(&self, student_id: &str) -> Result<(), StoreError>;
}

/// Append-only sink for finalized exam submissions. The store assigns the
/// submission timestamp; records are never read back or mutated from here.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn append(&self, record: SubmissionDoc) -> Result<(), StoreError>;
}
