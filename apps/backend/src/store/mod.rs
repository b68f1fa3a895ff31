//! Storage seams of the service.
//!
//! Postgres ([`crate::db::Database`]) and the in-memory [`memory::MemoryStore`]
//! implement the same traits; handlers only see `dyn Store`.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use medcards_core::CaseFilter;

use crate::error::Result;
use crate::models::*;

/// Case catalog. Reads never mutate case statistics.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Matching cases ordered by id. No match is an empty vec.
    async fn find_cases(&self, filter: &CaseFilter) -> Result<Vec<ClinicalCase>>;

    async fn get_case(&self, case_id: &str) -> Result<Option<ClinicalCase>>;

    /// Insert or replace by id.
    async fn upsert_case(&self, case: &ClinicalCase) -> Result<()>;

    /// Insert or replace every case, or none of them.
    async fn upsert_cases(&self, cases: &[ClinicalCase]) -> Result<()>;
}

/// Users and their versioned progress document.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn get_progress(&self, user_id: Uuid) -> Result<Option<VersionedProgress>>;

    /// Persist `commit` only if progress is still at `expected_version`.
    ///
    /// The progress write, the interaction append and the badge inserts
    /// happen together or not at all. Returns `false` on a version mismatch.
    async fn compare_and_set(
        &self,
        user_id: Uuid,
        expected_version: i64,
        commit: &ProgressCommit,
    ) -> Result<bool>;
}

/// Append-only interaction history.
#[async_trait]
pub trait InteractionLog: Send + Sync {
    /// Newest first, truncated to `filter.limit`.
    async fn list_interactions(&self, filter: &InteractionFilter) -> Result<Vec<Interaction>>;

    /// Attach coach feedback produced after the interaction was committed.
    async fn attach_feedback(&self, interaction_id: Uuid, feedback: &AIFeedback) -> Result<()>;
}

/// Badge definitions and per-user awards.
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    async fn list_badges(&self) -> Result<Vec<Badge>>;

    async fn upsert_badge(&self, badge: &Badge) -> Result<()>;

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>>;
}

/// Coach chat transcript per user.
#[async_trait]
pub trait ChatLog: Send + Sync {
    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()>;

    /// The newest `limit` messages in chronological order.
    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>>;
}

/// Everything the handlers need from storage.
pub trait Store:
    CaseRepository + ProgressStore + InteractionLog + BadgeRepository + ChatLog
{
}

impl<T> Store for T where
    T: CaseRepository + ProgressStore + InteractionLog + BadgeRepository + ChatLog
{
}
