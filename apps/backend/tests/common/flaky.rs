//! Store wrapper with switchable failures for the write and read paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use medcards_backend::error::{ApiError, Result};
use medcards_backend::models::*;
use medcards_backend::store::memory::MemoryStore;
use medcards_backend::store::{BadgeRepository, CaseRepository, ChatLog, InteractionLog, ProgressStore};
use medcards_core::CaseFilter;

/// Delegates to a [`MemoryStore`] unless a failure switch is on.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Every compare-and-set reports a lost race.
    pub always_stale: AtomicBool,
    /// Every compare-and-set fails with a storage error.
    pub fail_commits: AtomicBool,
    /// Interaction history reads fail.
    pub fail_history: AtomicBool,
    /// Batch case writes fail before writing anything.
    pub fail_case_batches: AtomicBool,
    pub commit_attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_commits(self) -> Self {
        self.always_stale.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_commits(self) -> Self {
        self.fail_commits.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_history(self) -> Self {
        self.fail_history.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_case_batches(self) -> Self {
        self.fail_case_batches.store(true, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }
}

fn injected(what: &str) -> ApiError {
    ApiError::Internal(format!("injected {} failure", what))
}

#[async_trait]
impl CaseRepository for FlakyStore {
    async fn find_cases(&self, filter: &CaseFilter) -> Result<Vec<ClinicalCase>> {
        self.inner.find_cases(filter).await
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<ClinicalCase>> {
        self.inner.get_case(case_id).await
    }

    async fn upsert_case(&self, case: &ClinicalCase) -> Result<()> {
        self.inner.upsert_case(case).await
    }

    async fn upsert_cases(&self, cases: &[ClinicalCase]) -> Result<()> {
        if self.fail_case_batches.load(Ordering::SeqCst) {
            return Err(injected("case batch"));
        }
        self.inner.upsert_cases(cases).await
    }
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn get_progress(&self, user_id: Uuid) -> Result<Option<VersionedProgress>> {
        self.inner.get_progress(user_id).await
    }

    async fn compare_and_set(
        &self,
        user_id: Uuid,
        expected_version: i64,
        commit: &ProgressCommit,
    ) -> Result<bool> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(injected("commit"));
        }
        if self.always_stale.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.compare_and_set(user_id, expected_version, commit).await
    }
}

#[async_trait]
impl InteractionLog for FlakyStore {
    async fn list_interactions(&self, filter: &InteractionFilter) -> Result<Vec<Interaction>> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(injected("history"));
        }
        self.inner.list_interactions(filter).await
    }

    async fn attach_feedback(&self, interaction_id: Uuid, feedback: &AIFeedback) -> Result<()> {
        self.inner.attach_feedback(interaction_id, feedback).await
    }
}

#[async_trait]
impl BadgeRepository for FlakyStore {
    async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.inner.list_badges().await
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<()> {
        self.inner.upsert_badge(badge).await
    }

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.inner.user_badges(user_id).await
    }
}

#[async_trait]
impl ChatLog for FlakyStore {
    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.inner.append_chat_message(message).await
    }

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        self.inner.list_chat_messages(user_id, session_id, limit).await
    }
}
