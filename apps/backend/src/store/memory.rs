//! In-memory store for development and tests.
//!
//! Per-user state lives in one `DashMap` entry; holding the entry's write
//! guard while checking the version and appending the interaction gives the
//! same all-or-nothing commit as the Postgres transaction.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use medcards_core::CaseFilter;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::store::{BadgeRepository, CaseRepository, ChatLog, InteractionLog, ProgressStore};

struct UserEntry {
    user: User,
    version: i64,
    interactions: Vec<Interaction>,
    badges: Vec<UserBadge>,
    chat: Vec<ChatMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, UserEntry>,
    emails: DashMap<String, Uuid>,
    cases: DashMap<String, ClinicalCase>,
    badges: DashMap<String, Badge>,
    /// Interaction id -> owning user, for feedback attachment.
    interaction_owners: DashMap<Uuid, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for MemoryStore {
    async fn find_cases(&self, filter: &CaseFilter) -> Result<Vec<ClinicalCase>> {
        let mut cases: Vec<ClinicalCase> = self
            .cases
            .iter()
            .filter(|c| filter.matches(c.value()))
            .map(|c| c.value().clone())
            .collect();
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cases)
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<ClinicalCase>> {
        Ok(self.cases.get(case_id).map(|c| c.value().clone()))
    }

    async fn upsert_case(&self, case: &ClinicalCase) -> Result<()> {
        self.cases.insert(case.id.clone(), case.clone());
        Ok(())
    }

    async fn upsert_cases(&self, cases: &[ClinicalCase]) -> Result<()> {
        for case in cases {
            self.cases.insert(case.id.clone(), case.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        match self.emails.entry(user.email.to_lowercase()) {
            Entry::Occupied(_) => {
                return Err(ApiError::Conflict(format!(
                    "email {} is already registered",
                    user.email
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(
            user.id,
            UserEntry {
                user: user.clone(),
                version: 0,
                interactions: Vec::new(),
                badges: Vec::new(),
                chat: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).map(|e| e.user.clone()))
    }

    async fn get_progress(&self, user_id: Uuid) -> Result<Option<VersionedProgress>> {
        Ok(self.users.get(&user_id).map(|e| VersionedProgress {
            progress: e.user.progress.clone(),
            version: e.version,
        }))
    }

    async fn compare_and_set(
        &self,
        user_id: Uuid,
        expected_version: i64,
        commit: &ProgressCommit,
    ) -> Result<bool> {
        let Some(mut entry) = self.users.get_mut(&user_id) else {
            return Err(ApiError::NotFound(format!("user not found: {}", user_id)));
        };
        if entry.version != expected_version {
            debug!(%user_id, expected_version, actual = entry.version, "progress version moved");
            return Ok(false);
        }

        entry.version += 1;
        entry.user.progress = commit.progress.clone();
        entry.user.updated_at = commit.interaction.created_at;
        entry.interactions.push(commit.interaction.clone());
        for award in &commit.user_badges {
            if !entry.badges.iter().any(|b| b.badge_id == award.badge_id) {
                entry.badges.push(award.clone());
            }
        }
        self.interaction_owners.insert(commit.interaction.id, user_id);
        Ok(true)
    }
}

#[async_trait]
impl InteractionLog for MemoryStore {
    async fn list_interactions(&self, filter: &InteractionFilter) -> Result<Vec<Interaction>> {
        let Some(entry) = self.users.get(&filter.user_id) else {
            return Ok(Vec::new());
        };
        let mut interactions: Vec<Interaction> = entry
            .interactions
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        interactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            interactions.truncate(limit);
        }
        Ok(interactions)
    }

    async fn attach_feedback(&self, interaction_id: Uuid, feedback: &AIFeedback) -> Result<()> {
        let user_id = self
            .interaction_owners
            .get(&interaction_id)
            .map(|owner| *owner.value())
            .ok_or_else(|| ApiError::NotFound(format!("interaction not found: {}", interaction_id)))?;
        if let Some(mut entry) = self.users.get_mut(&user_id) {
            if let Some(interaction) = entry.interactions.iter_mut().find(|i| i.id == interaction_id) {
                interaction.ai_feedback = Some(feedback.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BadgeRepository for MemoryStore {
    async fn list_badges(&self) -> Result<Vec<Badge>> {
        let mut badges: Vec<Badge> = self.badges.iter().map(|b| b.value().clone()).collect();
        badges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(badges)
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<()> {
        self.badges.insert(badge.id.clone(), badge.clone());
        Ok(())
    }

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        Ok(self
            .users
            .get(&user_id)
            .map(|e| e.badges.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatLog for MemoryStore {
    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        let Some(mut entry) = self.users.get_mut(&message.user_id) else {
            return Err(ApiError::NotFound(format!("user not found: {}", message.user_id)));
        };
        entry.chat.push(message.clone());
        Ok(())
    }

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let Some(entry) = self.users.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut messages: Vec<ChatMessage> = entry
            .chat
            .iter()
            .filter(|m| session_id.map_or(true, |s| m.session_id == Some(s)))
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }
}
