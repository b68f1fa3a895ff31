//! PostgreSQL database operations

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use medcards_core::CaseFilter;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::store::{BadgeRepository, CaseRepository, ChatLog, InteractionLog, ProgressStore};

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// === Case Repository ===

#[async_trait]
impl CaseRepository for Database {
    async fn find_cases(&self, filter: &CaseFilter) -> Result<Vec<ClinicalCase>> {
        let (band_min, band_max) = filter
            .difficulty_band
            .map(|b| (Some(i16::from(b.min)), Some(i16::from(b.max))))
            .unwrap_or((None, None));

        let rows = sqlx::query_as::<_, DbCase>(
            r#"
            SELECT id, document
            FROM clinical_cases
            WHERE ($1 OR is_active)
              AND ($2::text IS NULL OR specialty = $2)
              AND ($3::text IS NULL OR subspecialty = $3)
              AND ($4::smallint IS NULL OR difficulty_level = $4)
              AND ($5::smallint IS NULL OR difficulty_level >= $5)
              AND ($6::smallint IS NULL OR difficulty_level <= $6)
              AND ($7::text IS NULL OR clinical_algorithm = $7)
              AND (cardinality($8::text[]) = 0 OR tags && $8)
              AND NOT (id = ANY($9::text[]))
            ORDER BY id
            "#,
        )
        .bind(filter.include_inactive)
        .bind(filter.specialty.as_deref())
        .bind(filter.subspecialty.as_deref())
        .bind(filter.difficulty_level.map(i16::from))
        .bind(band_min)
        .bind(band_max)
        .bind(filter.clinical_algorithm.as_deref())
        .bind(&filter.tags)
        .bind(&filter.exclude_case_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<ClinicalCase>> {
        let row = sqlx::query_as::<_, DbCase>(
            r#"
            SELECT id, document
            FROM clinical_cases
            WHERE id = $1
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.document.0))
    }

    async fn upsert_case(&self, case: &ClinicalCase) -> Result<()> {
        upsert_case_row(&self.pool, case).await
    }

    async fn upsert_cases(&self, cases: &[ClinicalCase]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for case in cases {
            upsert_case_row(&mut *tx, case).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_case_row<'e, E>(executor: E, case: &ClinicalCase) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO clinical_cases (id, specialty, subspecialty, difficulty_level,
                                    clinical_algorithm, tags, is_active, document,
                                    created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            specialty = EXCLUDED.specialty,
            subspecialty = EXCLUDED.subspecialty,
            difficulty_level = EXCLUDED.difficulty_level,
            clinical_algorithm = EXCLUDED.clinical_algorithm,
            tags = EXCLUDED.tags,
            is_active = EXCLUDED.is_active,
            document = EXCLUDED.document,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&case.id)
    .bind(&case.specialty)
    .bind(case.subspecialty.as_deref())
    .bind(i16::from(case.difficulty_level))
    .bind(&case.clinical_algorithm)
    .bind(&case.tags)
    .bind(case.is_active)
    .bind(Json(case))
    .bind(case.created_at)
    .bind(case.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

// === Progress Store ===

#[async_trait]
impl ProgressStore for Database {
    async fn create_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, created_at, updated_at, progress,
                               progress_version, preferences, subscription_status,
                               subscription_ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.full_name.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(Json(&user.progress))
        .bind(Json(&user.preferences))
        .bind(enum_to_str(&user.subscription_status)?)
        .bind(user.subscription_ends_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, email, full_name, created_at, updated_at, progress, progress_version,
                   preferences, subscription_status, subscription_ends_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DbUser::into_user).transpose()
    }

    async fn get_progress(&self, user_id: Uuid) -> Result<Option<VersionedProgress>> {
        let row: Option<(Json<UserProgress>, i64)> = sqlx::query_as(
            r#"
            SELECT progress, progress_version
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(progress, version)| VersionedProgress {
            progress: progress.0,
            version,
        }))
    }

    async fn compare_and_set(
        &self,
        user_id: Uuid,
        expected_version: i64,
        commit: &ProgressCommit,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET progress = $1,
                progress_version = progress_version + 1,
                updated_at = $2
            WHERE id = $3 AND progress_version = $4
            "#,
        )
        .bind(Json(&commit.progress))
        .bind(commit.interaction.created_at)
        .bind(user_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            debug!(%user_id, expected_version, "progress version moved");
            tx.rollback().await?;
            return Ok(false);
        }

        let interaction = &commit.interaction;
        sqlx::query(
            r#"
            INSERT INTO interactions (id, user_id, case_id, specialty, is_correct,
                                      created_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(&interaction.case_id)
        .bind(&interaction.specialty)
        .bind(interaction.is_correct)
        .bind(interaction.created_at)
        .bind(Json(interaction))
        .execute(&mut *tx)
        .await?;

        for award in &commit.user_badges {
            sqlx::query(
                r#"
                INSERT INTO user_badges (id, user_id, badge_id, earned_at, earned_by_interaction_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, badge_id) DO NOTHING
                "#,
            )
            .bind(award.id)
            .bind(award.user_id)
            .bind(&award.badge_id)
            .bind(award.earned_at)
            .bind(award.earned_by_interaction_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

// === Interaction Log ===

#[async_trait]
impl InteractionLog for Database {
    async fn list_interactions(&self, filter: &InteractionFilter) -> Result<Vec<Interaction>> {
        let limit = filter.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = sqlx::query_as::<_, DbInteraction>(
            r#"
            SELECT id, document
            FROM interactions
            WHERE user_id = $1
              AND ($2::text IS NULL OR specialty = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
              AND ($5::boolean IS NULL OR is_correct = $5)
            ORDER BY created_at DESC, id
            LIMIT $6
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.specialty.as_deref())
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.is_correct)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }

    async fn attach_feedback(&self, interaction_id: Uuid, feedback: &AIFeedback) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE interactions
            SET document = jsonb_set(document, '{ai_feedback}', $1)
            WHERE id = $2
            "#,
        )
        .bind(Json(feedback))
        .bind(interaction_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "interaction not found: {}",
                interaction_id
            )));
        }
        Ok(())
    }
}

// === Badge Repository ===

#[async_trait]
impl BadgeRepository for Database {
    async fn list_badges(&self) -> Result<Vec<Badge>> {
        let rows = sqlx::query_as::<_, DbBadge>(
            r#"
            SELECT id, created_at, code, name, description, icon_emoji, criteria,
                   category, rarity, points_value
            FROM badges
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DbBadge::into_badge).collect()
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO badges (id, created_at, code, name, description, icon_emoji,
                                criteria, category, rarity, points_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                icon_emoji = EXCLUDED.icon_emoji,
                criteria = EXCLUDED.criteria,
                category = EXCLUDED.category,
                rarity = EXCLUDED.rarity,
                points_value = EXCLUDED.points_value
            "#,
        )
        .bind(&badge.id)
        .bind(badge.created_at)
        .bind(&badge.code)
        .bind(&badge.name)
        .bind(&badge.description)
        .bind(badge.icon_emoji.as_deref())
        .bind(Json(&badge.criteria))
        .bind(enum_to_str(&badge.category)?)
        .bind(enum_to_str(&badge.rarity)?)
        .bind(i32::try_from(badge.points_value).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        let rows = sqlx::query_as::<_, DbUserBadge>(
            r#"
            SELECT id, earned_at, user_id, badge_id, earned_by_interaction_id
            FROM user_badges
            WHERE user_id = $1
            ORDER BY earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserBadge::from).collect())
    }
}

// === Chat Log ===

#[async_trait]
impl ChatLog for Database {
    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, created_at, user_id, role, content, session_id,
                                       related_case_id, token_count, model_used)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message.id)
        .bind(message.created_at)
        .bind(message.user_id)
        .bind(enum_to_str(&message.role)?)
        .bind(&message.content)
        .bind(message.session_id)
        .bind(message.related_case_id.as_deref())
        .bind(message.token_count.map(|t| i32::try_from(t).unwrap_or(i32::MAX)))
        .bind(&message.model_used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, DbChatMessage>(
            r#"
            SELECT * FROM (
                SELECT id, created_at, user_id, role, content, session_id,
                       related_case_id, token_count, model_used
                FROM chat_messages
                WHERE user_id = $1
                  AND ($2::uuid IS NULL OR session_id = $2)
                ORDER BY created_at DESC, id
                LIMIT $3
            ) newest
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DbChatMessage::into_message).collect()
    }
}
