// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    models::{
        attempt::{AnswerUpdate, Attempt, LineItem, NewAttempt, NewLineItem},
        history::HistoryFilter,
        question::{Difficulty, Question},
    },
    store::{QuizStore, StoreError, StoreResult},
};

const ATTEMPT_COLUMNS: &str = "id, user_id, name, topic_id, topic_name, difficulty, \
     question_count, duration, score, created_at";

const LINE_ITEM_COLUMNS: &str = "id, history_id AS attempt_id, question_id, category_id, \
     category, category_description, sub_category, content, discussion, answer_key, \
     difficulty, scoring_type, point, max_point, kkm, selected_choice, is_correct, \
     achieved_point, duration";

const QUESTION_COLUMNS: &str = "id, category_id, content, discussion, answer_key, difficulty, \
     point, max_point, kkm, category, category_description, sub_category, scoring_type";

/// Raw 'generate_soal_history' row.
#[derive(FromRow)]
struct AttemptRecord {
    id: i64,
    user_id: i64,
    name: String,
    topic_id: i64,
    topic_name: String,
    difficulty: String,
    question_count: i64,
    duration: i64,
    score: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttemptRecord> for Attempt {
    type Error = StoreError;

    fn try_from(r: AttemptRecord) -> Result<Self, Self::Error> {
        let difficulty = r
            .difficulty
            .parse::<Difficulty>()
            .map_err(|e| StoreError::Corrupt(format!("attempt {}: {}", r.id, e)))?;

        Ok(Attempt {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            topic_id: r.topic_id,
            topic_name: r.topic_name,
            difficulty,
            question_count: r.question_count,
            duration: r.duration,
            score: r.score,
            created_at: r.created_at,
        })
    }
}

/// `QuizStore` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Escapes LIKE wildcards in user input.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_history_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &HistoryFilter) {
    builder.push(" WHERE TRUE");

    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ");
        builder.push_bind(difficulty.as_str());
    }

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR topic_name ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn child_category_ids(&self, parent_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT child_id FROM generate_soal_category_parents WHERE parent_id = $1 ORDER BY child_id",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn category_exists(&self, id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM generate_soal_categories WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn candidate_question_ids(
        &self,
        category_ids: &[i64],
        difficulty: Option<Difficulty>,
    ) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM soal_generate_soal
            WHERE category_id = ANY($1)
              AND ($2::TEXT IS NULL OR difficulty = $2)
            "#,
        )
        .bind(category_ids)
        .bind(difficulty.map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM soal_generate_soal WHERE id = ANY($1) ORDER BY id",
            QUESTION_COLUMNS
        );
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(questions)
    }

    async fn create_attempt(
        &self,
        attempt: NewAttempt,
        items: Vec<NewLineItem>,
    ) -> StoreResult<Attempt> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO generate_soal_history
                (user_id, name, topic_id, topic_name, difficulty, question_count, duration, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let header = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(attempt.user_id)
            .bind(&attempt.name)
            .bind(attempt.topic_id)
            .bind(&attempt.topic_name)
            .bind(attempt.difficulty.as_str())
            .bind(attempt.question_count)
            .bind(attempt.duration)
            .fetch_one(&mut *tx)
            .await?;

        if !items.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO generate_soal_history_detail (history_id, question_id, category_id, \
                 category, category_description, sub_category, content, discussion, answer_key, \
                 difficulty, scoring_type, point, max_point, kkm) ",
            );

            builder.push_values(items, |mut row, item| {
                row.push_bind(header.id)
                    .push_bind(item.question_id)
                    .push_bind(item.category_id)
                    .push_bind(item.category)
                    .push_bind(item.category_description)
                    .push_bind(item.sub_category)
                    .push_bind(item.content)
                    .push_bind(item.discussion)
                    .push_bind(item.answer_key)
                    .push_bind(item.difficulty)
                    .push_bind(item.scoring_type)
                    .push_bind(item.point)
                    .push_bind(item.max_point)
                    .push_bind(item.kkm);
            });

            builder.build().execute(&mut *tx).await?;
        }

        // Dropping `tx` on any error above rolls the header back.
        tx.commit().await?;

        Attempt::try_from(header)
    }

    async fn find_attempt(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<Attempt>> {
        let sql = format!(
            "SELECT {} FROM generate_soal_history WHERE id = $1 AND ($2::BIGINT IS NULL OR user_id = $2)",
            ATTEMPT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        record.map(Attempt::try_from).transpose()
    }

    async fn list_attempts(&self, filter: &HistoryFilter) -> StoreResult<(Vec<Attempt>, i64)> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM generate_soal_history");
        push_history_filter(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM generate_soal_history",
            ATTEMPT_COLUMNS
        ));
        push_history_filter(&mut builder, filter);

        // Column names come from a closed enum, never from input.
        builder.push(format!(
            " ORDER BY {} {} NULLS LAST, id {}",
            filter.sort_by.column(),
            if filter.descending { "DESC" } else { "ASC" },
            if filter.descending { "DESC" } else { "ASC" },
        ));
        builder.push(" LIMIT ");
        builder.push_bind(filter.take);
        builder.push(" OFFSET ");
        builder.push_bind(filter.skip);

        let records: Vec<AttemptRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
        let attempts = records
            .into_iter()
            .map(Attempt::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((attempts, total))
    }

    async fn line_items(&self, attempt_id: i64) -> StoreResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {} FROM generate_soal_history_detail WHERE history_id = $1 ORDER BY id",
            LINE_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(attempt_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn find_line_item(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<LineItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM generate_soal_history_detail
            WHERE id = $1
              AND ($2::BIGINT IS NULL
                   OR history_id IN (SELECT id FROM generate_soal_history WHERE user_id = $2))
            "#,
            LINE_ITEM_COLUMNS
        );
        let item = sqlx::query_as::<_, LineItem>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    async fn save_answer(&self, line_item_id: i64, update: &AnswerUpdate) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE generate_soal_history_detail
            SET selected_choice = $1,
                is_correct = $2,
                achieved_point = $3,
                duration = COALESCE($4, duration)
            WHERE id = $5
            "#,
        )
        .bind(update.selected_choice.as_deref())
        .bind(update.is_correct)
        .bind(update.achieved_point)
        .bind(update.duration)
        .bind(line_item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_score(&self, attempt_id: i64, score: i64) -> StoreResult<()> {
        sqlx::query("UPDATE generate_soal_history SET score = $1 WHERE id = $2")
            .bind(score)
            .bind(attempt_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_attempt(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM generate_soal_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
