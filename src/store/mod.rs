// src/store/mod.rs

//! Persistence boundary of the quiz engine.
//!
//! The engine only talks to a `QuizStore`; `PgStore` is used in production and
//! `MemoryStore` in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{
    attempt::{AnswerUpdate, Attempt, LineItem, NewAttempt, NewLineItem},
    history::HistoryFilter,
    question::{Difficulty, Question},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row that cannot be mapped to a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait QuizStore: Send + Sync {
    // --- Category hierarchy (read-only) ---

    /// Ids of the categories whose parent set contains `parent_id`.
    async fn child_category_ids(&self, parent_id: i64) -> StoreResult<Vec<i64>>;

    async fn category_exists(&self, id: i64) -> StoreResult<bool>;

    // --- Question bank (read-only) ---

    /// Ids of the questions in the given categories, optionally restricted to
    /// one difficulty. Only ids are loaded.
    async fn candidate_question_ids(
        &self,
        category_ids: &[i64],
        difficulty: Option<Difficulty>,
    ) -> StoreResult<Vec<i64>>;

    async fn questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>>;

    // --- Attempts ---

    /// Inserts the header and all line items in one transaction.
    /// Either everything is visible afterwards or nothing is.
    async fn create_attempt(
        &self,
        attempt: NewAttempt,
        items: Vec<NewLineItem>,
    ) -> StoreResult<Attempt>;

    /// Finds an attempt. With `owner` set, attempts of other users are not found.
    async fn find_attempt(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<Attempt>>;

    /// One page of attempts plus the total number matching the filter.
    async fn list_attempts(&self, filter: &HistoryFilter) -> StoreResult<(Vec<Attempt>, i64)>;

    /// Line items of an attempt in id order.
    async fn line_items(&self, attempt_id: i64) -> StoreResult<Vec<LineItem>>;

    /// Finds a line item. With `owner` set, items of other users' attempts are not found.
    async fn find_line_item(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<LineItem>>;

    async fn save_answer(&self, line_item_id: i64, update: &AnswerUpdate) -> StoreResult<()>;

    async fn set_score(&self, attempt_id: i64, score: i64) -> StoreResult<()>;

    /// Deletes an attempt with its line items. Returns `false` when absent.
    async fn delete_attempt(&self, id: i64) -> StoreResult<bool>;

    /// Releases underlying connections.
    async fn close(&self);
}
