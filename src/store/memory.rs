// src/store/memory.rs

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    models::{
        attempt::{AnswerUpdate, Attempt, LineItem, NewAttempt, NewLineItem},
        history::{HistoryFilter, HistorySort},
        question::{Difficulty, Question},
    },
    store::{QuizStore, StoreError, StoreResult},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: BTreeSet<i64>,
    /// (parent_id, child_id)
    parents: BTreeSet<(i64, i64)>,
    questions: BTreeMap<i64, Question>,
    attempts: BTreeMap<i64, Attempt>,
    line_items: BTreeMap<i64, LineItem>,
    next_attempt_id: i64,
    next_line_item_id: i64,
}

/// In-process `QuizStore`.
///
/// Writes that span several rows are staged on a copy of the tables and
/// swapped in only when they complete, mirroring a database transaction.
/// `fail_next_line_item_insert` makes the next attempt creation fail after
/// its header was staged.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_line_items: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_category(&self, id: i64) {
        self.tables().categories.insert(id);
    }

    /// Declares `child_id` as a member of `parent_id`, creating both categories.
    pub fn link_parent(&self, parent_id: i64, child_id: i64) {
        let mut tables = self.tables();
        tables.categories.insert(parent_id);
        tables.categories.insert(child_id);
        tables.parents.insert((parent_id, child_id));
    }

    /// Inserts or replaces a bank question, as the question-bank CRUD would.
    pub fn upsert_question(&self, question: Question) {
        let mut tables = self.tables();
        tables.categories.insert(question.category_id);
        tables.questions.insert(question.id, question);
    }

    pub fn fail_next_line_item_insert(&self) {
        self.fail_line_items.store(true, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.tables().attempts.len()
    }

    pub fn line_item_count(&self) -> usize {
        self.tables().line_items.len()
    }
}

fn matches_filter(attempt: &Attempt, filter: &HistoryFilter) -> bool {
    if filter.user_id.is_some_and(|u| u != attempt.user_id) {
        return false;
    }
    if filter.difficulty.is_some_and(|d| d != attempt.difficulty) {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        return attempt.name.to_lowercase().contains(&needle)
            || attempt.topic_name.to_lowercase().contains(&needle);
    }
    true
}

fn compare(a: &Attempt, b: &Attempt, sort: HistorySort) -> std::cmp::Ordering {
    match sort {
        HistorySort::CreatedAt => a.created_at.cmp(&b.created_at),
        HistorySort::Name => a.name.cmp(&b.name),
        HistorySort::Score => a.score.cmp(&b.score),
        HistorySort::QuestionCount => a.question_count.cmp(&b.question_count),
        HistorySort::TopicName => a.topic_name.cmp(&b.topic_name),
    }
    .then(a.id.cmp(&b.id))
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn child_category_ids(&self, parent_id: i64) -> StoreResult<Vec<i64>> {
        Ok(self
            .tables()
            .parents
            .iter()
            .filter(|(parent, _)| *parent == parent_id)
            .map(|(_, child)| *child)
            .collect())
    }

    async fn category_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables().categories.contains(&id))
    }

    async fn candidate_question_ids(
        &self,
        category_ids: &[i64],
        difficulty: Option<Difficulty>,
    ) -> StoreResult<Vec<i64>> {
        Ok(self
            .tables()
            .questions
            .values()
            .filter(|q| category_ids.contains(&q.category_id))
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d.as_str()))
            .map(|q| q.id)
            .collect())
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.questions.get(id).cloned())
            .collect())
    }

    async fn create_attempt(
        &self,
        attempt: NewAttempt,
        items: Vec<NewLineItem>,
    ) -> StoreResult<Attempt> {
        let mut tables = self.tables();
        let mut staged = tables.clone();

        staged.next_attempt_id += 1;
        let header = Attempt {
            id: staged.next_attempt_id,
            user_id: attempt.user_id,
            name: attempt.name,
            topic_id: attempt.topic_id,
            topic_name: attempt.topic_name,
            difficulty: attempt.difficulty,
            question_count: attempt.question_count,
            duration: attempt.duration,
            score: None,
            created_at: Utc::now(),
        };
        staged.attempts.insert(header.id, header.clone());

        if self.fail_line_items.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "line item insert failed".to_string(),
            ));
        }

        for item in items {
            staged.next_line_item_id += 1;
            let id = staged.next_line_item_id;
            staged.line_items.insert(
                id,
                LineItem {
                    id,
                    attempt_id: header.id,
                    question_id: item.question_id,
                    category_id: item.category_id,
                    category: item.category,
                    category_description: item.category_description,
                    sub_category: item.sub_category,
                    content: item.content,
                    discussion: item.discussion,
                    answer_key: item.answer_key,
                    difficulty: item.difficulty,
                    scoring_type: item.scoring_type,
                    point: item.point,
                    max_point: item.max_point,
                    kkm: item.kkm,
                    selected_choice: None,
                    is_correct: false,
                    achieved_point: 0,
                    duration: 0,
                },
            );
        }

        *tables = staged;
        Ok(header)
    }

    async fn find_attempt(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<Attempt>> {
        Ok(self
            .tables()
            .attempts
            .get(&id)
            .filter(|a| owner.is_none_or(|u| a.user_id == u))
            .cloned())
    }

    async fn list_attempts(&self, filter: &HistoryFilter) -> StoreResult<(Vec<Attempt>, i64)> {
        let mut matching: Vec<Attempt> = self
            .tables()
            .attempts
            .values()
            .filter(|a| matches_filter(a, filter))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            // Unscored attempts go last in either direction, like `NULLS LAST`.
            let nulls = match filter.sort_by {
                HistorySort::Score => a.score.is_none().cmp(&b.score.is_none()),
                _ => std::cmp::Ordering::Equal,
            };
            nulls.then_with(|| {
                let ordering = compare(a, b, filter.sort_by);
                if filter.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.take as usize)
            .collect();

        Ok((page, total))
    }

    async fn line_items(&self, attempt_id: i64) -> StoreResult<Vec<LineItem>> {
        Ok(self
            .tables()
            .line_items
            .values()
            .filter(|item| item.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn find_line_item(&self, id: i64, owner: Option<i64>) -> StoreResult<Option<LineItem>> {
        let tables = self.tables();
        let Some(item) = tables.line_items.get(&id) else {
            return Ok(None);
        };

        let visible = match owner {
            None => true,
            Some(user_id) => tables
                .attempts
                .get(&item.attempt_id)
                .is_some_and(|a| a.user_id == user_id),
        };

        Ok(visible.then(|| item.clone()))
    }

    async fn save_answer(&self, line_item_id: i64, update: &AnswerUpdate) -> StoreResult<()> {
        if let Some(item) = self.tables().line_items.get_mut(&line_item_id) {
            item.selected_choice = update.selected_choice.clone();
            item.is_correct = update.is_correct;
            item.achieved_point = update.achieved_point;
            if let Some(duration) = update.duration {
                item.duration = duration;
            }
        }
        Ok(())
    }

    async fn set_score(&self, attempt_id: i64, score: i64) -> StoreResult<()> {
        if let Some(attempt) = self.tables().attempts.get_mut(&attempt_id) {
            attempt.score = Some(score);
        }
        Ok(())
    }

    async fn delete_attempt(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables();
        if tables.attempts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.line_items.retain(|_, item| item.attempt_id != id);
        Ok(true)
    }

    async fn close(&self) {}
}
