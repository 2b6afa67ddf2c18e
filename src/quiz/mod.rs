// src/quiz/mod.rs

//! Quiz attempt engine: generates attempts from the question bank, records
//! answers and scores finished attempts.

pub mod resolver;
pub mod sampler;
pub mod scoring;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, TimeZone};

use crate::{
    models::{
        attempt::{
            AnswerRequest, Attempt, AttemptDetail, GenerateRequest, LineItemState, LineItemView,
            NewAttempt, NewLineItem,
        },
        category::TopicResolution,
        history::{HistoryListParams, Page, Pagination},
        question::AnswerKey,
        statistics::AttemptStatistics,
    },
    store::{QuizStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Topic {topic_id} has no sub-categories or questions yet")]
    EmptyTopic { topic_id: i64 },

    #[error("Not enough questions (available: {available}, requested: {requested})")]
    InsufficientPool { available: usize, requested: usize },

    #[error("History not found")]
    AttemptNotFound,

    #[error("Question not found")]
    LineItemNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identity of the requesting user, as supplied by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Caller {
    /// Owner restriction for lookups. Admins see every attempt.
    pub fn owner_filter(&self) -> Option<i64> {
        (!self.is_admin).then_some(self.user_id)
    }
}

const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];

/// Display name of a new attempt, e.g. "Latihan 05 Maret 2026 09:30".
pub fn attempt_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!(
        "Latihan {:02} {} {} {}",
        at.day(),
        MONTHS[at.month0() as usize],
        at.year(),
        at.naive_local().format("%H:%M")
    )
}

#[derive(Clone)]
pub struct QuizEngine {
    store: Arc<dyn QuizStore>,
    resolution: TopicResolution,
}

impl QuizEngine {
    pub fn new(store: Arc<dyn QuizStore>, resolution: TopicResolution) -> Self {
        Self { store, resolution }
    }

    /// Creates a new attempt with `question_count` questions drawn at random
    /// from the requested topic.
    ///
    /// * Resolves the topic, builds the candidate pool and samples it; any of
    ///   these failing aborts before anything is written.
    /// * Copies the sampled questions into line items and stores header and
    ///   items in one transaction.
    pub async fn generate(
        &self,
        caller: &Caller,
        req: &GenerateRequest,
    ) -> Result<Attempt, QuizError> {
        let leaves = resolver::resolve_topic(self.store.as_ref(), req.topic_id, self.resolution).await?;

        let candidates = self
            .store
            .candidate_question_ids(&leaves, req.difficulty.filter())
            .await?;

        let requested = usize::try_from(req.question_count).unwrap_or(0);
        let selected = {
            let mut rng = rand::rng();
            sampler::sample_ids(candidates, requested, &mut rng)?
        };

        let questions = self.store.questions_by_ids(&selected).await?;
        // Questions deleted between the id query and this one shrink the pool.
        if questions.len() != selected.len() {
            return Err(QuizError::InsufficientPool {
                available: questions.len(),
                requested,
            });
        }

        let items: Vec<NewLineItem> = questions.iter().map(NewLineItem::from).collect();
        let header = NewAttempt {
            user_id: caller.user_id,
            name: attempt_name(&Local::now()),
            topic_id: req.topic_id,
            topic_name: req.topic_name.trim().to_string(),
            difficulty: req.difficulty,
            question_count: items.len() as i64,
            duration: req.duration,
        };

        let attempt = self.store.create_attempt(header, items).await?;

        tracing::info!(
            "Attempt {} created for user {} (topic {}, {} questions, {})",
            attempt.id,
            attempt.user_id,
            attempt.topic_id,
            attempt.question_count,
            attempt.difficulty
        );

        Ok(attempt)
    }

    /// Records (or clears) the answer of one line item and grades it against
    /// the answer key frozen in that item.
    pub async fn record_answer(&self, caller: &Caller, req: &AnswerRequest) -> Result<(), QuizError> {
        let item = self
            .store
            .find_line_item(req.id, caller.owner_filter())
            .await?
            .ok_or(QuizError::LineItemNotFound)?;

        let key = AnswerKey::parse_lossy(&item.answer_key, item.id);
        let update = scoring::evaluate_answer(&item, &key, req.jawaban_select.as_ref(), req.duration);

        self.store.save_answer(item.id, &update).await?;

        tracing::debug!(
            "Line item {} answered: {:?} (correct: {})",
            item.id,
            update.selected_choice,
            update.is_correct
        );

        Ok(())
    }

    /// One line item with its answer key expanded.
    pub async fn line_item(&self, caller: &Caller, id: i64) -> Result<LineItemView, QuizError> {
        let item = self
            .store
            .find_line_item(id, caller.owner_filter())
            .await?
            .ok_or(QuizError::LineItemNotFound)?;

        let AnswerKey(jawaban) = AnswerKey::parse_lossy(&item.answer_key, item.id);
        Ok(LineItemView { item, jawaban })
    }

    /// Attempt header plus the answer state of every line item.
    pub async fn attempt_detail(&self, caller: &Caller, id: i64) -> Result<AttemptDetail, QuizError> {
        let attempt = self.find_attempt(caller, id).await?;
        let items = self.store.line_items(attempt.id).await?;

        Ok(AttemptDetail {
            attempt,
            soal_id: items.iter().map(LineItemState::from).collect(),
        })
    }

    /// Scores the attempt and stores the normalized score on its header.
    ///
    /// Finishing again recomputes from the current answers and overwrites the score.
    pub async fn finish(&self, caller: &Caller, id: i64) -> Result<AttemptStatistics, QuizError> {
        let mut attempt = self.find_attempt(caller, id).await?;
        let items = self.store.line_items(attempt.id).await?;
        let aggregates = scoring::aggregate(attempt.question_count, &items);

        self.store
            .set_score(attempt.id, aggregates.calculated_score)
            .await?;
        attempt.score = Some(aggregates.calculated_score);

        tracing::info!(
            "Attempt {} finished: score {} ({} correct, {} wrong, {} empty)",
            attempt.id,
            aggregates.calculated_score,
            aggregates.benar_count,
            aggregates.salah_count,
            aggregates.kosong_count
        );

        Ok(AttemptStatistics { attempt, aggregates })
    }

    /// Same payload as [`QuizEngine::finish`] without writing anything.
    pub async fn statistics(&self, caller: &Caller, id: i64) -> Result<AttemptStatistics, QuizError> {
        let attempt = self.find_attempt(caller, id).await?;
        let items = self.store.line_items(attempt.id).await?;
        let aggregates = scoring::aggregate(attempt.question_count, &items);

        Ok(AttemptStatistics { attempt, aggregates })
    }

    /// Lists attempts. `owner` pins the listing to one user; `None` lists everyone's.
    pub async fn list_history(
        &self,
        owner: Option<i64>,
        params: HistoryListParams,
    ) -> Result<Page<Attempt>, QuizError> {
        let filter = params.into_filter(owner);
        let (data, total) = self.store.list_attempts(&filter).await?;

        Ok(Page {
            data,
            pagination: Pagination {
                total,
                skip: filter.skip,
                take: filter.take,
            },
        })
    }

    pub async fn delete_attempt(&self, id: i64) -> Result<(), QuizError> {
        if !self.store.delete_attempt(id).await? {
            return Err(QuizError::AttemptNotFound);
        }
        tracing::info!("Attempt {} deleted", id);
        Ok(())
    }

    async fn find_attempt(&self, caller: &Caller, id: i64) -> Result<Attempt, QuizError> {
        self.store
            .find_attempt(id, caller.owner_filter())
            .await?
            .ok_or(QuizError::AttemptNotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;
    use crate::models::{
        attempt::LineItemStatus,
        history::HistorySort,
        question::{ChoiceId, Difficulty, Question},
    };
    use crate::store::MemoryStore;

    const LEARNER: Caller = Caller {
        user_id: 10,
        is_admin: false,
    };
    const OTHER: Caller = Caller {
        user_id: 11,
        is_admin: false,
    };
    const ADMIN: Caller = Caller {
        user_id: 1,
        is_admin: true,
    };

    /// Correct choice of question `id` is `id % 4`.
    fn question(id: i64, category_id: i64, difficulty: &str) -> Question {
        let correct = id % 4;
        let choices: Vec<String> = (0..4)
            .map(|c| {
                format!(
                    r#"{{"id":{},"value":"Pilihan {}","isCorrect":{}}}"#,
                    c,
                    c,
                    c == correct
                )
            })
            .collect();

        Question {
            id,
            category_id,
            content: format!("Soal {}", id),
            discussion: format!("Pembahasan {}", id),
            answer_key: format!("[{}]", choices.join(",")),
            difficulty: difficulty.to_string(),
            point: 5,
            max_point: 5,
            kkm: 80,
            category: if category_id == 3 { "IPA" } else { "IPS" }.to_string(),
            category_description: String::new(),
            sub_category: String::new(),
            scoring_type: "BENAR_SALAH".to_string(),
        }
    }

    /// Topic 1 has leaves 3 (10 'mudah' questions) and 4 (3 'sulit' questions).
    fn seeded() -> (Arc<MemoryStore>, QuizEngine) {
        let store = Arc::new(MemoryStore::new());
        store.link_parent(1, 3);
        store.link_parent(1, 4);
        for id in 1..=10 {
            store.upsert_question(question(id, 3, "mudah"));
        }
        for id in 11..=13 {
            store.upsert_question(question(id, 4, "sulit"));
        }
        let engine = QuizEngine::new(store.clone(), TopicResolution::Parent);
        (store, engine)
    }

    fn request(count: i64, difficulty: Difficulty) -> GenerateRequest {
        GenerateRequest {
            topic_id: 1,
            difficulty,
            question_count: count,
            duration: 30,
            topic_name: "Sains".to_string(),
        }
    }

    async fn answer_all_correctly(store: &MemoryStore, engine: &QuizEngine, attempt_id: i64) {
        for item in store.line_items(attempt_id).await.unwrap() {
            let req = AnswerRequest {
                id: item.id,
                jawaban_select: Some(ChoiceId::Number(item.question_id % 4)),
                duration: Some(12),
            };
            engine.record_answer(&LEARNER, &req).await.unwrap();
        }
    }

    #[tokio::test]
    async fn end_to_end_perfect_score() {
        let (store, engine) = seeded();

        let attempt = engine
            .generate(&LEARNER, &request(5, Difficulty::Mudah))
            .await
            .unwrap();
        assert_eq!(attempt.question_count, 5);
        assert_eq!(attempt.score, None);
        assert!(attempt.name.starts_with("Latihan "));

        let items = store.line_items(attempt.id).await.unwrap();
        assert_eq!(items.len(), 5);
        let sources: HashSet<i64> = items.iter().map(|i| i.question_id).collect();
        assert_eq!(sources.len(), 5);
        assert!(items.iter().all(|i| i.difficulty == "mudah"));
        assert!(items.iter().all(|i| i.selected_choice.is_none() && !i.is_correct));

        answer_all_correctly(&store, &engine, attempt.id).await;

        let stats = engine.finish(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(stats.aggregates.calculated_score, 100);
        assert_eq!(stats.aggregates.benar_count, 5);
        assert_eq!(stats.aggregates.salah_count, 0);
        assert_eq!(stats.aggregates.kosong_count, 0);
        assert_eq!(stats.aggregates.point, 25);
        assert_eq!(stats.attempt.score, Some(100));

        let stored = store.find_attempt(attempt.id, None).await.unwrap().unwrap();
        assert_eq!(stored.score, Some(100));
    }

    #[tokio::test]
    async fn mixed_difficulty_draws_from_every_leaf() {
        let (_, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(13, Difficulty::Campur))
            .await
            .unwrap();
        assert_eq!(attempt.question_count, 13);
    }

    #[tokio::test]
    async fn insufficient_pool_writes_nothing() {
        let (store, engine) = seeded();

        let err = engine
            .generate(&LEARNER, &request(4, Difficulty::Sulit))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QuizError::InsufficientPool {
                available: 3,
                requested: 4
            }
        ));
        assert_eq!(store.attempt_count(), 0);
        assert_eq!(store.line_item_count(), 0);
    }

    #[tokio::test]
    async fn empty_topic_writes_nothing() {
        let (store, engine) = seeded();
        let mut req = request(1, Difficulty::Campur);
        req.topic_id = 3;

        let err = engine.generate(&LEARNER, &req).await.unwrap_err();
        assert!(matches!(err, QuizError::EmptyTopic { topic_id: 3 }));
        assert_eq!(store.attempt_count(), 0);
    }

    #[tokio::test]
    async fn leaf_resolution_uses_topic_as_category() {
        let (store, _) = seeded();
        let engine = QuizEngine::new(store.clone(), TopicResolution::Leaf);
        let mut req = request(3, Difficulty::Campur);
        req.topic_id = 4;

        let attempt = engine.generate(&LEARNER, &req).await.unwrap();
        let items = store.line_items(attempt.id).await.unwrap();
        assert!(items.iter().all(|i| i.category_id == 4));
    }

    #[tokio::test]
    async fn failed_line_item_insert_leaves_no_attempt() {
        let (store, engine) = seeded();
        store.fail_next_line_item_insert();

        let err = engine
            .generate(&LEARNER, &request(5, Difficulty::Mudah))
            .await
            .unwrap_err();

        assert!(matches!(err, QuizError::Store(_)));
        assert_eq!(store.attempt_count(), 0);
        assert_eq!(store.line_item_count(), 0);

        // The store recovers for the next request.
        engine
            .generate(&LEARNER, &request(5, Difficulty::Mudah))
            .await
            .unwrap();
        assert_eq!(store.attempt_count(), 1);
    }

    #[tokio::test]
    async fn bank_edits_do_not_reach_existing_attempts() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(10, Difficulty::Mudah))
            .await
            .unwrap();
        let before = store.line_items(attempt.id).await.unwrap();

        for id in 1..=10 {
            let mut q = question(id, 3, "mudah");
            q.content = "edited".to_string();
            q.answer_key = "[]".to_string();
            store.upsert_question(q);
        }

        let after = store.line_items(attempt.id).await.unwrap();
        assert_eq!(before, after);
        assert!(after.iter().all(|i| i.content != "edited"));
    }

    #[tokio::test]
    async fn statistics_are_read_only_and_stable() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(4, Difficulty::Mudah))
            .await
            .unwrap();
        let first_item = store.line_items(attempt.id).await.unwrap()[0].clone();
        engine
            .record_answer(
                &LEARNER,
                &AnswerRequest {
                    id: first_item.id,
                    jawaban_select: Some(ChoiceId::Number(first_item.question_id % 4)),
                    duration: None,
                },
            )
            .await
            .unwrap();

        let a = engine.statistics(&LEARNER, attempt.id).await.unwrap();
        let b = engine.statistics(&LEARNER, attempt.id).await.unwrap();

        assert_eq!(a.aggregates, b.aggregates);
        assert_eq!(a.aggregates.calculated_score, 25);
        assert_eq!(a.attempt.score, None);
        assert_eq!(
            store.find_attempt(attempt.id, None).await.unwrap().unwrap().score,
            None
        );

        let finished = engine.finish(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(finished.aggregates, a.aggregates);
    }

    #[tokio::test]
    async fn answers_overwrite_and_clear() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(1, Difficulty::Mudah))
            .await
            .unwrap();
        let item = store.line_items(attempt.id).await.unwrap()[0].clone();
        let correct = item.question_id % 4;
        let wrong = (correct + 1) % 4;

        let answer = |choice: Option<ChoiceId>| AnswerRequest {
            id: item.id,
            jawaban_select: choice,
            duration: None,
        };

        engine
            .record_answer(&LEARNER, &answer(Some(ChoiceId::Text(correct.to_string()))))
            .await
            .unwrap();
        let detail = engine.attempt_detail(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(detail.soal_id[0].status, LineItemStatus::Benar);

        engine
            .record_answer(&LEARNER, &answer(Some(ChoiceId::Number(wrong))))
            .await
            .unwrap();
        let detail = engine.attempt_detail(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(detail.soal_id[0].status, LineItemStatus::Salah);
        assert!(detail.soal_id[0].is_answered);

        engine.record_answer(&LEARNER, &answer(None)).await.unwrap();
        let stats = engine.statistics(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(stats.aggregates.kosong_count, 1);
        assert_eq!(stats.aggregates.salah_count, 0);
        assert_eq!(stats.aggregates.point, 0);
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_answer() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(2, Difficulty::Mudah))
            .await
            .unwrap();
        let item = store.line_items(attempt.id).await.unwrap()[0].clone();

        assert!(matches!(
            engine.finish(&OTHER, attempt.id).await,
            Err(QuizError::AttemptNotFound)
        ));
        assert!(matches!(
            engine.line_item(&OTHER, item.id).await,
            Err(QuizError::LineItemNotFound)
        ));
        let req = AnswerRequest {
            id: item.id,
            jawaban_select: Some(ChoiceId::Number(0)),
            duration: None,
        };
        assert!(matches!(
            engine.record_answer(&OTHER, &req).await,
            Err(QuizError::LineItemNotFound)
        ));

        assert!(engine.statistics(&ADMIN, attempt.id).await.is_ok());
        assert!(engine.line_item(&ADMIN, item.id).await.is_ok());
    }

    #[tokio::test]
    async fn finishing_twice_recomputes_from_current_answers() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(2, Difficulty::Mudah))
            .await
            .unwrap();

        let first = engine.finish(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(first.attempt.score, Some(0));

        answer_all_correctly(&store, &engine, attempt.id).await;

        let second = engine.finish(&LEARNER, attempt.id).await.unwrap();
        assert_eq!(second.attempt.score, Some(100));
    }

    #[tokio::test]
    async fn line_item_view_expands_answer_key() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(1, Difficulty::Mudah))
            .await
            .unwrap();
        let item = store.line_items(attempt.id).await.unwrap()[0].clone();

        let view = engine.line_item(&LEARNER, item.id).await.unwrap();
        assert_eq!(view.jawaban.len(), 4);
        assert_eq!(view.jawaban.iter().filter(|c| c.is_correct).count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_attempt_and_items() {
        let (store, engine) = seeded();
        let attempt = engine
            .generate(&LEARNER, &request(3, Difficulty::Mudah))
            .await
            .unwrap();

        engine.delete_attempt(attempt.id).await.unwrap();
        assert_eq!(store.attempt_count(), 0);
        assert_eq!(store.line_item_count(), 0);
        assert!(matches!(
            engine.delete_attempt(attempt.id).await,
            Err(QuizError::AttemptNotFound)
        ));
    }

    #[tokio::test]
    async fn history_is_scoped_to_owner() {
        let (_, engine) = seeded();
        engine
            .generate(&LEARNER, &request(1, Difficulty::Mudah))
            .await
            .unwrap();
        engine
            .generate(&OTHER, &request(1, Difficulty::Mudah))
            .await
            .unwrap();

        let mine = engine
            .list_history(Some(LEARNER.user_id), HistoryListParams::default())
            .await
            .unwrap();
        assert_eq!(mine.pagination.total, 1);
        assert!(mine.data.iter().all(|a| a.user_id == LEARNER.user_id));

        let all = engine
            .list_history(None, HistoryListParams::default())
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);
    }

    #[tokio::test]
    async fn history_listing_filters_sorts_and_pages() {
        let (store, engine) = seeded();
        let first = engine
            .generate(&LEARNER, &request(2, Difficulty::Mudah))
            .await
            .unwrap();
        let second = engine
            .generate(&LEARNER, &request(3, Difficulty::Sulit))
            .await
            .unwrap();
        let third = engine
            .generate(&LEARNER, &request(4, Difficulty::Campur))
            .await
            .unwrap();
        answer_all_correctly(&store, &engine, second.id).await;
        engine.finish(&LEARNER, second.id).await.unwrap();
        engine.finish(&LEARNER, first.id).await.unwrap();

        let by_score = engine
            .list_history(
                Some(LEARNER.user_id),
                HistoryListParams {
                    sort_by: Some(HistorySort::Score),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let ids: Vec<i64> = by_score.data.iter().map(|a| a.id).collect();
        // Ascending by score, the unfinished attempt last.
        assert_eq!(ids, vec![first.id, second.id, third.id]);

        let sulit = engine
            .list_history(
                Some(LEARNER.user_id),
                HistoryListParams {
                    difficulty: Some(Difficulty::Sulit),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sulit.pagination.total, 1);
        assert_eq!(sulit.data[0].id, second.id);

        let page = engine
            .list_history(
                Some(LEARNER.user_id),
                HistoryListParams {
                    sort_by: Some(HistorySort::QuestionCount),
                    skip: Some(1),
                    take: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.skip, 1);
        assert_eq!(page.pagination.take, 1);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, second.id);

        let none = engine
            .list_history(
                Some(LEARNER.user_id),
                HistoryListParams {
                    search: Some("Sejarah".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(none.pagination.total, 0);
    }

    #[test]
    fn attempt_name_uses_indonesian_month() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 9, 30, 0).unwrap();
        assert_eq!(attempt_name(&at), "Latihan 05 Maret 2026 09:30");
    }
}
