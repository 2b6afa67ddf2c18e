// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::question::{AnswerChoice, ChoiceId, Difficulty, Question};

/// Attempt header, the 'generate_soal_history' table.
///
/// Written once at creation; afterwards only `score` changes (on finish).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,

    /// Generated display name, e.g. "Latihan 19 Oktober 2026 14:05".
    pub name: String,

    /// Requested topic (a parent or leaf category).
    pub topic_id: i64,
    pub topic_name: String,

    /// Requested difficulty filter.
    pub difficulty: Difficulty,

    /// Number of line items, fixed at creation.
    pub question_count: i64,

    /// Allotted time in minutes.
    pub duration: i64,

    /// Normalized score, `None` until the attempt is finished.
    pub score: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// Header data for a new attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub name: String,
    pub topic_id: i64,
    pub topic_name: String,
    pub difficulty: Difficulty,
    pub question_count: i64,
    pub duration: i64,
}

/// Per-question snapshot inside an attempt, the 'generate_soal_history_detail' table.
///
/// Everything but the answer fields is copied from the bank at creation and
/// never refreshed.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: i64,
    pub attempt_id: i64,

    /// Source question. Kept for reference only, there is no live link.
    pub question_id: i64,

    pub category_id: i64,
    pub category: String,
    pub category_description: String,
    pub sub_category: String,

    pub content: String,
    pub discussion: String,

    /// Serialized answer key as it was when the attempt was created.
    #[serde(skip)]
    pub answer_key: String,

    pub difficulty: String,
    pub scoring_type: String,

    /// Configured point of the question.
    pub point: i64,
    pub max_point: i64,
    pub kkm: i64,

    /// Canonical id of the selected choice; `None` means unanswered.
    #[serde(rename = "jawabanSelect")]
    pub selected_choice: Option<String>,
    pub is_correct: bool,
    pub achieved_point: i64,

    /// Elapsed seconds spent on this question.
    pub duration: i64,
}

/// Line item data for a new attempt.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub question_id: i64,
    pub category_id: i64,
    pub category: String,
    pub category_description: String,
    pub sub_category: String,
    pub content: String,
    pub discussion: String,
    pub answer_key: String,
    pub difficulty: String,
    pub scoring_type: String,
    pub point: i64,
    pub max_point: i64,
    pub kkm: i64,
}

impl From<&Question> for NewLineItem {
    fn from(q: &Question) -> Self {
        Self {
            question_id: q.id,
            category_id: q.category_id,
            category: q.category.clone(),
            category_description: q.category_description.clone(),
            sub_category: q.sub_category.clone(),
            content: q.content.clone(),
            discussion: q.discussion.clone(),
            answer_key: q.answer_key.clone(),
            difficulty: q.difficulty.clone(),
            scoring_type: q.scoring_type.clone(),
            point: q.point,
            max_point: q.max_point,
            kkm: q.kkm,
        }
    }
}

/// Field values written by the answer recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerUpdate {
    pub selected_choice: Option<String>,
    pub is_correct: bool,
    pub achieved_point: i64,
    /// `None` leaves the stored duration unchanged.
    pub duration: Option<i64>,
}

/// Line item with its answer key expanded, as served by `GET soal/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    #[serde(flatten)]
    pub item: LineItem,
    pub jawaban: Vec<AnswerChoice>,
}

/// Answer state of one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Benar,
    Salah,
    BelumDikerjakan,
}

impl LineItemStatus {
    pub fn of(item: &LineItem) -> Self {
        if item.is_correct {
            LineItemStatus::Benar
        } else if item.selected_choice.is_some() {
            LineItemStatus::Salah
        } else {
            LineItemStatus::BelumDikerjakan
        }
    }
}

/// Navigation entry for one line item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemState {
    pub id: i64,
    pub is_answered: bool,
    pub status: LineItemStatus,
}

impl From<&LineItem> for LineItemState {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id,
            is_answered: item.selected_choice.is_some(),
            status: LineItemStatus::of(item),
        }
    }
}

/// Attempt with the answer state of each of its line items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub soal_id: Vec<LineItemState>,
}

/// DTO for generating a new attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(alias = "categoryId")]
    #[validate(range(min = 1, message = "topicId must be a positive id"))]
    pub topic_id: i64,

    #[serde(alias = "tingkatKesulitan")]
    pub difficulty: Difficulty,

    #[serde(alias = "jumlahSoal")]
    #[validate(range(min = 1, max = 200, message = "questionCount must be between 1 and 200"))]
    pub question_count: i64,

    /// Minutes.
    #[serde(alias = "waktu")]
    #[validate(range(min = 1, max = 1440, message = "duration must be between 1 and 1440 minutes"))]
    pub duration: i64,

    #[serde(alias = "kategori")]
    #[validate(
        length(min = 1, max = 255, message = "topicName must be between 1 and 255 characters"),
        custom(function = validate_not_blank)
    )]
    pub topic_name: String,
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("topicName must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// DTO for answering one line item.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub id: i64,

    /// Selected choice; `null` clears the answer.
    #[serde(default)]
    pub jawaban_select: Option<ChoiceId>,

    /// Elapsed seconds on this question.
    #[validate(range(min = 0))]
    pub duration: Option<i64>,
}

/// DTO for finishing an attempt.
#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    pub id: i64,
}
