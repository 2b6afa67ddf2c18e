// src/models/history.rs

use serde::{Deserialize, Serialize};

use crate::models::question::Difficulty;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Columns the history list can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistorySort {
    #[default]
    CreatedAt,
    Name,
    Score,
    QuestionCount,
    TopicName,
}

impl HistorySort {
    pub fn column(&self) -> &'static str {
        match self {
            HistorySort::CreatedAt => "created_at",
            HistorySort::Name => "name",
            HistorySort::Score => "score",
            HistorySort::QuestionCount => "question_count",
            HistorySort::TopicName => "topic_name",
        }
    }
}

/// Query parameters for listing attempts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListParams {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub sort_by: Option<HistorySort>,

    /// Defaults to `true` when no `sortBy` is given (newest first).
    pub descending: Option<bool>,

    /// Substring match on the attempt name or topic name.
    pub search: Option<String>,

    pub difficulty: Option<Difficulty>,

    /// Admin listing only; ignored for learners.
    pub user_id: Option<i64>,
}

/// Normalized listing filter handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryFilter {
    pub user_id: Option<i64>,
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub sort_by: HistorySort,
    pub descending: bool,
    pub skip: i64,
    pub take: i64,
}

impl HistoryListParams {
    /// Builds the store filter. `owner` pins the listing to one user.
    pub fn into_filter(self, owner: Option<i64>) -> HistoryFilter {
        let descending = match (self.sort_by, self.descending) {
            (_, Some(d)) => d,
            (None, None) => true,
            (Some(_), None) => false,
        };

        HistoryFilter {
            user_id: owner.or(self.user_id),
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            difficulty: self.difficulty,
            sort_by: self.sort_by.unwrap_or_default(),
            descending,
            skip: self.skip.unwrap_or(0).max(0),
            take: self
                .take
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub skip: i64,
    pub take: i64,
}

/// Paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
