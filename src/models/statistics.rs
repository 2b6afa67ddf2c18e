// src/models/statistics.rs

use serde::Serialize;

use crate::models::attempt::Attempt;

/// Per-category point rollup of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRollup {
    pub category: String,
    pub all_point: i64,
    pub max_point: i64,
    pub kkm: i64,
}

/// 'Benar' / 'Salah' label of a summary row. Unanswered items count as 'Salah'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryStatus {
    Benar,
    Salah,
}

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub id: i64,
    pub soal: String,
    pub pembahasan: String,
    /// Text of the submitted choice, the raw submission, or "-".
    pub jawaban_kamu: String,
    /// Text of the correct choice or "-".
    pub kunci: String,
    pub status: SummaryStatus,
}

/// Aggregates derived from the line items of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAggregates {
    pub point_category: Vec<CategoryRollup>,
    pub point: i64,
    pub max_point: i64,
    pub summary_table: Vec<SummaryRow>,
    pub benar_count: i64,
    pub salah_count: i64,
    pub kosong_count: i64,
    pub calculated_score: i64,
}

/// Payload of `finish` and `statistic`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatistics {
    #[serde(flatten)]
    pub attempt: Attempt,
    #[serde(flatten)]
    pub aggregates: AttemptAggregates,
}
