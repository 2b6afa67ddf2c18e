// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Difficulty tag of a question, or the filter requested for an attempt.
///
/// `Campur` ("mixed") only appears as a filter; bank questions are always
/// one of the three concrete levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Mudah,
    Sedang,
    Sulit,
    Campur,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Mudah => "mudah",
            Difficulty::Sedang => "sedang",
            Difficulty::Sulit => "sulit",
            Difficulty::Campur => "campur",
        }
    }

    /// The level to filter the candidate pool by. `None` means no filter.
    pub fn filter(self) -> Option<Difficulty> {
        match self {
            Difficulty::Campur => None,
            level => Some(level),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mudah" => Ok(Difficulty::Mudah),
            "sedang" => Ok(Difficulty::Sedang),
            "sulit" => Ok(Difficulty::Sulit),
            "campur" => Ok(Difficulty::Campur),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Identifier of a single choice inside an answer key.
///
/// Question editors and clients send these either as JSON numbers or as
/// strings, so both forms are accepted and compared through [`ChoiceId::canonical`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceId {
    Number(i64),
    Text(String),
}

impl ChoiceId {
    /// Canonical string form used for every comparison and for persistence.
    pub fn canonical(&self) -> String {
        match self {
            ChoiceId::Number(n) => n.to_string(),
            ChoiceId::Text(s) => s.trim().to_string(),
        }
    }

    pub fn matches(&self, canonical: &str) -> bool {
        self.canonical() == canonical
    }
}

/// One entry of an answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerChoice {
    pub id: ChoiceId,

    /// Display text of the choice.
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub is_correct: bool,

    /// Optional per-choice point value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<i64>,
}

/// Parsed answer key: the ordered list of choices of one question.
///
/// Persisted as a serialized JSON array so that a line item keeps the exact
/// key it was created with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(pub Vec<AnswerChoice>);

impl AnswerKey {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Parses a stored key, substituting an empty key when the blob is corrupt.
    /// Only the one line item is affected, so the failure is logged and not raised.
    pub fn parse_lossy(raw: &str, line_item_id: i64) -> Self {
        match Self::parse(raw) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(
                    "Corrupt answer key on line item {}, treating as empty: {}",
                    line_item_id,
                    e
                );
                Self::default()
            }
        }
    }

    /// Finds the choice whose id equals the given canonical id.
    pub fn find(&self, canonical: &str) -> Option<&AnswerChoice> {
        self.0.iter().find(|c| c.id.matches(canonical))
    }

    /// First choice flagged as correct.
    pub fn correct(&self) -> Option<&AnswerChoice> {
        self.0.iter().find(|c| c.is_correct)
    }

    pub fn choices(&self) -> &[AnswerChoice] {
        &self.0
    }
}

/// Represents the 'soal_generate_soal' table (the question bank).
/// Owned by the question-bank CRUD; only read here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Leaf category the question belongs to.
    pub category_id: i64,

    /// Prompt text.
    pub content: String,

    /// Explanation shown after the attempt.
    pub discussion: String,

    /// Serialized [`AnswerKey`].
    pub answer_key: String,

    /// 'mudah', 'sedang' or 'sulit'.
    pub difficulty: String,

    pub point: i64,
    pub max_point: i64,

    /// Pass threshold carried through to rollups.
    pub kkm: i64,

    /// Category label used for rollups.
    pub category: String,
    pub category_description: String,
    pub sub_category: String,

    /// How the question is graded, e.g. 'BENAR_SALAH'.
    pub scoring_type: String,
}
