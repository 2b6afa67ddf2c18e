// src/models/category.rs

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// How a requested topic id is turned into the leaf categories that supply questions.
///
/// The two strategies produce different pools for the same id, so exactly one
/// is chosen for the whole process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicResolution {
    /// Leaves are the categories whose parent set contains the topic id.
    #[default]
    Parent,
    /// The topic id is itself the only leaf.
    Leaf,
}

impl FromStr for TopicResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(TopicResolution::Parent),
            "leaf" => Ok(TopicResolution::Leaf),
            other => Err(format!("unknown topic resolution '{}'", other)),
        }
    }
}

impl fmt::Display for TopicResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicResolution::Parent => f.write_str("parent"),
            TopicResolution::Leaf => f.write_str("leaf"),
        }
    }
}
