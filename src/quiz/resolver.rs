// src/quiz/resolver.rs

use crate::{
    models::category::TopicResolution,
    quiz::QuizError,
    store::QuizStore,
};

/// Expands a requested topic into the leaf categories whose questions count toward it.
///
/// Fails with `EmptyTopic` when nothing resolves, before anything is written.
pub async fn resolve_topic(
    store: &dyn QuizStore,
    topic_id: i64,
    strategy: TopicResolution,
) -> Result<Vec<i64>, QuizError> {
    let leaves = match strategy {
        TopicResolution::Parent => store.child_category_ids(topic_id).await?,
        TopicResolution::Leaf => {
            if store.category_exists(topic_id).await? {
                vec![topic_id]
            } else {
                Vec::new()
            }
        }
    };

    if leaves.is_empty() {
        return Err(QuizError::EmptyTopic { topic_id });
    }

    Ok(leaves)
}
