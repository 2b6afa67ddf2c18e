// src/quiz/sampler.rs

use rand::{Rng, seq::SliceRandom};

use crate::quiz::QuizError;

/// Draws `count` distinct ids uniformly at random without replacement.
///
/// Duplicates in the pool are collapsed first, so `available` in the error is
/// the number of distinct candidates. The order of the result carries no meaning.
pub fn sample_ids<R: Rng + ?Sized>(
    mut pool: Vec<i64>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<i64>, QuizError> {
    pool.sort_unstable();
    pool.dedup();

    if count > pool.len() {
        return Err(QuizError::InsufficientPool {
            available: pool.len(),
            requested: count,
        });
    }

    // Partial Fisher-Yates: only the first `count` slots are shuffled.
    let (selected, _) = pool.partial_shuffle(rng, count);
    Ok(selected.to_vec())
}
