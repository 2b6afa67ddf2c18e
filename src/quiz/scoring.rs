// src/quiz/scoring.rs

use std::collections::BTreeMap;

use crate::models::{
    attempt::{AnswerUpdate, LineItem},
    question::{AnswerKey, ChoiceId},
    statistics::{AttemptAggregates, CategoryRollup, SummaryRow, SummaryStatus},
};

/// Grades a submission against the line item's embedded answer key.
///
/// A submission that matches no choice is recorded as incorrect. A correct
/// choice without a positive point value earns the line item's configured point.
pub fn evaluate_answer(
    item: &LineItem,
    key: &AnswerKey,
    submission: Option<&ChoiceId>,
    duration: Option<i64>,
) -> AnswerUpdate {
    let selected_choice = submission.map(ChoiceId::canonical);

    let matched = selected_choice.as_deref().and_then(|id| key.find(id));
    let is_correct = matched.is_some_and(|c| c.is_correct);

    let achieved_point = match matched {
        Some(choice) if is_correct => choice.point.filter(|p| *p > 0).unwrap_or(item.point),
        _ => 0,
    };

    AnswerUpdate {
        selected_choice,
        is_correct,
        achieved_point,
        duration,
    }
}

/// Percentage of correct answers out of the requested count, rounded half up.
pub fn normalized_score(correct: i64, requested: i64) -> i64 {
    if requested <= 0 {
        return 0;
    }
    let correct = correct.clamp(0, requested);
    (correct * 200 + requested) / (requested * 2)
}

fn summary_row(item: &LineItem) -> SummaryRow {
    let key = AnswerKey::parse_lossy(&item.answer_key, item.id);

    let jawaban_kamu = match item.selected_choice.as_deref() {
        None => "-".to_string(),
        Some(selected) => key
            .find(selected)
            .and_then(|c| c.value.clone())
            .unwrap_or_else(|| selected.to_string()),
    };

    let kunci = key
        .correct()
        .and_then(|c| c.value.clone())
        .unwrap_or_else(|| "-".to_string());

    SummaryRow {
        id: item.id,
        soal: item.content.clone(),
        pembahasan: item.discussion.clone(),
        jawaban_kamu,
        kunci,
        status: if item.is_correct {
            SummaryStatus::Benar
        } else {
            SummaryStatus::Salah
        },
    }
}

/// Computes every aggregate shown on the result page.
///
/// Shared by finish and statistic so both return the same numbers for the
/// same line items. `items` must be in id order.
pub fn aggregate(question_count: i64, items: &[LineItem]) -> AttemptAggregates {
    let mut benar_count = 0;
    let mut salah_count = 0;
    let mut kosong_count = 0;
    let mut point = 0;
    let mut max_point = 0;
    let mut rollups: BTreeMap<&str, CategoryRollup> = BTreeMap::new();

    for item in items {
        if item.is_correct {
            benar_count += 1;
        } else if item.selected_choice.is_some() {
            salah_count += 1;
        }
        if item.selected_choice.is_none() {
            kosong_count += 1;
        }

        point += item.achieved_point;
        max_point += item.max_point;

        let rollup = rollups
            .entry(item.category.as_str())
            .or_insert_with(|| CategoryRollup {
                category: item.category.clone(),
                all_point: 0,
                max_point: 0,
                kkm: 0,
            });
        rollup.all_point += item.achieved_point;
        rollup.max_point += item.max_point;
        rollup.kkm += item.kkm;
    }

    AttemptAggregates {
        point_category: rollups.into_values().collect(),
        point,
        max_point,
        summary_table: items.iter().map(summary_row).collect(),
        benar_count,
        salah_count,
        kosong_count,
        calculated_score: normalized_score(benar_count, question_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = r#"[{"id":0,"value":"Jakarta","isCorrect":false},{"id":1,"value":"Bandung","isCorrect":true}]"#;

    fn item(id: i64, category: &str) -> LineItem {
        LineItem {
            id,
            attempt_id: 1,
            question_id: id,
            category_id: 3,
            category: category.to_string(),
            category_description: String::new(),
            sub_category: String::new(),
            content: format!("Soal {}", id),
            discussion: format!("Pembahasan {}", id),
            answer_key: KEY.to_string(),
            difficulty: "mudah".to_string(),
            scoring_type: "BENAR_SALAH".to_string(),
            point: 5,
            max_point: 5,
            kkm: 80,
            selected_choice: None,
            is_correct: false,
            achieved_point: 0,
            duration: 0,
        }
    }

    fn answered(mut item: LineItem, choice: ChoiceId) -> LineItem {
        let key = AnswerKey::parse(&item.answer_key).unwrap();
        let update = evaluate_answer(&item, &key, Some(&choice), None);
        item.selected_choice = update.selected_choice;
        item.is_correct = update.is_correct;
        item.achieved_point = update.achieved_point;
        item
    }

    #[test]
    fn correct_choice_earns_configured_point() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(KEY).unwrap();

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Number(1)), Some(30));
        assert!(update.is_correct);
        assert_eq!(update.achieved_point, 5);
        assert_eq!(update.selected_choice.as_deref(), Some("1"));
        assert_eq!(update.duration, Some(30));
    }

    #[test]
    fn string_submission_matches_numeric_key() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(KEY).unwrap();

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Text("1".into())), None);
        assert!(update.is_correct);
    }

    #[test]
    fn wrong_choice_earns_nothing() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(KEY).unwrap();

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Number(0)), None);
        assert!(!update.is_correct);
        assert_eq!(update.achieved_point, 0);
        assert_eq!(update.selected_choice.as_deref(), Some("0"));
    }

    #[test]
    fn unknown_choice_is_incorrect_not_an_error() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(KEY).unwrap();

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Text("Z".into())), None);
        assert!(!update.is_correct);
        assert_eq!(update.selected_choice.as_deref(), Some("Z"));
    }

    #[test]
    fn null_submission_clears_the_answer() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(KEY).unwrap();

        let update = evaluate_answer(&li, &key, None, None);
        assert_eq!(update.selected_choice, None);
        assert!(!update.is_correct);
        assert_eq!(update.achieved_point, 0);
    }

    #[test]
    fn per_choice_point_wins_over_configured_point() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse(r#"[{"id":"a","value":"x","isCorrect":true,"point":8}]"#).unwrap();

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Text("a".into())), None);
        assert_eq!(update.achieved_point, 8);
    }

    #[test]
    fn corrupt_key_grades_as_incorrect() {
        let li = item(1, "IPA");
        let key = AnswerKey::parse_lossy("not-json", li.id);

        let update = evaluate_answer(&li, &key, Some(&ChoiceId::Number(1)), None);
        assert!(!update.is_correct);
    }

    #[test]
    fn normalized_score_rounds_half_up() {
        assert_eq!(normalized_score(0, 0), 0);
        assert_eq!(normalized_score(0, 5), 0);
        assert_eq!(normalized_score(5, 5), 100);
        assert_eq!(normalized_score(1, 3), 33);
        assert_eq!(normalized_score(2, 3), 67);
        assert_eq!(normalized_score(1, 8), 13); // 12.5
        assert_eq!(normalized_score(9, 5), 100);
    }

    #[test]
    fn normalized_score_stays_in_bounds() {
        for requested in 1..=40 {
            for correct in 0..=requested {
                let score = normalized_score(correct, requested);
                let exact = correct as f64 * 100.0 / requested as f64;
                assert!((0..=100).contains(&score));
                assert!((score as f64 - exact).abs() <= 0.5 + 1e-9, "{}/{}", correct, requested);
            }
        }
    }

    #[test]
    fn aggregates_counts_points_and_rollups() {
        let items = vec![
            answered(item(1, "IPA"), ChoiceId::Number(1)),
            answered(item(2, "IPA"), ChoiceId::Number(0)),
            item(3, "IPS"),
            answered(item(4, "IPS"), ChoiceId::Text("1".into())),
        ];

        let agg = aggregate(4, &items);

        assert_eq!(agg.benar_count, 2);
        assert_eq!(agg.salah_count, 1);
        assert_eq!(agg.kosong_count, 1);
        assert_eq!(agg.benar_count + agg.salah_count + agg.kosong_count, 4);
        assert_eq!(agg.calculated_score, 50);
        assert_eq!(agg.point, items.iter().map(|i| i.achieved_point).sum::<i64>());
        assert_eq!(agg.point, 10);
        assert_eq!(agg.max_point, 20);

        assert_eq!(
            agg.point_category,
            vec![
                CategoryRollup {
                    category: "IPA".into(),
                    all_point: 5,
                    max_point: 10,
                    kkm: 160
                },
                CategoryRollup {
                    category: "IPS".into(),
                    all_point: 5,
                    max_point: 10,
                    kkm: 160
                },
            ]
        );
    }

    #[test]
    fn summary_table_labels() {
        let mut raw = item(4, "IPA");
        raw.selected_choice = Some("Z".into());

        let items = vec![
            answered(item(1, "IPA"), ChoiceId::Number(1)),
            answered(item(2, "IPA"), ChoiceId::Number(0)),
            item(3, "IPA"),
            raw,
        ];
        let rows = aggregate(4, &items).summary_table;

        assert_eq!(rows[0].jawaban_kamu, "Bandung");
        assert_eq!(rows[0].status, SummaryStatus::Benar);
        assert_eq!(rows[1].jawaban_kamu, "Jakarta");
        assert_eq!(rows[1].status, SummaryStatus::Salah);
        assert_eq!(rows[2].jawaban_kamu, "-");
        assert_eq!(rows[2].status, SummaryStatus::Salah);
        assert_eq!(rows[3].jawaban_kamu, "Z");
        assert!(rows.iter().all(|r| r.kunci == "Bandung"));
    }
}
