use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{cohort_values, exam_aggregate};
use crate::error::AnalyticsError;
use crate::models::{
    ExamSummary, HistoryPoint, Stability, StudentRef, StudentTrendReport, TrendDirection,
    TrendResult,
};
use crate::rank::rank;
use crate::snapshot::ScoreSnapshot;

/// Number of most recent exams the direction is judged on.
pub const TREND_WINDOW: usize = 3;
/// Absolute points on the summed exam total, not a percentage.
pub const TREND_MARGIN_POINTS: f64 = 5.0;
/// Standard deviation above which stability drops to medium.
pub const MEDIUM_STABILITY_STD_DEV: f64 = 5.0;
/// Standard deviation above which stability drops to low.
pub const LOW_STABILITY_STD_DEV: f64 = 10.0;

/// Thresholds used to classify a history. `Default` carries the fixed
/// policy values; overrides only come from explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPolicy {
    pub margin_points: f64,
    pub medium_std_dev: f64,
    pub low_std_dev: f64,
}

impl Default for TrendPolicy {
    fn default() -> Self {
        Self {
            margin_points: TREND_MARGIN_POINTS,
            medium_std_dev: MEDIUM_STABILITY_STD_DEV,
            low_std_dev: LOW_STABILITY_STD_DEV,
        }
    }
}

/// Puts a history oldest-first by `(exam_date, exam_id)`. Newest-first and
/// shuffled feeds end up in the same order, and same-day exams are settled
/// by exam id whatever order they arrived in.
pub fn chronological(mut history: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
    history.sort_by(|a, b| a.exam_date.cmp(&b.exam_date).then(a.exam_id.cmp(&b.exam_id)));
    history
}

/// Second-half mean minus first-half mean of total scores over the last
/// `TREND_WINDOW` exams. The first half takes the extra exam on odd windows.
pub fn window_delta(history: &[HistoryPoint]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let window = &history[history.len().saturating_sub(TREND_WINDOW)..];
    let (first, second) = window.split_at(window.len().div_ceil(2));
    Some(mean_total(second) - mean_total(first))
}

fn mean_total(points: &[HistoryPoint]) -> f64 {
    points.iter().map(|p| p.total_score).sum::<f64>() / points.len() as f64
}

/// Population variance and standard deviation of per-exam averages.
pub fn dispersion(history: &[HistoryPoint]) -> Option<(f64, f64)> {
    if history.is_empty() {
        return None;
    }
    let count = history.len() as f64;
    let mean = history.iter().map(|p| p.average_score).sum::<f64>() / count;
    let variance = history
        .iter()
        .map(|p| (p.average_score - mean).powi(2))
        .sum::<f64>()
        / count;
    Some((variance, variance.sqrt()))
}

pub fn classify_stability(std_deviation: f64, policy: &TrendPolicy) -> Stability {
    if std_deviation > policy.low_std_dev {
        Stability::Low
    } else if std_deviation > policy.medium_std_dev {
        Stability::Medium
    } else {
        Stability::High
    }
}

pub fn analyze_trend(history: &[HistoryPoint]) -> TrendResult {
    analyze_trend_with(history, &TrendPolicy::default())
}

pub fn analyze_trend_with(history: &[HistoryPoint], policy: &TrendPolicy) -> TrendResult {
    let history = chronological(history.to_vec());

    let direction = match window_delta(&history) {
        None if history.is_empty() => TrendDirection::InsufficientData,
        None => TrendDirection::Stable,
        Some(delta) => {
            debug!(delta, points = history.len(), "trend window delta");
            if delta > policy.margin_points {
                TrendDirection::Improving
            } else if delta < -policy.margin_points {
                TrendDirection::Declining
            } else {
                TrendDirection::Stable
            }
        }
    };

    match dispersion(&history) {
        Some((variance, std_deviation)) => TrendResult {
            direction,
            stability: Some(classify_stability(std_deviation, policy)),
            variance,
            std_deviation,
        },
        None => TrendResult {
            direction,
            stability: None,
            variance: 0.0,
            std_deviation: 0.0,
        },
    }
}

/// Per-exam summaries for a student across their class's exams, oldest
/// first. Exams the student has no score in are skipped.
pub fn student_history(
    snapshot: &ScoreSnapshot,
    student_id: Uuid,
) -> Result<Vec<ExamSummary>, AnalyticsError> {
    let student = snapshot.student(student_id)?;
    let mut summaries = Vec::new();

    for exam in snapshot.class_exams(student.class_id) {
        let Some(aggregate) = exam_aggregate(snapshot.scores(), student.id, exam.id) else {
            continue;
        };
        let ranking = rank(&cohort_values(snapshot, exam, None));
        let Some(entry) = ranking.iter().find(|e| e.student_id == student.id) else {
            continue;
        };
        summaries.push(ExamSummary {
            exam_id: exam.id,
            exam_name: exam.name.clone(),
            exam_date: exam.exam_date,
            total_score: aggregate.total,
            average_score: aggregate.average(),
            course_count: aggregate.course_count,
            rank: entry.rank,
            total_students: entry.total_students,
        });
    }

    Ok(summaries)
}

pub fn student_trend(
    snapshot: &ScoreSnapshot,
    student_id: Uuid,
) -> Result<StudentTrendReport, AnalyticsError> {
    student_trend_with(snapshot, student_id, &TrendPolicy::default())
}

pub fn student_trend_with(
    snapshot: &ScoreSnapshot,
    student_id: Uuid,
    policy: &TrendPolicy,
) -> Result<StudentTrendReport, AnalyticsError> {
    let student = snapshot.student(student_id)?;
    let exams = student_history(snapshot, student_id)?;
    let points: Vec<HistoryPoint> = exams.iter().map(HistoryPoint::from).collect();
    let result = analyze_trend_with(&points, policy);

    Ok(StudentTrendReport {
        student: StudentRef::from(student),
        exams,
        trend: result.direction,
        stability: result.stability,
        variance: result.variance,
        std_deviation: result.std_deviation,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::snapshot::fixtures::{grade_ten, id};

    fn point(n: u128, day: u32, total_score: f64, average_score: f64) -> HistoryPoint {
        HistoryPoint {
            exam_id: id(n),
            exam_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            total_score,
            average_score,
        }
    }

    #[test]
    fn rising_totals_are_improving() {
        let history = vec![
            point(1, 1, 200.0, 66.0),
            point(2, 2, 210.0, 70.0),
            point(3, 3, 230.0, 76.0),
        ];
        assert_eq!(window_delta(&history), Some(25.0));
        assert_eq!(analyze_trend(&history).direction, TrendDirection::Improving);
    }

    #[test]
    fn flat_history_is_stable_with_high_stability() {
        let history: Vec<HistoryPoint> = (1..=4).map(|n| point(n, n as u32, 210.0, 70.0)).collect();
        let result = analyze_trend(&history);

        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.stability, Some(Stability::High));
        assert_eq!(result.variance, 0.0);
        assert_eq!(result.std_deviation, 0.0);
    }

    #[test]
    fn margin_is_exclusive() {
        let at_margin = vec![point(1, 1, 200.0, 66.0), point(2, 2, 205.0, 68.0)];
        assert_eq!(analyze_trend(&at_margin).direction, TrendDirection::Stable);

        let below = vec![point(1, 1, 200.0, 66.0), point(2, 2, 194.0, 64.0)];
        assert_eq!(analyze_trend(&below).direction, TrendDirection::Declining);
    }

    #[test]
    fn only_the_last_three_exams_set_direction() {
        let history = vec![
            point(1, 1, 100.0, 33.0),
            point(2, 2, 250.0, 83.0),
            point(3, 3, 250.0, 83.0),
            point(4, 4, 248.0, 82.0),
        ];
        assert_eq!(analyze_trend(&history).direction, TrendDirection::Stable);
    }

    #[test]
    fn descending_feed_is_put_oldest_first() {
        let newest_first = vec![
            point(3, 3, 230.0, 76.0),
            point(2, 2, 210.0, 70.0),
            point(1, 1, 200.0, 66.0),
        ];
        let ordered = chronological(newest_first.clone());
        let ids: Vec<Uuid> = ordered.iter().map(|p| p.exam_id).collect();
        assert_eq!(ids, vec![id(1), id(2), id(3)]);
        assert_eq!(analyze_trend(&newest_first).direction, TrendDirection::Improving);
    }

    #[test]
    fn same_day_exams_order_by_id() {
        let ordered = chronological(vec![point(9, 5, 1.0, 1.0), point(4, 5, 2.0, 2.0)]);
        assert_eq!(ordered[0].exam_id, id(4));
    }

    #[test]
    fn newest_first_feed_with_same_day_exams_still_orders_by_id() {
        let ordered = chronological(vec![
            point(8, 9, 1.0, 1.0),
            point(6, 5, 1.0, 1.0),
            point(7, 5, 1.0, 1.0),
            point(5, 2, 1.0, 1.0),
        ]);
        let ids: Vec<Uuid> = ordered.iter().map(|p| p.exam_id).collect();
        assert_eq!(ids, vec![id(5), id(6), id(7), id(8)]);
    }

    #[test]
    fn shuffled_feed_is_sorted() {
        let ordered = chronological(vec![
            point(2, 2, 1.0, 1.0),
            point(3, 3, 1.0, 1.0),
            point(1, 1, 1.0, 1.0),
        ]);
        let ids: Vec<Uuid> = ordered.iter().map(|p| p.exam_id).collect();
        assert_eq!(ids, vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn short_histories_do_not_divide() {
        let empty = analyze_trend(&[]);
        assert_eq!(empty.direction, TrendDirection::InsufficientData);
        assert_eq!(empty.stability, None);
        assert_eq!(empty.variance, 0.0);

        let single = analyze_trend(&[point(1, 1, 240.0, 80.0)]);
        assert_eq!(single.direction, TrendDirection::Stable);
        assert_eq!(single.stability, Some(Stability::High));
        assert_eq!(single.variance, 0.0);
    }

    #[test]
    fn stability_uses_population_variance_of_averages() {
        let history = vec![
            point(1, 1, 0.0, 60.0),
            point(2, 2, 0.0, 80.0),
            point(3, 3, 0.0, 60.0),
            point(4, 4, 0.0, 80.0),
        ];
        let result = analyze_trend(&history);
        assert!((result.variance - 100.0).abs() < 1e-9);
        assert!((result.std_deviation - 10.0).abs() < 1e-9);
        assert_eq!(result.stability, Some(Stability::Medium));
    }

    #[test]
    fn stability_bands() {
        let policy = TrendPolicy::default();
        assert_eq!(classify_stability(10.01, &policy), Stability::Low);
        assert_eq!(classify_stability(10.0, &policy), Stability::Medium);
        assert_eq!(classify_stability(5.01, &policy), Stability::Medium);
        assert_eq!(classify_stability(5.0, &policy), Stability::High);
    }

    #[test]
    fn explicit_policy_overrides_margin() {
        let history = vec![point(1, 1, 200.0, 66.0), point(2, 2, 208.0, 69.0)];
        assert_eq!(analyze_trend(&history).direction, TrendDirection::Improving);

        let strict = TrendPolicy {
            margin_points: 10.0,
            ..TrendPolicy::default()
        };
        assert_eq!(
            analyze_trend_with(&history, &strict).direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn history_carries_rank_and_cohort_size() {
        let fixture = grade_ten();
        let history = student_history(&fixture.snapshot, fixture.noor).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].exam_id, fixture.midterm_one);
        assert_eq!((history[0].rank, history[0].total_students), (2, 4));
        assert_eq!(history[1].exam_id, fixture.final_exam);
        assert_eq!((history[1].rank, history[1].total_students), (2, 4));
    }

    #[test]
    fn student_trend_over_fixture() {
        let fixture = grade_ten();

        let avery = student_trend(&fixture.snapshot, fixture.avery).unwrap();
        assert_eq!(avery.trend, TrendDirection::Improving);
        assert_eq!(avery.stability, Some(Stability::Medium));
        assert!((avery.variance - 37.654_321).abs() < 1e-5);

        let jules = student_trend(&fixture.snapshot, fixture.jules).unwrap();
        assert_eq!(jules.trend, TrendDirection::Declining);
        assert_eq!(jules.stability, Some(Stability::High));

        let noor = student_trend(&fixture.snapshot, fixture.noor).unwrap();
        assert_eq!(noor.trend, TrendDirection::Stable);
        assert_eq!(noor.std_deviation, 0.0);
    }

    #[test]
    fn unknown_student_is_not_found() {
        let fixture = grade_ten();
        assert!(student_trend(&fixture.snapshot, id(404))
            .unwrap_err()
            .is_not_found());
    }
}
