use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

use crate::aggregate::cohort_values;
use crate::error::AnalyticsError;
use crate::models::{CohortMember, LeaderboardEntry, RankedEntry};
use crate::snapshot::ScoreSnapshot;

/// Dense 1-based ranks, highest value first. Equal values keep their cohort
/// input order, so the earlier member always takes the better rank.
pub fn rank(cohort: &[CohortMember]) -> Vec<RankedEntry> {
    // `+ 0.0` folds -0.0 into 0.0 so the two compare equal.
    let key = |index: usize| cohort[index].value + 0.0;
    let mut order: Vec<usize> = (0..cohort.len()).collect();
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)).then(a.cmp(&b)));

    let total_students = cohort.len();
    order
        .into_iter()
        .enumerate()
        .map(|(position, index)| RankedEntry {
            student_id: cohort[index].student_id,
            value: cohort[index].value,
            rank: position + 1,
            total_students,
        })
        .collect()
}

/// Ranks a class's cohort for one exam, on totals or on a single course.
pub fn rank_exam(
    snapshot: &ScoreSnapshot,
    exam_id: Uuid,
    course_id: Option<Uuid>,
) -> Result<Vec<RankedEntry>, AnalyticsError> {
    let exam = snapshot.exam(exam_id)?;
    if let Some(course_id) = course_id {
        snapshot.course(course_id)?;
    }

    let cohort = cohort_values(snapshot, exam, course_id);
    debug!(exam = %exam.name, cohort = cohort.len(), "ranking exam cohort");
    Ok(rank(&cohort))
}

/// Students of a class ordered by the mean of every score they hold in the
/// class's exams. Students without any score are left out.
pub fn class_leaderboard(
    snapshot: &ScoreSnapshot,
    class_id: Uuid,
) -> Result<Vec<LeaderboardEntry>, AnalyticsError> {
    snapshot.class(class_id)?;
    let exam_ids: HashSet<Uuid> = snapshot
        .class_exams(class_id)
        .iter()
        .map(|exam| exam.id)
        .collect();

    let mut sums: HashMap<Uuid, (f64, usize)> = HashMap::new();
    for record in snapshot.scores() {
        if !exam_ids.contains(&record.exam_id) {
            continue;
        }
        let entry = sums.entry(record.student_id).or_insert((0.0, 0));
        entry.0 += record.score;
        entry.1 += 1;
    }

    let roster = snapshot.class_students(class_id);
    let cohort: Vec<CohortMember> = roster
        .iter()
        .filter_map(|student| {
            sums.get(&student.id).map(|&(sum, count)| CohortMember {
                student_id: student.id,
                value: sum / count as f64,
            })
        })
        .collect();

    let ranked = rank(&cohort);
    let mut leaderboard = Vec::with_capacity(ranked.len());
    for entry in ranked {
        let student = snapshot.student(entry.student_id)?;
        leaderboard.push(LeaderboardEntry {
            id: student.id,
            name: student.name.clone(),
            student_number: student.student_number.clone(),
            average_score: entry.value,
        });
    }
    Ok(leaderboard)
}
