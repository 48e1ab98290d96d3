use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::aggregate::cohort_values;
use crate::error::AnalyticsError;
use crate::models::{ProgressEntry, ProgressReport};
use crate::snapshot::ScoreSnapshot;

/// Entries kept in each of the improved and declined lists.
pub const PROGRESS_TOP_N: usize = 5;

/// Compares each student's value in `exam_id` with the class's immediately
/// preceding exam. Only students with a value in both exams are compared.
pub fn compare_progress(
    snapshot: &ScoreSnapshot,
    exam_id: Uuid,
    course_id: Option<Uuid>,
) -> Result<ProgressReport, AnalyticsError> {
    let current = snapshot.exam(exam_id)?;
    if let Some(course_id) = course_id {
        snapshot.course(course_id)?;
    }

    let Some(previous) = snapshot.preceding_exam(current) else {
        debug!(exam = %current.name, "no preceding exam, nothing to compare");
        return Ok(ProgressReport::default());
    };

    let previous_values: HashMap<Uuid, f64> = cohort_values(snapshot, previous, course_id)
        .into_iter()
        .map(|member| (member.student_id, member.value))
        .collect();

    let mut entries = Vec::new();
    for member in cohort_values(snapshot, current, course_id) {
        let Some(&previous_value) = previous_values.get(&member.student_id) else {
            continue;
        };
        let student = snapshot.student(member.student_id)?;
        entries.push(ProgressEntry {
            student_id: student.id,
            name: student.name.clone(),
            student_number: student.student_number.clone(),
            previous_value,
            current_value: member.value,
            progress: member.value - previous_value,
        });
    }
    debug!(
        exam = %current.name,
        previous = %previous.name,
        compared = entries.len(),
        "progress computed"
    );

    let mut report = split_progress(entries);
    report.previous_exam_id = Some(previous.id);
    Ok(report)
}

/// Splits entries into the top improvements (largest gain first) and the
/// top declines (largest drop first). Unchanged entries are dropped.
pub fn split_progress(entries: Vec<ProgressEntry>) -> ProgressReport {
    let (mut improved, mut declined): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .filter(|entry| entry.progress != 0.0)
        .partition(|entry| entry.progress > 0.0);

    improved.sort_by(|a, b| b.progress.total_cmp(&a.progress));
    improved.truncate(PROGRESS_TOP_N);
    declined.sort_by(|a, b| a.progress.total_cmp(&b.progress));
    declined.truncate(PROGRESS_TOP_N);

    ProgressReport {
        previous_exam_id: None,
        improved,
        declined,
    }
}
