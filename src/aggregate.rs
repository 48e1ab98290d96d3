use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{CohortMember, Exam, ScoreRecord};
use crate::snapshot::ScoreSnapshot;

/// Sum and course count of one student's scores within one exam.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExamAggregate {
    pub total: f64,
    pub course_count: usize,
}

impl ExamAggregate {
    fn add(&mut self, score: f64) {
        self.total += score;
        self.course_count += 1;
    }

    pub fn average(&self) -> f64 {
        self.total / self.course_count as f64
    }
}

/// Sum of the student's course scores for the exam, or `None` when the
/// student has no score in it at all.
pub fn aggregate_exam_total(scores: &[ScoreRecord], student_id: Uuid, exam_id: Uuid) -> Option<f64> {
    exam_aggregate(scores, student_id, exam_id).map(|aggregate| aggregate.total)
}

/// The single course score; absent scores stay absent.
pub fn aggregate_course_score(
    scores: &[ScoreRecord],
    student_id: Uuid,
    exam_id: Uuid,
    course_id: Uuid,
) -> Option<f64> {
    scores
        .iter()
        .find(|record| {
            record.student_id == student_id
                && record.exam_id == exam_id
                && record.course_id == course_id
        })
        .map(|record| record.score)
}

pub fn exam_aggregate(scores: &[ScoreRecord], student_id: Uuid, exam_id: Uuid) -> Option<ExamAggregate> {
    scores
        .iter()
        .filter(|record| record.student_id == student_id && record.exam_id == exam_id)
        .fold(None, |acc: Option<ExamAggregate>, record| {
            let mut aggregate = acc.unwrap_or_default();
            aggregate.add(record.score);
            Some(aggregate)
        })
}

/// Mean over the courses the student was actually scored on.
pub fn exam_average(scores: &[ScoreRecord], student_id: Uuid, exam_id: Uuid) -> Option<f64> {
    exam_aggregate(scores, student_id, exam_id).map(|aggregate| aggregate.average())
}

/// The exam's cohort in roster order: every student of the exam's class who
/// has a value, either the whole-exam total or the selected course score.
pub fn cohort_values(snapshot: &ScoreSnapshot, exam: &Exam, course_id: Option<Uuid>) -> Vec<CohortMember> {
    let mut per_student: HashMap<Uuid, ExamAggregate> = HashMap::new();
    for record in snapshot.scores() {
        if record.exam_id != exam.id {
            continue;
        }
        if course_id.is_some_and(|course_id| record.course_id != course_id) {
            continue;
        }
        per_student.entry(record.student_id).or_default().add(record.score);
    }

    snapshot
        .class_students(exam.class_id)
        .into_iter()
        .filter_map(|student| {
            per_student.get(&student.id).map(|aggregate| CohortMember {
                student_id: student.id,
                value: aggregate.total,
            })
        })
        .collect()
}
