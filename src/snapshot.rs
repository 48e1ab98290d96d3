use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::error::{AnalyticsError, Entity};
use crate::models::{ClassGroup, Course, Exam, ScoreRecord, Student};

/// Read-only view of the score repository that every analytics call runs
/// against. Students keep the order the repository supplied; that order is
/// the tie-break for rankings.
#[derive(Debug, Clone, Default)]
pub struct ScoreSnapshot {
    classes: Vec<ClassGroup>,
    students: Vec<Student>,
    courses: Vec<Course>,
    exams: Vec<Exam>,
    scores: Vec<ScoreRecord>,
}

impl ScoreSnapshot {
    pub fn new(
        classes: Vec<ClassGroup>,
        students: Vec<Student>,
        courses: Vec<Course>,
        exams: Vec<Exam>,
        scores: Vec<ScoreRecord>,
    ) -> Self {
        let mut slots: HashMap<(Uuid, Uuid, Uuid), usize> = HashMap::new();
        let mut unique: Vec<ScoreRecord> = Vec::with_capacity(scores.len());

        for record in scores {
            let key = (record.student_id, record.exam_id, record.course_id);
            match slots.get(&key) {
                Some(&slot) => {
                    warn!(
                        student_id = %record.student_id,
                        exam_id = %record.exam_id,
                        course_id = %record.course_id,
                        "duplicate score row, keeping the later value"
                    );
                    unique[slot] = record;
                }
                None => {
                    slots.insert(key, unique.len());
                    unique.push(record);
                }
            }
        }

        Self {
            classes,
            students,
            courses,
            exams,
            scores: unique,
        }
    }

    pub fn classes(&self) -> &[ClassGroup] {
        &self.classes
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    pub fn scores(&self) -> &[ScoreRecord] {
        &self.scores
    }

    pub fn class(&self, id: Uuid) -> Result<&ClassGroup, AnalyticsError> {
        self.classes
            .iter()
            .find(|class| class.id == id)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Class, id))
    }

    pub fn student(&self, id: Uuid) -> Result<&Student, AnalyticsError> {
        self.students
            .iter()
            .find(|student| student.id == id)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Student, id))
    }

    pub fn exam(&self, id: Uuid) -> Result<&Exam, AnalyticsError> {
        self.exams
            .iter()
            .find(|exam| exam.id == id)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Exam, id))
    }

    pub fn course(&self, id: Uuid) -> Result<&Course, AnalyticsError> {
        self.courses
            .iter()
            .find(|course| course.id == id)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Course, id))
    }

    pub fn class_by_name(&self, name: &str) -> Result<&ClassGroup, AnalyticsError> {
        self.classes
            .iter()
            .find(|class| class.name == name)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Class, name))
    }

    pub fn course_by_name(&self, name: &str) -> Result<&Course, AnalyticsError> {
        self.courses
            .iter()
            .find(|course| course.name == name)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Course, name))
    }

    pub fn student_by_number(&self, student_number: &str) -> Result<&Student, AnalyticsError> {
        self.students
            .iter()
            .find(|student| student.student_number == student_number)
            .ok_or_else(|| AnalyticsError::not_found(Entity::Student, student_number))
    }

    /// Roster of a class in repository order.
    pub fn class_students(&self, class_id: Uuid) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|student| student.class_id == class_id)
            .collect()
    }

    /// Exams of a class, oldest first; same-day exams are ordered by id.
    pub fn class_exams(&self, class_id: Uuid) -> Vec<&Exam> {
        let mut exams: Vec<&Exam> = self
            .exams
            .iter()
            .filter(|exam| exam.class_id == class_id)
            .collect();
        exams.sort_by(|a, b| a.exam_date.cmp(&b.exam_date).then(a.id.cmp(&b.id)));
        exams
    }

    /// The latest exam of the same class dated strictly before `exam`.
    pub fn preceding_exam(&self, exam: &Exam) -> Option<&Exam> {
        self.exams
            .iter()
            .filter(|candidate| {
                candidate.class_id == exam.class_id && candidate.exam_date < exam.exam_date
            })
            .max_by(|a, b| a.exam_date.cmp(&b.exam_date).then(a.id.cmp(&b.id)))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{grade_ten, id};
    use super::*;

    #[test]
    fn later_duplicate_score_replaces_earlier() {
        let record = ScoreRecord {
            student_id: id(20),
            exam_id: id(30),
            course_id: id(10),
            score: 50.0,
        };
        let replacement = ScoreRecord {
            score: 65.0,
            ..record
        };
        let snapshot = ScoreSnapshot::new(vec![], vec![], vec![], vec![], vec![record, replacement]);
        assert_eq!(snapshot.scores(), &[replacement]);
    }

    #[test]
    fn lookups_report_missing_entities() {
        let fixture = grade_ten();
        let snapshot = &fixture.snapshot;

        assert_eq!(snapshot.student(fixture.avery).unwrap().name, "Avery Lee");
        assert_eq!(
            snapshot.exam(id(999)).unwrap_err(),
            AnalyticsError::not_found(Entity::Exam, id(999))
        );
        assert!(snapshot.class_by_name("Grade 12").unwrap_err().is_not_found());
        assert!(snapshot.course_by_name("Mathematics").is_ok());
        assert_eq!(
            snapshot.student_by_number("S1003").unwrap().id,
            fixture.kiara
        );
    }

    #[test]
    fn class_exams_are_chronological() {
        let fixture = grade_ten();
        let order: Vec<Uuid> = fixture
            .snapshot
            .class_exams(fixture.class_id)
            .iter()
            .map(|exam| exam.id)
            .collect();
        assert_eq!(
            order,
            vec![fixture.midterm_one, fixture.midterm_two, fixture.final_exam]
        );
        assert!(fixture.snapshot.class_exams(id(2)).is_empty());
    }

    #[test]
    fn preceding_exam_is_latest_strictly_earlier() {
        let fixture = grade_ten();
        let snapshot = &fixture.snapshot;

        let final_exam = snapshot.exam(fixture.final_exam).unwrap();
        assert_eq!(
            snapshot.preceding_exam(final_exam).map(|exam| exam.id),
            Some(fixture.midterm_two)
        );
        let first = snapshot.exam(fixture.midterm_one).unwrap();
        assert!(snapshot.preceding_exam(first).is_none());
    }

    #[test]
    fn same_day_exam_is_not_a_predecessor() {
        let class_id = id(1);
        let day = chrono::NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let exams = vec![
            Exam {
                id: id(40),
                name: "Quiz A".to_string(),
                class_id,
                exam_date: day,
            },
            Exam {
                id: id(41),
                name: "Quiz B".to_string(),
                class_id,
                exam_date: day,
            },
        ];
        let snapshot = ScoreSnapshot::new(vec![], vec![], vec![], exams, vec![]);
        let quiz_b = snapshot.exam(id(41)).unwrap();
        assert!(snapshot.preceding_exam(quiz_b).is_none());
    }
}
