use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::numeric::{serialize_1dp, serialize_2dp};

#[derive(Debug, Clone)]
pub struct ClassGroup {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub student_number: String,
    pub class_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Exam {
    pub id: Uuid,
    pub name: String,
    pub class_id: Uuid,
    pub exam_date: NaiveDate,
}

/// One raw score row; unique per `(student_id, exam_id, course_id)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub course_id: Uuid,
    pub score: f64,
}

/// A student's value within one exam (total or single course).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortMember {
    pub student_id: Uuid,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub student_id: Uuid,
    #[serde(serialize_with = "serialize_2dp")]
    pub value: f64,
    pub rank: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub name: String,
    pub student_number: String,
    #[serde(serialize_with = "serialize_1dp")]
    pub average_score: f64,
}

/// Immutable per-exam summary for one student, produced by the
/// aggregate-then-rank pipeline and consumed by trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamSummary {
    pub exam_id: Uuid,
    pub exam_name: String,
    pub exam_date: NaiveDate,
    #[serde(serialize_with = "serialize_2dp")]
    pub total_score: f64,
    #[serde(serialize_with = "serialize_2dp")]
    pub average_score: f64,
    pub course_count: usize,
    pub rank: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub exam_id: Uuid,
    pub exam_date: NaiveDate,
    pub total_score: f64,
    pub average_score: f64,
}

impl From<&ExamSummary> for HistoryPoint {
    fn from(summary: &ExamSummary) -> Self {
        HistoryPoint {
            exam_id: summary.exam_id,
            exam_date: summary.exam_date,
            total_score: summary.total_score,
            average_score: summary.average_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    High,
    Medium,
    Low,
}

impl Stability {
    pub fn as_str(self) -> &'static str {
        match self {
            Stability::High => "high",
            Stability::Medium => "medium",
            Stability::Low => "low",
        }
    }
}

/// `stability` is `None` only for an empty history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub stability: Option<Stability>,
    #[serde(serialize_with = "serialize_2dp")]
    pub variance: f64,
    #[serde(serialize_with = "serialize_2dp")]
    pub std_deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRef {
    pub id: Uuid,
    pub name: String,
    pub student_number: String,
}

impl From<&Student> for StudentRef {
    fn from(student: &Student) -> Self {
        StudentRef {
            id: student.id,
            name: student.name.clone(),
            student_number: student.student_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTrendReport {
    pub student: StudentRef,
    pub exams: Vec<ExamSummary>,
    pub trend: TrendDirection,
    pub stability: Option<Stability>,
    #[serde(serialize_with = "serialize_2dp")]
    pub variance: f64,
    #[serde(serialize_with = "serialize_2dp")]
    pub std_deviation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionBucket {
    pub range: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEntry {
    pub student_id: Uuid,
    pub name: String,
    pub student_number: String,
    #[serde(serialize_with = "serialize_2dp")]
    pub previous_value: f64,
    #[serde(serialize_with = "serialize_2dp")]
    pub current_value: f64,
    #[serde(serialize_with = "serialize_2dp")]
    pub progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressReport {
    #[serde(skip)]
    pub previous_exam_id: Option<Uuid>,
    pub improved: Vec<ProgressEntry>,
    pub declined: Vec<ProgressEntry>,
}
