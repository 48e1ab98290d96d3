use tracing::debug;
use uuid::Uuid;

use crate::aggregate::cohort_values;
use crate::error::AnalyticsError;
use crate::models::DistributionBucket;
use crate::snapshot::ScoreSnapshot;

/// A labelled score band matching every value at or above `lower`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub label: &'static str,
    pub lower: f64,
}

impl Band {
    pub const fn new(label: &'static str, lower: f64) -> Self {
        Self { label, lower }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower
    }
}

pub const COURSE_MAX: f64 = 100.0;

/// Whole-exam totals assume three 100-point courses.
pub const EXAM_TOTAL_MAX: f64 = 300.0;

pub const COURSE_BANDS: [Band; 5] = [
    Band::new("100-90", 90.0),
    Band::new("89-80", 80.0),
    Band::new("79-70", 70.0),
    Band::new("69-60", 60.0),
    Band::new("0-59", f64::NEG_INFINITY),
];

pub const EXAM_TOTAL_BANDS: [Band; 5] = [
    Band::new("300-270", 270.0),
    Band::new("269-240", 240.0),
    Band::new("239-210", 210.0),
    Band::new("209-180", 180.0),
    Band::new("0-179", f64::NEG_INFINITY),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionMode {
    Course,
    ExamTotal,
}

impl DistributionMode {
    pub fn bands(self) -> &'static [Band] {
        match self {
            DistributionMode::Course => &COURSE_BANDS,
            DistributionMode::ExamTotal => &EXAM_TOTAL_BANDS,
        }
    }

    pub fn max_score(self) -> f64 {
        match self {
            DistributionMode::Course => COURSE_MAX,
            DistributionMode::ExamTotal => EXAM_TOTAL_MAX,
        }
    }
}

/// Counts values per band, bands ordered highest first. Each value lands in
/// the first band that contains it; the last band takes everything left, so
/// the counts always add up to `values.len()`. Every band is reported, empty
/// ones with a zero count.
pub fn bucketize(values: &[f64], bands: &[Band]) -> Vec<DistributionBucket> {
    let Some(catch_all) = bands.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut counts = vec![0usize; bands.len()];
    for &value in values {
        let slot = bands[..catch_all]
            .iter()
            .position(|band| band.contains(value))
            .unwrap_or(catch_all);
        counts[slot] += 1;
    }

    bands
        .iter()
        .zip(counts)
        .map(|(band, count)| DistributionBucket {
            range: band.label,
            count,
        })
        .collect()
}

/// Score distribution of an exam's cohort: single-course bands when a course
/// is selected, whole-exam total bands otherwise.
pub fn exam_distribution(
    snapshot: &ScoreSnapshot,
    exam_id: Uuid,
    course_id: Option<Uuid>,
) -> Result<Vec<DistributionBucket>, AnalyticsError> {
    let exam = snapshot.exam(exam_id)?;
    let mode = match course_id {
        Some(course_id) => {
            snapshot.course(course_id)?;
            DistributionMode::Course
        }
        None => DistributionMode::ExamTotal,
    };

    let values: Vec<f64> = cohort_values(snapshot, exam, course_id)
        .into_iter()
        .map(|member| member.value)
        .collect();
    debug!(exam = %exam.name, ?mode, values = values.len(), "bucketizing exam scores");
    Ok(bucketize(&values, mode.bands()))
}
