use std::fmt::Write;

use uuid::Uuid;

use crate::distribution::{exam_distribution, DistributionMode};
use crate::error::AnalyticsError;
use crate::models::{Exam, ProgressEntry};
use crate::progress::compare_progress;
use crate::rank::class_leaderboard;
use crate::snapshot::ScoreSnapshot;
use crate::trend::{student_trend_with, TrendPolicy};

fn progress_line(output: &mut String, entry: &ProgressEntry) {
    let _ = writeln!(
        output,
        "- {} ({}): {:+.2} ({:.2} -> {:.2})",
        entry.name, entry.student_number, entry.progress, entry.previous_value, entry.current_value
    );
}

fn latest_exam_sections(
    output: &mut String,
    snapshot: &ScoreSnapshot,
    latest: &Exam,
) -> Result<(), AnalyticsError> {
    let distribution = exam_distribution(snapshot, latest.id, None)?;
    let _ = writeln!(
        output,
        "{} on {} (totals out of {})",
        latest.name,
        latest.exam_date,
        DistributionMode::ExamTotal.max_score()
    );
    for bucket in &distribution {
        let _ = writeln!(output, "- {}: {}", bucket.range, bucket.count);
    }

    let progress = compare_progress(snapshot, latest.id, None)?;
    let _ = writeln!(output);
    match progress
        .previous_exam_id
        .and_then(|id| snapshot.exam(id).ok())
    {
        Some(previous) => {
            let _ = writeln!(output, "## Progress Since {}", previous.name);
            let _ = writeln!(output, "### Most Improved");
            if progress.improved.is_empty() {
                let _ = writeln!(output, "No improvements.");
            }
            for entry in &progress.improved {
                progress_line(output, entry);
            }
            let _ = writeln!(output, "### Largest Declines");
            if progress.declined.is_empty() {
                let _ = writeln!(output, "No declines.");
            }
            for entry in &progress.declined {
                progress_line(output, entry);
            }
        }
        None => {
            let _ = writeln!(output, "## Progress");
            let _ = writeln!(output, "No earlier exam to compare against.");
        }
    }
    Ok(())
}

pub fn build_class_report(
    snapshot: &ScoreSnapshot,
    class_id: Uuid,
    policy: &TrendPolicy,
) -> Result<String, AnalyticsError> {
    let class = snapshot.class(class_id)?;
    let roster = snapshot.class_students(class_id);
    let exams = snapshot.class_exams(class_id);
    let leaderboard = class_leaderboard(snapshot, class_id)?;

    let mut output = String::new();

    let _ = writeln!(output, "# Class Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} students, {} exams)",
        class.name,
        roster.len(),
        exams.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if leaderboard.is_empty() {
        let _ = writeln!(output, "No scores recorded for this class.");
    } else {
        for (position, entry) in leaderboard.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}) average {:.1}",
                position + 1,
                entry.name,
                entry.student_number,
                entry.average_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Exam");

    match exams.last() {
        Some(latest) => latest_exam_sections(&mut output, snapshot, latest)?,
        None => {
            let _ = writeln!(output, "No exams scheduled for this class.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Trends");

    if roster.is_empty() {
        let _ = writeln!(output, "No students enrolled.");
    }
    for student in roster {
        let trend = student_trend_with(snapshot, student.id, policy)?;
        let stability = trend.stability.map_or("n/a", |s| s.as_str());
        let _ = writeln!(
            output,
            "- {} ({}): {} over {} exams, stability {} (std dev {:.2})",
            student.name,
            student.student_number,
            trend.trend.as_str(),
            trend.exams.len(),
            stability,
            trend.std_deviation
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassGroup, Student};
    use crate::snapshot::fixtures::{grade_ten, id};

    #[test]
    fn report_covers_every_section() {
        let fixture = grade_ten();
        let report =
            build_class_report(&fixture.snapshot, fixture.class_id, &TrendPolicy::default())
                .unwrap();

        assert!(report.contains("Generated for Grade 10-A (4 students, 3 exams)"));
        assert!(report.contains("1. Jules Moreno (S1002) average 83.0"));
        assert!(report.contains("Final on 2026-03-10 (totals out of 300)"));
        assert!(report.contains("- 300-270: 1"));
        assert!(report.contains("## Progress Since Midterm 2"));
        assert!(report.contains("- Kiara Patel (S1003): -68.00 (215.00 -> 147.00)"));
        assert!(report.contains("- Avery Lee (S1001): improving over 3 exams, stability medium"));
    }

    #[test]
    fn empty_class_still_lists_every_section() {
        let fixture = grade_ten();
        let report =
            build_class_report(&fixture.snapshot, id(2), &TrendPolicy::default()).unwrap();

        assert!(report.contains("No scores recorded for this class."));
        assert!(report.contains("No exams scheduled for this class."));
        assert!(report.contains("## Student Trends\nNo students enrolled."));
    }

    #[test]
    fn enrolled_class_without_exams_reports_student_trends() {
        let class_id = id(5);
        let snapshot = ScoreSnapshot::new(
            vec![ClassGroup {
                id: class_id,
                name: "Grade 11".to_string(),
            }],
            vec![Student {
                id: id(50),
                name: "Rae Okafor".to_string(),
                student_number: "S2001".to_string(),
                class_id,
            }],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let report = build_class_report(&snapshot, class_id, &TrendPolicy::default()).unwrap();

        assert!(report.contains("Generated for Grade 11 (1 students, 0 exams)"));
        assert!(report.contains("No exams scheduled for this class."));
        assert!(report.contains(
            "- Rae Okafor (S2001): insufficient_data over 0 exams, stability n/a (std dev 0.00)"
        ));
    }

    #[test]
    fn unknown_class_is_not_found() {
        let fixture = grade_ten();
        assert!(build_class_report(&fixture.snapshot, id(404), &TrendPolicy::default())
            .unwrap_err()
            .is_not_found());
    }
}
