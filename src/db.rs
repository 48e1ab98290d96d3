use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{ClassGroup, Course, Exam, ScoreRecord, Student};
use crate::snapshot::ScoreSnapshot;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("schema migrations applied");
    Ok(())
}

pub async fn upsert_class(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_performance.classes (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn upsert_course(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_performance.courses (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn upsert_student(
    pool: &PgPool,
    student_number: &str,
    full_name: &str,
    class_id: Uuid,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_performance.students (id, full_name, student_number, class_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_number) DO UPDATE
        SET full_name = EXCLUDED.full_name, class_id = EXCLUDED.class_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(student_number)
    .bind(class_id)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn upsert_exam(
    pool: &PgPool,
    class_id: Uuid,
    name: &str,
    exam_date: NaiveDate,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_performance.exams (id, name, class_id, exam_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (class_id, name) DO UPDATE SET exam_date = EXCLUDED.exam_date
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(class_id)
    .bind(exam_date)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

/// Inserts or overwrites one score; returns whether a row was written.
pub async fn upsert_score(
    pool: &PgPool,
    student_id: Uuid,
    exam_id: Uuid,
    course_id: Uuid,
    score: f64,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_performance.scores (student_id, exam_id, course_id, score)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, exam_id, course_id) DO UPDATE
        SET score = EXCLUDED.score
        WHERE student_performance.scores.score IS DISTINCT FROM EXCLUDED.score
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(course_id)
    .bind(score)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let class_id = upsert_class(pool, "Grade 10-A").await?;

    let mut course_ids = Vec::new();
    for name in ["Mathematics", "English", "Science"] {
        course_ids.push(upsert_course(pool, name).await?);
    }

    let exams = [
        ("Midterm 1", NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?),
        ("Midterm 2", NaiveDate::from_ymd_opt(2026, 2, 16).context("invalid date")?),
        ("Final", NaiveDate::from_ymd_opt(2026, 3, 23).context("invalid date")?),
    ];
    let mut exam_ids = Vec::new();
    for (name, exam_date) in exams {
        exam_ids.push(upsert_exam(pool, class_id, name, exam_date).await?);
    }

    // One row per student; three exams of Mathematics/English/Science.
    // Jun has no Science score on the final.
    let roster: [(&str, &str, [[Option<f64>; 3]; 3]); 5] = [
        (
            "S1001",
            "Avery Lee",
            [
                [Some(72.0), Some(78.0), Some(75.0)],
                [Some(80.0), Some(82.0), Some(79.0)],
                [Some(88.0), Some(90.0), Some(86.0)],
            ],
        ),
        (
            "S1002",
            "Jules Moreno",
            [
                [Some(91.0), Some(87.0), Some(89.0)],
                [Some(86.0), Some(84.0), Some(85.0)],
                [Some(79.0), Some(80.0), Some(77.0)],
            ],
        ),
        (
            "S1003",
            "Kiara Patel",
            [
                [Some(64.0), Some(70.0), Some(66.0)],
                [Some(65.0), Some(71.0), Some(68.0)],
                [Some(66.0), Some(69.0), Some(67.0)],
            ],
        ),
        (
            "S1004",
            "Noor Haddad",
            [
                [Some(55.0), Some(62.0), Some(58.0)],
                [Some(70.0), Some(74.0), Some(69.0)],
                [Some(81.0), Some(85.0), Some(80.0)],
            ],
        ),
        (
            "S1005",
            "Jun Park",
            [
                [Some(83.0), Some(79.0), Some(84.0)],
                [Some(60.0), Some(88.0), Some(71.0)],
                [Some(90.0), Some(76.0), None],
            ],
        ),
    ];

    let mut written = 0usize;
    for (student_number, full_name, grid) in roster {
        let student_id = upsert_student(pool, student_number, full_name, class_id).await?;
        for (exam_id, row) in exam_ids.iter().zip(grid) {
            for (course_id, value) in course_ids.iter().zip(row) {
                let Some(score) = value else {
                    continue;
                };
                if upsert_score(pool, student_id, *exam_id, *course_id, score).await? {
                    written += 1;
                }
            }
        }
    }

    info!(scores = written, "seed data written");
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        class_name: String,
        student_number: String,
        student_name: String,
        exam_name: String,
        exam_date: NaiveDate,
        course_name: String,
        score: f64,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", line + 1))?;
        if !row.score.is_finite() {
            anyhow::bail!("record {} has a non-numeric score", line + 1);
        }

        let class_id = upsert_class(pool, &row.class_name).await?;
        let student_id =
            upsert_student(pool, &row.student_number, &row.student_name, class_id).await?;
        let exam_id = upsert_exam(pool, class_id, &row.exam_name, row.exam_date).await?;
        let course_id = upsert_course(pool, &row.course_name).await?;

        if upsert_score(pool, student_id, exam_id, course_id, row.score).await? {
            written += 1;
        }
    }

    info!(scores = written, path = %csv_path.display(), "CSV import finished");
    Ok(written)
}

/// Loads the whole repository into an immutable snapshot. Students come back
/// by student number, exams by date then id.
pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<ScoreSnapshot> {
    let classes = sqlx::query("SELECT id, name FROM student_performance.classes ORDER BY name")
        .fetch_all(pool)
        .await
        .context("failed to load classes")?
        .into_iter()
        .map(|row| ClassGroup {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect();

    let students = sqlx::query(
        "SELECT id, full_name, student_number, class_id \
         FROM student_performance.students \
         ORDER BY student_number",
    )
    .fetch_all(pool)
    .await
    .context("failed to load students")?
    .into_iter()
    .map(|row| Student {
        id: row.get("id"),
        name: row.get("full_name"),
        student_number: row.get("student_number"),
        class_id: row.get("class_id"),
    })
    .collect();

    let courses = sqlx::query("SELECT id, name FROM student_performance.courses ORDER BY name")
        .fetch_all(pool)
        .await
        .context("failed to load courses")?
        .into_iter()
        .map(|row| Course {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect();

    let exams = sqlx::query(
        "SELECT id, name, class_id, exam_date \
         FROM student_performance.exams \
         ORDER BY exam_date, id",
    )
    .fetch_all(pool)
    .await
    .context("failed to load exams")?
    .into_iter()
    .map(|row| Exam {
        id: row.get("id"),
        name: row.get("name"),
        class_id: row.get("class_id"),
        exam_date: row.get("exam_date"),
    })
    .collect();

    let scores: Vec<ScoreRecord> = sqlx::query(
        "SELECT student_id, exam_id, course_id, score FROM student_performance.scores",
    )
    .fetch_all(pool)
    .await
    .context("failed to load scores")?
    .into_iter()
    .map(|row| ScoreRecord {
        student_id: row.get("student_id"),
        exam_id: row.get("exam_id"),
        course_id: row.get("course_id"),
        score: row.get("score"),
    })
    .collect();

    info!(scores = scores.len(), "snapshot loaded");
    Ok(ScoreSnapshot::new(classes, students, courses, exams, scores))
}
