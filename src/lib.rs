//! Student performance analytics for Group Scholar classes.
//!
//! Raw `(student, exam, course, score)` rows are turned into exam rankings,
//! score distributions, progress between consecutive exams and per-student
//! trend and stability classifications. The analytics modules are pure
//! functions over a [`ScoreSnapshot`]; `db` loads that snapshot from Postgres.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod distribution;
pub mod error;
pub mod models;
pub mod numeric;
pub mod progress;
pub mod rank;
pub mod report;
pub mod snapshot;
pub mod trend;

pub use error::{AnalyticsError, Entity};
pub use snapshot::ScoreSnapshot;
