use std::fmt;

use thiserror::Error;

/// The kinds of repository entities an analytics call can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Class,
    Student,
    Exam,
    Course,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Class => "class",
            Entity::Student => "student",
            Entity::Exam => "exam",
            Entity::Course => "course",
        };
        f.write_str(label)
    }
}

/// Failures surfaced by the analytics engine.
///
/// Empty cohorts, short histories and exams without a predecessor are not
/// errors; they produce neutral results instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },
}

impl AnalyticsError {
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        AnalyticsError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyticsError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_key() {
        let error = AnalyticsError::not_found(Entity::Exam, "final-2026");
        assert_eq!(error.to_string(), "exam not found: final-2026");
        assert!(error.is_not_found());
    }
}
