pub mod checklist;
pub mod clock;
pub mod completion;
pub mod config;
pub mod error;
pub mod model;
pub mod schedule;
pub mod sitter_api;
pub mod source;
pub mod storage;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{DaySet, Frequency, Task};
    use crate::schedule::is_due_on;
    use time::macros::date;

    #[test]
    fn task_has_required_fields() {
        let task = Task {
            id: "task-1".to_string(),
            tank_id: "tank-1".to_string(),
            title: "Feed".to_string(),
            description: None,
            frequency: Frequency::Weekly {
                days: DaySet::from_indices([1]),
            },
            created_at: "2025-12-20T00:00:00Z".to_string(),
        };

        assert_eq!(task.id, "task-1");
        assert_eq!(task.tank_id, "tank-1");
        assert_eq!(task.frequency.label(), "weekly");
        assert!(is_due_on(&task, date!(2025 - 12 - 22)));
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
    }
}
