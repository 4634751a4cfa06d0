use crate::clock::Clock;
use crate::completion::CompletionTracker;
use crate::error::AppError;
use crate::model::{Tank, Task};
use crate::schedule::{due_tasks, is_due_on};
use crate::source::TaskSource;
use crate::storage::KeyValueStore;
use time::Date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub task: Task,
    pub done: bool,
}

/// What a sitter sees for one tank on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    pub tank: Tank,
    pub date: Date,
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    pub fn build<K: KeyValueStore>(
        tank: Tank,
        tasks: &[Task],
        tracker: &mut CompletionTracker<K>,
        date: Date,
    ) -> Self {
        let done = tracker.load_completion_set(&tank.id, date);
        let items = due_tasks(tasks, date)
            .into_iter()
            .map(|task| {
                let done = done.contains(&task.id);
                ChecklistItem { task, done }
            })
            .collect();

        Self { tank, date, items }
    }

    pub fn due_count(&self) -> usize {
        self.items.len()
    }

    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|item| item.done).count()
    }

    /// Vacuously true when nothing is due.
    pub fn all_done(&self) -> bool {
        self.items.iter().all(|item| item.done)
    }

    pub fn progress_percent(&self) -> u8 {
        let due = self.due_count();
        if due == 0 {
            return 100;
        }
        // done <= due, so this stays within 0..=100.
        (self.done_count() * 100 / due) as u8
    }
}

/// Every task due on `date` is marked complete.
pub fn all_done<K: KeyValueStore>(
    tasks: &[Task],
    tracker: &mut CompletionTracker<K>,
    tank_id: &str,
    date: Date,
) -> bool {
    let done = tracker.load_completion_set(tank_id, date);
    tasks
        .iter()
        .filter(|task| is_due_on(task, date))
        .all(|task| done.contains(&task.id))
}

/// One viewer's session on one device.
pub struct SitterSession<K, C> {
    tracker: CompletionTracker<K>,
    clock: C,
}

impl<K: KeyValueStore, C: Clock> SitterSession<K, C> {
    pub fn new(store: K, clock: C) -> Self {
        Self {
            tracker: CompletionTracker::new(store),
            clock,
        }
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn tracker(&self) -> &CompletionTracker<K> {
        &self.tracker
    }

    pub fn checklist(
        &mut self,
        source: &dyn TaskSource,
        share_token: &str,
    ) -> Result<Checklist, AppError> {
        let today = self.today();
        self.checklist_on(source, share_token, today)
    }

    pub fn checklist_on(
        &mut self,
        source: &dyn TaskSource,
        share_token: &str,
        date: Date,
    ) -> Result<Checklist, AppError> {
        let tank = source.tank_by_share_token(share_token)?;
        let tasks = source.tasks_for_tank(&tank.id)?;
        Ok(Checklist::build(tank, &tasks, &mut self.tracker, date))
    }

    /// Toggles one of the tank's tasks and returns the new state.
    pub fn toggle(
        &mut self,
        source: &dyn TaskSource,
        share_token: &str,
        task_id: &str,
        date: Date,
    ) -> Result<bool, AppError> {
        let trimmed_id = task_id.trim();
        if trimmed_id.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        let tank = source.tank_by_share_token(share_token)?;
        let tasks = source.tasks_for_tank(&tank.id)?;
        if !tasks.iter().any(|task| task.id == trimmed_id) {
            return Err(AppError::invalid_input("task not found"));
        }

        Ok(self.tracker.toggle_complete(&tank.id, trimmed_id, date))
    }
}

#[cfg(test)]
mod tests {
    use super::{Checklist, SitterSession, all_done};
    use crate::clock::{Clock, FixedClock};
    use crate::completion::CompletionTracker;
    use crate::error::AppError;
    use crate::model::{DaySet, Frequency, Tank, Task, TaskRecord};
    use crate::storage::json_store::SitterState;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::cell::Cell;
    use std::rc::Rc;
    use time::Date;
    use time::macros::date;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::io("storage disabled"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::io("storage disabled"))
        }
    }

    /// Clock the test can move forward while the session holds it.
    struct SharedClock(Rc<Cell<Date>>);

    impl Clock for SharedClock {
        fn today(&self) -> Date {
            self.0.get()
        }
    }

    fn tank() -> Tank {
        Tank {
            id: "tank-1".to_string(),
            name: "Reef".to_string(),
            share_token: "token-1".to_string(),
            created_at: "2025-12-01T00:00:00Z".to_string(),
        }
    }

    fn task(id: &str, frequency: Frequency, created_at: &str) -> Task {
        Task {
            id: id.to_string(),
            tank_id: "tank-1".to_string(),
            title: format!("title {id}"),
            description: None,
            frequency,
            created_at: created_at.to_string(),
        }
    }

    fn daily_and_sunday() -> Vec<Task> {
        vec![
            task("task-a", Frequency::Daily, "2025-12-01T00:00:00Z"),
            task(
                "task-b",
                Frequency::Weekly {
                    days: DaySet::from_indices([0]),
                },
                "2025-12-02T00:00:00Z",
            ),
        ]
    }

    fn state() -> SitterState {
        SitterState {
            tanks: vec![tank()],
            tasks: daily_and_sunday().iter().map(TaskRecord::from).collect(),
        }
    }

    #[test]
    fn all_done_ignores_tasks_not_due() {
        let tasks = daily_and_sunday();
        let mut tracker = CompletionTracker::new(MemoryStore::new());
        let tuesday = date!(2025 - 12 - 23);
        let sunday = date!(2025 - 12 - 28);

        tracker.toggle_complete("tank-1", "task-a", tuesday);
        assert!(all_done(&tasks, &mut tracker, "tank-1", tuesday));

        tracker.toggle_complete("tank-1", "task-a", sunday);
        assert!(!all_done(&tasks, &mut tracker, "tank-1", sunday));

        tracker.toggle_complete("tank-1", "task-b", sunday);
        assert!(all_done(&tasks, &mut tracker, "tank-1", sunday));
    }

    #[test]
    fn all_done_is_vacuously_true_without_due_tasks() {
        let tasks = vec![task(
            "task-a",
            Frequency::Weekly {
                days: DaySet::EMPTY,
            },
            "2025-12-01T00:00:00Z",
        )];
        let mut tracker = CompletionTracker::new(MemoryStore::new());

        assert!(all_done(&tasks, &mut tracker, "tank-1", date!(2025 - 12 - 23)));
        assert!(all_done(&[], &mut tracker, "tank-1", date!(2025 - 12 - 23)));
    }

    #[test]
    fn checklist_reports_progress_for_due_tasks_only() {
        let tasks = daily_and_sunday();
        let mut tracker = CompletionTracker::new(MemoryStore::new());
        let sunday = date!(2025 - 12 - 28);
        let tuesday = date!(2025 - 12 - 23);

        tracker.toggle_complete("tank-1", "task-a", sunday);
        let checklist = Checklist::build(tank(), &tasks, &mut tracker, sunday);
        assert_eq!(checklist.due_count(), 2);
        assert_eq!(checklist.done_count(), 1);
        assert_eq!(checklist.progress_percent(), 50);
        assert!(!checklist.all_done());
        assert_eq!(checklist.items[0].task.id, "task-a");
        assert!(checklist.items[0].done);

        // A stale completion for a task that is not due does not count.
        tracker.toggle_complete("tank-1", "task-b", tuesday);
        let checklist = Checklist::build(tank(), &tasks, &mut tracker, tuesday);
        assert_eq!(checklist.due_count(), 1);
        assert_eq!(checklist.done_count(), 0);
        assert_eq!(checklist.progress_percent(), 0);
    }

    #[test]
    fn empty_checklist_is_complete() {
        let mut tracker = CompletionTracker::new(MemoryStore::new());
        let checklist = Checklist::build(tank(), &[], &mut tracker, date!(2025 - 12 - 23));

        assert!(checklist.all_done());
        assert_eq!(checklist.progress_percent(), 100);
    }

    #[test]
    fn session_starts_fresh_after_midnight() {
        let source = state();
        let now = Rc::new(Cell::new(date!(2025 - 12 - 28)));
        let mut session = SitterSession::new(MemoryStore::new(), SharedClock(Rc::clone(&now)));

        let today = session.today();
        assert!(session.toggle(&source, "token-1", "task-a", today).unwrap());
        let before = session.checklist(&source, "token-1").unwrap();
        assert_eq!(before.date, date!(2025 - 12 - 28));
        assert_eq!(before.due_count(), 2);
        assert_eq!(before.done_count(), 1);

        now.set(date!(2025 - 12 - 29));
        let after = session.checklist(&source, "token-1").unwrap();
        assert_eq!(after.date, date!(2025 - 12 - 29));
        assert_eq!(after.due_count(), 1);
        assert_eq!(after.done_count(), 0);
        assert!(!after.all_done());

        now.set(date!(2025 - 12 - 28));
        let back = session.checklist(&source, "token-1").unwrap();
        assert_eq!(back.done_count(), 1);
    }

    #[test]
    fn session_rejects_foreign_task_ids() {
        let source = state();
        let mut session = SitterSession::new(MemoryStore::new(), FixedClock(date!(2025 - 12 - 28)));
        let today = session.today();

        let err = session
            .toggle(&source, "token-1", "task-z", today)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = session
            .toggle(&source, "token-9", "task-a", today)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn session_keeps_working_when_storage_is_disabled() {
        let source = state();
        let mut session = SitterSession::new(BrokenStore, FixedClock(date!(2025 - 12 - 23)));
        let today = session.today();

        assert!(session.toggle(&source, "token-1", "task-a", today).unwrap());
        let checklist = session.checklist(&source, "token-1").unwrap();

        assert!(session.tracker().is_degraded());
        assert!(checklist.items[0].done);
        assert!(checklist.all_done());
    }
}
