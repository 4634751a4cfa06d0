use crate::model::{Frequency, Task};
use std::cmp::Ordering;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

/// Whether `task` belongs on the checklist for the local calendar date `date`.
///
/// Once tasks stay due every day until they are deleted.
pub fn is_due_on(task: &Task, date: Date) -> bool {
    match &task.frequency {
        Frequency::Daily | Frequency::Once => true,
        Frequency::Weekly { days } => days.contains(date.weekday()),
    }
}

/// Tasks due on `date` in display order.
pub fn due_tasks(tasks: &[Task], date: Date) -> Vec<Task> {
    let mut due: Vec<Task> = tasks
        .iter()
        .filter(|task| is_due_on(task, date))
        .cloned()
        .collect();
    sort_for_display(&mut due);
    due
}

/// Orders by `created_at`, oldest first. Unparsable timestamps sort last.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        let left_at = created_at(left);
        let right_at = created_at(right);
        let by_time = match (left_at, right_at) {
            (Some(left_at), Some(right_at)) => left_at.cmp(&right_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_time.then_with(|| left.id.cmp(&right.id))
    });
}

fn created_at(task: &Task) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(&task.created_at, &Rfc3339).ok()
}
