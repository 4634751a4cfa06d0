use crate::checklist::{Checklist, SitterSession};
use crate::clock::Clock;
use crate::config::StorePaths;
use crate::error::AppError;
use crate::model::{Frequency, Tank, Task, TaskRecord};
use crate::schedule::sort_for_display;
use crate::source::{JsonTaskSource, TaskSource};
use crate::storage::{FileKeyValueStore, KeyValueStore, json_store};
use std::cmp::Ordering;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub task_id: String,
    pub done: bool,
    pub checklist: Checklist,
}

pub fn add_tank(paths: &StorePaths, name: &str) -> Result<Tank, AppError> {
    add_tank_with_path(&paths.data, name)
}

/// Newest tank first.
pub fn list_tanks(paths: &StorePaths) -> Result<Vec<Tank>, AppError> {
    list_tanks_with_path(&paths.data)
}

/// Removes the tank together with every task that belongs to it.
pub fn delete_tank(paths: &StorePaths, id: &str) -> Result<Tank, AppError> {
    delete_tank_with_path(&paths.data, id)
}

pub fn add_task(paths: &StorePaths, tank_id: &str, new_task: NewTask) -> Result<Task, AppError> {
    add_task_with_path(&paths.data, tank_id, new_task)
}

pub fn delete_task(paths: &StorePaths, id: &str) -> Result<TaskRecord, AppError> {
    delete_task_with_path(&paths.data, id)
}

pub fn list_tasks(paths: &StorePaths, tank_id: &str) -> Result<Vec<Task>, AppError> {
    list_tasks_with_path(&paths.data, tank_id)
}

pub fn task_source(paths: &StorePaths) -> JsonTaskSource {
    JsonTaskSource::new(&paths.data)
}

/// A sitter session whose progress lives in the completion file.
pub fn open_session<C: Clock>(paths: &StorePaths, clock: C) -> SitterSession<FileKeyValueStore, C> {
    SitterSession::new(FileKeyValueStore::new(&paths.completion), clock)
}

/// Toggles a task for `date` and returns the refreshed checklist.
pub fn toggle_task<K, C>(
    session: &mut SitterSession<K, C>,
    source: &dyn TaskSource,
    share_token: &str,
    task_id: &str,
    date: Date,
) -> Result<ToggleOutcome, AppError>
where
    K: KeyValueStore,
    C: Clock,
{
    let done = session.toggle(source, share_token, task_id, date)?;
    let checklist = session.checklist_on(source, share_token, date)?;
    Ok(ToggleOutcome {
        task_id: task_id.trim().to_string(),
        done,
        checklist,
    })
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn add_tank_with_path(path: &Path, name: &str) -> Result<Tank, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }

    let tank = Tank {
        id: uuid::Uuid::new_v4().to_string(),
        name: trimmed.to_string(),
        share_token: uuid::Uuid::new_v4().to_string(),
        created_at: now_rfc3339()?,
    };

    let mut state = json_store::load_state(path)?;
    state.tanks.push(tank.clone());
    json_store::save_state(path, &state)?;
    info!(tank_id = %tank.id, "created tank");

    Ok(tank)
}

fn list_tanks_with_path(path: &Path) -> Result<Vec<Tank>, AppError> {
    let mut tanks = json_store::load_state(path)?.tanks;
    tanks.sort_by(|left, right| {
        let by_time = match (created_at(&left.created_at), created_at(&right.created_at)) {
            (Some(left_at), Some(right_at)) => right_at.cmp(&left_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_time.then_with(|| left.id.cmp(&right.id))
    });
    Ok(tanks)
}

fn created_at(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

fn delete_tank_with_path(path: &Path, id: &str) -> Result<Tank, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("tank id is required"));
    }

    let mut state = json_store::load_state(path)?;
    let index = state
        .tanks
        .iter()
        .position(|tank| tank.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("tank not found"))?;

    let removed = state.tanks.remove(index);
    let task_count = state.tasks.len();
    state.tasks.retain(|record| record.tank_id != removed.id);
    let removed_tasks = task_count - state.tasks.len();
    json_store::save_state(path, &state)?;
    info!(tank_id = %removed.id, removed_tasks, "deleted tank");

    Ok(removed)
}

fn add_task_with_path(path: &Path, tank_id: &str, new_task: NewTask) -> Result<Task, AppError> {
    let trimmed_tank_id = tank_id.trim();
    if trimmed_tank_id.is_empty() {
        return Err(AppError::invalid_input("tank id is required"));
    }

    let trimmed_title = new_task.title.trim();
    if trimmed_title.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let mut state = json_store::load_state(path)?;
    if !state.tanks.iter().any(|tank| tank.id == trimmed_tank_id) {
        return Err(AppError::not_found("tank not found"));
    }

    let task = Task {
        id: format!("task-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        tank_id: trimmed_tank_id.to_string(),
        title: trimmed_title.to_string(),
        description: new_task
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        frequency: new_task.frequency,
        created_at: now_rfc3339()?,
    };

    state.tasks.push(TaskRecord::from(&task));
    json_store::save_state(path, &state)?;
    info!(task_id = %task.id, tank_id = %task.tank_id, "created task");

    Ok(task)
}

fn delete_task_with_path(path: &Path, id: &str) -> Result<TaskRecord, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    let mut state = json_store::load_state(path)?;
    let index = state
        .tasks
        .iter()
        .position(|record| record.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("task not found"))?;

    let removed = state.tasks.remove(index);
    json_store::save_state(path, &state)?;
    info!(task_id = %removed.id, "deleted task");

    Ok(removed)
}

fn list_tasks_with_path(path: &Path, tank_id: &str) -> Result<Vec<Task>, AppError> {
    let trimmed_tank_id = tank_id.trim();
    if trimmed_tank_id.is_empty() {
        return Err(AppError::invalid_input("tank id is required"));
    }

    let state = json_store::load_state(path)?;
    if !state.tanks.iter().any(|tank| tank.id == trimmed_tank_id) {
        return Err(AppError::not_found("tank not found"));
    }

    let mut tasks = state.tasks_for_tank(trimmed_tank_id)?;
    sort_for_display(&mut tasks);
    Ok(tasks)
}
