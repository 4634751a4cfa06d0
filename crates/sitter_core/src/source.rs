use crate::error::AppError;
use crate::model::{Tank, Task, TaskRecord};
use crate::storage::json_store::{self, SitterState};
use std::path::PathBuf;
use tracing::warn;

/// Read access to tanks and their tasks, keyed by share credential.
pub trait TaskSource {
    fn tank_by_share_token(&self, share_token: &str) -> Result<Tank, AppError>;

    fn tasks_for_tank(&self, tank_id: &str) -> Result<Vec<Task>, AppError>;
}

impl TaskSource for SitterState {
    fn tank_by_share_token(&self, share_token: &str) -> Result<Tank, AppError> {
        let token = share_token.trim();
        if token.is_empty() {
            return Err(AppError::invalid_input("share token is required"));
        }

        self.tanks
            .iter()
            .find(|tank| tank.share_token == token)
            .cloned()
            .ok_or_else(|| AppError::not_found("no tank for this share token"))
    }

    fn tasks_for_tank(&self, tank_id: &str) -> Result<Vec<Task>, AppError> {
        Ok(self
            .tasks
            .iter()
            .filter(|record| record.tank_id == tank_id)
            .filter_map(|record| into_task(record.clone()))
            .collect())
    }
}

/// Records with an unrecognized frequency are hidden rather than failing
/// the whole listing.
fn into_task(record: TaskRecord) -> Option<Task> {
    let task_id = record.id.clone();
    match Task::try_from(record) {
        Ok(task) => Some(task),
        Err(err) => {
            warn!(task_id = %task_id, error = %err, "skipping task record");
            None
        }
    }
}

/// Reads the JSON data file on every call.
#[derive(Debug, Clone)]
pub struct JsonTaskSource {
    path: PathBuf,
}

impl JsonTaskSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl TaskSource for JsonTaskSource {
    fn tank_by_share_token(&self, share_token: &str) -> Result<Tank, AppError> {
        json_store::load_state(&self.path)?.tank_by_share_token(share_token)
    }

    fn tasks_for_tank(&self, tank_id: &str) -> Result<Vec<Task>, AppError> {
        json_store::load_state(&self.path)?.tasks_for_tank(tank_id)
    }
}
